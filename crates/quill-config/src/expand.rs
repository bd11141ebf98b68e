//! Placeholder expansion.
//!
//! Resolved configuration values may reference other values as `$NAME`
//! or `${NAME}`; `$$` escapes a literal dollar. Expansion is a single
//! left-to-right pass: a resolved replacement is spliced in verbatim, not
//! re-scanned, and an unresolved reference survives unchanged. Cycles are
//! caught by the session's expansion frame, a stack-disciplined name set
//! guarded so that every exit path pops what it pushed.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};
use crate::session::ConfigSession;

/// Caller-supplied named value lookup used during expansion.
///
/// The override is consulted before the general resolution chain.
pub trait NamedValues {
    /// Look up `name`, `None` if this provider does not know it.
    fn try_get_value(&self, name: &str) -> Option<String>;

    /// Look up `name`, failing if this provider does not know it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UndefinedValue`] when
    /// [`NamedValues::try_get_value`] returns `None`.
    fn get_value(&self, name: &str) -> ConfigResult<String> {
        self.try_get_value(name)
            .ok_or_else(|| ConfigError::UndefinedValue { name: name.to_owned() })
    }
}

/// Built-in macros available to every default expansion.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMacros;

impl NamedValues for DefaultMacros {
    fn try_get_value(&self, name: &str) -> Option<String> {
        match name {
            "QUILL_SYSTEM_TAG" => Some(format!(
                "{}-{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            )),
            "QUILL_EXE_SUFFIX" => Some(std::env::consts::EXE_SUFFIX.to_owned()),
            _ => None,
        }
    }
}

/// Installation root macros for template configuration.
#[derive(Debug, Clone)]
pub struct RootMacros {
    /// The installation root.
    pub install: PathBuf,
    /// The writable configuration root.
    pub config: PathBuf,
    /// The per-user data root.
    pub data: PathBuf,
}

impl NamedValues for RootMacros {
    fn try_get_value(&self, name: &str) -> Option<String> {
        let path = match name {
            "QUILL_INSTALL" => &self.install,
            "QUILL_CONFIG" => &self.config,
            "QUILL_DATA" => &self.data,
            _ => return None,
        };
        Some(path.display().to_string())
    }
}

/// Which expansion passes to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Run shell-glob brace expansion before and after value expansion.
    pub braces: bool,
    /// Run `$NAME`/`${NAME}` value expansion.
    pub values: bool,
    /// Run path-pattern expansion last.
    pub path_patterns: bool,
}

impl ExpandOptions {
    /// Value expansion only. This is the default.
    #[must_use]
    pub fn values_only() -> Self {
        Self { braces: false, values: true, path_patterns: false }
    }

    /// Every pass, in search-path order: braces, values, braces,
    /// path patterns.
    #[must_use]
    pub fn search_path() -> Self {
        Self { braces: true, values: true, path_patterns: true }
    }
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self::values_only()
    }
}

/// External brace-expansion and path-pattern collaborator.
///
/// Both passes take a string and return a flattened, delimiter-joined
/// search-path string; their internals are out of scope here.
pub trait SearchPathRewriter {
    /// Expand `{a,b,c}` alternatives into a flattened search path.
    fn expand_braces(&self, input: &str) -> String;

    /// Expand recognized path placeholders into a joined path list.
    fn expand_path_patterns(&self, input: &str) -> String;
}

/// The identity rewriter used when no search-path machinery is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRewriter;

impl SearchPathRewriter for NoRewriter {
    fn expand_braces(&self, input: &str) -> String {
        input.to_owned()
    }

    fn expand_path_patterns(&self, input: &str) -> String {
        input.to_owned()
    }
}

/// Replace `@NAME@` markers in template text.
///
/// `@@` produces a literal `@`. A marker left open at end of input is
/// dropped, matching the original stream transform.
///
/// # Errors
///
/// Returns [`ConfigError::UndefinedValue`] if `values` cannot produce a
/// referenced name.
pub fn configure_template(text: &str, values: &dyn NamedValues) -> ConfigResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut reading = false;
    let mut name = String::new();
    for ch in text.chars() {
        if ch == '@' {
            if reading {
                reading = false;
                if name.is_empty() {
                    out.push('@');
                } else {
                    out.push_str(&values.get_value(&name)?);
                }
            } else {
                reading = true;
                name.clear();
            }
        } else if reading {
            name.push(ch);
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}

/// Removes its name from the expansion frame on every exit path.
struct FrameGuard<'a> {
    frame: &'a RefCell<BTreeSet<String>>,
    name: String,
}

impl<'a> FrameGuard<'a> {
    fn push(frame: &'a RefCell<BTreeSet<String>>, name: &str) -> Self {
        frame.borrow_mut().insert(name.to_owned());
        Self { frame, name: name.to_owned() }
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.frame.borrow_mut().remove(&self.name);
    }
}

impl ConfigSession {
    /// Expand with the default macros only.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] on malformed placeholders or a cyclic
    /// reference.
    pub fn expand(&self, input: &str) -> ConfigResult<String> {
        self.expand_with(input, &DefaultMacros)
    }

    /// Expand with an explicit override lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] on malformed placeholders or a cyclic
    /// reference.
    pub fn expand_with(&self, input: &str, values: &dyn NamedValues) -> ConfigResult<String> {
        self.expand_with_options(input, ExpandOptions::default(), Some(values))
    }

    /// Expand with explicit options and an optional override lookup.
    ///
    /// Pass order is fixed: braces, values, braces, path patterns; each
    /// pass feeds the next.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] on malformed placeholders or a cyclic
    /// reference.
    pub fn expand_with_options(
        &self,
        input: &str,
        options: ExpandOptions,
        values: Option<&dyn NamedValues>,
    ) -> ConfigResult<String> {
        let mut result = input.to_owned();
        if options.braces {
            result = self.rewriter.expand_braces(&result);
        }
        if options.values {
            result = self.expand_values(&result, values)?;
        }
        if options.braces {
            result = self.rewriter.expand_braces(&result);
        }
        if options.path_patterns {
            result = self.rewriter.expand_path_patterns(&result);
        }
        Ok(result)
    }

    /// Single left-to-right value expansion pass.
    #[allow(clippy::arithmetic_side_effects)]
    pub(crate) fn expand_values(
        &self,
        input: &str,
        values: Option<&dyn NamedValues>,
    ) -> ConfigResult<String> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];
            let after = &rest[1..];
            if let Some(tail) = after.strip_prefix('$') {
                // "$$" consumes both dollars before any other form.
                out.push('$');
                rest = tail;
            } else if let Some(braced) = after.strip_prefix('{') {
                let Some(close) = braced.find('}') else {
                    return Err(ConfigError::UnterminatedPlaceholder { input: input.to_owned() });
                };
                let name = &braced[..close];
                if name.is_empty() {
                    return Err(ConfigError::EmptyPlaceholder { input: input.to_owned() });
                }
                let token_len = close + 3; // $, {, name, }
                match self.resolve_placeholder(name, values)? {
                    Some(v) => out.push_str(&v),
                    None => out.push_str(&rest[..token_len]),
                }
                rest = &rest[token_len..];
            } else if after.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
                let name_len = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                let name = &after[..name_len];
                let token_len = name_len + 1;
                match self.resolve_placeholder(name, values)? {
                    Some(v) => out.push_str(&v),
                    None => out.push_str(&rest[..token_len]),
                }
                rest = &rest[token_len..];
            } else {
                out.push('$');
                rest = after;
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Resolve one placeholder name: override lookup first, then the
    /// general chain with the empty section and no callback.
    fn resolve_placeholder(
        &self,
        name: &str,
        values: Option<&dyn NamedValues>,
    ) -> ConfigResult<Option<String>> {
        if self.expanding.borrow().contains(name) {
            return Err(ConfigError::CyclicReference { name: name.to_owned() });
        }
        let _guard = FrameGuard::push(&self.expanding, name);
        if let Some(v) = values.and_then(|c| c.try_get_value(name)) {
            return Ok(Some(v));
        }
        self.resolve_value("", name, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticEnvironment;
    use crate::layers::ApplicationIdentity;
    use crate::locate::{RootScope, SearchRoot, SearchRoots};
    use std::rc::Rc;

    fn session_with_rewriter(
        rewriter: impl SearchPathRewriter + 'static,
    ) -> (ConfigSession, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let locator = SearchRoots::new(vec![SearchRoot {
            path: root.path().to_path_buf(),
            scope: RootScope::User,
            managed: true,
        }]);
        let session = ConfigSession::builder(ApplicationIdentity::new("latex"))
            .engine("pdftex")
            .environment(StaticEnvironment::new())
            .locator(locator)
            .rewriter(rewriter)
            .build()
            .unwrap();
        (session, root)
    }

    /// Marks its output and records the input of every pass, so both the
    /// pass order and the feeding of each pass into the next are visible.
    struct RecordingRewriter {
        calls: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl SearchPathRewriter for RecordingRewriter {
        fn expand_braces(&self, input: &str) -> String {
            self.calls.borrow_mut().push(("braces".to_owned(), input.to_owned()));
            format!("{input}|b")
        }

        fn expand_path_patterns(&self, input: &str) -> String {
            self.calls.borrow_mut().push(("paths".to_owned(), input.to_owned()));
            format!("{input}|p")
        }
    }

    struct OneValue;

    impl NamedValues for OneValue {
        fn try_get_value(&self, name: &str) -> Option<String> {
            (name == "KNOWN").then(|| "value".to_owned())
        }
    }

    #[test]
    fn test_configure_template() {
        let out = configure_template("x @KNOWN@ y @@ z", &OneValue).unwrap();
        assert_eq!(out, "x value y @ z");
    }

    #[test]
    fn test_configure_template_unknown_name_fails() {
        let err = configure_template("@MISSING@", &OneValue).unwrap_err();
        assert!(matches!(err, ConfigError::UndefinedValue { .. }));
    }

    #[test]
    fn test_get_value_default_impl() {
        assert_eq!(OneValue.get_value("KNOWN").unwrap(), "value");
        assert!(OneValue.get_value("OTHER").is_err());
    }

    #[test]
    fn test_search_path_pass_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let (session, _root) =
            session_with_rewriter(RecordingRewriter { calls: Rc::clone(&calls) });
        let out = session
            .expand_with_options("${engine}", ExpandOptions::search_path(), None)
            .unwrap();
        assert_eq!(out, "pdftex|b|b|p");
        // The second braces pass sees the resolved value, and the path
        // pass sees both brace markers: braces, values, braces, paths.
        assert_eq!(
            *calls.borrow(),
            vec![
                ("braces".to_owned(), "${engine}".to_owned()),
                ("braces".to_owned(), "pdftex|b".to_owned()),
                ("paths".to_owned(), "pdftex|b|b".to_owned()),
            ]
        );
    }

    #[test]
    fn test_values_only_never_calls_rewriter() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let (session, _root) =
            session_with_rewriter(RecordingRewriter { calls: Rc::clone(&calls) });
        let out = session
            .expand_with_options("${engine}", ExpandOptions::default(), None)
            .unwrap();
        assert_eq!(out, "pdftex");
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_root_macros() {
        let macros = RootMacros {
            install: PathBuf::from("/opt/quill"),
            config: PathBuf::from("/home/ada/.quill"),
            data: PathBuf::from("/home/ada/.local/share/quill"),
        };
        let out = configure_template("bin=@QUILL_INSTALL@/bin data=@QUILL_DATA@", &macros).unwrap();
        assert_eq!(out, "bin=/opt/quill/bin data=/home/ada/.local/share/quill");

        let (session, _root) = session_with_rewriter(NoRewriter);
        assert_eq!(
            session.expand_with("${QUILL_CONFIG}", &macros).unwrap(),
            "/home/ada/.quill"
        );
    }

    #[test]
    fn test_default_macros() {
        let tag = DefaultMacros.try_get_value("QUILL_SYSTEM_TAG").unwrap();
        assert!(tag.contains('-'));
        assert!(DefaultMacros.try_get_value("QUILL_EXE_SUFFIX").is_some());
        assert_eq!(DefaultMacros.try_get_value("nope"), None);
    }
}
