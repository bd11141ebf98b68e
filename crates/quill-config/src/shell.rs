//! Shell command safety policy and command-line sanitizing.
//!
//! Engines may ask the session whether a document-triggered shell command
//! should run. The answer combines the configured [`ShellCommandMode`],
//! the allow-list of known-harmless programs and a re-quoting pass that
//! turns user-supplied double-quoted arguments into safely quoted ones
//! for the platform shell.

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::names;
use crate::session::ConfigSession;

/// Policy for executing shell commands embedded in documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommandMode {
    /// Never execute.
    Forbidden,
    /// Ask the user before executing.
    Query,
    /// Execute allow-listed commands only.
    Restricted,
    /// Execute anything.
    Unrestricted,
}

/// Safety verdict for an examined command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamineResult {
    /// The line is malformed or could not be sanitized.
    SyntaxError,
    /// The program is not on the allow-list; run only if the user says so.
    MaybeSafe,
    /// The program is allow-listed and the line was sanitized.
    ProbablySafe,
}

/// Which quote character argument re-quoting emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// Double quotes, `cmd.exe` style.
    Double,
    /// Single quotes, POSIX shell style.
    Single,
}

impl QuoteStyle {
    /// The style matching the platform shell.
    #[must_use]
    pub fn platform_default() -> Self {
        if cfg!(windows) { Self::Double } else { Self::Single }
    }

    /// The quote character this style emits.
    #[must_use]
    pub fn quote_char(self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
        }
    }
}

/// Outcome of [`ConfigSession::examine_command_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExaminedCommand {
    /// The safety verdict.
    pub result: ExamineResult,
    /// The program name (first token), empty on a syntax error.
    pub program: String,
    /// The sanitized line, present only for [`ExamineResult::ProbablySafe`].
    pub safe_line: Option<String>,
}

/// Re-quote a command line so every argument is safely quoted.
///
/// The first token (the program) is copied verbatim. Every other argument
/// is wrapped in the style's quote character; a double-quoted span in the
/// input is absorbed into the surrounding argument. Returns `None` if the
/// line cannot be made safe: a single quote anywhere, an unterminated
/// double-quoted span, or a quoted span not followed by whitespace.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub fn to_safe_command_line(line: &str, style: QuoteStyle) -> Option<String> {
    let quote = style.quote_char();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() && chars[i].is_ascii_whitespace() {
        i += 1;
    }
    let mut out = String::with_capacity(line.len());
    while i < chars.len() && !chars[i].is_ascii_whitespace() {
        out.push(chars[i]);
        i += 1;
    }

    let mut previous_is_whitespace = true;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            return None;
        }
        if c == '"' {
            if !previous_is_whitespace {
                if style == QuoteStyle::Double && out.ends_with('=') {
                    // `--format="x"` keeps the `=` outside the quotes.
                    out.pop();
                    out.push(quote);
                    out.push('=');
                } else {
                    out.push(quote);
                }
            }
            previous_is_whitespace = false;
            out.push(quote);
            i += 1;
            loop {
                match chars.get(i) {
                    None | Some('\'') => return None,
                    Some('"') => break,
                    Some(&inner) => {
                        out.push(inner);
                        i += 1;
                    }
                }
            }
            i += 1;
            // The closing quote is emitted when the argument ends.
            if let Some(&next) = chars.get(i) {
                if !next.is_ascii_whitespace() {
                    return None;
                }
            }
        } else if previous_is_whitespace && !c.is_ascii_whitespace() {
            previous_is_whitespace = false;
            out.push(quote);
            out.push(c);
            i += 1;
        } else if !previous_is_whitespace && c.is_ascii_whitespace() {
            previous_is_whitespace = true;
            out.push(quote);
            out.push(c);
            i += 1;
        } else {
            out.push(c);
            i += 1;
        }
    }
    if !previous_is_whitespace {
        out.push(quote);
    }
    Some(out)
}

impl ConfigSession {
    /// The configured shell command execution policy.
    ///
    /// `Unrestricted` downgrades to `Restricted` for an elevated process
    /// unless the setup explicitly allows an unrestricted super user.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownShellCommandMode`] for an
    /// unrecognized mode string.
    pub fn shell_command_mode(&self) -> ConfigResult<ShellCommandMode> {
        let value = self
            .get(names::SECTION_CORE, names::SHELL_COMMAND_MODE)?
            .as_string()
            .unwrap_or_default();
        match value.as_str() {
            "Forbidden" => Ok(ShellCommandMode::Forbidden),
            "Query" => Ok(ShellCommandMode::Query),
            "Restricted" => Ok(ShellCommandMode::Restricted),
            "Unrestricted" => {
                let allow_super_user = self
                    .get(names::SECTION_CORE, names::ALLOW_UNRESTRICTED_SUPER_USER)?
                    .as_bool()
                    .unwrap_or(false);
                if self.host.running_as_administrator() && !allow_super_user {
                    debug!("downgrading unrestricted shell commands for the super user");
                    Ok(ShellCommandMode::Restricted)
                } else {
                    Ok(ShellCommandMode::Unrestricted)
                }
            }
            _ => Err(ConfigError::UnknownShellCommandMode { value }),
        }
    }

    /// The allow-list of shell commands considered harmless.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configured value fails to expand.
    pub fn allowed_shell_commands(&self) -> ConfigResult<Vec<String>> {
        Ok(self
            .get(names::SECTION_CORE, names::ALLOWED_SHELL_COMMANDS)?
            .as_string_list()
            .unwrap_or_default())
    }

    /// Classify a document-supplied command line.
    ///
    /// The program token is matched case-insensitively against the
    /// allow-list; a program token containing quotes is never matched. An
    /// allow-listed line is additionally sanitized with
    /// [`to_safe_command_line`]; failure to sanitize is a syntax error.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the allow-list cannot be resolved.
    pub fn examine_command_line(&self, line: &str) -> ConfigResult<ExaminedCommand> {
        let Some(program) = line.split_ascii_whitespace().next() else {
            return Ok(ExaminedCommand {
                result: ExamineResult::SyntaxError,
                program: String::new(),
                safe_line: None,
            });
        };
        let mut result = ExamineResult::MaybeSafe;
        if !program.contains(['"', '\'']) {
            let allowed = self.allowed_shell_commands()?;
            if allowed.iter().any(|cmd| cmd.eq_ignore_ascii_case(program)) {
                result = ExamineResult::ProbablySafe;
            }
        }
        if result != ExamineResult::ProbablySafe {
            return Ok(ExaminedCommand {
                result,
                program: program.to_owned(),
                safe_line: None,
            });
        }
        match to_safe_command_line(line, QuoteStyle::platform_default()) {
            Some(safe) if !safe.is_empty() => Ok(ExaminedCommand {
                result: ExamineResult::ProbablySafe,
                program: program.to_owned(),
                safe_line: Some(safe),
            }),
            _ => Ok(ExaminedCommand {
                result: ExamineResult::SyntaxError,
                program: String::new(),
                safe_line: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticEnvironment;
    use crate::host::BasicHost;
    use crate::layers::ApplicationIdentity;
    use crate::locate::{RootScope, SearchRoot, SearchRoots};
    use std::fs;
    use tempfile::TempDir;

    fn session(root: &TempDir, host: BasicHost) -> ConfigSession {
        let locator = SearchRoots::new(vec![SearchRoot {
            path: root.path().to_path_buf(),
            scope: RootScope::User,
            managed: true,
        }]);
        ConfigSession::builder(ApplicationIdentity::new("latex"))
            .environment(StaticEnvironment::new())
            .locator(locator)
            .host(host)
            .build()
            .unwrap()
    }

    fn with_core(root: &TempDir, body: &str) {
        let dir = root.path().join("config");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("latex.ini"), format!("[core]\n{body}")).unwrap();
    }

    #[test]
    fn test_requote_single_style() {
        let line = r#"kpsewhich --format="other text files" foo.sty"#;
        assert_eq!(
            to_safe_command_line(line, QuoteStyle::Single).unwrap(),
            "kpsewhich '--format=''other text files' 'foo.sty'"
        );
    }

    #[test]
    fn test_requote_double_style_merges_equals() {
        let line = r#"kpsewhich --format="other text files""#;
        assert_eq!(
            to_safe_command_line(line, QuoteStyle::Double).unwrap(),
            r#"kpsewhich "--format"="other text files""#
        );
    }

    #[test]
    fn test_requote_plain_arguments() {
        assert_eq!(
            to_safe_command_line("  bibtex  paper", QuoteStyle::Single).unwrap(),
            "bibtex  'paper'"
        );
        assert_eq!(to_safe_command_line("bibtex", QuoteStyle::Single).unwrap(), "bibtex");
    }

    #[test]
    fn test_requote_rejections() {
        assert!(to_safe_command_line("cmd 'a'", QuoteStyle::Single).is_none());
        assert!(to_safe_command_line("cmd it's", QuoteStyle::Single).is_none());
        assert!(to_safe_command_line("cmd \"open", QuoteStyle::Single).is_none());
        assert!(to_safe_command_line("cmd \"a\"b", QuoteStyle::Single).is_none());
        assert!(to_safe_command_line("cmd \"don't\"", QuoteStyle::Single).is_none());
    }

    #[test]
    fn test_examine_allow_listed_command() {
        let root = TempDir::new().unwrap();
        let session = session(&root, BasicHost::default());
        let quote = QuoteStyle::platform_default().quote_char();
        let examined = session.examine_command_line("kpsewhich article.cls").unwrap();
        assert_eq!(examined.result, ExamineResult::ProbablySafe);
        assert_eq!(examined.program, "kpsewhich");
        assert_eq!(
            examined.safe_line.as_deref(),
            Some(format!("kpsewhich {quote}article.cls{quote}").as_str())
        );
        // Allow-list matching ignores case.
        let examined = session.examine_command_line("BibTeX paper").unwrap();
        assert_eq!(examined.result, ExamineResult::ProbablySafe);
    }

    #[test]
    fn test_examine_unknown_and_malformed() {
        let root = TempDir::new().unwrap();
        let session = session(&root, BasicHost::default());
        let examined = session.examine_command_line("rm -rf /").unwrap();
        assert_eq!(examined.result, ExamineResult::MaybeSafe);
        assert_eq!(examined.program, "rm");
        assert!(examined.safe_line.is_none());

        let examined = session.examine_command_line("   ").unwrap();
        assert_eq!(examined.result, ExamineResult::SyntaxError);

        // Allow-listed but unsanitizable.
        let examined = session.examine_command_line("kpsewhich it's").unwrap();
        assert_eq!(examined.result, ExamineResult::SyntaxError);
    }

    #[test]
    fn test_shell_command_mode_parsing() {
        let root = TempDir::new().unwrap();
        let session = session(&root, BasicHost::default());
        // Factory default.
        assert_eq!(session.shell_command_mode().unwrap(), ShellCommandMode::Restricted);

        with_core(&root, "ShellCommandMode=Forbidden\n");
        let session = session_from(&root);
        assert_eq!(session.shell_command_mode().unwrap(), ShellCommandMode::Forbidden);

        with_core(&root, "ShellCommandMode=Paranoid\n");
        let session = session_from(&root);
        assert!(matches!(
            session.shell_command_mode(),
            Err(ConfigError::UnknownShellCommandMode { .. })
        ));
    }

    fn session_from(root: &TempDir) -> ConfigSession {
        session(root, BasicHost::default())
    }

    #[test]
    fn test_unrestricted_downgrades_for_super_user() {
        let root = TempDir::new().unwrap();
        with_core(&root, "ShellCommandMode=Unrestricted\n");
        let elevated = BasicHost { elevated: true, ..BasicHost::default() };

        let session = session(&root, elevated.clone());
        assert_eq!(session.shell_command_mode().unwrap(), ShellCommandMode::Restricted);

        let session = self::session(&root, BasicHost::default());
        assert_eq!(session.shell_command_mode().unwrap(), ShellCommandMode::Unrestricted);

        with_core(&root, "ShellCommandMode=Unrestricted\nAllowUnrestrictedSuperUser=true\n");
        let session = self::session(&root, elevated);
        assert_eq!(session.shell_command_mode().unwrap(), ShellCommandMode::Unrestricted);
    }
}
