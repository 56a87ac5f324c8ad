//! Password lookup: flag or environment first, then a prompt or one line from stdin.

use std::io::{self, BufRead, IsTerminal};

use anyhow::{Context, Result, bail};

use crate::cli::Args;

/// Returns the password from `--password`/`ECOTAXA_PASSWORD`, or prompts for it.
///
/// A terminal gets a prompt that does not echo; piped stdin is read as one line.
pub(crate) fn resolve_password(args: &Args) -> Result<String> {
    if let Some(password) = args.password.as_deref().filter(|p| !p.is_empty()) {
        return Ok(password.to_string());
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        let typed = rpassword::prompt_password(format!("Password for {}: ", args.user))
            .context("failed to read password from the terminal")?;
        return require_password(&typed);
    }
    read_password_line(stdin.lock())
}

pub(crate) fn read_password_line(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    require_password(line.trim_end_matches(['\r', '\n']))
}

fn require_password(password: &str) -> Result<String> {
    if password.is_empty() {
        bail!(
            "What: No password provided\nWhy: --password, ECOTAXA_PASSWORD and stdin were all empty\nFix: Pass --password, set ECOTAXA_PASSWORD, or pipe the password on stdin."
        );
    }
    Ok(password.to_string())
}

#[cfg(test)]
mod tests {
    use super::{read_password_line, require_password};

    #[test]
    fn test_password_line_strips_newline_only() {
        let password = read_password_line(" s3cret pass \n".as_bytes()).unwrap();
        assert_eq!(password, " s3cret pass ");
        let password = read_password_line("crlf\r\n".as_bytes()).unwrap();
        assert_eq!(password, "crlf");
    }

    #[test]
    fn test_empty_password_is_rejected() {
        let err = read_password_line("\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("No password provided"));
        assert!(read_password_line("".as_bytes()).is_err());
    }

    #[test]
    fn test_only_first_line_is_read() {
        let password = read_password_line("first\nsecond\n".as_bytes()).unwrap();
        assert_eq!(password, "first");
    }

    #[test]
    fn test_typed_password_kept_verbatim() {
        assert_eq!(require_password(" with spaces ").unwrap(), " with spaces ");
        let err = require_password("").unwrap_err();
        assert!(err.to_string().contains("No password provided"));
    }
}
