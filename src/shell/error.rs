use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Failures surfaced by the parsing and execution core.
///
/// The `Display` form is the reason only. Callers prefix it with the shell and
/// command name, see [`ShellError::diagnostic`].
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    ParseAmbiguity(String),

    #[error("{}", .source.desc())]
    ChdirFailure { path: String, source: Errno },

    #[error("{}: No such file or directory", .path.display())]
    FileNotFound { command: String, path: PathBuf },

    #[error("{}: {source}", .path.display())]
    Redirect {
        command: String,
        path: PathBuf,
        source: io::Error,
    },

    #[error("{context} failed: {}", .source.desc())]
    SpawnFailure {
        context: &'static str,
        source: Errno,
    },

    #[error("command not found")]
    ExecutableNotFound { name: String },
}

impl ShellError {
    /// `-<shell>: <command>: <reason>`, the conventional shell diagnostic shape.
    /// Errors raised by one pipeline stage name that stage instead of `command`.
    pub fn diagnostic(&self, shell: &str, command: &str) -> String {
        let command = match self {
            ShellError::ExecutableNotFound { name } => name.as_str(),
            ShellError::FileNotFound { command, .. } | ShellError::Redirect { command, .. } => {
                command.as_str()
            }
            _ => command,
        };
        if command.is_empty() {
            format!("-{}: {}", shell, self)
        } else {
            format!("-{}: {}: {}", shell, command, self)
        }
    }

    pub fn spawn(context: &'static str, source: Errno) -> Self {
        ShellError::SpawnFailure { context, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_shape() {
        let err = ShellError::ChdirFailure {
            path: "/nope".to_string(),
            source: Errno::ENOENT,
        };
        assert_eq!(
            err.diagnostic("shellax", "cd"),
            "-shellax: cd: No such file or directory"
        );
    }

    #[test]
    fn test_not_found_names_the_stage() {
        let err = ShellError::ExecutableNotFound {
            name: "frobnicate".to_string(),
        };
        assert_eq!(
            err.diagnostic("shellax", "ls"),
            "-shellax: frobnicate: command not found"
        );
    }

    #[test]
    fn test_redirect_failure_names_the_stage() {
        let err = ShellError::Redirect {
            command: "cat".to_string(),
            path: PathBuf::from("/root/x"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let diagnostic = err.diagnostic("shellax", "echo");
        assert!(diagnostic.starts_with("-shellax: cat: /root/x: "), "{}", diagnostic);
    }

    #[test]
    fn test_parse_ambiguity_without_command() {
        let err = ShellError::ParseAmbiguity("line exceeds 8 bytes".to_string());
        assert_eq!(err.diagnostic("shellax", ""), "-shellax: line exceeds 8 bytes");
    }
}
