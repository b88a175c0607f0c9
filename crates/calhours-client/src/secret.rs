//! Secret references in `config.toml`.
//!
//! `client_id` and `client_secret` may point outside the file:
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: value of `$VAR_NAME`
//! - anything else: used verbatim

use std::process::Command;

use thiserror::Error;

/// Failure to expand a secret reference.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    /// The environment variable is unset or not unicode.
    #[error("environment variable `{0}` is not set")]
    MissingEnv(String),

    /// `pass` could not be run or exited unsuccessfully.
    #[error("`pass show {path}` failed: {reason}")]
    Pass {
        /// Entry in the password store.
        path: String,
        /// What went wrong.
        reason: String,
    },
}

/// A parsed secret reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    /// Entry in the `pass` password store.
    Pass(&'a str),
    /// Environment variable name.
    Env(&'a str),
    /// Literal value.
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    /// Parses a configuration value.
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Returns true when the value lives outside the config file.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }

    /// Expands the reference.
    pub fn resolve(&self) -> Result<String, SecretError> {
        match *self {
            Self::Plain(value) => Ok(value.to_string()),
            Self::Env(var) => std::env::var(var).map_err(|_| SecretError::MissingEnv(var.into())),
            Self::Pass(path) => resolve_pass(path),
        }
    }
}

/// Expands `value` if it is a secret reference.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    SecretRef::parse(value).resolve()
}

fn resolve_pass(path: &str) -> Result<String, SecretError> {
    let failed = |reason: String| SecretError::Pass {
        path: path.to_string(),
        reason,
    };

    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| failed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failed(format!("{}: {}", output.status, stderr.trim())));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| failed("no output".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefixes() {
        assert_eq!(SecretRef::parse("pass::google/calhours"), SecretRef::Pass("google/calhours"));
        assert_eq!(SecretRef::parse("env::CLIENT_ID"), SecretRef::Env("CLIENT_ID"));
        assert_eq!(
            SecretRef::parse("x.apps.googleusercontent.com"),
            SecretRef::Plain("x.apps.googleusercontent.com")
        );
        assert!(SecretRef::parse("env::X").is_reference());
        assert!(!SecretRef::parse("plain").is_reference());
    }

    #[test]
    fn plain_text_passthrough() {
        assert_eq!(resolve("hello").unwrap(), "hello");
        assert_eq!(resolve("").unwrap(), "");
    }

    #[test]
    fn env_prefix_resolves() {
        unsafe {
            std::env::set_var("_CALHOURS_TEST_SECRET", "my-secret-value");
        }
        assert_eq!(resolve("env::_CALHOURS_TEST_SECRET").unwrap(), "my-secret-value");
        unsafe {
            std::env::remove_var("_CALHOURS_TEST_SECRET");
        }
    }

    #[test]
    fn env_prefix_missing_var_errors() {
        assert_eq!(
            resolve("env::_CALHOURS_NONEXISTENT_VAR_12345"),
            Err(SecretError::MissingEnv("_CALHOURS_NONEXISTENT_VAR_12345".to_string()))
        );
    }

    #[test]
    fn pass_prefix_unknown_entry_errors() {
        // Fails whether or not `pass` is installed.
        let err = resolve("pass::nonexistent/entry/that/should/not/exist/12345").unwrap_err();
        assert!(matches!(err, SecretError::Pass { .. }));
    }
}
