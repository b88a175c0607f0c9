//! Configuration commands.

use std::path::Path;

use crate::cli::ReportArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret::SecretRef;

/// Stands in for a literal `client_secret` in dumped configuration.
const REDACTED: &str = "***";

/// Dump the current configuration to stdout. A literal `client_secret` is
/// masked; `env::` and `pass::` references are shown as written.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", config_path.display());
    println!("{}", render(config)?);
    Ok(())
}

fn render(config: &ClientConfig) -> ClientResult<String> {
    toml::to_string_pretty(&redacted(config))
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
}

fn redacted(config: &ClientConfig) -> ClientConfig {
    let mut config = config.clone();
    if let Some(secret) = config.google.as_mut().and_then(|g| g.client_secret.as_mut()) {
        if !SecretRef::parse(secret).is_reference() {
            *secret = REDACTED.to_string();
        }
    }
    config
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    check(config)?;
    if config.google.as_ref().is_some_and(|g| g.has_inline_credentials()) {
        println!("Google credentials are valid.");
    }
    println!("Configuration is valid.");
    Ok(())
}

fn check(config: &ClientConfig) -> ClientResult<()> {
    config.report.resolve(&ReportArgs::default())?;

    if let Some(ref google) = config.google {
        if google.client_id.is_some() || google.client_secret.is_some() {
            let credentials = google.resolve_credentials().map_err(|e| {
                ClientError::Config(format!("invalid Google credentials: {}", e))
            })?;
            credentials.validate().map_err(|e| {
                ClientError::Config(format!("invalid Google credentials: {}", e))
            })?;
        }
        if let Some(ref path) = google.credentials_file {
            if !path.exists() {
                return Err(ClientError::Config(format!(
                    "credentials_file {} does not exist",
                    path.display()
                )));
            }
        }
    }

    Ok(())
}

/// Show the configuration file path.
pub fn path(config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(check(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn zero_reference_hours_is_invalid() {
        let config = ClientConfig::parse("[report]\nreference_hours = 0.0\n").unwrap();
        assert!(check(&config).is_err());
    }

    #[test]
    fn malformed_client_id_is_invalid() {
        let config = ClientConfig::parse(
            "[google]\nclient_id = \"nope\"\nclient_secret = \"s\"\n",
        )
        .unwrap();
        let err = check(&config).unwrap_err();
        assert!(err.to_string().contains("apps.googleusercontent.com"));
    }

    #[test]
    fn missing_credentials_file_is_invalid() {
        let config =
            ClientConfig::parse("[google]\ncredentials_file = \"/nonexistent/creds.json\"\n")
                .unwrap();
        assert!(check(&config).is_err());
    }

    #[test]
    fn dump_round_trips() {
        let config = ClientConfig::parse(
            "[report]\ncalendar_names = [\"Work\"]\nall_day_policy = \"full-day\"\n",
        )
        .unwrap();
        let reparsed = ClientConfig::parse(&render(&config).unwrap()).unwrap();
        assert_eq!(reparsed.report, config.report);
    }

    #[test]
    fn dump_masks_literal_secret() {
        let config = ClientConfig::parse(
            "[google]\nclient_id = \"id.apps.googleusercontent.com\"\nclient_secret = \"GOCSPX-real\"\n",
        )
        .unwrap();
        let text = render(&config).unwrap();
        assert!(!text.contains("GOCSPX-real"));
        assert!(text.contains("client_secret = \"***\""));
        assert!(text.contains("id.apps.googleusercontent.com"));
        assert_eq!(
            config.google.unwrap().client_secret.as_deref(),
            Some("GOCSPX-real")
        );
    }

    #[test]
    fn dump_keeps_secret_references() {
        let config = ClientConfig::parse(
            "[google]\nclient_id = \"env::CH_ID\"\nclient_secret = \"pass::google/calhours\"\n",
        )
        .unwrap();
        let text = render(&config).unwrap();
        assert!(text.contains("pass::google/calhours"));
    }
}
