//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::SocketConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl ConfigError {
    /// Sections rejected by validation, in file order, without repeats.
    pub fn failed_sections(&self) -> Vec<&'static str> {
        let mut sections = Vec::new();
        if let ConfigError::Validation(errors) = self {
            for section in errors.iter().map(ValidationError::section) {
                if !sections.contains(&section) {
                    sections.push(section);
                }
            }
        }
        sections
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Invalid [{}] configuration: ", self.failed_sections().join("], ["))?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SocketConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: SocketConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[listener]\nbind_address = \"127.0.0.1:0\"\n\n[handshake]\ntimeout_ms = 750"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:0");
        assert_eq!(config.handshake.timeout_ms, 750);
    }

    #[test]
    fn rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[handshake]\ntimeout_ms = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert_eq!(err.failed_sections(), vec!["handshake"]);
        let message = err.to_string();
        assert!(message.starts_with("Invalid [handshake] configuration"), "{message}");
        assert!(message.contains("timeout_ms"));
    }

    #[test]
    fn names_every_failed_section_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[listener]\nbind_address = \"nowhere\"\nmax_connections = 0\n\n[tls]\ncert_path = \"cert.pem\""
        )
        .unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert_eq!(err.failed_sections(), vec!["listener", "tls"]);
        assert!(err.to_string().starts_with("Invalid [listener], [tls] configuration"));
        assert!(ConfigError::Io(std::io::Error::other("gone")).failed_sections().is_empty());
    }

    #[test]
    fn reports_parse_and_io_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[handshake\ntimeout_ms = ").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));

        let missing = Path::new("/nonexistent/secure-socket.toml");
        assert!(matches!(load_config(missing), Err(ConfigError::Io(_))));
    }
}
