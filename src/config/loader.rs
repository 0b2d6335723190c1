//! Configuration loading from disk.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{FunctionConfig, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// File looked up in the service directory when no config path is given.
pub const CONFIG_FILE_NAME: &str = "gateway.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment file error: {0}")]
    Environment(#[from] dotenvy::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub stage: Option<String>,
    pub spec_path: Option<PathBuf>,
}

/// Parse a TOML configuration file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Load, override and validate the configuration for a service directory.
///
/// Uses `explicit` when given, else `<service_dir>/gateway.toml` when it
/// exists, else defaults. Relative paths are resolved against `service_dir`.
pub fn load_service_config(
    service_dir: &Path,
    explicit: Option<&Path>,
    overrides: &Overrides,
) -> Result<GatewayConfig, ConfigError> {
    let default_path = service_dir.join(CONFIG_FILE_NAME);
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None if default_path.is_file() => load_config(&default_path)?,
        None => {
            tracing::debug!(service_dir = %service_dir.display(), "No gateway.toml, using defaults");
            GatewayConfig::default()
        }
    };

    apply_overrides(&mut config, overrides);
    resolve_paths(&mut config, service_dir);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn apply_overrides(config: &mut GatewayConfig, overrides: &Overrides) {
    if let Some(port) = overrides.port {
        if let Ok(mut addr) = config.listener.bind_address.parse::<SocketAddr>() {
            addr.set_port(port);
            config.listener.bind_address = addr.to_string();
        }
    }
    if let Some(stage) = &overrides.stage {
        config.api.stage = stage.clone();
    }
    if let Some(spec_path) = &overrides.spec_path {
        config.api.spec_path = spec_path.clone();
    }
}

fn resolve_paths(config: &mut GatewayConfig, service_dir: &Path) {
    if config.api.spec_path.is_relative() {
        config.api.spec_path = service_dir.join(&config.api.spec_path);
    }

    let functions = std::iter::once(&mut config.functions.handler)
        .chain(config.functions.authorizer.as_mut());
    for function in functions {
        if let FunctionConfig::Command { cwd, .. } = function {
            let resolved = match cwd.take() {
                Some(dir) if dir.is_relative() => service_dir.join(dir),
                Some(dir) => dir,
                None => service_dir.to_path_buf(),
            };
            *cwd = Some(resolved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_service_config(dir.path(), None, &Overrides::default()).unwrap();
        assert_eq!(config.api.spec_path, dir.path().join("swagger/oas30_templ.json"));
        assert_eq!(config.listener.bind_address, "127.0.0.1:4001");
    }

    #[test]
    fn test_reads_service_file_and_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
            [listener]
            bind_address = "0.0.0.0:5000"

            [api]
            project = "shop"

            [functions.handler]
            kind = "command"
            program = "node"
            cwd = "build"
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            port: Some(4010),
            stage: Some("qa".into()),
            spec_path: None,
        };
        let config = load_service_config(dir.path(), None, &overrides).unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:4010");
        assert_eq!(config.api.stage, "qa");
        assert_eq!(config.api.project.as_deref(), Some("shop"));
        assert_eq!(
            config.functions.handler,
            FunctionConfig::Command {
                program: "node".into(),
                args: vec![],
                cwd: Some(dir.path().join("build")),
            }
        );
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[listener]\nbind_address = \"nowhere\"\n").unwrap();

        let err = load_service_config(dir.path(), Some(&path), &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[listener").unwrap();
        assert!(matches!(
            load_service_config(dir.path(), Some(&path), &Overrides::default()),
            Err(ConfigError::Parse(_))
        ));
    }
}
