//! Stage environment for the service under test.
//!
//! Variables come from `<service>/.env.<stage>` when that file exists.
//! Otherwise a default set is derived from the service metadata so that
//! handlers see the same names they get when deployed. The result is handed
//! to command-launched functions; the gateway's own process environment is
//! never modified.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::loader::ConfigError;
use crate::config::schema::GatewayConfig;

/// Folder under the bucket where uploads land.
const UPLOAD_FOLDER: &str = "upload";

/// Process variable naming the deployed environment the upload path belongs to.
const DEPLOYED_ENV: &str = "ENV";
const LOCAL_ENV: &str = "local";

/// Where the variables came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentSource {
    File(PathBuf),
    Derived,
}

/// Read-only set of stage variables.
#[derive(Debug, Clone)]
pub struct StageEnvironment {
    vars: BTreeMap<String, String>,
    source: EnvironmentSource,
}

impl StageEnvironment {
    /// Load `.env.<stage>` from `service_dir`, or derive defaults.
    pub fn load(service_dir: &Path, config: &GatewayConfig) -> Result<Self, ConfigError> {
        let path = service_dir.join(format!(".env.{}", config.api.stage));
        if path.is_file() {
            let mut vars = BTreeMap::new();
            for item in dotenvy::from_path_iter(&path)? {
                let (key, value) = item?;
                vars.insert(key, value);
            }
            return Ok(Self {
                vars,
                source: EnvironmentSource::File(path),
            });
        }

        Ok(Self::derive(config))
    }

    /// Defaults used when the stage has no environment file.
    ///
    /// `BUCKET_PATH` follows the gateway's own `ENV` variable, not the stage.
    pub fn derive(config: &GatewayConfig) -> Self {
        Self::derive_for(config, std::env::var(DEPLOYED_ENV).ok().as_deref())
    }

    pub fn derive_for(config: &GatewayConfig, deployed_env: Option<&str>) -> Self {
        let stage = &config.api.stage;
        let region = &config.auth.region;
        let project = config.api.project.clone().unwrap_or_default();
        let short = region_short(region);

        let bucket = if short.is_empty() {
            "web.oxymoron-tech.com".to_string()
        } else {
            format!("web.{short}.oxymoron-tech.com")
        };

        let mut vars = BTreeMap::new();
        vars.insert("DB_NAME".to_string(), format!("{project}-{stage}"));
        vars.insert(
            "DB_TABLE".to_string(),
            config.api.main_entity.clone().unwrap_or_default(),
        );
        vars.insert("ENV".to_string(), stage.clone());
        vars.insert("REGION".to_string(), region.clone());
        vars.insert("BUCKET".to_string(), bucket);
        vars.insert(
            "BUCKET_PATH".to_string(),
            format!("{UPLOAD_FOLDER}/{project}/{}", deployed_env.unwrap_or(LOCAL_ENV)),
        );

        Self {
            vars,
            source: EnvironmentSource::Derived,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn source(&self) -> &EnvironmentSource {
        &self.source
    }
}

impl Default for StageEnvironment {
    fn default() -> Self {
        Self {
            vars: BTreeMap::new(),
            source: EnvironmentSource::Derived,
        }
    }
}

/// Short region code used in bucket names; empty for unknown regions.
pub fn region_short(region: &str) -> &'static str {
    match region {
        "us-east-1" | "us-east-2" => "us-e",
        "us-west-1" | "us-west-2" => "us-w",
        "af-south-1" => "af",
        "ap-east-1" => "ap-e",
        "ap-south-1" => "ap-s",
        "ap-northeast-1" | "ap-northeast-2" | "ap-northeast-3" => "ap-ne",
        "ap-southeast-1" | "ap-southeast-2" => "ap-se",
        "ca-central-1" => "ca",
        "eu-central-1" | "eu-west-1" | "eu-west-2" | "eu-west-3" | "eu-north-1"
        | "eu-south-1" => "eu",
        "il-central-1" => "il",
        "me-south-1" => "me",
        "sa-east-1" => "sa",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.api.project = Some("shop".into());
        config.api.main_entity = Some("orders".into());
        config.api.stage = "qa".into();
        config
    }

    #[test]
    fn test_region_short_codes() {
        assert_eq!(region_short("il-central-1"), "il");
        assert_eq!(region_short("eu-north-1"), "eu");
        assert_eq!(region_short("ap-northeast-3"), "ap-ne");
        assert_eq!(region_short("mars-1"), "");
    }

    #[test]
    fn test_derived_defaults() {
        let env = StageEnvironment::derive_for(&config(), None);
        assert_eq!(env.get("DB_NAME"), Some("shop-qa"));
        assert_eq!(env.get("DB_TABLE"), Some("orders"));
        assert_eq!(env.get("ENV"), Some("qa"));
        assert_eq!(env.get("REGION"), Some("il-central-1"));
        assert_eq!(env.get("BUCKET"), Some("web.il.oxymoron-tech.com"));
        assert_eq!(env.get("BUCKET_PATH"), Some("upload/shop/local"));
        assert_eq!(env.source(), &EnvironmentSource::Derived);
    }

    #[test]
    fn test_bucket_path_follows_deployed_env() {
        let env = StageEnvironment::derive_for(&config(), Some("prod"));
        assert_eq!(env.get("BUCKET_PATH"), Some("upload/shop/prod"));
        assert_eq!(env.get("ENV"), Some("qa"));
    }

    #[test]
    fn test_unknown_region_bucket() {
        let mut config = config();
        config.auth.region = "local".into();
        let env = StageEnvironment::derive(&config);
        assert_eq!(env.get("BUCKET"), Some("web.oxymoron-tech.com"));
    }

    #[test]
    fn test_stage_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env.qa");
        std::fs::write(&path, "DB_NAME=custom\n# comment\nTOKEN=\"quoted value\"\n").unwrap();

        let env = StageEnvironment::load(dir.path(), &config()).unwrap();
        assert_eq!(env.get("DB_NAME"), Some("custom"));
        assert_eq!(env.get("TOKEN"), Some("quoted value"));
        assert_eq!(env.get("BUCKET"), None);
        assert_eq!(env.source(), &EnvironmentSource::File(path));
    }
}
