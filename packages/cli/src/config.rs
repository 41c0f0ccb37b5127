use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vellum_compiler_html::CompileOptions;
use vellum_editor::SessionConfig;

pub const DEFAULT_CONFIG_NAME: &str = "vellum.config.json";

/// Vellum configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Editing session tunables
    pub session: SessionConfig,

    /// Directory of the saved-state store, relative to the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<String>,

    /// Options for saved templates
    pub compile: CompileOptions,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Store directory: the command-line flag wins over the config file
    pub fn get_store_dir(&self, cwd: &str, flag: Option<&PathBuf>) -> Option<PathBuf> {
        match flag {
            Some(dir) => Some(dir.clone()),
            None => self.store_dir.as_ref().map(|dir| PathBuf::from(cwd).join(dir)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "session": { "historyCapacity": 20, "colorCommitDelayMs": 150 },
            "storeDir": ".vellum",
            "compile": { "pretty": false }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.session.history_capacity, 20);
        assert_eq!(config.session.color_commit_delay_ms, 150);
        assert_eq!(config.session.autosave_delay_ms, 1000);
        assert_eq!(config.store_dir.as_deref(), Some(".vellum"));
        assert!(!config.compile.pretty);
        assert_eq!(config.compile.indent, "  ");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session, SessionConfig::default());
        assert!(config.get_store_dir("/work", None).is_none());
        assert_eq!(
            config.get_store_dir("/work", Some(&PathBuf::from("/tmp/s"))),
            Some(PathBuf::from("/tmp/s"))
        );
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "storeDir": "state" }"#).unwrap();
        let cwd = dir.path().display().to_string();
        let config = Config::load(&cwd).unwrap();
        assert_eq!(config.get_store_dir(&cwd, None), Some(dir.path().join("state")));

        let empty = tempfile::tempdir().unwrap();
        assert!(Config::load(&empty.path().display().to_string()).unwrap().store_dir.is_none());
    }
}
