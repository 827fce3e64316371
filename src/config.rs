//! Build configuration
//!
//! Projects carry an `oolong.yaml` next to their DSL sources. Every key is
//! optional; missing keys fall back to the defaults below, and a missing
//! file means an all-default configuration.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "OOLONG_CONFIG";

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "oolong.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Root directory of the DSL sources
    pub dsl_dir: PathBuf,
    /// Entry module, relative to `dsl_dir`
    pub entry: PathBuf,
    /// Output directory for generated data-access sources
    pub models_dir: PathBuf,
    /// Output directory for generated SQL scripts
    pub scripts_dir: PathBuf,
    /// Where to drop the parsed-module JSON artifacts; `None` disables them
    pub debug_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dsl_dir: PathBuf::from("dsl"),
            entry: PathBuf::from("main.ool"),
            models_dir: PathBuf::from("generated/models"),
            scripts_dir: PathBuf::from("generated/sql"),
            debug_dir: None,
        }
    }
}

impl BuildConfig {
    /// Load configuration.
    ///
    /// Precedence: explicit `path` argument, then the `OOLONG_CONFIG`
    /// environment variable, then `./oolong.yaml`, then defaults.
    pub fn load(path: Option<&Path>) -> Result<BuildConfig> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match env::var(CONFIG_ENV) {
                Ok(p) => PathBuf::from(p),
                Err(_) => PathBuf::from(CONFIG_FILE),
            },
        };

        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(BuildConfig::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: BuildConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        info!(
            path = %path.display(),
            dsl_dir = %config.dsl_dir.display(),
            entry = %config.entry.display(),
            "loaded build configuration"
        );
        Ok(config)
    }

    /// Absolute-ish path of the entry module
    pub fn entry_path(&self) -> PathBuf {
        self.dsl_dir.join(&self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_file_is_missing() {
        let cfg = BuildConfig::load(Some(Path::new("/nonexistent/oolong.yaml"))).unwrap();
        assert_eq!(cfg.dsl_dir, PathBuf::from("dsl"));
        assert_eq!(cfg.entry_path(), PathBuf::from("dsl/main.ool"));
        assert!(cfg.debug_dir.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oolong.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "dsl_dir: schema").unwrap();
        writeln!(file, "debug_dir: build/debug").unwrap();

        let cfg = BuildConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.dsl_dir, PathBuf::from("schema"));
        assert_eq!(cfg.entry, PathBuf::from("main.ool"));
        assert_eq!(cfg.debug_dir, Some(PathBuf::from("build/debug")));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oolong.yaml");
        std::fs::write(&path, "dsl_dir: [unclosed").unwrap();
        assert!(BuildConfig::load(Some(&path)).is_err());
    }
}
