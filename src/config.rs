// ABOUTME: Optional TOML configuration for the pgvault CLI
// ABOUTME: File values fill in defaults; command-line flags override them

use crate::migration::dump::DEFAULT_ROWS_PER_INSERT;
use crate::migration::restore::DEFAULT_PROGRESS_EVERY;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Overrides the default backup directory when set
pub const BACKUP_DIR_ENV: &str = "PGVAULT_BACKUP_DIR";

const DEFAULT_BACKUP_DIR: &str = "./backups";

/// Settings read from `pgvault.toml`
///
/// ```toml
/// backup_dir = "/var/backups/pg"
/// compress = true
/// rows_per_insert = 500
/// progress_every = 50
/// accept_invalid_certs = false
/// connect_retries = 3
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub backup_dir: PathBuf,
    pub compress: bool,
    pub rows_per_insert: usize,
    pub progress_every: usize,
    pub accept_invalid_certs: bool,
    pub connect_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            compress: false,
            rows_per_insert: DEFAULT_ROWS_PER_INSERT,
            progress_every: DEFAULT_PROGRESS_EVERY,
            accept_invalid_certs: false,
            connect_retries: 0,
        }
    }
}

impl EngineConfig {
    pub fn connect_options(&self) -> crate::postgres::ConnectOptions {
        crate::postgres::ConnectOptions {
            accept_invalid_certs: self.accept_invalid_certs,
            retries: self.connect_retries,
        }
    }
}

/// Parse configuration from TOML text
pub fn parse_config(text: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(text).context("Invalid configuration file")?;
    if config.rows_per_insert == 0 {
        anyhow::bail!("rows_per_insert must be at least 1");
    }
    Ok(config)
}

/// Load the configuration file, falling back to defaults when no path is given
///
/// The `PGVAULT_BACKUP_DIR` environment variable replaces the default backup
/// directory but not one set explicitly in the file.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = parse_config(&text)?;
            tracing::debug!("Loaded configuration from {}", path.display());
            config
        }
        None => EngineConfig::default(),
    };

    if config.backup_dir == Path::new(DEFAULT_BACKUP_DIR) {
        if let Ok(dir) = std::env::var(BACKUP_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.backup_dir = PathBuf::from(dir);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            backup_dir = "/srv/pg-backups"
            compress = true
            rows_per_insert = 500
            progress_every = 10
            accept_invalid_certs = true
            connect_retries = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.backup_dir, PathBuf::from("/srv/pg-backups"));
        assert!(config.compress);
        assert_eq!(config.rows_per_insert, 500);
        assert_eq!(config.progress_every, 10);
        assert_eq!(config.connect_options().retries, 3);
        assert!(config.connect_options().accept_invalid_certs);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config("compress = true").unwrap();
        assert!(config.compress);
        assert_eq!(config.rows_per_insert, DEFAULT_ROWS_PER_INSERT);
        assert_eq!(config.progress_every, DEFAULT_PROGRESS_EVERY);
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_values() {
        assert!(parse_config("compres = true").is_err());
        assert!(parse_config("rows_per_insert = 0").is_err());
        assert!(parse_config("rows_per_insert = \"many\"").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backup_dir = \"/tmp/explicit\"").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.backup_dir, PathBuf::from("/tmp/explicit"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
