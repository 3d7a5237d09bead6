// ABOUTME: Restore command: replays a backup script into a target database
// ABOUTME: Resolves the backup, confirms destructive cleanup, and reports statement failures

use super::display::sink_for;
use crate::migration::{restore_backup, BackupStore, RestoreOptions};
use crate::utils;
use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::PathBuf;

/// Where the script to restore comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupSource {
    /// A backup in the store, by base name
    Name(String),
    /// Any `.sql` / `.sql.gz` file
    File(PathBuf),
}

impl BackupSource {
    fn resolve(&self, store: &BackupStore) -> Result<PathBuf> {
        match self {
            BackupSource::Name(name) => {
                utils::validate_backup_name(name)?;
                store.resolve(name)
            }
            BackupSource::File(path) => Ok(path.clone()),
        }
    }
}

/// Restore a backup into `target_url`
///
/// Statement failures do not fail the command; they are counted and the first
/// few are printed. With `clean` set the user is asked to confirm the drops
/// unless `skip_confirmation` is true.
///
/// # Errors
///
/// Returns an error if the connection string is malformed, the backup cannot
/// be found or read, the user declines cleanup, or the connection fails.
pub async fn restore(
    target_url: &str,
    source: &BackupSource,
    store: &BackupStore,
    options: &RestoreOptions,
    skip_confirmation: bool,
    json: bool,
) -> Result<()> {
    utils::validate_connection_string(target_url).context("Invalid target connection string")?;
    let path = source.resolve(store)?;

    if options.clean && !skip_confirmation {
        let scope = if options.schemas.is_empty() {
            "all non-system schemas".to_string()
        } else {
            options.schemas.join(", ")
        };
        tracing::warn!("⚠ --clean drops existing tables, views, sequences, functions and enum types");
        tracing::warn!("  in {} of the target before restoring", scope);

        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Drop existing objects and restore?")
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;

        if !confirmed {
            tracing::warn!("⚠ User cancelled operation");
            bail!("Restore cancelled by user");
        }
    }

    tracing::info!("Restoring {}...", path.display());
    let sink = sink_for(json);
    let report = restore_backup(target_url, &path, options, sink.as_ref()).await?;

    if json {
        return Ok(());
    }

    tracing::info!("");
    tracing::info!("========================================");
    tracing::info!("Restore Summary");
    tracing::info!("========================================");
    tracing::info!(
        "Statements: {} parsed, {} executed",
        report.total_statements,
        report.filtered_statements
    );
    tracing::info!("✓ Succeeded: {}", report.success_count);
    tracing::info!("✗ Failed:    {}", report.error_count);
    if options.clean {
        tracing::info!("Cleanup warnings: {}", report.cleanup_warnings);
    }
    tracing::info!("========================================");

    if report.error_count > 0 {
        tracing::warn!("");
        tracing::warn!("⚠ {} statement(s) failed. First errors:", report.error_count);
        for failure in &report.errors {
            tracing::warn!("  ✗ {}", failure.statement);
            tracing::warn!("    {}", failure.error);
        }
    }

    Ok(())
}
