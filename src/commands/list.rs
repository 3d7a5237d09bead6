// ABOUTME: Backup directory commands: list, import and delete
// ABOUTME: Thin wrappers over the backup store with human or JSON output

use crate::migration::BackupStore;
use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::Path;

/// Print the usable backups, newest first
pub async fn list(store: &BackupStore, json: bool) -> Result<()> {
    let backups = store.list().await?;

    if json {
        let text =
            serde_json::to_string_pretty(&backups).context("Failed to serialize backup list")?;
        println!("{}", text);
        return Ok(());
    }

    if backups.is_empty() {
        tracing::info!("No backups found in {}", store.dir().display());
        return Ok(());
    }

    tracing::info!("Backups in {}:", store.dir().display());
    for backup in &backups {
        let metadata = &backup.metadata;
        tracing::info!(
            "  {}  {:>10}  {}  {} ({} objects){}",
            backup.created_at.format("%Y-%m-%d %H:%M:%S"),
            crate::utils::format_bytes(backup.size),
            backup.filename,
            metadata.database_name,
            metadata.object_counts.total(),
            if metadata.compressed { " [gz]" } else { "" }
        );
    }
    tracing::info!("{} backup(s)", backups.len());

    Ok(())
}

/// Copy an external script into the store
pub async fn import(store: &BackupStore, path: &Path) -> Result<()> {
    let imported = store.import(path).await?;
    tracing::info!(
        "✓ Imported {} ({})",
        imported.filepath.display(),
        crate::utils::format_bytes(imported.size)
    );
    Ok(())
}

/// Delete a backup after confirmation
pub async fn delete(store: &BackupStore, name: &str, skip_confirmation: bool) -> Result<()> {
    crate::utils::validate_backup_name(name)?;
    // Fail before prompting when there is nothing to delete
    store.resolve(name)?;

    if !skip_confirmation {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete backup '{}'?", name))
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;

        if !confirmed {
            tracing::warn!("⚠ User cancelled operation");
            bail!("Delete cancelled by user");
        }
    }

    store.delete(name).await
}
