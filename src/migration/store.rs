// ABOUTME: On-disk backup directory: one script and one metadata file per backup
// ABOUTME: Writes pairs atomically and lists, imports, resolves and deletes backups

use super::metadata::BackupMetadata;
use crate::error::EngineError;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SCRIPT_SUFFIX: &str = ".sql";
pub const GZIP_SCRIPT_SUFFIX: &str = ".sql.gz";
pub const METADATA_SUFFIX: &str = ".json";

/// A usable backup: script and metadata both present
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupFile {
    pub filename: String,
    pub filepath: PathBuf,
    pub metadata: BackupMetadata,
    pub created_at: DateTime<Utc>,
    pub size: u64,
}

/// Base name of a script file (`nightly.sql.gz` -> `nightly`)
pub fn script_base_name(filename: &str) -> Option<&str> {
    filename
        .strip_suffix(GZIP_SCRIPT_SUFFIX)
        .or_else(|| filename.strip_suffix(SCRIPT_SUFFIX))
        .filter(|base| !base.is_empty())
}

#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn script_path(&self, name: &str, compressed: bool) -> PathBuf {
        let suffix = if compressed {
            GZIP_SCRIPT_SUFFIX
        } else {
            SCRIPT_SUFFIX
        };
        self.dir.join(format!("{}{}", name, suffix))
    }

    pub fn metadata_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, METADATA_SUFFIX))
    }

    /// Start writing a backup; nothing is visible until [`PendingBackup::commit`]
    pub fn begin(&self, name: &str, compressed: bool) -> Result<PendingBackup> {
        std::fs::create_dir_all(&self.dir).map_err(|source| EngineError::Artifact {
            name: name.to_string(),
            source,
        })?;
        let script = NamedTempFile::new_in(&self.dir).map_err(|source| EngineError::Artifact {
            name: name.to_string(),
            source,
        })?;

        Ok(PendingBackup {
            store: self.clone(),
            name: name.to_string(),
            compressed,
            script,
        })
    }

    /// Script path for a backup base name, preferring the compressed form
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        [true, false]
            .into_iter()
            .map(|compressed| self.script_path(name, compressed))
            .find(|path| path.is_file())
            .ok_or_else(|| EngineError::BackupNotFound(self.script_path(name, false)).into())
    }

    /// Usable backups, newest first. Scripts without metadata are skipped.
    pub async fn list(&self) -> Result<Vec<BackupFile>> {
        let mut backups = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(backups),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read backup directory {}", self.dir.display())
                })
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name().to_string_lossy().to_string();
            let Some(base) = script_base_name(&filename) else {
                continue;
            };
            let file_meta = entry.metadata().await?;
            if !file_meta.is_file() {
                continue;
            }

            let metadata_path = self.metadata_path(base);
            let metadata = match tokio::fs::read_to_string(&metadata_path).await {
                Ok(json) => match BackupMetadata::from_json(&json) {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        tracing::warn!(
                            "⚠ Ignoring backup '{}': unreadable metadata ({})",
                            filename,
                            e
                        );
                        continue;
                    }
                },
                Err(_) => {
                    tracing::debug!("Skipping '{}': no metadata file", filename);
                    continue;
                }
            };

            let created_at = file_meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or(metadata.timestamp);

            backups.push(BackupFile {
                filename,
                filepath: entry.path(),
                size: file_meta.len(),
                created_at,
                metadata,
            });
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// Copy an externally produced `.sql` / `.sql.gz` script into the store
    ///
    /// Writes a minimal metadata record (database "Imported", version
    /// "Unknown", zero object counts) so the script shows up in listings.
    pub async fn import(&self, source: &Path) -> Result<BackupFile> {
        let filename = source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(base) = script_base_name(&filename) else {
            bail!("Invalid file type. Only .sql or .sql.gz allowed: {}", filename);
        };
        crate::utils::validate_backup_name(base)?;

        if !source.is_file() {
            return Err(EngineError::BackupNotFound(source.to_path_buf()).into());
        }

        let compressed = filename.ends_with(GZIP_SCRIPT_SUFFIX);
        let pending = self.begin(base, compressed)?;
        let mut reader = File::open(source)
            .with_context(|| format!("Failed to open {}", source.display()))?;
        let mut writer = pending.writer()?;
        std::io::copy(&mut reader, &mut writer)
            .with_context(|| format!("Failed to copy {}", source.display()))?;
        writer.flush()?;
        drop(writer);

        let size = pending.size()?;
        let metadata = BackupMetadata::imported(&filename, size, compressed);
        let (script_path, _) = pending.commit(metadata.clone())?;

        tracing::info!("✓ Imported {} as '{}'", source.display(), base);
        Ok(BackupFile {
            filename,
            filepath: script_path,
            created_at: metadata.timestamp,
            size,
            metadata,
        })
    }

    /// Remove a backup's script(s) and metadata
    pub async fn delete(&self, name: &str) -> Result<()> {
        let mut removed = false;
        for path in [
            self.script_path(name, true),
            self.script_path(name, false),
            self.metadata_path(name),
        ] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to delete {}", path.display()))
                }
            }
        }

        if !removed {
            return Err(EngineError::BackupNotFound(self.script_path(name, false)).into());
        }
        tracing::info!("✓ Deleted backup '{}'", name);
        Ok(())
    }
}

/// A script being written into the store under a temporary name
///
/// Dropping it without committing removes the temporary file.
pub struct PendingBackup {
    store: BackupStore,
    name: String,
    compressed: bool,
    script: NamedTempFile,
}

impl PendingBackup {
    /// A fresh handle onto the temporary script file
    pub fn writer(&self) -> Result<File> {
        self.script
            .reopen()
            .map_err(|source| self.artifact_error(source))
    }

    /// Bytes written to the script so far
    pub fn size(&self) -> Result<u64> {
        Ok(self
            .script
            .as_file()
            .metadata()
            .map_err(|source| self.artifact_error(source))?
            .len())
    }

    fn artifact_error(&self, source: std::io::Error) -> anyhow::Error {
        EngineError::Artifact {
            name: self.name.clone(),
            source,
        }
        .into()
    }

    /// Publish the script and its metadata
    ///
    /// The new script is renamed into place before anything old is removed, so
    /// a failed publish leaves the previous backup intact. The metadata lands
    /// last. Returns (script path, metadata path).
    pub fn commit(self, metadata: BackupMetadata) -> Result<(PathBuf, PathBuf)> {
        let script_path = self.store.script_path(&self.name, self.compressed);
        let stale_script = self.store.script_path(&self.name, !self.compressed);
        let metadata_path = self.store.metadata_path(&self.name);

        let json = metadata
            .to_json()
            .context("Failed to serialize backup metadata")?;
        let mut metadata_tmp =
            NamedTempFile::new_in(self.store.dir()).map_err(|source| self.artifact_error(source))?;
        metadata_tmp
            .write_all(json.as_bytes())
            .and_then(|_| metadata_tmp.as_file().sync_all())
            .map_err(|source| self.artifact_error(source))?;
        self.script
            .as_file()
            .sync_all()
            .map_err(|source| self.artifact_error(source))?;

        let name = self.name.clone();
        let artifact = |source: std::io::Error| EngineError::Artifact {
            name: name.clone(),
            source,
        };

        self.script
            .persist(&script_path)
            .map_err(|e| artifact(e.error))?;
        remove_if_exists(&stale_script).map_err(artifact)?;
        metadata_tmp
            .persist(&metadata_path)
            .map_err(|e| artifact(e.error))?;

        Ok((script_path, metadata_path))
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
