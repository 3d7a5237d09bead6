// ABOUTME: Backup metadata record written next to every dump script
// ABOUTME: Serialized as camelCase JSON for the history view and restore selection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of objects of each kind written to a dump script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectCounts {
    pub tables: u64,
    pub views: u64,
    pub sequences: u64,
    pub functions: u64,
    pub triggers: u64,
    pub enums: u64,
    pub extensions: u64,
}

impl ObjectCounts {
    pub fn total(&self) -> u64 {
        self.tables
            + self.views
            + self.sequences
            + self.functions
            + self.triggers
            + self.enums
            + self.extensions
    }
}

/// Summary of one backup, paired with its script by base name
///
/// Every field defaults when missing so metadata written by hand or by older
/// versions still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupMetadata {
    pub backup_name: String,
    pub timestamp: DateTime<Utc>,
    pub database_name: String,
    pub postgres_version: String,
    pub file_size: u64,
    pub compressed: bool,
    pub schemas: Vec<String>,
    pub object_counts: ObjectCounts,
}

impl Default for BackupMetadata {
    fn default() -> Self {
        Self {
            backup_name: String::new(),
            timestamp: DateTime::<Utc>::default(),
            database_name: String::new(),
            postgres_version: String::new(),
            file_size: 0,
            compressed: false,
            schemas: Vec::new(),
            object_counts: ObjectCounts::default(),
        }
    }
}

impl BackupMetadata {
    /// Minimal record for a script that was produced elsewhere and imported
    pub fn imported(backup_name: &str, file_size: u64, compressed: bool) -> Self {
        Self {
            backup_name: backup_name.to_string(),
            timestamp: Utc::now(),
            database_name: "Imported".to_string(),
            postgres_version: "Unknown".to_string(),
            file_size,
            compressed,
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
