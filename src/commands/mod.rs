// ABOUTME: Command implementations for the pgvault CLI
// ABOUTME: Exports backup, restore, list, import, and delete commands

pub mod backup;
pub mod display;
pub mod list;
pub mod restore;

pub use backup::backup;
pub use list::{delete, import, list};
pub use restore::{restore, BackupSource};
