// ABOUTME: Backup and restore engine module
// ABOUTME: Script generation, tokenizing, cleanup, replay, and the on-disk backup store

pub mod cleanup;
pub mod dump;
pub mod metadata;
pub mod restore;
pub mod sql;
pub mod statements;
pub mod store;

pub use cleanup::{execute_cleanup, plan_cleanup, CleanupPlan, DropTarget, ObjectKind};
pub use dump::{create_backup, DumpOptions, DumpResult};
pub use metadata::{BackupMetadata, ObjectCounts};
pub use restore::{
    execute_statements, filter_statements, read_script, restore_backup, RestoreOptions,
    RestoreReport, SqlExecutor, StatementError,
};
pub use statements::{split_statements, split_statements_with, SplitOptions};
pub use store::{BackupFile, BackupStore};
