// ABOUTME: CLI entry point for pgvault
// ABOUTME: Parses commands, merges configuration, and routes to handlers

use clap::{Args, Parser, Subcommand};
use pgvault::commands::{self, BackupSource};
use pgvault::config::{load_config, EngineConfig};
use pgvault::migration::{BackupStore, DumpOptions, RestoreOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pgvault")]
#[command(about = "Logical PostgreSQL backup and restore over a plain database connection", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a pgvault.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backup directory (overrides config file and PGVAULT_BACKUP_DIR)
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,
    /// Print progress events as JSON lines instead of a progress bar
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct ContentArgs {
    /// Only these schemas (comma-separated)
    #[arg(long, value_delimiter = ',')]
    schemas: Vec<String>,
    /// Definitions only, no table data (wins over --data-only on restore)
    #[arg(long)]
    schema_only: bool,
    /// Table data only, no definitions
    #[arg(long)]
    data_only: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump a database into the backup directory
    #[command(group = clap::ArgGroup::new("content_mode").args(["schema_only", "data_only"]))]
    Backup {
        #[arg(long)]
        source: String,
        /// Backup name (letters, digits, '-' and '_')
        #[arg(long)]
        name: String,
        /// gzip the script
        #[arg(long)]
        compress: bool,
        #[command(flatten)]
        content: ContentArgs,
        /// Rows per INSERT statement
        #[arg(long)]
        rows_per_insert: Option<usize>,
    },
    /// Replay a backup into a target database
    Restore {
        #[arg(long)]
        target: String,
        /// Backup script to restore
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        file: Option<PathBuf>,
        /// Name of a backup in the backup directory
        #[arg(long)]
        name: Option<String>,
        /// Drop existing objects in scope before restoring
        #[arg(long)]
        clean: bool,
        #[command(flatten)]
        content: ContentArgs,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
        /// Split statements without recognizing $$-quoted bodies
        #[arg(long)]
        no_dollar_quotes: bool,
    },
    /// List backups in the backup directory
    List,
    /// Copy an existing .sql or .sql.gz script into the backup directory
    Import { path: PathBuf },
    /// Delete a backup
    Delete {
        name: String,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let store = BackupStore::new(
        cli.backup_dir
            .clone()
            .unwrap_or_else(|| config.backup_dir.clone()),
    );

    match cli.command {
        Commands::Backup {
            source,
            name,
            compress,
            content,
            rows_per_insert,
        } => {
            let options = DumpOptions {
                compress: compress || config.compress,
                schemas: content.schemas,
                schema_only: content.schema_only,
                data_only: content.data_only,
                rows_per_insert: rows_per_insert.unwrap_or(config.rows_per_insert),
                connect: config.connect_options(),
            };
            commands::backup(&source, &name, &store, &options, cli.json).await
        }
        Commands::Restore {
            target,
            file,
            name,
            clean,
            content,
            yes,
            no_dollar_quotes,
        } => {
            let source = match (file, name) {
                (Some(path), _) => BackupSource::File(path),
                (None, Some(name)) => BackupSource::Name(name),
                (None, None) => anyhow::bail!("Either --file or --name is required"),
            };
            let options = restore_options(&config, clean, content, no_dollar_quotes);
            commands::restore(&target, &source, &store, &options, yes, cli.json).await
        }
        Commands::List => commands::list(&store, cli.json).await,
        Commands::Import { path } => commands::import(&store, &path).await,
        Commands::Delete { name, yes } => commands::delete(&store, &name, yes).await,
    }
}

fn restore_options(
    config: &EngineConfig,
    clean: bool,
    content: ContentArgs,
    no_dollar_quotes: bool,
) -> RestoreOptions {
    RestoreOptions {
        clean,
        data_only: content.data_only,
        schema_only: content.schema_only,
        schemas: content.schemas,
        dollar_quotes: !no_dollar_quotes,
        progress_every: config.progress_every,
        connect: config.connect_options(),
    }
}
