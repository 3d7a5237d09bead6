// ABOUTME: Pre-restore cleanup: plans and executes DROP ... CASCADE for existing objects
// ABOUTME: Best-effort; individual drop failures become warnings, never errors

use super::restore::SqlExecutor;
use super::sql::qualified;
use crate::error::EngineError;
use crate::postgres::catalog::{not_extension_member, SCOPE_PREDICATE};
use crate::progress::{ProgressReporter, Stage};
use anyhow::Result;
use tokio_postgres::Client;

/// Drop categories, in the order they are dropped within a schema
///
/// Dropping tables first lets `CASCADE` take dependent views and owned
/// sequences with them; the later `IF EXISTS` drops then find nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Table,
    View,
    Sequence,
    Function,
    Type,
}

impl ObjectKind {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "table" => Some(Self::Table),
            "view" => Some(Self::View),
            "sequence" => Some(Self::Sequence),
            "function" => Some(Self::Function),
            "type" => Some(Self::Type),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Sequence => "SEQUENCE",
            // ROUTINE covers functions and procedures alike
            Self::Function => "ROUTINE",
            Self::Type => "TYPE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub schema: String,
    pub kind: ObjectKind,
    pub name: String,
    /// Identity argument list, for functions only
    pub arguments: Option<String>,
}

impl DropTarget {
    pub fn drop_statement(&self) -> String {
        let name = qualified(&self.schema, &self.name);
        match &self.arguments {
            Some(arguments) => format!(
                "DROP {} IF EXISTS {}({}) CASCADE",
                self.kind.keyword(),
                name,
                arguments
            ),
            None => format!("DROP {} IF EXISTS {} CASCADE", self.kind.keyword(), name),
        }
    }
}

/// Ordered drop targets: by schema, then by [`ObjectKind`], then by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupPlan {
    targets: Vec<DropTarget>,
}

impl CleanupPlan {
    pub fn new(mut targets: Vec<DropTarget>) -> Self {
        targets.sort_by(|a, b| {
            (&a.schema, a.kind, &a.name, &a.arguments).cmp(&(&b.schema, b.kind, &b.name, &b.arguments))
        });
        Self { targets }
    }

    pub fn targets(&self) -> &[DropTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Find what a clean restore has to drop in `schemas` (empty = all non-system schemas)
///
/// Extension-owned objects are left alone; dropping them would break the extension.
pub async fn plan_cleanup(client: &Client, schemas: &[String]) -> Result<CleanupPlan> {
    let sql = format!(
        "SELECT n.nspname::text, 'table', c.relname::text, NULL::text
         FROM pg_catalog.pg_class c
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         WHERE c.relkind IN ('r', 'p') AND {scope} AND {class_member}
         UNION ALL
         SELECT n.nspname::text, 'view', c.relname::text, NULL::text
         FROM pg_catalog.pg_class c
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         WHERE c.relkind = 'v' AND {scope} AND {class_member}
         UNION ALL
         SELECT n.nspname::text, 'sequence', c.relname::text, NULL::text
         FROM pg_catalog.pg_class c
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         WHERE c.relkind = 'S' AND {scope} AND {class_member}
         UNION ALL
         SELECT n.nspname::text, 'function', p.proname::text,
                pg_catalog.pg_get_function_identity_arguments(p.oid)
         FROM pg_catalog.pg_proc p
         JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
         WHERE p.prokind IN ('f', 'p') AND {scope} AND {proc_member}
         UNION ALL
         SELECT n.nspname::text, 'type', t.typname::text, NULL::text
         FROM pg_catalog.pg_type t
         JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
         WHERE t.typtype = 'e' AND {scope} AND {type_member}",
        scope = SCOPE_PREDICATE,
        class_member = not_extension_member("pg_class", "c.oid"),
        proc_member = not_extension_member("pg_proc", "p.oid"),
        type_member = not_extension_member("pg_type", "t.oid"),
    );

    let rows = client
        .query(sql.as_str(), &[&schemas])
        .await
        .map_err(EngineError::catalog("cleanup targets"))?;

    let targets = rows
        .iter()
        .filter_map(|row| {
            let kind: String = row.get(1);
            Some(DropTarget {
                schema: row.get(0),
                kind: ObjectKind::from_code(&kind)?,
                name: row.get(2),
                arguments: row.get(3),
            })
        })
        .collect();

    Ok(CleanupPlan::new(targets))
}

/// Run every planned drop, returning how many failed
pub async fn execute_cleanup<E: SqlExecutor>(
    executor: &E,
    plan: &CleanupPlan,
    reporter: &mut ProgressReporter<'_>,
) -> usize {
    let mut warnings = 0;

    for target in plan.targets() {
        let statement = target.drop_statement();
        if let Err(e) = executor.execute_statement(&statement).await {
            warnings += 1;
            let message = format!(
                "Could not drop {} {}: {:#}",
                target.kind.keyword().to_lowercase(),
                qualified(&target.schema, &target.name),
                e
            );
            tracing::warn!("⚠ {}", message);
            reporter.warn(Stage::Cleaning, message);
        }
    }

    warnings
}
