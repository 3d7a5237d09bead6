// ABOUTME: Catalog introspection for logical dumps
// ABOUTME: Lists schemas, extensions, types, sequences, tables, views, functions, triggers, constraints

use crate::error::EngineError;
use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio_postgres::Client;

/// Restricts a query to the dump scope. `$1` is the schema allow-list; an empty
/// list means every non-system schema. System schemas are only included when
/// named explicitly.
pub(crate) const SCOPE_PREDICATE: &str = "((cardinality($1::text[]) = 0
        AND n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
        AND n.nspname NOT LIKE 'pg_temp_%'
        AND n.nspname NOT LIKE 'pg_toast_temp_%')
    OR n.nspname = ANY($1::text[]))";

/// Excludes objects created by an extension (they come back with CREATE EXTENSION)
pub(crate) fn not_extension_member(catalog: &str, oid_expr: &str) -> String {
    format!(
        "NOT EXISTS (SELECT 1 FROM pg_catalog.pg_depend dep
            WHERE dep.classid = 'pg_catalog.{}'::regclass
              AND dep.objid = {}
              AND dep.deptype = 'e')",
        catalog, oid_expr
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionInfo {
    pub name: String,
    pub schema: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub schema: String,
    pub name: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceInfo {
    pub schema: String,
    pub name: String,
    pub data_type: String,
    pub start: i64,
    pub increment: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub cache: i64,
    pub cycle: bool,
    /// `None` when the sequence was never advanced
    pub last_value: Option<i64>,
    /// (table, column) when the sequence belongs to a serial or identity column
    pub owned_by: Option<(String, String)>,
    /// Identity sequences are created implicitly by their column
    pub identity: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Always,
    ByDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    /// Default expression, or generation expression for generated columns
    pub default: Option<String>,
    pub identity: Option<IdentityKind>,
    pub generated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    /// `CREATE INDEX` statements for indexes not backing a constraint
    pub indexes: Vec<String>,
    pub has_user_triggers: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewInfo {
    pub schema: String,
    pub name: String,
    pub definition: String,
}

/// A function is identified by name and argument types together
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub schema: String,
    pub name: String,
    pub arguments: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    Exclusion,
    Check,
    ForeignKey,
}

impl ConstraintKind {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "p" => Some(Self::PrimaryKey),
            "u" => Some(Self::Unique),
            "x" => Some(Self::Exclusion),
            "c" => Some(Self::Check),
            "f" => Some(Self::ForeignKey),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub kind: ConstraintKind,
    pub definition: String,
}

/// Make every `pg_get_*def` result schema-qualified for this session
///
/// With an empty search_path nothing but `pg_catalog` is visible, so the
/// server spells out the schema of every table, type and sequence it prints.
pub async fn pin_search_path(client: &Client) -> Result<()> {
    client
        .batch_execute("SELECT pg_catalog.set_config('search_path', '', false)")
        .await
        .context("Failed to reset search_path for catalog introspection")
}

pub async fn server_version(client: &Client) -> Result<String> {
    let row = client
        .query_one("SHOW server_version", &[])
        .await
        .map_err(EngineError::catalog("server version"))?;
    Ok(row.get(0))
}

pub async fn current_database(client: &Client) -> Result<String> {
    let row = client
        .query_one("SELECT pg_catalog.current_database()::text", &[])
        .await
        .map_err(EngineError::catalog("current database"))?;
    Ok(row.get(0))
}

/// List the schemas in scope, in name order
pub async fn list_schemas(client: &Client, scope: &[String]) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT n.nspname::text
         FROM pg_catalog.pg_namespace n
         WHERE {}
           AND {}
         ORDER BY n.nspname",
        SCOPE_PREDICATE,
        not_extension_member("pg_namespace", "n.oid")
    );

    let rows = client
        .query(sql.as_str(), &[&scope])
        .await
        .map_err(EngineError::catalog("schemas"))?;

    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// List installed extensions (database-wide; plpgsql is always present)
pub async fn list_extensions(client: &Client) -> Result<Vec<ExtensionInfo>> {
    let rows = client
        .query(
            "SELECT e.extname::text, n.nspname::text, e.extversion
             FROM pg_catalog.pg_extension e
             JOIN pg_catalog.pg_namespace n ON n.oid = e.extnamespace
             WHERE e.extname <> 'plpgsql'
             ORDER BY e.extname",
            &[],
        )
        .await
        .map_err(EngineError::catalog("extensions"))?;

    Ok(rows
        .iter()
        .map(|row| ExtensionInfo {
            name: row.get(0),
            schema: row.get(1),
            version: row.get(2),
        })
        .collect())
}

/// List enum types with their labels in declaration order
pub async fn list_enums(client: &Client, scope: &[String]) -> Result<Vec<EnumType>> {
    let sql = format!(
        "SELECT n.nspname::text, t.typname::text,
                array_agg(e.enumlabel::text ORDER BY e.enumsortorder)
         FROM pg_catalog.pg_type t
         JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
         JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
         WHERE {}
           AND {}
         GROUP BY n.nspname, t.typname
         ORDER BY n.nspname, t.typname",
        SCOPE_PREDICATE,
        not_extension_member("pg_type", "t.oid")
    );

    let rows = client
        .query(sql.as_str(), &[&scope])
        .await
        .map_err(EngineError::catalog("enum types"))?;

    Ok(rows
        .iter()
        .map(|row| EnumType {
            schema: row.get(0),
            name: row.get(1),
            labels: row.get(2),
        })
        .collect())
}

pub async fn list_sequences(client: &Client, scope: &[String]) -> Result<Vec<SequenceInfo>> {
    let sql = format!(
        "SELECT n.nspname::text, c.relname::text, s.data_type::text,
                s.start_value, s.increment_by, s.min_value, s.max_value,
                s.cache_size, s.cycle, s.last_value,
                owner.relname::text, att.attname::text, dep.deptype::text
         FROM pg_catalog.pg_sequences s
         JOIN pg_catalog.pg_namespace n ON n.nspname = s.schemaname
         JOIN pg_catalog.pg_class c ON c.relnamespace = n.oid AND c.relname = s.sequencename
         LEFT JOIN pg_catalog.pg_depend dep
                ON dep.classid = 'pg_catalog.pg_class'::regclass
               AND dep.objid = c.oid
               AND dep.refclassid = 'pg_catalog.pg_class'::regclass
               AND dep.deptype IN ('a', 'i')
         LEFT JOIN pg_catalog.pg_class owner ON owner.oid = dep.refobjid
         LEFT JOIN pg_catalog.pg_attribute att
                ON att.attrelid = dep.refobjid AND att.attnum = dep.refobjsubid
         WHERE {}
           AND {}
         ORDER BY n.nspname, c.relname",
        SCOPE_PREDICATE,
        not_extension_member("pg_class", "c.oid")
    );

    let rows = client
        .query(sql.as_str(), &[&scope])
        .await
        .map_err(EngineError::catalog("sequences"))?;

    Ok(rows
        .iter()
        .map(|row| {
            let owner_table: Option<String> = row.get(10);
            let owner_column: Option<String> = row.get(11);
            let deptype: Option<String> = row.get(12);
            SequenceInfo {
                schema: row.get(0),
                name: row.get(1),
                data_type: row.get(2),
                start: row.get(3),
                increment: row.get(4),
                min_value: row.get(5),
                max_value: row.get(6),
                cache: row.get(7),
                cycle: row.get(8),
                last_value: row.get(9),
                owned_by: owner_table.zip(owner_column),
                identity: deptype.as_deref() == Some("i"),
            }
        })
        .collect())
}

/// List ordinary tables with columns, standalone indexes and trigger presence
pub async fn list_tables(client: &Client, scope: &[String]) -> Result<Vec<TableInfo>> {
    let sql = format!(
        "SELECT c.oid, n.nspname::text, c.relname::text,
                EXISTS (SELECT 1 FROM pg_catalog.pg_trigger tg
                        WHERE tg.tgrelid = c.oid AND NOT tg.tgisinternal)
         FROM pg_catalog.pg_class c
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         WHERE c.relkind = 'r'
           AND {}
           AND {}
         ORDER BY n.nspname, c.relname",
        SCOPE_PREDICATE,
        not_extension_member("pg_class", "c.oid")
    );

    let rows = client
        .query(sql.as_str(), &[&scope])
        .await
        .map_err(EngineError::catalog("tables"))?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let oids: Vec<u32> = rows.iter().map(|row| row.get(0)).collect();
    let mut columns = list_columns(client, &oids).await?;
    let mut indexes = list_standalone_indexes(client, &oids).await?;

    Ok(rows
        .iter()
        .map(|row| {
            let oid: u32 = row.get(0);
            TableInfo {
                schema: row.get(1),
                name: row.get(2),
                columns: columns.remove(&oid).unwrap_or_default(),
                indexes: indexes.remove(&oid).unwrap_or_default(),
                has_user_triggers: row.get(3),
            }
        })
        .collect())
}

async fn list_columns(client: &Client, oids: &[u32]) -> Result<HashMap<u32, Vec<ColumnInfo>>> {
    let rows = client
        .query(
            "SELECT a.attrelid, a.attname::text,
                    pg_catalog.format_type(a.atttypid, a.atttypmod),
                    a.attnotnull,
                    pg_catalog.pg_get_expr(ad.adbin, ad.adrelid),
                    a.attidentity::text,
                    a.attgenerated::text
             FROM pg_catalog.pg_attribute a
             LEFT JOIN pg_catalog.pg_attrdef ad
                    ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
             WHERE a.attrelid = ANY($1::oid[])
               AND a.attnum > 0
               AND NOT a.attisdropped
             ORDER BY a.attrelid, a.attnum",
            &[&oids],
        )
        .await
        .map_err(EngineError::catalog("columns"))?;

    let mut columns: HashMap<u32, Vec<ColumnInfo>> = HashMap::new();
    for row in &rows {
        let identity: String = row.get(5);
        let generated: String = row.get(6);
        columns.entry(row.get(0)).or_default().push(ColumnInfo {
            name: row.get(1),
            data_type: row.get(2),
            not_null: row.get(3),
            default: row.get(4),
            identity: match identity.as_str() {
                "a" => Some(IdentityKind::Always),
                "d" => Some(IdentityKind::ByDefault),
                _ => None,
            },
            generated: generated == "s",
        });
    }

    Ok(columns)
}

async fn list_standalone_indexes(
    client: &Client,
    oids: &[u32],
) -> Result<HashMap<u32, Vec<String>>> {
    let rows = client
        .query(
            "SELECT i.indrelid, pg_catalog.pg_get_indexdef(i.indexrelid)
             FROM pg_catalog.pg_index i
             WHERE i.indrelid = ANY($1::oid[])
               AND NOT EXISTS (
                   SELECT 1 FROM pg_catalog.pg_constraint con
                   WHERE con.conindid = i.indexrelid
                     AND con.contype IN ('p', 'u', 'x'))
             ORDER BY i.indrelid, i.indexrelid",
            &[&oids],
        )
        .await
        .map_err(EngineError::catalog("indexes"))?;

    let mut indexes: HashMap<u32, Vec<String>> = HashMap::new();
    for row in &rows {
        indexes.entry(row.get(0)).or_default().push(row.get(1));
    }
    Ok(indexes)
}

/// List views in creation (oid) order, so views built on views come later
pub async fn list_views(client: &Client, scope: &[String]) -> Result<Vec<ViewInfo>> {
    let sql = format!(
        "SELECT n.nspname::text, c.relname::text, pg_catalog.pg_get_viewdef(c.oid)
         FROM pg_catalog.pg_class c
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         WHERE c.relkind = 'v'
           AND {}
           AND {}
         ORDER BY c.oid",
        SCOPE_PREDICATE,
        not_extension_member("pg_class", "c.oid")
    );

    let rows = client
        .query(sql.as_str(), &[&scope])
        .await
        .map_err(EngineError::catalog("views"))?;

    Ok(rows
        .iter()
        .map(|row| ViewInfo {
            schema: row.get(0),
            name: row.get(1),
            definition: row.get(2),
        })
        .collect())
}

/// List functions and procedures with their identity signature and full definition
pub async fn list_functions(client: &Client, scope: &[String]) -> Result<Vec<FunctionInfo>> {
    let sql = format!(
        "SELECT n.nspname::text, p.proname::text,
                pg_catalog.pg_get_function_identity_arguments(p.oid),
                pg_catalog.pg_get_functiondef(p.oid)
         FROM pg_catalog.pg_proc p
         JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
         WHERE p.prokind IN ('f', 'p')
           AND {}
           AND {}
         ORDER BY n.nspname, p.proname, 3",
        SCOPE_PREDICATE,
        not_extension_member("pg_proc", "p.oid")
    );

    let rows = client
        .query(sql.as_str(), &[&scope])
        .await
        .map_err(EngineError::catalog("functions"))?;

    Ok(rows
        .iter()
        .map(|row| FunctionInfo {
            schema: row.get(0),
            name: row.get(1),
            arguments: row.get(2),
            definition: row.get(3),
        })
        .collect())
}

pub async fn list_triggers(client: &Client, scope: &[String]) -> Result<Vec<TriggerInfo>> {
    let sql = format!(
        "SELECT n.nspname::text, c.relname::text, t.tgname::text,
                pg_catalog.pg_get_triggerdef(t.oid)
         FROM pg_catalog.pg_trigger t
         JOIN pg_catalog.pg_class c ON c.oid = t.tgrelid
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         WHERE NOT t.tgisinternal
           AND c.relkind = 'r'
           AND {}
           AND {}
         ORDER BY n.nspname, c.relname, t.tgname",
        SCOPE_PREDICATE,
        not_extension_member("pg_class", "c.oid")
    );

    let rows = client
        .query(sql.as_str(), &[&scope])
        .await
        .map_err(EngineError::catalog("triggers"))?;

    Ok(rows
        .iter()
        .map(|row| TriggerInfo {
            schema: row.get(0),
            table: row.get(1),
            name: row.get(2),
            definition: row.get(3),
        })
        .collect())
}

/// List table constraints, ordered by kind (foreign keys last)
pub async fn list_constraints(client: &Client, scope: &[String]) -> Result<Vec<ConstraintInfo>> {
    let sql = format!(
        "SELECT n.nspname::text, c.relname::text, con.conname::text, con.contype::text,
                pg_catalog.pg_get_constraintdef(con.oid)
         FROM pg_catalog.pg_constraint con
         JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         WHERE con.contype IN ('p', 'u', 'x', 'c', 'f')
           AND con.conislocal
           AND c.relkind = 'r'
           AND {}
           AND {}
         ORDER BY n.nspname, c.relname, con.conname",
        SCOPE_PREDICATE,
        not_extension_member("pg_class", "c.oid")
    );

    let rows = client
        .query(sql.as_str(), &[&scope])
        .await
        .map_err(EngineError::catalog("constraints"))?;

    let mut constraints: Vec<ConstraintInfo> = rows
        .iter()
        .filter_map(|row| {
            let code: String = row.get(3);
            Some(ConstraintInfo {
                schema: row.get(0),
                table: row.get(1),
                name: row.get(2),
                kind: ConstraintKind::from_code(&code)?,
                definition: row.get(4),
            })
        })
        .collect();

    // Stable sort keeps name order within a kind
    constraints.sort_by_key(|c| c.kind);
    Ok(constraints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::connect;

    #[test]
    fn test_constraint_kind_codes() {
        assert_eq!(ConstraintKind::from_code("p"), Some(ConstraintKind::PrimaryKey));
        assert_eq!(ConstraintKind::from_code("f"), Some(ConstraintKind::ForeignKey));
        assert_eq!(ConstraintKind::from_code("n"), None);
        assert!(ConstraintKind::Check < ConstraintKind::ForeignKey);
    }

    #[test]
    fn test_extension_member_predicate() {
        let predicate = not_extension_member("pg_proc", "p.oid");
        assert!(predicate.contains("'pg_catalog.pg_proc'::regclass"));
        assert!(predicate.contains("dep.objid = p.oid"));
        assert!(predicate.contains("deptype = 'e'"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_list_schemas_excludes_system_schemas() {
        let url = std::env::var("TEST_SOURCE_URL").unwrap();
        let client = connect(&url).await.unwrap();

        let schemas = list_schemas(&client, &[]).await.unwrap();
        assert!(!schemas.iter().any(|s| s == "pg_catalog"));
        assert!(!schemas.iter().any(|s| s == "information_schema"));
        assert!(!schemas.iter().any(|s| s.starts_with("pg_toast")));

        let named = list_schemas(&client, &["pg_catalog".to_string()])
            .await
            .unwrap();
        assert_eq!(named, vec!["pg_catalog".to_string()]);
    }

    #[tokio::test]
    #[ignore]
    async fn test_functions_carry_signatures() {
        let url = std::env::var("TEST_SOURCE_URL").unwrap();
        let client = connect(&url).await.unwrap();

        client
            .batch_execute(
                "CREATE SCHEMA IF NOT EXISTS pgvault_catalog_test;
                 CREATE OR REPLACE FUNCTION pgvault_catalog_test.twice(a int) RETURNS int
                     LANGUAGE sql AS $$ SELECT a * 2 $$;
                 CREATE OR REPLACE FUNCTION pgvault_catalog_test.twice(a text) RETURNS text
                     LANGUAGE sql AS $$ SELECT a || a $$;",
            )
            .await
            .unwrap();

        let scope = vec!["pgvault_catalog_test".to_string()];
        let functions = list_functions(&client, &scope).await.unwrap();
        let signatures: Vec<&str> = functions.iter().map(|f| f.arguments.as_str()).collect();

        assert_eq!(functions.len(), 2);
        assert!(signatures.contains(&"a integer"));
        assert!(signatures.contains(&"a text"));

        client
            .batch_execute("DROP SCHEMA pgvault_catalog_test CASCADE")
            .await
            .unwrap();
    }
}
