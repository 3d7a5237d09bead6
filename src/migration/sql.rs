// ABOUTME: SQL text helpers for identifier quoting and literal rendering
// ABOUTME: Mirrors PostgreSQL quote_ident / quote_literal so dumps stay readable

/// Keywords PostgreSQL refuses as bare identifiers (reserved, type/function
/// name and column name categories). Unreserved keywords may stay bare.
const NON_BARE_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "between", "bigint", "binary", "bit", "boolean", "both", "case", "cast",
    "char", "character", "check", "coalesce", "collate", "collation", "column", "concurrently",
    "constraint", "create", "cross", "current_catalog", "current_date", "current_role",
    "current_schema", "current_time", "current_timestamp", "current_user", "dec", "decimal",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "exists",
    "extract", "false", "fetch", "float", "for", "foreign", "freeze", "from", "full", "grant",
    "greatest", "group", "grouping", "having", "ilike", "in", "initially", "inner", "inout",
    "int", "integer", "intersect", "interval", "into", "is", "isnull", "join", "lateral",
    "leading", "least", "left", "like", "limit", "localtime", "localtimestamp", "national",
    "natural", "nchar", "none", "normalize", "not", "notnull", "null", "nullif", "numeric",
    "offset", "on", "only", "or", "order", "out", "outer", "overlaps", "overlay", "placing",
    "position", "precision", "primary", "real", "references", "returning", "right", "row",
    "select", "session_user", "setof", "similar", "smallint", "some", "substring", "symmetric",
    "system_user", "table", "tablesample", "then", "time", "timestamp", "to", "trailing",
    "treat", "trim", "true", "union", "unique", "user", "using", "values", "varchar",
    "variadic", "verbose", "when", "where", "window", "with",
];

/// Quote an identifier only when PostgreSQL would require it
///
/// Lowercase names made of `[a-z0-9_$]` that do not start with a digit or `$`
/// and are not keywords are returned as-is; everything else is wrapped in
/// double quotes with embedded quotes doubled.
pub fn quote_ident(name: &str) -> String {
    let mut chars = name.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');

    if simple && !NON_BARE_KEYWORDS.contains(&name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// `schema.name` with each part quoted as needed
pub fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Standard-conforming string literal (`'` doubled, backslashes literal)
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render a value fetched in its text form as an INSERT operand
///
/// Text literals are untyped in PostgreSQL, so the server coerces them to the
/// target column type on insert.
pub fn render_value(value: Option<&str>) -> String {
    match value {
        Some(text) => quote_literal(text),
        None => "NULL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_leaves_simple_names_bare() {
        assert_eq!(quote_ident("users"), "users");
        assert_eq!(quote_ident("order_items_2"), "order_items_2");
        assert_eq!(quote_ident("_private"), "_private");
    }

    #[test]
    fn test_quote_ident_quotes_when_required() {
        assert_eq!(quote_ident("Users"), "\"Users\"");
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("user"), "\"user\"");
        assert_eq!(quote_ident("2fa"), "\"2fa\"");
        assert_eq!(quote_ident("with space"), "\"with space\"");
        assert_eq!(quote_ident("say\"hi"), "\"say\"\"hi\"");
        assert_eq!(quote_ident(""), "\"\"");
    }

    #[test]
    fn test_qualified() {
        assert_eq!(qualified("public", "t"), "public.t");
        assert_eq!(qualified("Sales", "order"), "\"Sales\".\"order\"");
    }

    #[test]
    fn test_literals() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal("C:\\path"), "'C:\\path'");
        assert_eq!(render_value(None), "NULL");
        assert_eq!(render_value(Some("42")), "'42'");
    }
}
