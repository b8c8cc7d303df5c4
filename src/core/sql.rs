//! Text rules applied to Athena DDL and to QuickSight ids.

use regex::{NoExpand, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

pub const ATHENA_DATABASE_PLACEHOLDER: &str = "${athena_database_name}";
pub const ATHENA_DATASOURCE_PLACEHOLDER: &str = "${athena_datasource_arn}";
pub const CUR_TABLE_PLACEHOLDER: &str = "${cur_table_name}";

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9a-zA-Z]+").expect("valid id regex"));

// FROM/JOIN followed by a (possibly qualified, possibly quoted) name. The
// trailing group catches function calls such as `CROSS JOIN UNNEST(`.
static TABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:from|join)\s+((?:"[^"]+"|`[^`]+`|\w+)(?:\s*\.\s*(?:"[^"]+"|`[^`]+`|\w+))*)(\s*\()?"#,
    )
    .expect("valid table reference regex")
});

static CTE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:\bwith\s+(?:recursive\s+)?|,\s*)"?(\w+)"?\s*(?:\([^()]*\))?\s+as\s*\("#)
        .expect("valid cte regex")
});

static CREATE_VIEW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCREATE\s+VIEW\s").expect("valid create view regex"));

static S3_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)LOCATION\s+'s3://([^/']+)").expect("valid s3 location regex")
});

/// Replaces every run of non-alphanumeric characters with `-`.
pub fn escape_id(id: &str) -> String {
    NON_ALPHANUMERIC.replace_all(id, "-").into_owned()
}

/// Default id for dashboards and templates derived from an analysis name.
pub fn default_resource_id(name: &str) -> String {
    escape_id(&name.to_lowercase())
}

fn unquote(part: &str) -> &str {
    part.trim().trim_matches(|c| c == '"' || c == '`')
}

/// Names of the tables and views a statement reads from, lower-cased, in order
/// of first appearance. Database prefixes are dropped; CTE names are excluded.
pub fn referenced_tables(sql: &str) -> Vec<String> {
    let ctes: HashSet<String> = CTE_NAME
        .captures_iter(sql)
        .map(|caps| caps[1].to_lowercase())
        .collect();

    let mut seen = HashSet::new();
    let mut tables = Vec::new();
    for caps in TABLE_REFERENCE.captures_iter(sql) {
        if caps.get(2).is_some() {
            continue;
        }
        let Some(last) = caps[1].rsplit('.').next() else {
            continue;
        };
        let name = unquote(last).to_lowercase();
        if name.is_empty() || ctes.contains(&name) {
            continue;
        }
        if seen.insert(name.clone()) {
            tables.push(name);
        }
    }
    tables
}

/// Replaces the `database.` qualifier (quoted or bare) with the database placeholder.
pub fn parameterize_database(sql: &str, database: &str) -> String {
    let escaped = regex::escape(database);
    let quoted = Regex::new(&format!(r#"(?i)"{}"\."#, escaped));
    let bare = Regex::new(&format!(r"(?i)\b{}\.", escaped));
    match (quoted, bare) {
        (Ok(quoted), Ok(bare)) => {
            let placeholder_quoted = format!("\"{}\".", ATHENA_DATABASE_PLACEHOLDER);
            let placeholder_bare = format!("{}.", ATHENA_DATABASE_PLACEHOLDER);
            let sql = quoted.replace_all(sql, NoExpand(&placeholder_quoted));
            bare.replace_all(&sql, NoExpand(&placeholder_bare)).into_owned()
        }
        _ => sql.replace(&format!("{}.", database), &format!("{}.", ATHENA_DATABASE_PLACEHOLDER)),
    }
}

pub fn create_or_replace(sql: &str) -> String {
    CREATE_VIEW
        .replace_all(sql, NoExpand("CREATE OR REPLACE VIEW "))
        .into_owned()
}

/// Whole-word replacement of a table name, keeping any surrounding quotes.
pub fn replace_table_name(sql: &str, table: &str, placeholder: &str) -> String {
    match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(table))) {
        Ok(re) => re.replace_all(sql, NoExpand(placeholder)).into_owned(),
        Err(_) => sql.replace(table, placeholder),
    }
}

/// Buckets named in `LOCATION 's3://bucket/...'` clauses.
pub fn s3_buckets(sql: &str) -> Vec<String> {
    S3_LOCATION
        .captures_iter(sql)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Multi-line strings can only be emitted as YAML literal blocks when no line
/// ends in whitespace.
pub fn strip_trailing_whitespace(text: &str) -> String {
    if text.lines().nth(1).is_none() {
        return text.to_string();
    }
    let stripped: Vec<&str> = text.lines().map(str::trim_end).collect();
    stripped.join("\n").trim_end().to_string()
}
