//! Benchmark database metadata.
//!
//! Each benchmark database has a directory under the metadata root holding
//! its schema DDL, column descriptions and a JSONL knowledge base:
//!
//! ```text
//! <root>/<db>/<db>_schema.txt
//! <root>/<db>/<db>_column_meaning_base.json
//! <root>/<db>/<db>_kb.jsonl
//! ```
//!
//! Missing files yield empty sections; a missing directory is an error.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

/// Description of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeaning {
    pub table_name: String,
    pub column_name: String,
    pub description: String,
}

/// One knowledge-base entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub knowledge: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Everything known about one benchmark database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    pub database_name: String,
    pub schema_ddl: String,
    pub column_meanings: Vec<ColumnMeaning>,
    pub knowledge_base: Vec<KnowledgeBaseItem>,
}

/// Lists databases that have a metadata directory, sorted by name.
pub fn list_databases(root: &Path) -> Result<Vec<String>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(root).map_err(|e| {
        BenchError::metadata(format!("Failed to read {}: {e}", root.display()))
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| BenchError::metadata(format!("Failed to read entry: {e}")))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() && !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Loads metadata for `database_name` from `root`.
pub fn get_database_metadata(root: &Path, database_name: &str) -> Result<DatabaseMetadata> {
    let db_path = root.join(database_name);
    if !db_path.is_dir() {
        return Err(BenchError::metadata(format!(
            "Metadata for database {database_name} not found in {}",
            root.display()
        )));
    }

    let schema_file = db_path.join(format!("{database_name}_schema.txt"));
    let schema_ddl = read_optional(&schema_file)?.unwrap_or_default();

    let column_file = db_path.join(format!("{database_name}_column_meaning_base.json"));
    let column_meanings = match read_optional(&column_file)? {
        Some(content) => parse_column_meanings(&content).map_err(|e| {
            BenchError::metadata(format!("Invalid {}: {e}", column_file.display()))
        })?,
        None => Vec::new(),
    };

    let kb_file = db_path.join(format!("{database_name}_kb.jsonl"));
    let knowledge_base = match read_optional(&kb_file)? {
        Some(content) => parse_knowledge_base(&content)
            .map_err(|e| BenchError::metadata(format!("Invalid {}: {e}", kb_file.display())))?,
        None => Vec::new(),
    };

    Ok(DatabaseMetadata {
        database_name: database_name.to_string(),
        schema_ddl,
        column_meanings,
        knowledge_base,
    })
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| BenchError::metadata(format!("Failed to read {}: {e}", path.display())))
}

/// Parses a `{"db|table|column": description}` map.
///
/// Keys with fewer than three segments are skipped. Object descriptions use
/// their `column_meaning` field when present and are stringified otherwise.
fn parse_column_meanings(content: &str) -> serde_json::Result<Vec<ColumnMeaning>> {
    let raw: serde_json::Map<String, JsonValue> = serde_json::from_str(content)?;

    Ok(raw
        .iter()
        .filter_map(|(key, value)| {
            let parts: Vec<&str> = key.split('|').collect();
            if parts.len() < 3 {
                return None;
            }
            let description = match value {
                JsonValue::String(s) => s.clone(),
                JsonValue::Object(obj) => match obj.get("column_meaning") {
                    Some(JsonValue::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => value.to_string(),
                },
                other => other.to_string(),
            };
            Some(ColumnMeaning {
                table_name: parts[1].to_string(),
                column_name: parts[2].to_string(),
                description,
            })
        })
        .collect())
}

fn parse_knowledge_base(content: &str) -> serde_json::Result<Vec<KnowledgeBaseItem>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect()
}
