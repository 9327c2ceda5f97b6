//! Benchmark dataset loading.
//!
//! A dataset is split across two JSONL files: raw instances and ground-truth
//! annotations. Both are keyed by `instance_id`; only ids present in both
//! files are benchmarked, and annotation fields override raw fields.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One benchmark unit: a question, its target database and a ground truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkInstance {
    pub instance_id: String,
    pub database_name: String,
    pub question: String,
    /// First statement of the instance's solution list.
    pub ground_truth_sql: Option<String>,
}

impl BenchmarkInstance {
    /// Builds an instance from a merged JSON record.
    ///
    /// Reads `selected_database`, `query` and the first element of `sol_sql`;
    /// later solution statements are ignored.
    pub fn from_record(record: &Map<String, JsonValue>) -> Self {
        let text = |key: &str| {
            record
                .get(key)
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let ground_truth_sql = record
            .get("sol_sql")
            .and_then(JsonValue::as_array)
            .and_then(|sols| sols.first())
            .and_then(JsonValue::as_str)
            .map(String::from);

        Self {
            instance_id: text("instance_id"),
            database_name: text("selected_database"),
            question: text("query"),
            ground_truth_sql,
        }
    }

    /// Returns true if the instance names a database and has a ground truth.
    pub fn is_evaluable(&self) -> bool {
        !self.database_name.is_empty()
            && self
                .ground_truth_sql
                .as_deref()
                .is_some_and(|sql| !sql.is_empty())
    }
}

/// Source of benchmark instances.
pub trait DatasetProvider: Send + Sync {
    /// Loads the ordered collection of instances.
    fn load(&self) -> Result<Vec<BenchmarkInstance>>;
}

/// Dataset backed by a pair of JSONL files.
#[derive(Debug, Clone)]
pub struct JsonlDataset {
    pub input_file: PathBuf,
    pub ground_truth_file: PathBuf,
}

impl JsonlDataset {
    /// Creates a dataset reading the given files.
    pub fn new(input_file: impl Into<PathBuf>, ground_truth_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            ground_truth_file: ground_truth_file.into(),
        }
    }
}

impl DatasetProvider for JsonlDataset {
    fn load(&self) -> Result<Vec<BenchmarkInstance>> {
        load_benchmark_data(&self.input_file, &self.ground_truth_file)
    }
}

impl DatasetProvider for Vec<BenchmarkInstance> {
    fn load(&self) -> Result<Vec<BenchmarkInstance>> {
        Ok(self.clone())
    }
}

/// Records keyed by `instance_id`, remembering first-seen order.
#[derive(Debug, Default)]
struct KeyedRecords {
    order: Vec<String>,
    records: HashMap<String, Map<String, JsonValue>>,
}

impl KeyedRecords {
    fn insert(&mut self, id: String, record: Map<String, JsonValue>) {
        if self.records.insert(id.clone(), record).is_none() {
            self.order.push(id);
        }
    }
}

/// Reads a JSONL file into records keyed by `instance_id`.
///
/// Blank lines are skipped; a later record with the same id replaces the
/// earlier one but keeps its position.
fn read_keyed_jsonl(path: &Path) -> Result<KeyedRecords> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BenchError::dataset(format!("Failed to read {}: {e}", path.display()))
    })?;

    let mut keyed = KeyedRecords::default();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record: Map<String, JsonValue> = serde_json::from_str(line).map_err(|e| {
            BenchError::dataset(format!(
                "{}:{}: invalid JSON record: {e}",
                path.display(),
                line_no + 1
            ))
        })?;

        let id = record
            .get("instance_id")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                BenchError::dataset(format!(
                    "{}:{}: record has no instance_id",
                    path.display(),
                    line_no + 1
                ))
            })?
            .to_string();

        keyed.insert(id, record);
    }

    debug!("Read {} records from {}", keyed.order.len(), path.display());
    Ok(keyed)
}

/// Loads and merges the raw and ground-truth files.
///
/// The result follows the raw file's order.
pub fn load_benchmark_data(input: &Path, ground_truth: &Path) -> Result<Vec<BenchmarkInstance>> {
    let raw = read_keyed_jsonl(input)?;
    let mut annotations = read_keyed_jsonl(ground_truth)?;

    let mut merged = Vec::with_capacity(raw.order.len());
    let mut records = raw.records;
    for id in raw.order {
        let Some(annotation) = annotations.records.remove(&id) else {
            continue;
        };
        let Some(mut record) = records.remove(&id) else {
            continue;
        };
        record.extend(annotation);
        merged.push(BenchmarkInstance::from_record(&record));
    }

    info!(
        "Loaded {} benchmark instances from {} and {}",
        merged.len(),
        input.display(),
        ground_truth.display()
    );
    Ok(merged)
}

/// Finds an instance by id.
pub fn find_instance<'a>(
    instances: &'a [BenchmarkInstance],
    instance_id: &str,
) -> Option<&'a BenchmarkInstance> {
    instances.iter().find(|i| i.instance_id == instance_id)
}
