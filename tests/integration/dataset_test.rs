//! Dataset, metadata and manual evaluation integration tests.

use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use t2sql_bench::config::Config;
use t2sql_bench::dataset::{DatasetProvider, JsonlDataset};
use t2sql_bench::db::{MockExecutor, Value};
use t2sql_bench::error::BenchError;
use t2sql_bench::metadata;
use t2sql_bench::persistence::StateDb;
use t2sql_bench::service::BenchmarkService;
use tempfile::tempdir;

fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn fixture(dir: &Path) -> JsonlDataset {
    let input = write_lines(
        dir,
        "mini_interact.jsonl",
        &[
            r#"{"instance_id": "solar_panel_1", "selected_database": "solar_panel", "query": "How many panels are installed?", "amb_user_query": "panels?"}"#,
            r#"{"instance_id": "solar_panel_2", "selected_database": "solar_panel", "query": "Average efficiency?"}"#,
            r#"{"instance_id": "hulushows_1", "selected_database": "hulushows", "query": "Shows per year?"}"#,
        ],
    );
    let gt = write_lines(
        dir,
        "mini_interact_gt.jsonl",
        &[
            r#"{"instance_id": "hulushows_1", "sol_sql": ["SELECT year, COUNT(*) FROM shows GROUP BY year"], "test_cases": []}"#,
            r#"{"instance_id": "solar_panel_1", "sol_sql": ["SELECT COUNT(*) FROM panels", "SELECT COUNT(id) FROM panels"]}"#,
        ],
    );
    JsonlDataset::new(input, gt)
}

#[test]
fn test_jsonl_dataset_merges_files() {
    let dir = tempdir().unwrap();
    let instances = fixture(dir.path()).load().unwrap();

    let ids: Vec<&str> = instances.iter().map(|i| i.instance_id.as_str()).collect();
    assert_eq!(ids, vec!["solar_panel_1", "hulushows_1"]);
    assert_eq!(
        instances[0].ground_truth_sql.as_deref(),
        Some("SELECT COUNT(*) FROM panels")
    );
    assert!(instances.iter().all(|i| i.is_evaluable()));
}

#[test]
fn test_manual_evaluation_against_jsonl_dataset() {
    let dir = tempdir().unwrap();
    let dataset = fixture(dir.path());

    tokio_test::block_on(async {
        let executor = MockExecutor::new()
            .with_rows("SELECT COUNT(*) FROM panels", vec![vec![Value::Int(40)]])
            .with_rows("SELECT 40", vec![vec![Value::Int(40)]])
            .with_rows("SELECT 41", vec![vec![Value::Int(41)]]);
        let state = StateDb::open_in_memory().await.unwrap();
        let service = BenchmarkService::new(
            Arc::new(Config::default()),
            state,
            Arc::new(executor),
            Arc::new(dataset),
        );

        let right = service
            .manual_evaluate("solar_panel_1", "SELECT 40")
            .await
            .unwrap();
        assert!(right.is_correct);
        assert_eq!(right.total, 1);
        assert_eq!(right.accuracy_score, 1.0);

        let wrong = service
            .manual_evaluate("solar_panel_1", "SELECT 41")
            .await
            .unwrap();
        assert!(!wrong.is_correct);
        assert_eq!(wrong.wrong_result, 1);
        assert_eq!(wrong.valid_sql_rate, 1.0);

        // Present in the raw file only, so it is not part of the dataset.
        let err = service
            .manual_evaluate("solar_panel_2", "SELECT 1")
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::InstanceNotFound(_)));
        assert_eq!(err.category(), "Not Found");
    });
}

#[test]
fn test_metadata_directory_listing() {
    let dir = tempdir().unwrap();
    for name in ["solar_panel", "hulushows"] {
        let db_dir = dir.path().join(name);
        std::fs::create_dir(&db_dir).unwrap();
        std::fs::write(
            db_dir.join(format!("{name}_schema.txt")),
            format!("CREATE TABLE {name}_t (id int);"),
        )
        .unwrap();
    }

    assert_eq!(
        metadata::list_databases(dir.path()).unwrap(),
        vec!["hulushows".to_string(), "solar_panel".to_string()]
    );

    let meta = metadata::get_database_metadata(dir.path(), "hulushows").unwrap();
    assert_eq!(meta.schema_ddl, "CREATE TABLE hulushows_t (id int);");
    assert!(meta.knowledge_base.is_empty());
}
