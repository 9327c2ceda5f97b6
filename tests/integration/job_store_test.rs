//! Integration tests for the job store.

use pretty_assertions::assert_eq;
use t2sql_bench::eval::{EvaluationResult, Outcome};
use t2sql_bench::persistence::{jobs, results, JobStatus, StateDb};
use tempfile::tempdir;

fn result(instance_id: &str, outcome: Outcome, error: Option<&str>, latency: Option<f64>) -> EvaluationResult {
    EvaluationResult {
        instance_id: instance_id.to_string(),
        database_name: "hulushows".to_string(),
        question: "Which shows aired in 2010?".to_string(),
        generated_sql: Some("SELECT title FROM shows WHERE year = 2010".to_string()),
        expected_sql: Some("SELECT title FROM shows WHERE year = 2010".to_string()),
        is_correct: Some(outcome.is_correct()),
        outcome,
        error: error.map(String::from),
        latency_ms: latency,
    }
}

#[tokio::test]
async fn test_jobs_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.db");

    let db = StateDb::open(&path).await.unwrap();
    let job = jobs::create_job(db.pool(), "http://localhost:8001/").await.unwrap();
    jobs::set_job_status(db.pool(), job.id, JobStatus::Running)
        .await
        .unwrap();
    results::record_result(db.pool(), job.id, &result("h_1", Outcome::Correct, None, Some(120.0)))
        .await
        .unwrap();
    db.close().await;

    let db = StateDb::open(&path).await.unwrap();
    let reopened = jobs::get_job(db.pool(), job.id).await.unwrap().unwrap();
    assert_eq!(reopened.status, JobStatus::Running);
    assert_eq!(results::list_results(db.pool(), job.id).await.unwrap().len(), 1);
    db.close().await;
}

#[tokio::test]
async fn test_job_detail_stats() {
    let dir = tempdir().unwrap();
    let db = StateDb::open(&dir.path().join("state.db")).await.unwrap();
    let job = jobs::create_job(db.pool(), "http://localhost:8001/").await.unwrap();

    let rows = [
        result("h_1", Outcome::Correct, None, Some(100.0)),
        result("h_2", Outcome::Correct, None, Some(200.0)),
        result(
            "h_3",
            Outcome::ExecutionError,
            Some("Generated SQL Error: column \"yr\" does not exist"),
            Some(300.0),
        ),
        result("h_4", Outcome::WrongResult, Some("Error: 500 - boom"), None),
    ];
    for row in &rows {
        results::record_result(db.pool(), job.id, row).await.unwrap();
    }

    let detail = jobs::job_detail(db.pool(), job.id).await.unwrap().unwrap();
    assert_eq!(detail.stats.total, 4);
    assert_eq!(detail.stats.correct, 2);
    assert_eq!(detail.stats.execution_error, 1);
    assert_eq!(detail.stats.wrong_result, 1);
    assert_eq!(detail.stats.accuracy_score, 0.5);
    assert_eq!(detail.stats.valid_sql_rate, 0.75);
    // 600 ms over four results, one without latency.
    assert_eq!(detail.stats.avg_latency_ms, 150.0);

    db.close().await;
}

#[tokio::test]
async fn test_delete_job_removes_results() {
    let dir = tempdir().unwrap();
    let db = StateDb::open(&dir.path().join("state.db")).await.unwrap();

    let keep = jobs::create_job(db.pool(), "http://keep/").await.unwrap();
    let gone = jobs::create_job(db.pool(), "http://drop/").await.unwrap();
    results::record_result(db.pool(), keep.id, &result("k_1", Outcome::Correct, None, None))
        .await
        .unwrap();
    results::record_result(db.pool(), gone.id, &result("d_1", Outcome::Correct, None, None))
        .await
        .unwrap();

    assert!(jobs::delete_job(db.pool(), gone.id).await.unwrap());

    let remaining: Vec<i64> = jobs::list_jobs(db.pool())
        .await
        .unwrap()
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(remaining, vec![keep.id]);
    assert!(results::list_results(db.pool(), gone.id).await.unwrap().is_empty());
    assert_eq!(results::list_results(db.pool(), keep.id).await.unwrap().len(), 1);

    db.close().await;
}
