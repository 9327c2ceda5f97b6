//! End-to-end benchmark job tests.
//!
//! Runs a full job through the HTTP generator client against a local
//! responder, with scripted query results standing in for PostgreSQL.

use std::sync::Arc;
use t2sql_bench::config::Config;
use t2sql_bench::dataset::BenchmarkInstance;
use t2sql_bench::db::{MockExecutor, Value};
use t2sql_bench::eval::Outcome;
use t2sql_bench::persistence::{JobStatus, StateDb};
use t2sql_bench::service::BenchmarkService;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn instance(id: &str, question: &str) -> BenchmarkInstance {
    BenchmarkInstance {
        instance_id: id.to_string(),
        database_name: "solar_panel".to_string(),
        question: question.to_string(),
        ground_truth_sql: Some("SELECT COUNT(*) FROM panels".to_string()),
    }
}

/// Reads one HTTP request, headers and body.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        request.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&request).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|l| {
                    l.to_lowercase()
                        .strip_prefix("content-length:")
                        .and_then(|v| v.trim().parse::<usize>().ok())
                })
                .unwrap_or(0);
            if request.len() >= header_end + 4 + content_length {
                return text;
            }
        }
        if n == 0 {
            return text;
        }
    }
}

/// Serves `count` requests, answering according to the question asked.
async fn serve_generator(count: usize) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/generate", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for _ in 0..count {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            let (status, body) = if request.contains("How many panels") {
                ("200 OK", r#"{"sql": "SELECT COUNT(id) FROM panels"}"#)
            } else if request.contains("Misspelled") {
                ("200 OK", r#"{"generated_sql": "SELEC COUNT(*) FROM panels"}"#)
            } else {
                ("500 Internal Server Error", "model unavailable")
            };

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            seen.push(request);
        }
        seen
    });

    (url, handle)
}

#[tokio::test]
async fn test_benchmark_job_over_http() {
    let (url, server) = serve_generator(3).await;

    let executor = MockExecutor::new()
        .with_rows("SELECT COUNT(*) FROM panels", vec![vec![Value::Int(40)]])
        .with_rows("SELECT COUNT(id) FROM panels", vec![vec![Value::Int(40)]])
        .with_failure(
            "SELEC COUNT(*) FROM panels",
            "error returned from database: syntax error at or near \"SELEC\"",
        );
    let dataset = vec![
        instance("solar_panel_1", "How many panels are installed?"),
        instance("solar_panel_2", "Misspelled count"),
        instance("solar_panel_3", "Total capacity?"),
    ];
    let config = Config {
        generator_timeout_secs: 5,
        ..Config::default()
    };

    let state = StateDb::open_in_memory().await.unwrap();
    let service = BenchmarkService::new(
        Arc::new(config),
        state,
        Arc::new(executor),
        Arc::new(dataset),
    );

    let (job_id, handle) = service.start_job(&url).await.unwrap();
    assert_eq!(handle.await.unwrap().unwrap(), JobStatus::Completed);

    let requests = server.await.unwrap();
    assert!(requests[0].contains(
        r#"{"database":"solar_panel","query":"How many panels are installed?"}"#
    ));

    let results = service.job_results(job_id).await.unwrap();
    let outcomes: Vec<Outcome> = results.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![Outcome::Correct, Outcome::ExecutionError, Outcome::WrongResult]
    );

    assert_eq!(
        results[1].error.as_deref(),
        Some("Generated SQL Error: error returned from database: syntax error at or near \"SELEC\"")
    );
    assert_eq!(results[2].generated_sql, None);
    assert_eq!(
        results[2].error.as_deref(),
        Some("Error: 500 - model unavailable")
    );
    assert!(results.iter().all(|r| r.latency_ms.is_some()));

    let detail = service.job_detail(job_id).await.unwrap().unwrap();
    assert_eq!(detail.job.status, JobStatus::Completed);
    assert_eq!(detail.job.endpoint_url, url);
    assert_eq!(detail.stats.total, 3);
    assert_eq!(detail.stats.correct, 1);
    assert_eq!(detail.stats.execution_error, 1);
    assert_eq!(detail.stats.wrong_result, 1);
}

#[tokio::test]
async fn test_unreachable_generator_still_completes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/generate", listener.local_addr().unwrap());
    drop(listener);

    let state = StateDb::open_in_memory().await.unwrap();
    let service = BenchmarkService::new(
        Arc::new(Config::default()),
        state,
        Arc::new(MockExecutor::new()),
        Arc::new(vec![instance("solar_panel_1", "How many panels?")]),
    );

    let (job_id, handle) = service.start_job(&url).await.unwrap();
    assert_eq!(handle.await.unwrap().unwrap(), JobStatus::Completed);

    let results = service.job_results(job_id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::WrongResult);
    assert!(results[0].error.is_some());
}

#[tokio::test]
async fn test_missing_dataset_fails_job() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        input_file: dir.path().join("missing.jsonl"),
        ground_truth_file: dir.path().join("missing_gt.jsonl"),
        ..Config::default()
    };

    let state = StateDb::open_in_memory().await.unwrap();
    let service = BenchmarkService::from_config(Arc::new(config), state);

    let (job_id, handle) = service.start_job("http://127.0.0.1:9/").await.unwrap();
    assert_eq!(handle.await.unwrap().unwrap(), JobStatus::Failed);

    let detail = service.job_detail(job_id).await.unwrap().unwrap();
    assert_eq!(detail.job.status, JobStatus::Failed);
    assert_eq!(detail.stats.total, 0);
}
