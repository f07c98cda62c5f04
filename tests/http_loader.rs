//! HttpLoader against a one-shot HTTP stub on a local socket.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use fraudcharts::loader::{HttpLoader, LoadError, PayloadSource};
use fraudcharts::model::{ChartCategory, RiskLevel};

/// Serve one response and report the request line it answered.
fn serve_once(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        // drain headers
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
            line.clear();
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        let _ = tx.send(request_line.trim_end().to_string());
    });
    (format!("http://{}/fraud_detector", addr), rx)
}

#[tokio::test]
async fn fetches_and_decodes_payload() {
    let body = r#"{
        "fraudScores": [{"score": 6.5, "fraud_score": 6.5, "risk_level": "High", "claim_number": "C-9"}],
        "geographic": [{"state": "OH", "count": 3, "fraud_score": 2.0, "risk_level": "Low"}]
    }"#;
    let (base, rx) = serve_once("200 OK", body);
    let loader = HttpLoader::new(&base, 5).unwrap();

    let payload = loader.fetch("42").await.unwrap();
    assert_eq!(rx.recv().unwrap(), "GET /fraud_detector/api/charts-data/42/ HTTP/1.1");

    let scores = payload.records(ChartCategory::FraudScores);
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].fraud_score, 6.5);
    assert_eq!(scores[0].risk_level, RiskLevel::High);
    assert_eq!(payload.records(ChartCategory::Geographic)[0].state.as_deref(), Some("OH"));
    assert!(payload.records(ChartCategory::Timeline).is_empty());
}

#[tokio::test]
async fn non_success_status_is_network_error() {
    let (base, _rx) = serve_once("500 Internal Server Error", r#"{"error": "boom"}"#);
    let loader = HttpLoader::new(&base, 5).unwrap();
    assert_eq!(loader.fetch("1").await.unwrap_err(), LoadError::Status(500));
}

#[tokio::test]
async fn not_found_is_network_error() {
    let (base, _rx) = serve_once("404 Not Found", "{}");
    let loader = HttpLoader::new(&base, 5).unwrap();
    assert_eq!(loader.fetch("1").await.unwrap_err(), LoadError::Status(404));
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let (base, _rx) = serve_once("200 OK", "[1, 2, 3]");
    let loader = HttpLoader::new(&base, 5).unwrap();
    assert!(matches!(loader.fetch("1").await, Err(LoadError::Decode(_))));
}

#[tokio::test]
async fn refused_connection_is_transport_error() {
    // bind then drop to get a port nobody listens on
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let loader = HttpLoader::new(&format!("http://{}", addr), 5).unwrap();
    assert!(matches!(loader.fetch("1").await, Err(LoadError::Transport(_))));
}
