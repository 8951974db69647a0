use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serial_test::serial;
use testkit::StubCollector;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_rumshop")
}

fn spawn_server(temp: &Path, collector_url: &str) -> (Child, u16) {
    let port = free_port();
    let db_url = format!("sqlite://{}?mode=rwc", temp.join("loja.db").display());

    let child = Command::new(bin())
        .arg("serve")
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--database-url")
        .arg(&db_url)
        .arg("--collector-url")
        .arg(collector_url)
        .env("RUMSHOP_EXPORT_MODE", "simple")
        .env("RUMSHOP_CONFIG", temp.join("missing.toml"))
        .env_remove("DATABASE_URL")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    (child, port)
}

async fn wait_http_ready(port: u16, child: &mut Child) {
    let client = reqwest::Client::new();
    let mut ready = false;
    for _ in 0..100 {
        assert!(child.try_wait().unwrap().is_none(), "rumshop exited early");
        if client
            .get(format!("http://127.0.0.1:{port}/"))
            .send()
            .await
            .is_ok()
        {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(ready, "http endpoint not ready");
}

#[tokio::test]
#[serial]
async fn e2e_checkout_reaches_collector_with_browser_trace() {
    let temp = tempfile::tempdir().unwrap();
    let collector = StubCollector::start().await.unwrap();
    let (mut child, port) = spawn_server(temp.path(), &collector.url());
    wait_http_ready(port, &mut child).await;

    let client = reqwest::Client::new();
    let page = client
        .get(format!("http://127.0.0.1:{port}/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Loja RUM - Monitoramento Full"));
    assert!(page.contains(&collector.url()));

    let traceparent = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
    let resp = client
        .post(format!("http://127.0.0.1:{port}/checkout"))
        .header("traceparent", traceparent)
        .json(&serde_json::json!({ "product": "Bola", "amount": 49.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "sucesso");
    assert!(body["id"].as_i64().unwrap() >= 1);

    let spans = collector.wait_for_spans(1, Duration::from_secs(5)).await;
    assert_eq!(spans.len(), 1);
    assert_eq!(hex::encode(&spans[0].trace_id), "4bf92f3577b34da6a3ce929d0e0e4736");
    assert_eq!(hex::encode(&spans[0].parent_span_id), "00f067aa0ba902b7");

    let logs = collector.wait_for_logs(1, Duration::from_secs(5)).await;
    assert_eq!(logs[0].trace_id, spans[0].trace_id);
    assert_eq!(logs[0].span_id, spans[0].span_id);

    let _ = child.kill();
    let _ = child.wait();
}

#[tokio::test]
#[serial]
async fn e2e_simulated_error_is_500_and_exported_as_error() {
    let temp = tempfile::tempdir().unwrap();
    let collector = StubCollector::start().await.unwrap();
    let (mut child, port) = spawn_server(temp.path(), &collector.url());
    wait_http_ready(port, &mut child).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/simular_erro"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "erro");

    let logs = collector.wait_for_logs(1, Duration::from_secs(5)).await;
    assert_eq!(logs[0].severity_number, 17);
    assert!(testkit::body_text(&logs[0]).contains("Falha"));

    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn page_subcommand_prints_the_document() {
    let temp = tempfile::tempdir().unwrap();
    let output = Command::new(bin())
        .arg("page")
        .arg("--collector-url")
        .arg("https://collector.example")
        .env("RUMSHOP_CONFIG", temp.path().join("missing.toml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Monitoramento Full"));
    assert!(stdout.contains(r#""https://collector.example""#));
}
