#![cfg(all(feature = "http", unix))]

use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};

use slotd_api::{HttpApi, SupervisorApiAdapter};
use slotd_core::{Supervisor, SupervisorConfig};

async fn serve(root: &std::path::Path) -> String {
    let supervisor = Supervisor::new(SupervisorConfig {
        slots: 3,
        root: root.to_path_buf(),
        interpreter: Some("sh".into()),
        cleanup_interpreter: Some("sh".into()),
        warmup: Duration::from_millis(200),
        stop_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap();
    let adapter = SupervisorApiAdapter::new(Arc::new(supervisor));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = HttpApi::new(Arc::new(adapter)).router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn payload(slot: u32) -> Value {
    json!({
        format!("RC{slot}"): "rc",
        format!("AttackTime{slot}"): 1500,
        format!("DefenceTime{slot}"): 1200,
        format!("PlanetName{slot}"): "Kepler",
        format!("IntervalTime{slot}"): 100,
        format!("Rival{slot}"): "A,B,C",
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_status_stop_through_http() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["test_1.js", "galaxy_1.js"] {
        std::fs::write(dir.path().join(name), "exec sleep 30\n").unwrap();
    }
    std::fs::write(dir.path().join("killNode_1.sh"), "exit 0\n").unwrap();

    let base = serve(dir.path()).await;
    let client = reqwest::Client::new();

    let started = client
        .post(format!("{base}/start/1"))
        .json(&payload(1))
        .send()
        .await
        .unwrap();
    assert_eq!(started.status(), 200);
    let started: Value = started.json().await.unwrap();
    let worker_pid = started["worker"]["pid"].clone();
    assert!(worker_pid.is_u64());

    let config: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("config1.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(config["rival"], json!(["A", "B", "C"]));

    let status: Value = client
        .get(format!("{base}/status/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["workerRunning"], true);
    assert_eq!(status["companionRunning"], true);
    assert_eq!(status["workerPid"], worker_pid);

    let stopped = client.post(format!("{base}/stop/1")).send().await.unwrap();
    assert_eq!(stopped.status(), 200);
    let stopped: Value = stopped.json().await.unwrap();
    assert_eq!(stopped["workerPid"], worker_pid);
    assert!(stopped.get("warning").is_none());
}

#[tokio::test]
async fn missing_worker_script_is_404() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test_3.js"), "exec sleep 30\n").unwrap();
    let base = serve(dir.path()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/start/3"))
        .json(&payload(3))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert!(body["companion"]["pid"].is_u64());
    assert!(
        body["failures"][0]["script"]
            .as_str()
            .unwrap()
            .ends_with("galaxy_3.js")
    );

    // Missing cleanup script only produces a warning.
    let stopped = client.post(format!("{base}/stop/3")).send().await.unwrap();
    assert_eq!(stopped.status(), 200);
}

#[tokio::test]
async fn out_of_range_slot_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(dir.path()).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/update/4"))
        .json(&payload(4))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(!dir.path().join("config4.json").exists());
}
