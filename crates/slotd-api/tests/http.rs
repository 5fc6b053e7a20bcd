#![cfg(feature = "http")]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use slotd_api::{ApiError, ApiHandler, HttpApi};
use slotd_core::ConfigError;
use slotd_model::{
    FailureKind, LaunchFailure, RawFields, Role, RoleOutcome, SlotId, SlotStatus, StartReport,
    StopReport,
};

const SLOTS: u32 = 5;

/// Scripted handler: slot 3 lacks its worker script, slot 2's cleanup warns,
/// and a payload without `RC{slot}` is a config error.
#[derive(Default)]
struct FakeHandler {
    calls: Mutex<Vec<String>>,
}

impl FakeHandler {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(slot: SlotId, fields: &RawFields) -> Result<(), ApiError> {
        if slot.get() == 0 || slot.get() > SLOTS {
            return Err(ApiError::InvalidSlot(format!("{slot}")));
        }
        let rc = format!("RC{slot}");
        if !fields.contains_key(&rc) {
            return Err(ConfigError::MissingField(rc).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ApiHandler for FakeHandler {
    async fn start_slot(&self, slot: SlotId, fields: RawFields) -> Result<StartReport, ApiError> {
        Self::check(slot, &fields)?;
        self.record(format!("start {slot}"));

        let mut report = StartReport::new(slot);
        report.companion = Some(RoleOutcome {
            pid: 100 + slot.get(),
            spawned: true,
        });
        if slot.get() == 3 {
            report.failures.push(LaunchFailure {
                role: Role::Worker,
                kind: FailureKind::ScriptNotFound,
                message: "worker script not found: galaxy_3.js".into(),
                script: Some("galaxy_3.js".into()),
            });
        } else {
            report.worker = Some(RoleOutcome {
                pid: 200 + slot.get(),
                spawned: true,
            });
        }
        Ok(report)
    }

    async fn update_slot(&self, slot: SlotId, fields: RawFields) -> Result<(), ApiError> {
        Self::check(slot, &fields)?;
        self.record(format!("update {slot}"));
        Ok(())
    }

    async fn stop_slot(&self, slot: SlotId) -> Result<StopReport, ApiError> {
        Self::check(slot, &RawFields::from([(format!("RC{slot}"), json!(""))]))?;
        self.record(format!("stop {slot}"));

        let mut report = StopReport::new(slot);
        report.worker_pid = Some(200 + slot.get());
        if slot.get() == 2 {
            report.warning = Some("permission denied".into());
        }
        Ok(report)
    }

    async fn slot_status(&self, slot: SlotId) -> Result<SlotStatus, ApiError> {
        Self::check(slot, &RawFields::from([(format!("RC{slot}"), json!(""))]))?;
        Ok(SlotStatus::new(slot, Some(200 + slot.get()), None))
    }

    async fn all_status(&self) -> Result<Vec<SlotStatus>, ApiError> {
        Ok((1..=SLOTS)
            .map(|n| SlotStatus::new(SlotId::new(n), None, None))
            .collect())
    }
}

async fn serve(handler: Arc<FakeHandler>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = HttpApi::new(handler).router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn payload(slot: u32) -> Value {
    let fields = [
        ("RC", "rc"),
        ("AttackTime", "1500"),
        ("DefenceTime", "1200"),
        ("PlanetName", "Kepler"),
        ("IntervalTime", "100"),
        ("Rival", "A,B"),
    ];
    fields
        .into_iter()
        .map(|(name, value)| (format!("{name}{slot}"), json!(value)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

#[tokio::test]
async fn start_returns_process_ids() {
    let handler = Arc::new(FakeHandler::default());
    let base = serve(Arc::clone(&handler)).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/start/1"))
        .json(&payload(1))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["slot"], 1);
    assert_eq!(body["worker"]["pid"], 201);
    assert_eq!(body["companion"]["pid"], 101);
    assert!(body["message"].as_str().unwrap().contains("started"));
    assert!(body.get("failures").is_none());
    assert_eq!(handler.calls(), vec!["start 1"]);
}

#[tokio::test]
async fn missing_script_is_not_found_with_partial_report() {
    let base = serve(Arc::new(FakeHandler::default())).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/start/3"))
        .json(&payload(3))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["companion"]["pid"], 103);
    assert!(body["worker"].is_null());
    assert_eq!(body["failures"][0]["kind"], "scriptNotFound");
    assert_eq!(body["failures"][0]["script"], "galaxy_3.js");
}

#[tokio::test]
async fn config_error_names_the_field() {
    let handler = Arc::new(FakeHandler::default());
    let base = serve(Arc::clone(&handler)).await;

    let mut bad = payload(2);
    bad.as_object_mut().unwrap().remove("RC2");
    for route in ["start", "update"] {
        let resp = reqwest::Client::new()
            .post(format!("{base}/{route}/2"))
            .json(&bad)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 500, "{route}");

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["field"], "RC2");
        assert!(body["error"].as_str().unwrap().contains("RC2"));
    }
    assert!(handler.calls().is_empty());
}

#[tokio::test]
async fn invalid_slot_is_bad_request() {
    let base = serve(Arc::new(FakeHandler::default())).await;
    let client = reqwest::Client::new();

    let out_of_range = client
        .post(format!("{base}/start/9"))
        .json(&payload(9))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_range.status(), 400);

    let not_a_number = client
        .post(format!("{base}/stop/first"))
        .send()
        .await
        .unwrap();
    assert_eq!(not_a_number.status(), 400);

    let status = client.get(format!("{base}/status/0")).send().await.unwrap();
    assert_eq!(status.status(), 400);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let handler = Arc::new(FakeHandler::default());
    let base = serve(Arc::clone(&handler)).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/start/1"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(handler.calls().is_empty());
}

#[tokio::test]
async fn update_acknowledges_slot() {
    let handler = Arc::new(FakeHandler::default());
    let base = serve(Arc::clone(&handler)).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/update/4"))
        .json(&payload(4))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["slot"], 4);
    assert_eq!(handler.calls(), vec!["update 4"]);
}

#[tokio::test]
async fn stop_is_ok_even_with_cleanup_warning() {
    let base = serve(Arc::new(FakeHandler::default())).await;
    let client = reqwest::Client::new();

    let clean: Value = client
        .post(format!("{base}/stop/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(clean["workerPid"], 201);
    assert!(clean.get("warning").is_none());

    let resp = client.post(format!("{base}/stop/2")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let warned: Value = resp.json().await.unwrap();
    assert_eq!(warned["warning"], "permission denied");
}

#[tokio::test]
async fn status_routes() {
    let base = serve(Arc::new(FakeHandler::default())).await;
    let client = reqwest::Client::new();

    let all: Value = client
        .get(format!("{base}/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let slots = all.as_array().unwrap();
    assert_eq!(slots.len(), SLOTS as usize);
    assert_eq!(slots[0]["workerRunning"], false);
    assert_eq!(slots[0]["phase"], "idle");

    let one: Value = client
        .get(format!("{base}/status/2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(one["workerRunning"], true);
    assert_eq!(one["workerPid"], 202);
    assert_eq!(one["companionRunning"], false);
    assert!(one["companionPid"].is_null());
    assert_eq!(one["phase"], "degraded");
}

#[tokio::test]
async fn health_and_cors() {
    let base = serve(Arc::new(FakeHandler::default())).await;

    let resp = reqwest::Client::new()
        .get(format!("{base}/health"))
        .header("origin", "http://ui.example")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
