//! HTTP trigger tests.

#![cfg(feature = "server")]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tower::ServiceExt;

use trial_sweep::account::Account;
use trial_sweep::errors::{SweepError, SweepResult};
use trial_sweep::jobs::TrialSweep;
use trial_sweep::mailer::LogMailer;
use trial_sweep::notification::NotificationSettings;
use trial_sweep::server::{build_router, AppState};
use trial_sweep::store::{AccountStore, MemoryStore};

struct UnreachableStore;

#[async_trait]
impl AccountStore for UnreachableStore {
    async fn fetch_trial_accounts(
        &self,
        _after_id: Option<&str>,
        _limit: u32,
    ) -> SweepResult<Vec<Account>> {
        Err(SweepError::StoreError("relation \"accounts\" does not exist".to_string()))
    }

    async fn mark_expired(&self, _id: &str) -> SweepResult<bool> {
        Ok(false)
    }
}

fn app(store: Arc<dyn AccountStore>) -> axum::Router {
    let sweep = TrialSweep::new(store, Arc::new(LogMailer), NotificationSettings::default());
    build_router(AppState {
        sweep: Arc::new(sweep),
        db_type: "sqlite".to_string(),
    })
}

fn trial(id: &str, offset: Duration) -> Account {
    Account {
        id: id.to_string(),
        name: format!("Pharmacie {id}"),
        contact_name: None,
        email: format!("{id}@example.sn"),
        plan: "Starter".to_string(),
        status: "trial".to_string(),
        trial_end: Utc::now() + offset,
    }
}

async fn call(app: axum::Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn trigger_returns_summary() {
    let store = Arc::new(MemoryStore::with_accounts([
        // Half a day of slack so the handler's own clock read lands on the same day count.
        trial("remind", Duration::days(3) - Duration::hours(12)),
        trial("past", -Duration::days(4)),
        trial("later", Duration::days(20)),
    ]));

    let (status, body) = call(app(store.clone()), Method::POST, "/relance-trial").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["sent"], 1);
    assert_eq!(body["expired"], 1);
    assert_eq!(body["errors"], 0);
    assert!(body["ts"].as_str().unwrap().ends_with('Z'));
    assert_eq!(store.get("past").unwrap().status, "expired");
}

#[tokio::test]
async fn trigger_accepts_get() {
    let (status, body) = call(app(Arc::new(MemoryStore::new())), Method::GET, "/relance-trial").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], 0);
}

#[tokio::test]
async fn fetch_failure_returns_500_with_error() {
    let (status, body) = call(app(Arc::new(UnreachableStore)), Method::POST, "/relance-trial").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("does not exist"));
    assert!(body.get("ok").is_none());
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = call(app(Arc::new(MemoryStore::new())), Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db_type"], "sqlite");
}
