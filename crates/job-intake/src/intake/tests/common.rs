use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tempfile::TempDir;

use crate::intake::domain::{
    ApplicantDetails, Application, ApplicationId, NewApplication, PaymentProof,
    VerificationRequest,
};
use crate::intake::gateway::{payment_signature, GatewayError, GatewayOrder, PaymentGateway};
use crate::intake::repository::{ApplicationRepository, RepositoryError};
use crate::intake::service::IntakeService;
use crate::intake::storage::ResumeStore;

pub(super) const KEY_ID: &str = "rzp_test_1DP5mmOlF5G5ag";
pub(super) const KEY_SECRET: &str = "thisisasecret";
pub(super) const UPLOAD_LIMIT: usize = 2 * 1024 * 1024;

pub(super) fn details() -> ApplicantDetails {
    ApplicantDetails {
        full_name: "Asha Verma".to_string(),
        email: "asha.verma@example.com".to_string(),
        phone: "+91 98765 43210".to_string(),
        gender: "female".to_string(),
        dob: "1994-03-18".to_string(),
        bio: "Backend engineer with five years of payments experience.".to_string(),
    }
}

pub(super) fn upload_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .expect("valid upload time")
}

pub(super) fn signed_proof(order_id: &str, payment_id: &str) -> PaymentProof {
    PaymentProof {
        order_id: order_id.to_string(),
        payment_id: payment_id.to_string(),
        signature: payment_signature(KEY_SECRET, order_id, payment_id),
    }
}

pub(super) fn verification(resume_filename: &str) -> VerificationRequest {
    VerificationRequest {
        proof: signed_proof("order_test_1", "pay_test_1"),
        details: details(),
        resume_filename: resume_filename.to_string(),
    }
}

/// Gateway double that signs with [`KEY_SECRET`] the way the provider does.
#[derive(Default)]
pub(super) struct MockGateway {
    orders: Mutex<Vec<(u64, String)>>,
    unreachable: bool,
}

impl MockGateway {
    pub(super) fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub(super) fn orders(&self) -> Vec<(u64, String)> {
        self.orders.lock().expect("orders mutex poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn key_id(&self) -> &str {
        KEY_ID
    }

    async fn create_order(
        &self,
        amount_minor_units: u64,
        currency: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        if self.unreachable {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        let mut orders = self.orders.lock().expect("orders mutex poisoned");
        orders.push((amount_minor_units, currency.to_string()));
        Ok(GatewayOrder {
            order_id: format!("order_test_{}", orders.len()),
            amount: amount_minor_units,
            currency: currency.to_string(),
        })
    }

    async fn verify(&self, proof: &PaymentProof) -> Result<(), GatewayError> {
        if self.unreachable {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        let expected = payment_signature(KEY_SECRET, &proof.order_id, &proof.payment_id);
        if expected == proof.signature {
            Ok(())
        } else {
            Err(GatewayError::SignatureMismatch)
        }
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    rows: Mutex<Vec<Application>>,
}

impl MemoryRepository {
    pub(super) fn rows(&self) -> Vec<Application> {
        self.rows.lock().expect("repository mutex poisoned").clone()
    }
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        let mut rows = self.rows.lock().expect("repository mutex poisoned");
        let stored = Application {
            id: ApplicationId(rows.len() as i64 + 1),
            details: application.details,
            resume_filename: application.resume_filename,
            payment_id: application.payment_id,
            payment_status: application.payment_status,
            created_at: Utc::now(),
        };
        rows.push(stored.clone());
        Ok(stored)
    }

    fn list_recent(&self) -> Result<Vec<Application>, RepositoryError> {
        let mut rows = self.rows();
        rows.reverse();
        Ok(rows)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: NewApplication) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_recent(&self) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn resume_store(dir: &TempDir) -> Arc<ResumeStore> {
    Arc::new(ResumeStore::new(dir.path().join("uploads"), UPLOAD_LIMIT))
}

pub(super) struct Harness {
    pub(super) service: Arc<IntakeService<MemoryRepository, MockGateway>>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) gateway: Arc<MockGateway>,
    pub(super) store: Arc<ResumeStore>,
    _dir: TempDir,
}

pub(super) fn harness() -> Harness {
    harness_with(MockGateway::default(), UPLOAD_LIMIT)
}

pub(super) fn harness_with(gateway: MockGateway, upload_limit: usize) -> Harness {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(ResumeStore::new(dir.path().join("uploads"), upload_limit));
    let repository = Arc::new(MemoryRepository::default());
    let gateway = Arc::new(gateway);
    let service = Arc::new(IntakeService::new(
        repository.clone(),
        gateway.clone(),
        store.clone(),
    ));

    Harness {
        service,
        repository,
        gateway,
        store,
        _dir: dir,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

pub(super) const BOUNDARY: &str = "intake-test-boundary";

/// Multipart body with a single file part.
pub(super) fn multipart_body(field: &str, filename: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn multipart_value_body(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    )
    .into_bytes()
}

pub(super) fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}
