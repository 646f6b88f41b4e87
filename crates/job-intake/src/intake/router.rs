use std::sync::Arc;

use askama::Template;
use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;
use tracing::error;

use super::domain::{ApplicantDetails, OrderTicket, VerificationRequest};
use super::gateway::{PaymentGateway, APPLICATION_FEE};
use super::pages::{AdminPage, IndexPage, SuccessPage};
use super::repository::ApplicationRepository;
use super::service::{IntakeError, IntakeService};
use super::storage::FileStoreError;

const RESUME_FIELD: &str = "resume";
const SUBMITTED_MESSAGE: &str = "Payment verified and application submitted";

/// Router exposing the intake form, the three workflow endpoints, and the
/// admin pages. Request bodies are capped at the resume size limit.
pub fn intake_router<R, G>(service: Arc<IntakeService<R, G>>) -> Router
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
{
    let body_limit = service.resumes().max_bytes();

    Router::new()
        .route("/", get(index_handler))
        .route("/create-order", post(create_order_handler::<R, G>))
        .route("/upload-resume", post(upload_resume_handler::<R, G>))
        .route("/verify-payment", post(verify_payment_handler::<R, G>))
        .route("/success", get(success_handler))
        .route("/admin", get(admin_handler::<R, G>))
        .route(
            "/download-resume/:filename",
            get(download_resume_handler::<R, G>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

impl IntakeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IntakeError::Validation(_)
            | IntakeError::SignatureInvalid
            | IntakeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            IntakeError::Storage(err) => match err {
                FileStoreError::NoFile
                | FileStoreError::NoFileSelected
                | FileStoreError::InvalidFileType => StatusCode::BAD_REQUEST,
                FileStoreError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                FileStoreError::InvalidPath => StatusCode::FORBIDDEN,
                FileStoreError::NotFound => StatusCode::NOT_FOUND,
                FileStoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            IntakeError::Gateway(_)
            | IntakeError::Repository(_)
            | IntakeError::Render(_)
            | IntakeError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "intake request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

fn render<T: Template>(page: T) -> Result<Html<String>, IntakeError> {
    page.render()
        .map(Html)
        .map_err(|err| IntakeError::Render(err.to_string()))
}

fn json_rejection(rejection: JsonRejection, limit: usize) -> IntakeError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FileStoreError::PayloadTooLarge { limit }.into()
    } else {
        IntakeError::BadRequest(rejection.body_text())
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> IntakeError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FileStoreError::PayloadTooLarge { limit }.into()
    } else {
        IntakeError::BadRequest(err.body_text())
    }
}

pub(crate) async fn index_handler() -> Result<Html<String>, IntakeError> {
    render(IndexPage::new(APPLICATION_FEE))
}

pub(crate) async fn success_handler() -> Result<Html<String>, IntakeError> {
    render(SuccessPage)
}

pub(crate) async fn create_order_handler<R, G>(
    State(service): State<Arc<IntakeService<R, G>>>,
    payload: Result<Json<ApplicantDetails>, JsonRejection>,
) -> Result<Json<OrderTicket>, IntakeError>
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
{
    let limit = service.resumes().max_bytes();
    let Json(details) = payload.map_err(|rejection| json_rejection(rejection, limit))?;
    let ticket = service.create_order(&details).await?;
    Ok(Json(ticket))
}

pub(crate) async fn upload_resume_handler<R, G>(
    State(service): State<Arc<IntakeService<R, G>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, IntakeError>
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
{
    let limit = service.resumes().max_bytes();
    let mut multipart =
        multipart.map_err(|rejection| IntakeError::BadRequest(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }

        // A resume part without a filename is a plain form value, not a file.
        let Some(declared_filename) = field.file_name().map(str::to_string) else {
            return Err(FileStoreError::NoFile.into());
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|err| multipart_error(err, limit))?;

        let filename = service
            .upload_resume(bytes.to_vec(), declared_filename)
            .await?;
        return Ok(Json(json!({ "success": true, "filename": filename })));
    }

    Err(FileStoreError::NoFile.into())
}

pub(crate) async fn verify_payment_handler<R, G>(
    State(service): State<Arc<IntakeService<R, G>>>,
    payload: Result<Json<VerificationRequest>, JsonRejection>,
) -> Result<Json<Value>, IntakeError>
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
{
    let limit = service.resumes().max_bytes();
    let Json(request) = payload.map_err(|rejection| json_rejection(rejection, limit))?;
    service.verify_payment(request).await?;
    Ok(Json(json!({ "success": true, "message": SUBMITTED_MESSAGE })))
}

pub(crate) async fn admin_handler<R, G>(
    State(service): State<Arc<IntakeService<R, G>>>,
) -> Result<Html<String>, IntakeError>
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
{
    let applications = service.applications().await?;
    render(AdminPage::new(applications))
}

pub(crate) async fn download_resume_handler<R, G>(
    State(service): State<Arc<IntakeService<R, G>>>,
    Path(filename): Path<String>,
) -> Result<Response, IntakeError>
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
{
    let path = service.resume_path(&filename)?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(FileStoreError::Io)?;

    let stored_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("resume")
        .to_string();
    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{stored_name}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
