use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{
    ApplicantDetails, Application, NewApplication, OrderTicket, PaymentStatus, ValidationError,
    VerificationRequest,
};
use super::gateway::{GatewayError, PaymentGateway, APPLICATION_FEE};
use super::repository::{ApplicationRepository, RepositoryError};
use super::storage::{has_allowed_extension, sanitize_filename, FileStoreError, ResumeStore};

/// Orchestrates one intake attempt: order creation, resume upload, and the
/// verify-then-commit step. The repository insert in
/// [`IntakeService::verify_payment`] is the only write to the database.
pub struct IntakeService<R, G> {
    repository: Arc<R>,
    gateway: Arc<G>,
    resumes: Arc<ResumeStore>,
}

impl<R, G> IntakeService<R, G>
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(repository: Arc<R>, gateway: Arc<G>, resumes: Arc<ResumeStore>) -> Self {
        Self {
            repository,
            gateway,
            resumes,
        }
    }

    pub fn resumes(&self) -> &ResumeStore {
        &self.resumes
    }

    /// Validate the form fields and open a fixed-amount order. Nothing is
    /// persisted here.
    pub async fn create_order(
        &self,
        details: &ApplicantDetails,
    ) -> Result<OrderTicket, IntakeError> {
        details.validate()?;

        let order = self
            .gateway
            .create_order(APPLICATION_FEE.amount_minor_units, APPLICATION_FEE.currency)
            .await?;

        info!(
            order_id = %order.order_id,
            amount = order.amount,
            currency = %order.currency,
            "payment order created"
        );

        Ok(OrderTicket {
            order_id: order.order_id,
            amount: order.amount,
            currency: order.currency,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Store a resume and return the generated filename.
    pub async fn upload_resume(
        &self,
        bytes: Vec<u8>,
        declared_filename: String,
    ) -> Result<String, IntakeError> {
        let resumes = Arc::clone(&self.resumes);
        blocking(move || Ok(resumes.upload(&bytes, &declared_filename)?)).await
    }

    /// Verify the payment proof, re-check the claimed resume, and commit the
    /// application. Any failing gate aborts before the insert.
    pub async fn verify_payment(
        &self,
        request: VerificationRequest,
    ) -> Result<Application, IntakeError> {
        let VerificationRequest {
            proof,
            details,
            resume_filename,
        } = request;

        if let Err(err) = self.gateway.verify(&proof).await {
            warn!(order_id = %proof.order_id, reason = %err, "payment verification declined");
            return Err(IntakeError::SignatureInvalid);
        }

        details.validate()?;
        let resume_filename = self.checked_resume(&resume_filename)?;

        let repository = Arc::clone(&self.repository);
        let new_application = NewApplication {
            details,
            resume_filename,
            payment_id: Some(proof.payment_id),
            payment_status: PaymentStatus::Success,
        };
        let application = blocking(move || Ok(repository.insert(new_application)?)).await?;

        info!(
            application_id = %application.id,
            payment_id = application.payment_id.as_deref().unwrap_or_default(),
            "application committed"
        );
        Ok(application)
    }

    /// Applications for the admin listing, newest first.
    pub async fn applications(&self) -> Result<Vec<Application>, IntakeError> {
        let repository = Arc::clone(&self.repository);
        blocking(move || Ok(repository.list_recent()?)).await
    }

    /// Absolute path of a stored resume for download.
    pub fn resume_path(&self, filename: &str) -> Result<PathBuf, IntakeError> {
        Ok(self.resumes.resolve(filename)?)
    }

    fn checked_resume(&self, claimed: &str) -> Result<String, IntakeError> {
        if claimed.is_empty() {
            return Err(ValidationError::ResumeFilenameRequired.into());
        }

        let sanitized = sanitize_filename(claimed);
        if sanitized.is_empty() || !has_allowed_extension(&sanitized) {
            return Err(ValidationError::InvalidResumeFilename.into());
        }

        match self.resumes.resolve(&sanitized) {
            Ok(_) => Ok(sanitized),
            Err(FileStoreError::NotFound | FileStoreError::InvalidPath) => {
                Err(ValidationError::ResumeNotFound.into())
            }
            Err(other) => Err(other.into()),
        }
    }
}

/// Error raised by the intake workflow.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Payment verification failed")]
    SignatureInvalid,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Storage(#[from] FileStoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("page rendering failed: {0}")]
    Render(String),
    #[error("background task failed: {0}")]
    Worker(String),
}

/// Run file system or SQLite work on the blocking pool.
async fn blocking<T, F>(task: F) -> Result<T, IntakeError>
where
    F: FnOnce() -> Result<T, IntakeError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| IntakeError::Worker(err.to_string()))?
}
