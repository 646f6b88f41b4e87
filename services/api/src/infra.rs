use job_intake::config::{AppConfig, DatabaseConfig};
use job_intake::error::AppError;
use job_intake::intake::{
    IntakeService, RazorpayGateway, ResumeStore, SqliteApplicationRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type LiveIntakeService = IntakeService<SqliteApplicationRepository, RazorpayGateway>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn open_repository(
    config: &DatabaseConfig,
) -> Result<SqliteApplicationRepository, AppError> {
    let repository = SqliteApplicationRepository::open(&config.path)?;
    info!(path = %config.path.display(), "application database opened");
    Ok(repository)
}

/// Wires the SQLite repository, the resume directory, and the Razorpay
/// adapter into a service. Missing gateway credentials only produce a warning;
/// the affected requests fail individually.
pub(crate) fn build_intake_service(config: &AppConfig) -> Result<Arc<LiveIntakeService>, AppError> {
    let resumes = ResumeStore::from_config(&config.storage);
    resumes.ensure_root()?;

    let repository = open_repository(&config.database)?;

    if !config.payment.has_credentials() {
        warn!("RAZORPAY_KEY_ID or RAZORPAY_KEY_SECRET is empty; payments will be declined");
    }
    let gateway = RazorpayGateway::new(&config.payment);

    Ok(Arc::new(IntakeService::new(
        Arc::new(repository),
        Arc::new(gateway),
        Arc::new(resumes),
    )))
}
