use askama::Template;

use super::domain::Application;
use super::gateway::ApplicationFee;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub fee_display: String,
    pub currency: &'static str,
}

impl IndexPage {
    pub fn new(fee: ApplicationFee) -> Self {
        let major = fee.amount_minor_units / 100;
        let minor = fee.amount_minor_units % 100;
        Self {
            fee_display: format!("{major}.{minor:02}"),
            currency: fee.currency,
        }
    }
}

#[derive(Template)]
#[template(path = "success.html")]
pub struct SuccessPage;

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminPage {
    pub rows: Vec<AdminRow>,
}

/// Display-ready copy of an application row.
pub struct AdminRow {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub dob: String,
    pub bio: String,
    pub resume_filename: String,
    pub payment_id: String,
    pub payment_status: &'static str,
    pub created_at: String,
}

impl From<Application> for AdminRow {
    fn from(application: Application) -> Self {
        Self {
            id: application.id.0,
            full_name: application.details.full_name,
            email: application.details.email,
            phone: application.details.phone,
            gender: application.details.gender,
            dob: application.details.dob,
            bio: application.details.bio,
            resume_filename: application.resume_filename,
            payment_id: application.payment_id.unwrap_or_default(),
            payment_status: application.payment_status.label(),
            created_at: application.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl AdminPage {
    pub fn new(applications: Vec<Application>) -> Self {
        Self {
            rows: applications.into_iter().map(AdminRow::from).collect(),
        }
    }
}
