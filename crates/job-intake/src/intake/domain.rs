use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Auto-assigned identifier of a persisted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub i64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The applicant-supplied form fields. Missing JSON keys deserialize to empty
/// strings so that presence checks report the field by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDetails {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub bio: String,
}

impl ApplicantDetails {
    pub fn value(&self, field: RequiredField) -> &str {
        match field {
            RequiredField::FullName => &self.full_name,
            RequiredField::Email => &self.email,
            RequiredField::Phone => &self.phone,
            RequiredField::Gender => &self.gender,
            RequiredField::Dob => &self.dob,
            RequiredField::Bio => &self.bio,
        }
    }

    /// First required field that is empty, in form order.
    pub fn first_missing(&self) -> Option<RequiredField> {
        RequiredField::ALL
            .into_iter()
            .find(|field| self.value(*field).is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.first_missing() {
            Some(field) => Err(ValidationError::MissingField(field)),
            None => Ok(()),
        }
    }
}

/// Fields that must be present before an order is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    FullName,
    Email,
    Phone,
    Gender,
    Dob,
    Bio,
}

impl RequiredField {
    pub const ALL: [RequiredField; 6] = [
        RequiredField::FullName,
        RequiredField::Email,
        RequiredField::Phone,
        RequiredField::Gender,
        RequiredField::Dob,
        RequiredField::Bio,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            RequiredField::FullName => "full_name",
            RequiredField::Email => "email",
            RequiredField::Phone => "phone",
            RequiredField::Gender => "gender",
            RequiredField::Dob => "dob",
            RequiredField::Bio => "bio",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input rejected before any side effect happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(RequiredField),
    #[error("Resume filename is required")]
    ResumeFilenameRequired,
    #[error("Invalid resume filename")]
    InvalidResumeFilename,
    #[error("Resume file not found")]
    ResumeNotFound,
}

/// Payment state stored with each application. Only `Success` is ever
/// written; `Pending` exists because the table default allows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(PaymentStatus::Pending),
            "success" => Some(PaymentStatus::Success),
            _ => None,
        }
    }
}

/// Proof of payment returned by the gateway's client widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    #[serde(rename = "razorpay_order_id", default)]
    pub order_id: String,
    #[serde(rename = "razorpay_payment_id", default)]
    pub payment_id: String,
    #[serde(rename = "razorpay_signature", default)]
    pub signature: String,
}

/// Everything the client sends to finish an intake attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    #[serde(flatten)]
    pub proof: PaymentProof,
    #[serde(flatten)]
    pub details: ApplicantDetails,
    #[serde(default)]
    pub resume_filename: String,
}

/// Result of order creation handed back to the browser so it can open the
/// gateway's checkout widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTicket {
    pub order_id: String,
    pub amount: u64,
    pub currency: String,
    pub key_id: String,
}

/// Row to be written once payment is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub details: ApplicantDetails,
    pub resume_filename: String,
    pub payment_id: Option<String>,
    pub payment_status: PaymentStatus,
}

/// A persisted application. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub id: ApplicationId,
    #[serde(flatten)]
    pub details: ApplicantDetails,
    pub resume_filename: String,
    pub payment_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}
