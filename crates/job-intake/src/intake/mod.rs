//! Job application intake.
//!
//! An attempt runs in three phases: the applicant's details are validated and
//! a fixed-amount order is opened with the payment gateway, the resume is
//! uploaded to the [`ResumeStore`], and the payment proof is verified before
//! the application row is committed. Only the final phase writes to the
//! database, and only after every gate has passed.

pub mod domain;
pub mod gateway;
pub mod pages;
pub mod repository;
pub mod router;
pub mod service;
pub mod storage;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantDetails, Application, ApplicationId, NewApplication, OrderTicket, PaymentProof,
    PaymentStatus, RequiredField, ValidationError, VerificationRequest,
};
pub use gateway::{
    payment_signature, ApplicationFee, GatewayError, GatewayOrder, PaymentGateway,
    RazorpayGateway, APPLICATION_FEE,
};
pub use repository::{ApplicationRepository, RepositoryError, SqliteApplicationRepository};
pub use router::intake_router;
pub use service::{IntakeError, IntakeService};
pub use storage::{
    has_allowed_extension, sanitize_filename, FileStoreError, ResumeStore, ALLOWED_EXTENSIONS,
};
