use crate::infra::open_repository;
use clap::Args;
use job_intake::config::AppConfig;
use job_intake::error::AppError;
use job_intake::intake::{Application, ApplicationRepository};

#[derive(Args, Debug, Default)]
pub(crate) struct ListArgs {
    /// Only print the most recent N applications
    #[arg(long)]
    pub(crate) limit: Option<usize>,
}

pub(crate) fn run_list(args: ListArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let repository = open_repository(&config.database)?;
    let applications = repository.list_recent()?;

    for line in render_listing(&applications, args.limit) {
        println!("{line}");
    }
    Ok(())
}

fn render_listing(applications: &[Application], limit: Option<usize>) -> Vec<String> {
    let shown = limit.unwrap_or(applications.len()).min(applications.len());
    let mut lines = vec![format!(
        "Applications ({} total, newest first)",
        applications.len()
    )];

    if applications.is_empty() {
        lines.push("- none submitted yet".to_string());
        return lines;
    }

    for application in &applications[..shown] {
        let details = &application.details;
        lines.push(format!(
            "- #{} | {} | {} <{}> | {}",
            application.id,
            application.created_at.format("%Y-%m-%d %H:%M:%S"),
            details.full_name,
            details.email,
            details.phone
        ));
        lines.push(format!(
            "  resume {} | payment {} ({})",
            application.resume_filename,
            application.payment_status.label(),
            application.payment_id.as_deref().unwrap_or("-")
        ));
    }

    if shown < applications.len() {
        lines.push(format!("  ... {} more", applications.len() - shown));
    }
    lines
}
