use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::models::JobRecord;

pub const JOB_WEBHOOK_VAR: &str = "SLACK_JOB_WEBHOOK_URL";
pub const ERROR_WEBHOOK_VAR: &str = "SLACK_ERROR_WEBHOOK_URL";
pub const DEPLOY_WEBHOOK_VAR: &str = "SLACK_DEPLOY_WEBHOOK_URL";

const NOTIFY_TIMEOUT_SECS: u64 = 30;

/// Posts `{"text": ...}` payloads to the three Slack webhooks. In dry-run
/// mode every message is printed instead of delivered.
pub struct Notifier {
    client: reqwest::blocking::Client,
    job_webhook: Option<String>,
    error_webhook: Option<String>,
    deploy_webhook: Option<String>,
    dry_run: bool,
}

impl Notifier {
    pub fn from_env(dry_run: bool) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()
            .context("Failed to build notification HTTP client")?;
        Ok(Self {
            client,
            job_webhook: std::env::var(JOB_WEBHOOK_VAR).ok(),
            error_webhook: std::env::var(ERROR_WEBHOOK_VAR).ok(),
            deploy_webhook: std::env::var(DEPLOY_WEBHOOK_VAR).ok(),
            dry_run,
        })
    }

    pub fn job_found(&self, company: &str, job_id: &str, job: &JobRecord) -> Result<()> {
        let text = format!(
            "Company Name: *{company}*\nJob Id: *{job_id}*\nJob Title: *{title}*\nPosted Date: *{posted}*\nApply: <{apply}>\n----------\n",
            title = job.title,
            posted = job.posted.format("%m/%d/%Y"),
            apply = job.apply_url,
        );
        self.post(self.job_webhook.as_deref(), JOB_WEBHOOK_VAR, &text)
    }

    pub fn error(&self, message: &str) -> Result<()> {
        let text = format!("Error Message: ERROR - {message}");
        self.post(self.error_webhook.as_deref(), ERROR_WEBHOOK_VAR, &text)
    }

    pub fn deployment(&self, kind: &str, message: &str) -> Result<()> {
        let text = format!("Deployment Message: {kind} - {message}");
        self.post(self.deploy_webhook.as_deref(), DEPLOY_WEBHOOK_VAR, &text)
    }

    fn post(&self, webhook: Option<&str>, var: &str, text: &str) -> Result<()> {
        if self.dry_run {
            println!("[DRY RUN] {text}");
            return Ok(());
        }
        let webhook = webhook.ok_or_else(|| anyhow!("{var} is not set"))?;
        let resp = self
            .client
            .post(webhook)
            .json(&json!({ "text": text }))
            .send()
            .with_context(|| format!("Failed to deliver notification via {var}"))?;
        info!("Notification sent with response status code: {}", resp.status());
        Ok(())
    }
}
