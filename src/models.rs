use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One normalized job posting, keyed by the vendor's job id in a `JobMap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub posted: NaiveDate,
    pub apply_url: String,
}

/// Job id -> record. Later inserts for the same id overwrite.
pub type JobMap = HashMap<String, JobRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Get,
    Post,
}

impl SearchKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Some(SearchKind::Get),
            "POST" => Some(SearchKind::Post),
            _ => None,
        }
    }
}

/// Everything the run loop knows about one monitored company, assembled
/// from the CSV tables at startup. `known_jobs` is the only field written
/// back at the end of a run.
#[derive(Debug, Clone)]
pub struct CompanyConfig {
    pub id: String,
    pub name: String,
    pub portal: String,
    pub keywords: Vec<String>,
    pub search_url: String,
    pub search_kind: SearchKind,
    /// POST body template (keyword and paging offset get injected per request).
    pub search_body: Option<Value>,
    /// Static HTTP headers sent with every request for this company.
    pub extra_headers: Option<Value>,
    pub known_jobs: Vec<String>,
    pub enabled: bool,
}

/// What happened when one company was checked. A failure still carries
/// whatever was accumulated before the failing keyword so those records
/// are not lost for the run.
#[derive(Debug)]
pub enum CompanyOutcome {
    Checked(JobMap),
    Failed { reason: String, partial: JobMap },
}

impl CompanyOutcome {
    pub fn records(&self) -> &JobMap {
        match self {
            CompanyOutcome::Checked(jobs) => jobs,
            CompanyOutcome::Failed { partial, .. } => partial,
        }
    }
}
