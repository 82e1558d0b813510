use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{CompanyConfig, SearchKind};

const COMPANY_DATA_CSV: &str = "company_data.csv";
const KEYWORDS_CSV: &str = "keywords.csv";
const SEARCH_API_CSV: &str = "search_api.csv";
const SEARCH_HEADERS_CSV: &str = "search_headers.csv";
const SEARCH_EXTRA_HEADERS_CSV: &str = "search_extra_headers.csv";
const COMPANY_STATUS_CSV: &str = "company_status.csv";
const KNOWN_JOBS_CSV: &str = "already_known_jobs.csv";

/// The configuration tables live as flat CSV files in one data directory.
/// Everything is loaded up front into `CompanyConfig`s; the only table ever
/// written back is the known-jobs list, rewritten in full.
pub struct ConfigStore {
    data_dir: PathBuf,
}

#[derive(Deserialize)]
struct CompanyRow {
    #[serde(rename = "CompanyID")]
    id: String,
    #[serde(rename = "CompanyName")]
    name: String,
    #[serde(rename = "CompanyPortal")]
    portal: String,
}

#[derive(Deserialize)]
struct KeywordsRow {
    #[serde(rename = "CompanyID")]
    id: String,
    #[serde(rename = "Keywords")]
    keywords: String,
}

#[derive(Deserialize)]
struct SearchApiRow {
    #[serde(rename = "CompanyID")]
    id: String,
    #[serde(rename = "SearchType")]
    search_type: String,
    #[serde(rename = "SearchAPI")]
    search_api: String,
}

#[derive(Deserialize)]
struct SearchHeaderRow {
    #[serde(rename = "CompanyID")]
    id: String,
    #[serde(rename = "SearchHeader")]
    header: String,
}

#[derive(Deserialize)]
struct SearchExtraHeaderRow {
    #[serde(rename = "CompanyID")]
    id: String,
    #[serde(rename = "SearchExtraHeader")]
    header: String,
}

#[derive(Deserialize)]
struct StatusRow {
    #[serde(rename = "CompanyID")]
    id: String,
    #[serde(rename = "MonitorStatus")]
    status: String,
}

#[derive(Deserialize)]
struct KnownJobsRow {
    #[serde(rename = "CompanyID")]
    id: String,
    #[serde(rename = "KnownJobs")]
    known_jobs: String,
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path, delimiter: u8) -> Result<Vec<T>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = ReaderBuilder::new().delimiter(delimiter).from_reader(file);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.with_context(|| format!("Malformed row in {}", path.display()))?);
    }
    Ok(rows)
}

/// "" stays empty; anything else must be a JSON object.
fn parse_json_column(raw: &str, path: &Path) -> Result<Option<Value>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(raw)
        .with_context(|| format!("Invalid JSON payload in {}", path.display()))?;
    Ok(Some(value))
}

fn split_piped(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split('|').map(|s| s.to_string()).collect()
}

impl ConfigStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn default_dir() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobwatch") {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from("data")
        }
    }

    /// Assemble one `CompanyConfig` per row of the company table, in table
    /// order. Every other table is keyed by CompanyID; a reference to an id
    /// the company table does not list is a configuration error.
    pub fn load_companies(&self) -> Result<Vec<CompanyConfig>> {
        let company_rows: Vec<CompanyRow> =
            read_rows(&self.data_dir.join(COMPANY_DATA_CSV), b',')?;
        let mut companies: Vec<CompanyConfig> = Vec::with_capacity(company_rows.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in company_rows {
            index.insert(row.id.clone(), companies.len());
            companies.push(CompanyConfig {
                id: row.id,
                name: row.name,
                portal: row.portal,
                keywords: Vec::new(),
                search_url: String::new(),
                search_kind: SearchKind::Get,
                search_body: None,
                extra_headers: None,
                known_jobs: Vec::new(),
                enabled: false,
            });
        }
        let lookup = |index: &HashMap<String, usize>, id: &str, table: &str| -> Result<usize> {
            index
                .get(id)
                .copied()
                .ok_or_else(|| anyhow!("{table} references unknown CompanyID '{id}'"))
        };

        for row in read_rows::<KeywordsRow>(&self.data_dir.join(KEYWORDS_CSV), b',')? {
            let i = lookup(&index, &row.id, KEYWORDS_CSV)?;
            companies[i].keywords = split_piped(&row.keywords);
        }
        for row in read_rows::<SearchApiRow>(&self.data_dir.join(SEARCH_API_CSV), b',')? {
            let i = lookup(&index, &row.id, SEARCH_API_CSV)?;
            companies[i].search_kind = SearchKind::parse(&row.search_type).ok_or_else(|| {
                anyhow!(
                    "{SEARCH_API_CSV}: unknown SearchType '{}' for CompanyID '{}'",
                    row.search_type,
                    row.id
                )
            })?;
            companies[i].search_url = row.search_api;
        }
        // The header tables hold JSON payloads with embedded commas, so they
        // are pipe-delimited.
        let headers_path = self.data_dir.join(SEARCH_HEADERS_CSV);
        for row in read_rows::<SearchHeaderRow>(&headers_path, b'|')? {
            let i = lookup(&index, &row.id, SEARCH_HEADERS_CSV)?;
            companies[i].search_body = parse_json_column(&row.header, &headers_path)?;
        }
        let extra_path = self.data_dir.join(SEARCH_EXTRA_HEADERS_CSV);
        for row in read_rows::<SearchExtraHeaderRow>(&extra_path, b'|')? {
            let i = lookup(&index, &row.id, SEARCH_EXTRA_HEADERS_CSV)?;
            companies[i].extra_headers = parse_json_column(&row.header, &extra_path)?;
        }
        for row in read_rows::<StatusRow>(&self.data_dir.join(COMPANY_STATUS_CSV), b',')? {
            let i = lookup(&index, &row.id, COMPANY_STATUS_CSV)?;
            companies[i].enabled = row.status == "Enabled";
        }
        for row in read_rows::<KnownJobsRow>(&self.data_dir.join(KNOWN_JOBS_CSV), b',')? {
            let i = lookup(&index, &row.id, KNOWN_JOBS_CSV)?;
            companies[i].known_jobs = split_piped(&row.known_jobs);
        }
        Ok(companies)
    }

    /// Rewrite the known-jobs table in full, one pipe-joined row per company.
    pub fn save_known_jobs(&self, companies: &[CompanyConfig]) -> Result<()> {
        let path = self.data_dir.join(KNOWN_JOBS_CSV);
        let file =
            File::create(&path).with_context(|| format!("Failed to write {}", path.display()))?;
        let mut writer = WriterBuilder::new().from_writer(file);
        writer.write_record(["CompanyID", "KnownJobs"])?;
        for company in companies {
            writer.write_record([company.id.as_str(), &company.known_jobs.join("|")])?;
        }
        writer.flush()?;
        info!("Updated the known jobs file.");
        Ok(())
    }
}
