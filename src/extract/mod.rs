pub mod apple;
pub mod greenhouse;
pub mod json_apis;
pub mod lever;
pub mod paginate;
pub mod workday;

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

use crate::fetch::{self, HttpClient, PageResponse};
use crate::filter::TitleFilter;
use crate::models::{CompanyConfig, CompanyOutcome, JobMap, SearchKind};

/// Everything an adapter may need beyond the page itself: the keyword it
/// is matching, the request that produced the page (for vendors that
/// paginate by re-issuing it), and the shared client/filter.
pub struct ExtractContext<'a> {
    pub keyword: &'a str,
    /// URL that produced the first page, keyword already substituted.
    pub search_url: &'a str,
    /// POST body that produced the first page, when the vendor POSTs.
    pub body: Option<&'a Value>,
    /// Static per-company HTTP headers.
    pub headers: Option<&'a Value>,
    pub client: &'a HttpClient,
    pub filter: &'a TitleFilter,
    pub today: NaiveDate,
}

/// One career-page backend. Implementations turn a raw page response into
/// normalized job records, fetching follow-up pages themselves where the
/// vendor paginates.
pub trait Extractor {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap>;
}

/// Company name -> adapter. Closed table built at startup; companies
/// without an entry produce no records.
pub struct Registry {
    table: HashMap<String, Box<dyn Extractor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn register(&mut self, company: &str, extractor: Box<dyn Extractor>) {
        self.table.insert(company.to_string(), extractor);
    }

    pub fn get(&self, company: &str) -> Option<&dyn Extractor> {
        self.table.get(company).map(|e| e.as_ref())
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("Amazon", Box::new(json_apis::Amazon));
        registry.register("Netflix", Box::new(json_apis::Netflix));
        registry.register("IBM", Box::new(json_apis::Ibm));
        registry.register("Oracle", Box::new(json_apis::Oracle));
        registry.register("Tencent", Box::new(json_apis::Tencent));
        registry.register("JaneStreet", Box::new(json_apis::JaneStreet));
        registry.register("Microsoft", Box::new(json_apis::Microsoft));
        registry.register("Disney", Box::new(json_apis::Disney));
        registry.register("Apple", Box::new(apple::Apple));
        registry.register("DeepMind", Box::new(greenhouse::GreenhouseApi));
        registry.register(
            "Stripe",
            Box::new(greenhouse::GreenhouseBoard::new("https://boards.greenhouse.io")),
        );
        registry.register(
            "Databricks",
            Box::new(greenhouse::GreenhouseBoard::new("https://boards.greenhouse.io")),
        );
        registry.register("Palantir", Box::new(lever::LeverBoard));
        registry.register("Plaid", Box::new(lever::LeverBoard));
        // The Workday boards share one implementation; only the apply-link
        // base differs per tenant.
        registry.register(
            "Adobe",
            Box::new(workday::WorkdayBoard::new(
                "https://adobe.wd5.myworkdayjobs.com/en-US/external_experienced",
            )),
        );
        registry.register(
            "Salesforce",
            Box::new(workday::WorkdayBoard::new(
                "https://salesforce.wd12.myworkdayjobs.com/en-US/External_Career_Site",
            )),
        );
        registry.register(
            "Nvidia",
            Box::new(workday::WorkdayBoard::new(
                "https://nvidia.wd5.myworkdayjobs.com/en-US/NVIDIAExternalCareerSite",
            )),
        );
        registry.register(
            "Qualcomm",
            Box::new(workday::WorkdayBoard::new(
                "https://qualcomm.wd5.myworkdayjobs.com/en-US/External",
            )),
        );
        registry.register(
            "AstraZeneca",
            Box::new(workday::WorkdayBoard::new(
                "https://astrazeneca.wd3.myworkdayjobs.com/en-US/Careers",
            )),
        );
        registry.register(
            "BankOfAmerica",
            Box::new(workday::WorkdayBoard::new(
                "https://ghr.wd1.myworkdayjobs.com/en-US/Lateral-US",
            )),
        );
        registry.register(
            "ABCFinancialServices",
            Box::new(workday::WorkdayBoard::new(
                "https://abcfinancial.wd5.myworkdayjobs.com/en-US/ABCFinancialServices",
            )),
        );
        registry.register(
            "ActivisionBlizzard",
            Box::new(workday::WorkdayBoard::new(
                "https://activision.wd1.myworkdayjobs.com/External",
            )),
        );
        registry
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Run every configured keyword for one company through its adapter,
/// merging per-keyword results. A fetch or decode failure aborts the
/// remaining keywords but keeps what was already collected.
pub fn check_company(
    registry: &Registry,
    company: &CompanyConfig,
    client: &HttpClient,
    filter: &TitleFilter,
    today: NaiveDate,
) -> CompanyOutcome {
    let mut relevant = JobMap::new();
    let Some(extractor) = registry.get(&company.name) else {
        return CompanyOutcome::Checked(relevant);
    };
    for keyword in &company.keywords {
        info!(
            "Fetching data from {} for keyword: {} ...",
            company.name, keyword
        );
        let (url, body) = match company.search_kind {
            SearchKind::Get => (fetch::keyword_url(&company.search_url, keyword), None),
            SearchKind::Post => (
                company.search_url.clone(),
                Some(fetch::body_with_keyword(
                    company.search_body.as_ref(),
                    &company.portal,
                    keyword,
                )),
            ),
        };
        let fetched = match &body {
            Some(body) => client.post_json(&url, body, company.extra_headers.as_ref()),
            None => client.get(&url, company.extra_headers.as_ref()),
        };
        let page = match fetched {
            Ok(Some(page)) => page,
            // Empty answer: stop this company, keep what we have.
            Ok(None) => return CompanyOutcome::Checked(relevant),
            Err(err) => {
                return CompanyOutcome::Failed {
                    reason: format!("{err:#}"),
                    partial: relevant,
                };
            }
        };
        let ctx = ExtractContext {
            keyword,
            search_url: &url,
            body: body.as_ref(),
            headers: company.extra_headers.as_ref(),
            client,
            filter,
            today,
        };
        match extractor.extract(&page, &ctx) {
            Ok(jobs) => relevant.extend(jobs),
            Err(err) => {
                return CompanyOutcome::Failed {
                    reason: format!("{err:#}"),
                    partial: relevant,
                };
            }
        }
    }
    CompanyOutcome::Checked(relevant)
}

pub(crate) fn expect_json(page: &PageResponse) -> Result<&Value> {
    page.as_json()
        .ok_or_else(|| anyhow::anyhow!("expected a JSON response, got HTML"))
}

/// Vendors disagree about whether ids are JSON strings or numbers.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse an RFC3339-with-offset timestamp ("2024-03-12T08:00:00+00:00")
/// down to its calendar date.
pub(crate) fn offset_date(s: &str) -> Option<NaiveDate> {
    chrono::DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z")
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    pub fn context<'a>(
        keyword: &'a str,
        client: &'a HttpClient,
        filter: &'a TitleFilter,
        today: NaiveDate,
    ) -> ExtractContext<'a> {
        ExtractContext {
            keyword,
            search_url: "https://careers.example.test/search?q={}",
            body: None,
            headers: None,
            client,
            filter,
            today,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn company(name: &str) -> CompanyConfig {
        CompanyConfig {
            id: "1".to_string(),
            name: name.to_string(),
            portal: "Custom".to_string(),
            keywords: vec!["Software Engineer".to_string()],
            search_url: "https://careers.example.test/search?q={}".to_string(),
            search_kind: SearchKind::Get,
            search_body: None,
            extra_headers: None,
            known_jobs: vec![],
            enabled: true,
        }
    }

    #[test]
    fn test_unrecognized_company_yields_empty_without_requests() {
        let registry = Registry::builtin();
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let outcome = check_company(
            &registry,
            &company("NoSuchCompany"),
            &client,
            &filter,
            Local::now().date_naive(),
        );
        match outcome {
            CompanyOutcome::Checked(jobs) => assert!(jobs.is_empty()),
            CompanyOutcome::Failed { reason, .. } => {
                panic!("unknown company should not fail: {reason}")
            }
        }
    }

    #[test]
    fn test_builtin_registry_covers_the_workday_family() {
        let registry = Registry::builtin();
        for name in [
            "Adobe",
            "Salesforce",
            "Nvidia",
            "Qualcomm",
            "AstraZeneca",
            "BankOfAmerica",
            "ABCFinancialServices",
            "ActivisionBlizzard",
        ] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
        assert!(registry.get("HPE").is_none());
    }

    #[test]
    fn test_id_string_accepts_strings_and_numbers() {
        assert_eq!(
            id_string(&serde_json::json!("R-12345")),
            Some("R-12345".to_string())
        );
        assert_eq!(id_string(&serde_json::json!(98765)), Some("98765".to_string()));
        assert_eq!(id_string(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_offset_date_parses_both_offset_styles() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        assert_eq!(offset_date("2024-03-12T08:00:00+00:00"), Some(expected));
        assert_eq!(offset_date("2024-03-12T08:00:00+0000"), Some(expected));
        assert_eq!(offset_date("March 12, 2024"), None);
    }
}
