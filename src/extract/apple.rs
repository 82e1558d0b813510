use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use scraper::{Html, Selector};
use serde_json::Value;

use super::{id_string, paginate, ExtractContext, Extractor};
use crate::fetch::PageResponse;
use crate::models::{JobMap, JobRecord};

const APPLE_PAGE_SIZE: u64 = 20;
const APPLE_PAGE_CAP: usize = 5;

/// jobs.apple.com serves HTML with the search state dumped into the first
/// `text/javascript` script as a `window.APP_STATE = {...};` assignment.
/// The JSON carries the record total, the page's results, and the search
/// URL that later `&page=N` requests are built from.
pub struct Apple;

struct ApplePage {
    jobs: JobMap,
    pages: usize,
    full_url: String,
}

/// Cut the JSON payload out of the `window.APP_STATE = {...};` assignment.
fn strip_app_state(script: &str) -> Option<&str> {
    let (_, rest) = script.split_once("window.APP_STATE")?;
    let (_, rest) = rest.split_once('=')?;
    Some(rest.trim().trim_end_matches(';'))
}

fn parse_app_state(html: &str) -> Result<Value> {
    let document = Html::parse_document(html);
    let script_sel = Selector::parse(r#"script[type="text/javascript"]"#)
        .map_err(|e| anyhow!("invalid script selector: {e:?}"))?;
    let script = document
        .select(&script_sel)
        .next()
        .ok_or_else(|| anyhow!("Apple page has no text/javascript script element"))?;
    let text = script.text().collect::<String>();
    let payload = strip_app_state(&text)
        .ok_or_else(|| anyhow!("Apple script did not contain a window.APP_STATE assignment"))?;
    serde_json::from_str(payload).map_err(|e| anyhow!("Apple APP_STATE was not valid JSON: {e}"))
}

impl Apple {
    fn page_jobs(html: &str, ctx: &ExtractContext<'_>) -> Result<ApplePage> {
        let state = parse_app_state(html)?;
        let total = state
            .get("totalRecords")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let full_url = state
            .get("fullUrl")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let available = state
            .get("searchResults")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Apple APP_STATE missing 'searchResults'"))?;
        let mut relevant = JobMap::new();
        for job in available {
            let Some(id) = job.get("positionId").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("postingTitle").and_then(Value::as_str) else {
                continue;
            };
            let Some(posted) = job
                .get("postingDate")
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%b %d, %Y").ok())
            else {
                continue;
            };
            let Some(slug) = job.get("transformedPostingTitle").and_then(Value::as_str) else {
                continue;
            };
            let Some(team) = job.pointer("/team/teamCode").and_then(Value::as_str) else {
                continue;
            };
            if ctx.filter.accepts(title, ctx.keyword, posted, ctx.today) {
                relevant.insert(
                    id.clone(),
                    JobRecord {
                        title: title.to_string(),
                        posted,
                        apply_url: format!(
                            "https://jobs.apple.com/en-us/details/{id}/{slug}?team={team}"
                        ),
                    },
                );
            }
        }
        Ok(ApplePage {
            jobs: relevant,
            pages: paginate::page_count(total, APPLE_PAGE_SIZE),
            full_url,
        })
    }
}

impl Extractor for Apple {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let html = page
            .as_html()
            .ok_or_else(|| anyhow!("expected an HTML response from Apple"))?;
        let first = Apple::page_jobs(html, ctx)?;
        // Each page restates fullUrl; follow the latest one.
        let mut full_url = first.full_url;
        paginate::drive_pages(first.jobs, first.pages, APPLE_PAGE_CAP, |page| {
            let url = format!("{full_url}&page={page}");
            match ctx.client.get(&url, ctx.headers)? {
                Some(resp) => {
                    let html = resp
                        .as_html()
                        .ok_or_else(|| anyhow!("expected an HTML response from Apple"))?;
                    let next = Apple::page_jobs(html, ctx)?;
                    if !next.full_url.is_empty() {
                        full_url = next.full_url;
                    }
                    Ok(Some(next.jobs))
                }
                None => Ok(None),
            }
        })
    }
}
