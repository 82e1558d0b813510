use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use super::{expect_json, id_string, offset_date, ExtractContext, Extractor};
use crate::fetch::PageResponse;
use crate::models::{JobMap, JobRecord};

/// Greenhouse job-board JSON API (`/v1/boards/<org>/jobs`): flat `jobs[]`
/// with `updated_at` timestamps and ready-made `absolute_url` apply links.
/// Gated to postings whose location mentions the US.
pub struct GreenhouseApi;

impl Extractor for GreenhouseApi {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let available = root
            .get("jobs")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Greenhouse response missing 'jobs' array"))?;
        let mut relevant = JobMap::new();
        for job in available {
            let Some(location) = job.pointer("/location/name").and_then(Value::as_str) else {
                continue;
            };
            if !location.contains("US") {
                continue;
            }
            let Some(id) = job.get("id").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("title").and_then(Value::as_str) else {
                continue;
            };
            let Some(posted) = job
                .get("updated_at")
                .and_then(Value::as_str)
                .and_then(offset_date)
            else {
                continue;
            };
            let Some(url) = job.get("absolute_url").and_then(Value::as_str) else {
                continue;
            };
            if ctx.filter.accepts(title, ctx.keyword, posted, ctx.today) {
                relevant.insert(
                    id,
                    JobRecord {
                        title: title.to_string(),
                        posted,
                        apply_url: url.to_string(),
                    },
                );
            }
        }
        Ok(relevant)
    }
}

/// Server-rendered Greenhouse board pages: departments as `section.level-0`
/// groupings with one `div.opening` anchor per posting. The listing page
/// carries no dates, so each candidate that passes the title check costs a
/// follow-up GET whose `ld+json` block has `datePosted` and the location.
pub struct GreenhouseBoard {
    board_base: String,
}

impl GreenhouseBoard {
    pub fn new(board_base: &str) -> Self {
        Self {
            board_base: board_base.trim_end_matches('/').to_string(),
        }
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{href}", self.board_base)
        }
    }
}

/// `datePosted` in ld+json is usually a bare date, occasionally a full
/// timestamp.
fn ld_json_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| offset_date(s))
}

fn us_location(posting: &Value) -> bool {
    let address = posting.pointer("/jobLocation/address");
    let Some(address) = address else {
        // No location in the structured data: nothing to filter on.
        return true;
    };
    ["addressCountry", "addressRegion", "addressLocality"]
        .iter()
        .filter_map(|field| address.get(*field).and_then(Value::as_str))
        .any(|part| part.contains("US") || part.contains("United States"))
}

/// Pull `datePosted` and the location gate out of a posting detail page.
fn detail_posting(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    let ld_sel = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    for script in document.select(&ld_sel) {
        let text = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            return Some(value);
        }
    }
    None
}

impl Extractor for GreenhouseBoard {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let html = page
            .as_html()
            .ok_or_else(|| anyhow!("expected an HTML board page from Greenhouse"))?;
        let opening_sel = Selector::parse("section.level-0 div.opening a")
            .map_err(|e| anyhow!("invalid opening selector: {e:?}"))?;
        let id_re = Regex::new(r"/jobs/(\d+)").map_err(|e| anyhow!("invalid id pattern: {e}"))?;

        // Walk the listing once, then issue the detail requests.
        let mut openings: Vec<(String, String, String)> = Vec::new();
        {
            let document = Html::parse_document(html);
            for anchor in document.select(&opening_sel) {
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                let Some(id) = id_re
                    .captures(href)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                else {
                    continue;
                };
                let title = anchor.text().collect::<String>().trim().to_string();
                if title.is_empty() {
                    continue;
                }
                openings.push((id, title, href.to_string()));
            }
        }

        let mut relevant = JobMap::new();
        for (id, title, href) in openings {
            // Check the title before paying for the detail request.
            if !ctx.filter.title_matches(&title, ctx.keyword) {
                continue;
            }
            let apply_url = self.absolute(&href);
            let Some(detail) = ctx.client.get(&apply_url, ctx.headers)? else {
                continue;
            };
            let Some(detail_html) = detail.as_html() else {
                continue;
            };
            let Some(posting) = detail_posting(detail_html) else {
                continue;
            };
            if !us_location(&posting) {
                continue;
            }
            let Some(posted) = posting
                .get("datePosted")
                .and_then(Value::as_str)
                .and_then(ld_json_date)
            else {
                continue;
            };
            if ctx.filter.is_recent(posted, ctx.today) {
                relevant.insert(
                    id,
                    JobRecord {
                        title,
                        posted,
                        apply_url,
                    },
                );
            }
        }
        Ok(relevant)
    }
}
