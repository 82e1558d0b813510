use anyhow::{anyhow, Result};
use chrono::DateTime;
use serde_json::Value;

use super::{expect_json, id_string, ExtractContext, Extractor};
use crate::fetch::PageResponse;
use crate::models::{JobMap, JobRecord};

/// Lever postings API (`api.lever.co/v0/postings/<org>`): a flat array with
/// epoch-millisecond `createdAt` stamps and hosted apply pages. Postings
/// that carry a location are gated to the US; ones without pass through.
pub struct LeverBoard;

fn epoch_millis_date(value: &Value) -> Option<chrono::NaiveDate> {
    value
        .as_i64()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.date_naive())
}

fn us_posting(job: &Value) -> bool {
    match job.pointer("/categories/location").and_then(Value::as_str) {
        Some(location) => location.contains("US") || location.contains("United States"),
        None => true,
    }
}

impl Extractor for LeverBoard {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let available = root
            .as_array()
            .ok_or_else(|| anyhow!("Lever response was not a JSON array"))?;
        let mut relevant = JobMap::new();
        for job in available {
            if !us_posting(job) {
                continue;
            }
            let Some(id) = job.get("id").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("text").and_then(Value::as_str) else {
                continue;
            };
            let Some(posted) = job.get("createdAt").and_then(epoch_millis_date) else {
                continue;
            };
            let Some(url) = job.get("hostedUrl").and_then(Value::as_str) else {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testutil::context;
    use crate::fetch::HttpClient;
    use crate::filter::TitleFilter;
    use chrono::NaiveDate;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2024-03-13T00:00:00Z
    const MAR_13_2024_MS: i64 = 1_710_288_000_000;

    #[test]
    fn test_epoch_millis_dates() {
        assert_eq!(
            epoch_millis_date(&json!(MAR_13_2024_MS)),
            Some(day(2024, 3, 13))
        );
        assert_eq!(epoch_millis_date(&json!("not a number")), None);
    }

    #[test]
    fn test_extracts_us_postings_with_hosted_urls() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let today = day(2024, 3, 15);
        let ctx = context("Software Engineer", &client, &filter, today);
        let page = PageResponse::Json(json!([
            {
                "id": "a1b2c3d4",
                "text": "Software Engineer",
                "createdAt": MAR_13_2024_MS,
                "hostedUrl": "https://jobs.lever.co/acme/a1b2c3d4",
                "categories": {"location": "New York, NY, United States"}
            },
            {
                "id": "e5f6a7b8",
                "text": "Software Engineer",
                "createdAt": MAR_13_2024_MS,
                "hostedUrl": "https://jobs.lever.co/acme/e5f6a7b8",
                "categories": {"location": "London, UK"}
            }
        ]));
        let jobs = LeverBoard.extract(&page, &ctx).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(
            jobs["a1b2c3d4"].apply_url,
            "https://jobs.lever.co/acme/a1b2c3d4"
        );
    }

    #[test]
    fn test_posting_without_location_is_not_filtered() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let today = day(2024, 3, 15);
        let ctx = context("Software Engineer", &client, &filter, today);
        let page = PageResponse::Json(json!([{
            "id": "c9d0e1f2",
            "text": "Software Engineer",
            "createdAt": MAR_13_2024_MS,
            "hostedUrl": "https://jobs.lever.co/acme/c9d0e1f2"
        }]));
        assert_eq!(LeverBoard.extract(&page, &ctx).unwrap().len(), 1);
    }
}
