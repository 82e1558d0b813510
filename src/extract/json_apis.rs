use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde_json::Value;

use super::{expect_json, id_string, offset_date, paginate, ExtractContext, Extractor};
use crate::fetch::PageResponse;
use crate::models::{JobMap, JobRecord};

/// amazon.jobs search API: `jobs[]` with icims ids and long-form dates.
pub struct Amazon;

impl Extractor for Amazon {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let available = root
            .get("jobs")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Amazon response missing 'jobs' array"))?;
        let mut relevant = JobMap::new();
        for job in available {
            let Some(id) = job.get("id_icims").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("title").and_then(Value::as_str) else {
                continue;
            };
            let Some(posted) = job
                .get("posted_date")
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%B %d, %Y").ok())
            else {
                continue;
            };
            let Some(path) = job.get("job_path").and_then(Value::as_str) else {
                continue;
            };
            if ctx.filter.accepts(title, ctx.keyword, posted, ctx.today) {
                relevant.insert(
                    id,
                    JobRecord {
                        title: title.to_string(),
                        posted,
                        apply_url: format!("https://www.amazon.jobs/{path}"),
                    },
                );
            }
        }
        Ok(relevant)
    }
}

/// jobs.netflix.com: postings live under `records.postings`.
pub struct Netflix;

impl Extractor for Netflix {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let available = root
            .pointer("/records/postings")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Netflix response missing 'records.postings'"))?;
        let mut relevant = JobMap::new();
        for job in available {
            let Some(id) = job.get("external_id").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("text").and_then(Value::as_str) else {
                continue;
            };
            let Some(posted) = job
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(offset_date)
            else {
                continue;
            };
            if ctx.filter.accepts(title, ctx.keyword, posted, ctx.today) {
                relevant.insert(
                    id.clone(),
                    JobRecord {
                        title: title.to_string(),
                        posted,
                        apply_url: format!("https://jobs.netflix.com/jobs/{id}"),
                    },
                );
            }
        }
        Ok(relevant)
    }
}

/// IBM careers search: `queryResult[]`, gated to US-country requisitions.
pub struct Ibm;

impl Extractor for Ibm {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let available = root
            .get("queryResult")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("IBM response missing 'queryResult' array"))?;
        let mut relevant = JobMap::new();
        for job in available {
            if job.get("primary_country").and_then(Value::as_str) != Some("US") {
                continue;
            }
            let Some(id) = job.get("id").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("title").and_then(Value::as_str) else {
                continue;
            };
            let Some(posted) = job
                .get("open_date")
                .and_then(Value::as_str)
                .and_then(offset_date)
            else {
                continue;
            };
            let Some(url) = job.get("url").and_then(Value::as_str) else {
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

/// Oracle's requisition search buries the list in `items[0].requisitionList`.
pub struct Oracle;

impl Extractor for Oracle {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let available = root
            .pointer("/items/0/requisitionList")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Oracle response missing 'items[0].requisitionList'"))?;
        let mut relevant = JobMap::new();
        for job in available {
            let Some(id) = job.get("Id").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("Title").and_then(Value::as_str) else {
                continue;
            };
            let Some(posted) = job
                .get("PostedDate")
                .and_then(Value::as_str)
                .and_then(offset_date)
            else {
                continue;
            };
            if ctx.filter.accepts(title, ctx.keyword, posted, ctx.today) {
                relevant.insert(
                    id.clone(),
                    JobRecord {
                        title: title.to_string(),
                        posted,
                        apply_url: format!(
                            "https://careers.oracle.com/jobs/#en/sites/jobsearch/job/{id}"
                        ),
                    },
                );
            }
        }
        Ok(relevant)
    }
}

/// Tencent careers: `Data.Posts[]` with numeric post ids and a no-space
/// month-day date format.
pub struct Tencent;

impl Extractor for Tencent {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let available = root
            .pointer("/Data/Posts")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Tencent response missing 'Data.Posts'"))?;
        let mut relevant = JobMap::new();
        for job in available {
            let Some(id) = job.get("RecruitPostId").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("RecruitPostName").and_then(Value::as_str) else {
                continue;
            };
            let Some(posted) = job
                .get("LastUpdateTime")
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%B %d,%Y").ok())
            else {
                continue;
            };
            let Some(url) = job.get("PostURL").and_then(Value::as_str) else {
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

/// Jane Street publishes a flat array with no posting date; anything that
/// passes the title filter counts as discovered today. NYC positions only.
pub struct JaneStreet;

impl Extractor for JaneStreet {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let available = root
            .as_array()
            .ok_or_else(|| anyhow!("Jane Street response was not a JSON array"))?;
        let mut relevant = JobMap::new();
        for job in available {
            if job.get("city").and_then(Value::as_str) != Some("NYC") {
                continue;
            }
            let Some(id) = job.get("id").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("position").and_then(Value::as_str) else {
                continue;
            };
            if ctx.filter.title_matches(title, ctx.keyword) {
                relevant.insert(
                    id.clone(),
                    JobRecord {
                        title: title.to_string(),
                        posted: ctx.today,
                        apply_url: format!(
                            "https://www.janestreet.com/join-jane-street/position/{id}"
                        ),
                    },
                );
            }
        }
        Ok(relevant)
    }
}

const MICROSOFT_PAGE_SIZE: u64 = 20;
const MICROSOFT_PAGE_CAP: usize = 5;

/// Microsoft careers: results under `operationResult.result` with a declared
/// total; later pages are the same GET with `&pg=N` appended.
pub struct Microsoft;

impl Microsoft {
    fn page_jobs(root: &Value, ctx: &ExtractContext<'_>) -> Result<(JobMap, usize)> {
        let result = root
            .pointer("/operationResult/result")
            .ok_or_else(|| anyhow!("Microsoft response missing 'operationResult.result'"))?;
        let total = result.get("totalJobs").and_then(Value::as_u64).unwrap_or(0);
        let pages = paginate::page_count(total, MICROSOFT_PAGE_SIZE);
        let available = result
            .get("jobs")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Microsoft response missing 'jobs' array"))?;
        let mut relevant = JobMap::new();
        for job in available {
            let Some(id) = job.get("jobId").and_then(id_string) else {
                continue;
            };
            let Some(title) = job.get("title").and_then(Value::as_str) else {
                continue;
            };
            let Some(posted) = job
                .get("postingDate")
                .and_then(Value::as_str)
                .and_then(offset_date)
            else {
                continue;
            };
            if ctx.filter.accepts(title, ctx.keyword, posted, ctx.today) {
                relevant.insert(
                    id.clone(),
                    JobRecord {
                        title: title.to_string(),
                        posted,
                        apply_url: format!("https://careers.microsoft.com/us/en/job/{id}"),
                    },
                );
            }
        }
        Ok((relevant, pages))
    }
}

impl Extractor for Microsoft {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let (first, pages) = Self::page_jobs(root, ctx)?;
        paginate::drive_pages(first, pages, MICROSOFT_PAGE_CAP, |page| {
            let url = format!("{}&pg={page}", ctx.search_url);
            match ctx.client.get(&url, ctx.headers)? {
                Some(resp) => {
                    let root = expect_json(&resp)?;
                    Ok(Some(Self::page_jobs(root, ctx)?.0))
                }
                None => Ok(None),
            }
        })
    }
}

/// Disney's endpoint stopped returning parseable JSON and its extractor was
/// never finished. Registered so the configured row stays valid, but it
/// reports nothing.
pub struct Disney;

impl Extractor for Disney {
    fn extract(&self, _page: &PageResponse, _ctx: &ExtractContext<'_>) -> Result<JobMap> {
        Ok(JobMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testutil::context;
    use crate::fetch::HttpClient;
    use crate::filter::TitleFilter;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_amazon_extracts_and_filters() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let today = day(2024, 3, 15);
        let ctx = context("Software Engineer", &client, &filter, today);
        let page = PageResponse::Json(json!({
            "jobs": [
                {
                    "id_icims": "2554321",
                    "title": "Software Engineer",
                    "posted_date": "March 14, 2024",
                    "job_path": "en/jobs/2554321/software-engineer"
                },
                {
                    "id_icims": "2554322",
                    "title": "Software Engineer",
                    "posted_date": "March 1, 2024",
                    "job_path": "en/jobs/2554322/software-engineer"
                },
                {
                    // no title: skipped, not an error
                    "id_icims": "2554323",
                    "posted_date": "March 14, 2024",
                    "job_path": "en/jobs/2554323/x"
                }
            ]
        }));
        let jobs = Amazon.extract(&page, &ctx).unwrap();
        assert_eq!(jobs.len(), 1);
        let job = &jobs["2554321"];
        assert_eq!(job.posted, day(2024, 3, 14));
        assert_eq!(
            job.apply_url,
            "https://www.amazon.jobs/en/jobs/2554321/software-engineer"
        );
    }

    #[test]
    fn test_amazon_missing_jobs_array_is_an_error() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let ctx = context("Software Engineer", &client, &filter, day(2024, 3, 15));
        let page = PageResponse::Json(json!({"error": "throttled"}));
        assert!(Amazon.extract(&page, &ctx).is_err());
    }

    #[test]
    fn test_netflix_builds_apply_link_from_external_id() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let today = day(2024, 3, 15);
        let ctx = context("Software Engineer", &client, &filter, today);
        let page = PageResponse::Json(json!({
            "records": {
                "postings": [{
                    "external_id": "790298765",
                    "text": "Software Engineer",
                    "created_at": "2024-03-13T08:00:00+00:00"
                }]
            }
        }));
        let jobs = Netflix.extract(&page, &ctx).unwrap();
        assert_eq!(
            jobs["790298765"].apply_url,
            "https://jobs.netflix.com/jobs/790298765"
        );
    }

    #[test]
    fn test_ibm_rejects_non_us_requisitions() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let today = day(2024, 3, 15);
        let ctx = context("Software Engineer", &client, &filter, today);
        let page = PageResponse::Json(json!({
            "queryResult": [
                {
                    "id": "R-100",
                    "title": "Software Engineer",
                    "open_date": "2024-03-13T08:00:00+00:00",
                    "primary_country": "IN",
                    "url": "https://ibm.example/jobs/R-100"
                },
                {
                    "id": "R-101",
                    "title": "Software Engineer",
                    "open_date": "2024-03-13T08:00:00+00:00",
                    "primary_country": "US",
                    "url": "https://ibm.example/jobs/R-101"
                }
            ]
        }));
        let jobs = Ibm.extract(&page, &ctx).unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs.contains_key("R-101"));
    }

    #[test]
    fn test_tencent_accepts_numeric_ids_and_compact_dates() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let today = day(2024, 3, 15);
        let ctx = context("Backend Engineer", &client, &filter, today);
        let page = PageResponse::Json(json!({
            "Data": {
                "Posts": [{
                    "RecruitPostId": 117702,
                    "RecruitPostName": "Backend Engineer",
                    "LastUpdateTime": "March 12,2024",
                    "PostURL": "https://careers.tencent.com/en-us/jobdesc.html?postId=117702"
                }]
            }
        }));
        let jobs = Tencent.extract(&page, &ctx).unwrap();
        assert_eq!(jobs["117702"].posted, day(2024, 3, 12));
    }

    #[test]
    fn test_janestreet_gates_on_city_and_dates_today() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let today = day(2024, 3, 15);
        let ctx = context("Software Engineer", &client, &filter, today);
        let page = PageResponse::Json(json!([
            {"id": 7001, "position": "Software Engineer", "city": "NYC"},
            {"id": 7002, "position": "Software Engineer", "city": "LDN"}
        ]));
        let jobs = JaneStreet.extract(&page, &ctx).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs["7001"].posted, today);
    }

    #[test]
    fn test_microsoft_single_page_needs_no_follow_up() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let today = day(2024, 3, 15);
        let ctx = context("Software Engineer", &client, &filter, today);
        let page = PageResponse::Json(json!({
            "operationResult": {
                "result": {
                    "totalJobs": 2,
                    "jobs": [
                        {
                            "jobId": "1698765",
                            "title": "Software Engineer",
                            "postingDate": "2024-03-14T00:00:00+00:00"
                        },
                        {
                            "jobId": "1698766",
                            "title": "Software Engineer II",
                            "postingDate": "2024-03-14T00:00:00+00:00"
                        }
                    ]
                }
            }
        }));
        let jobs = Microsoft.extract(&page, &ctx).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(
            jobs["1698765"].apply_url,
            "https://careers.microsoft.com/us/en/job/1698765"
        );
    }

    #[test]
    fn test_disney_stays_inert() {
        let client = HttpClient::new().unwrap();
        let filter = TitleFilter::default();
        let ctx = context("Software Engineer", &client, &filter, day(2024, 3, 15));
        let page = PageResponse::Json(json!({"results": "<html></html>"}));
        assert!(Disney.extract(&page, &ctx).unwrap().is_empty());
    }
}
