use anyhow::{anyhow, Result};
use serde_json::Value;

use super::{expect_json, id_string, paginate, ExtractContext, Extractor};
use crate::dates;
use crate::fetch::{self, PageResponse};
use crate::models::{JobMap, JobRecord};

const WORKDAY_PAGE_SIZE: u64 = 20;
const WORKDAY_PAGE_CAP: usize = 5;

/// Generic Workday tenant board. Every tenant answers the same POST shape
/// (`total` + `jobPostings[]`, relative "Posted N Days Ago" phrases,
/// requisition id in `bulletFields[0]`); only the apply-link base differs,
/// so one implementation is registered once per company.
pub struct WorkdayBoard {
    apply_base: String,
}

impl WorkdayBoard {
    pub fn new(apply_base: &str) -> Self {
        Self {
            apply_base: apply_base.to_string(),
        }
    }

    fn page_jobs(&self, root: &Value, ctx: &ExtractContext<'_>) -> Result<(JobMap, usize)> {
        let total = root
            .get("total")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("Workday response missing 'total'"))?;
        let pages = paginate::page_count(total, WORKDAY_PAGE_SIZE);
        let available = root
            .get("jobPostings")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("Workday response missing 'jobPostings' array"))?;
        let mut relevant = JobMap::new();
        for job in available {
            let Some(title) = job.get("title").and_then(Value::as_str) else {
                continue;
            };
            let Some(id) = job.pointer("/bulletFields/0").and_then(id_string) else {
                continue;
            };
            // "Posted 30+ Days Ago" -> "30 days ago"
            let Some(posted) = job
                .get("postedOn")
                .and_then(Value::as_str)
                .map(|s| s.replace("Posted ", "").replace('+', "").to_lowercase())
                .and_then(|phrase| dates::parse_posted(&phrase).ok())
            else {
                continue;
            };
            let Some(path) = job.get("externalPath").and_then(Value::as_str) else {
                continue;
            };
            if ctx.filter.accepts(title, ctx.keyword, posted, ctx.today) {
                relevant.insert(
                    id,
                    JobRecord {
                        title: title.to_string(),
                        posted,
                        apply_url: format!("{}{path}", self.apply_base),
                    },
                );
            }
        }
        Ok((relevant, pages))
    }
}

impl Extractor for WorkdayBoard {
    fn extract(&self, page: &PageResponse, ctx: &ExtractContext<'_>) -> Result<JobMap> {
        let root = expect_json(page)?;
        let (first, pages) = self.page_jobs(root, ctx)?;
        paginate::drive_pages(first, pages, WORKDAY_PAGE_CAP, |page| {
            // Same search body, offset advanced one page per request.
            let mut body = ctx.body.cloned().unwrap_or_else(|| Value::Object(Default::default()));
            fetch::set_json_path(
                &mut body,
                "offset",
                Value::from((page as u64 - 1) * WORKDAY_PAGE_SIZE),
            );
            match ctx.client.post_json(ctx.search_url, &body, ctx.headers)? {
                Some(resp) => {
                    let root = expect_json(&resp)?;
                    Ok(Some(self.page_jobs(root, ctx)?.0))
                }
                None => Ok(None),
            }
        })
    }
}
