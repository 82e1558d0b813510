use anyhow::Result;
use chrono::Local;
use tracing::{info, warn};

use crate::config::ConfigStore;
use crate::extract::{self, Registry};
use crate::fetch::HttpClient;
use crate::filter::TitleFilter;
use crate::models::{CompanyConfig, CompanyOutcome, JobMap};
use crate::notify::Notifier;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub checked: usize,
    pub skipped: usize,
    pub failed: usize,
    pub notified: usize,
}

/// Ids in `jobs` that have not been notified before, in a stable order.
pub fn new_job_ids(jobs: &JobMap, known: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = jobs
        .keys()
        .filter(|id| !known.iter().any(|k| k == *id))
        .cloned()
        .collect();
    ids.sort();
    ids
}

fn timestamp() -> String {
    Local::now().format("%d/%m/%Y %H:%M:%S").to_string()
}

/// One full batch: load configuration, check every enabled company, notify
/// new matches, persist known-job state. Per-company failures are reported
/// and skipped past; anything that escapes this loop ends the run after a
/// best-effort state flush and an error notification.
pub struct Runner {
    store: ConfigStore,
    registry: Registry,
    client: HttpClient,
    filter: TitleFilter,
    notifier: Notifier,
    dry_run: bool,
}

impl Runner {
    pub fn new(
        store: ConfigStore,
        registry: Registry,
        client: HttpClient,
        filter: TitleFilter,
        notifier: Notifier,
        dry_run: bool,
    ) -> Self {
        Self {
            store,
            registry,
            client,
            filter,
            notifier,
            dry_run,
        }
    }

    pub fn run(&self) -> Result<RunStats> {
        let result = self.run_inner();
        if let Err(err) = &result {
            // Best effort; the original failure is what propagates.
            if let Err(notify_err) = self.notifier.error(&format!("{} - {err:#}", timestamp())) {
                warn!("Failed to deliver error notification: {notify_err:#}");
            }
        }
        result
    }

    fn run_inner(&self) -> Result<RunStats> {
        self.notifier.deployment(
            "Info",
            &format!("{} - Starting the application ...", timestamp()),
        )?;
        let mut companies = self.store.load_companies()?;
        let outcome = self.check_all(&mut companies);
        if !self.dry_run {
            // Known-job state accumulated before a failure is still flushed
            // so those jobs are not re-notified next run.
            match &outcome {
                Ok(_) => self.store.save_known_jobs(&companies)?,
                Err(_) => {
                    if let Err(save_err) = self.store.save_known_jobs(&companies) {
                        warn!("Failed to flush known jobs after error: {save_err:#}");
                    }
                }
            }
        }
        let stats = outcome?;
        info!("All new jobs notified to the user.");
        self.notifier.deployment(
            "Information",
            &format!("{} - Application completed successfully.", timestamp()),
        )?;
        Ok(stats)
    }

    fn check_all(&self, companies: &mut [CompanyConfig]) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let today = Local::now().date_naive();
        for company in companies.iter_mut() {
            if !company.enabled {
                info!("Bypassing {} as monitoring is not enabled", company.name);
                stats.skipped += 1;
                continue;
            }
            let outcome = extract::check_company(
                &self.registry,
                company,
                &self.client,
                &self.filter,
                today,
            );
            match &outcome {
                CompanyOutcome::Checked(_) => stats.checked += 1,
                CompanyOutcome::Failed { reason, .. } => {
                    warn!("Checking {} failed: {}", company.name, reason);
                    self.notifier
                        .error(&format!("{} - {}: {}", timestamp(), company.name, reason))?;
                    stats.failed += 1;
                }
            }
            stats.notified += self.notify_new_jobs(company, outcome.records())?;
        }
        Ok(stats)
    }

    fn notify_new_jobs(&self, company: &mut CompanyConfig, jobs: &JobMap) -> Result<usize> {
        let mut notified = 0;
        for job_id in new_job_ids(jobs, &company.known_jobs) {
            let record = &jobs[&job_id];
            info!(
                "New job found: {} posted on: {} for company: {}. Notifying user ...",
                record.title, record.posted, company.name
            );
            self.notifier.job_found(&company.name, &job_id, record)?;
            company.known_jobs.push(job_id);
            notified += 1;
        }
        Ok(notified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobRecord;
    use chrono::NaiveDate;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn record(title: &str) -> JobRecord {
        JobRecord {
            title: title.to_string(),
            posted: NaiveDate::from_ymd_opt(2024, 3, 13).unwrap(),
            apply_url: "https://careers.example.test/jobs/1".to_string(),
        }
    }

    #[test]
    fn test_new_job_ids_skips_known_and_sorts() {
        let mut jobs = JobMap::new();
        jobs.insert("b".to_string(), record("Software Engineer"));
        jobs.insert("a".to_string(), record("Software Engineer"));
        jobs.insert("c".to_string(), record("Software Engineer"));
        let known = vec!["b".to_string()];
        assert_eq!(new_job_ids(&jobs, &known), vec!["a", "c"]);
    }

    #[test]
    fn test_new_job_ids_with_everything_known_is_empty() {
        let mut jobs = JobMap::new();
        jobs.insert("a".to_string(), record("Software Engineer"));
        let known = vec!["a".to_string(), "stale-id".to_string()];
        assert!(new_job_ids(&jobs, &known).is_empty());
    }

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "jobwatch-runner-{label}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_single_company(dir: &Path, status: &str) {
        fs::write(
            dir.join("company_data.csv"),
            "CompanyID,CompanyName,CompanyPortal\n1,Netflix,Custom\n",
        )
        .unwrap();
        fs::write(
            dir.join("keywords.csv"),
            "CompanyID,Keywords\n1,Software Engineer\n",
        )
        .unwrap();
        fs::write(
            dir.join("search_api.csv"),
            "CompanyID,SearchType,SearchAPI\n1,GET,https://netflix.example.invalid/search?q={}\n",
        )
        .unwrap();
        fs::write(dir.join("search_headers.csv"), "CompanyID|SearchHeader\n1|\n").unwrap();
        fs::write(
            dir.join("search_extra_headers.csv"),
            "CompanyID|SearchExtraHeader\n1|\n",
        )
        .unwrap();
        fs::write(
            dir.join("company_status.csv"),
            format!("CompanyID,MonitorStatus\n1,{status}\n"),
        )
        .unwrap();
        fs::write(
            dir.join("already_known_jobs.csv"),
            "CompanyID,KnownJobs\n1,790298765\n",
        )
        .unwrap();
    }

    fn dry_runner(dir: PathBuf) -> Runner {
        Runner::new(
            ConfigStore::new(dir),
            Registry::builtin(),
            HttpClient::new().unwrap(),
            TitleFilter::default(),
            Notifier::from_env(true).unwrap(),
            true,
        )
    }

    #[test]
    fn test_disabled_company_is_skipped_entirely() {
        let dir = scratch_dir("disabled");
        write_single_company(&dir, "Disabled");
        let stats = dry_runner(dir.clone()).run().unwrap();
        assert_eq!(
            stats,
            RunStats {
                checked: 0,
                skipped: 1,
                failed: 0,
                notified: 0
            }
        );
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_dry_run_leaves_known_jobs_untouched() {
        let dir = scratch_dir("dry");
        write_single_company(&dir, "Disabled");
        let before = fs::read_to_string(dir.join("already_known_jobs.csv")).unwrap();
        dry_runner(dir.clone()).run().unwrap();
        let after = fs::read_to_string(dir.join("already_known_jobs.csv")).unwrap();
        assert_eq!(before, after);
        fs::remove_dir_all(&dir).unwrap();
    }
}
