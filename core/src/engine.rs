//! The batch engine: recomputes every derived table from one snapshot.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. RFM               → rfm_segments, segment_summary
//!   2. Daily rollup      → daily_sales
//!   3. Country rollup    → country_summary
//!   4. Product rollup    → product_performance
//!   5. Monthly rollup    → monthly_sales
//!   6. Sales summary     → sales_summary
//!   7. Forecast insight  → forecast_insight
//!
//! RULES:
//!   - The snapshot (transactions + forecast series) is read once, in one
//!     read transaction, before any job runs.
//!   - A job runs only while it holds the recompute lock on every table it
//!     writes. A held lock rejects the job; it is not retried.
//!   - A failed or rejected job leaves its tables at the previous version
//!     and does not stop the jobs after it.
//!   - Everything the run does is recorded in recompute_log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    aggregation_engine::{Rollup, RollupJob},
    config::AnalyticsConfig,
    error::{AnalyticsError, AnalyticsResult},
    event::{BatchEvent, BatchLogEntry},
    insight_engine::ForecastInsightJob,
    job::{BatchInput, RecomputeJob, TableWrite},
    rfm_engine::RfmJob,
    store::AnalyticsStore,
    types::RunId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Rejected { table: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub job:    String,
    #[serde(flatten)]
    pub status: JobStatus,
    /// (table, rows) for every table the job replaced.
    pub tables: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id:        RunId,
    pub analysis_date: NaiveDate,
    pub jobs:          Vec<JobReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Failed { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Rejected { .. }))
    }

    pub fn job(&self, name: &str) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.job == name)
    }

    fn count(&self, pred: impl Fn(&JobStatus) -> bool) -> usize {
        self.jobs.iter().filter(|j| pred(&j.status)).count()
    }
}

pub struct BatchEngine {
    config: AnalyticsConfig,
    store:  AnalyticsStore,
    jobs:   Vec<Box<dyn RecomputeJob>>,
}

impl BatchEngine {
    pub fn new(config: AnalyticsConfig, store: AnalyticsStore) -> Self {
        Self {
            config,
            store,
            jobs: Vec::new(),
        }
    }

    /// Build a fully wired engine with all jobs registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: AnalyticsConfig, store: AnalyticsStore) -> Self {
        let display_limit = config.product_display_limit;
        let window_days = config.history_window_days;
        let mut engine = BatchEngine::new(config, store);

        // EXECUTION ORDER: fixed and documented. Never reorder.
        engine.register(Box::new(RfmJob));
        engine.register(Box::new(RollupJob::new(Rollup::Daily, display_limit)));
        engine.register(Box::new(RollupJob::new(Rollup::Country, display_limit)));
        engine.register(Box::new(RollupJob::new(Rollup::Product, display_limit)));
        engine.register(Box::new(RollupJob::new(Rollup::Monthly, display_limit)));
        engine.register(Box::new(RollupJob::new(Rollup::Summary, display_limit)));
        engine.register(Box::new(ForecastInsightJob::new(window_days)));
        engine
    }

    /// Register a job. Call in the documented execution order.
    pub fn register(&mut self, job: Box<dyn RecomputeJob>) {
        self.jobs.push(job);
    }

    pub fn store(&self) -> &AnalyticsStore {
        &self.store
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.name()).collect()
    }

    /// Run every registered job under a fresh run id.
    pub fn run(&mut self, today: NaiveDate) -> AnalyticsResult<BatchReport> {
        self.run_as(Uuid::new_v4().to_string(), today)
    }

    /// Run every registered job under `run_id`. Only a failure to read the
    /// snapshot or to write the log aborts the run.
    pub fn run_as(&mut self, run_id: RunId, today: NaiveDate) -> AnalyticsResult<BatchReport> {
        let (transactions, forecast) = self.store.read_batch_snapshot()?;
        let analysis_date = self.config.analysis_date.resolve(&transactions, today);
        let input = BatchInput {
            run_id: run_id.clone(),
            analysis_date,
            transactions,
            forecast,
        };

        let mut audit = RunLog::new(&self.store, &run_id);
        log::info!(
            "Batch {run_id} starting: {} transactions, {} forecast days, analysis date {analysis_date}",
            input.transactions.len(),
            input.forecast.daily.len()
        );
        audit.emit("engine", BatchEvent::RunStarted {
            run_id:        run_id.clone(),
            analysis_date,
            transactions:  input.transactions.len(),
            forecast_days: input.forecast.daily.len(),
        })?;

        let mut reports = Vec::with_capacity(self.jobs.len());
        for job in self.jobs.iter_mut() {
            let report = run_job(
                job.as_mut(),
                &input,
                &self.store,
                &mut audit,
                self.config.lock_stale_after_secs,
            )?;
            reports.push(report);
        }

        let report = BatchReport {
            run_id: run_id.clone(),
            analysis_date,
            jobs: reports,
        };
        audit.emit("engine", BatchEvent::RunCompleted {
            run_id:    run_id.clone(),
            succeeded: report.succeeded(),
            failed:    report.failed(),
            rejected:  report.rejected(),
        })?;
        log::info!(
            "Batch {run_id} finished: {} succeeded, {} failed, {} rejected",
            report.succeeded(),
            report.failed(),
            report.rejected()
        );
        Ok(report)
    }
}

fn run_job(
    job: &mut dyn RecomputeJob,
    input: &BatchInput,
    store: &AnalyticsStore,
    audit: &mut RunLog<'_>,
    stale_after_secs: i64,
) -> AnalyticsResult<JobReport> {
    let name = job.name();
    let now = chrono::Utc::now().timestamp();

    let mut held: Vec<&'static str> = Vec::new();
    for &table in job.tables() {
        match store.try_lock_table(table, &input.run_id, now, stale_after_secs) {
            Ok(true) => {
                held.push(table);
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                release(store, &held, &input.run_id);
                return job_failed(name, e, audit);
            }
        }
        release(store, &held, &input.run_id);
        let rejection = AnalyticsError::RecomputeInFlight { table: table.to_string() };
        log::warn!("{name}: {rejection}, job rejected");
        audit.emit(name, BatchEvent::JobRejected {
            job:   name.to_string(),
            table: table.to_string(),
        })?;
        return Ok(JobReport {
            job:    name.to_string(),
            status: JobStatus::Rejected { table: table.to_string() },
            tables: Vec::new(),
        });
    }

    audit.emit(name, BatchEvent::JobStarted { job: name.to_string() })?;
    let result = job.recompute(input, store);
    release(store, &held, &input.run_id);

    match result {
        Ok(writes) => {
            for TableWrite { table, rows } in &writes {
                audit.emit(name, BatchEvent::TableReplaced {
                    job:   name.to_string(),
                    table: table.to_string(),
                    rows:  *rows,
                })?;
            }
            audit.emit(name, BatchEvent::JobCompleted {
                job:    name.to_string(),
                tables: writes.len(),
            })?;
            Ok(JobReport {
                job:    name.to_string(),
                status: JobStatus::Succeeded,
                tables: writes.iter().map(|w| (w.table.to_string(), w.rows)).collect(),
            })
        }
        Err(e) => job_failed(name, e, audit),
    }
}

/// Record a failed job. Nothing was committed and no lock is held.
fn job_failed(
    name: &'static str,
    error: AnalyticsError,
    audit: &mut RunLog<'_>,
) -> AnalyticsResult<JobReport> {
    log::error!("{name}: recompute failed, previous tables kept: {error}");
    audit.emit(name, BatchEvent::JobFailed {
        job:   name.to_string(),
        error: error.to_string(),
    })?;
    Ok(JobReport {
        job:    name.to_string(),
        status: JobStatus::Failed { error: error.to_string() },
        tables: Vec::new(),
    })
}

fn release(store: &AnalyticsStore, tables: &[&'static str], run_id: &str) {
    for table in tables {
        if let Err(e) = store.unlock_table(table, run_id) {
            log::warn!("Could not release recompute lock on {table}: {e}");
        }
    }
}

/// Sequenced writer for one run's recompute_log rows.
struct RunLog<'a> {
    store:  &'a AnalyticsStore,
    run_id: &'a str,
    seq:    i64,
}

impl<'a> RunLog<'a> {
    fn new(store: &'a AnalyticsStore, run_id: &'a str) -> Self {
        Self { store, run_id, seq: 0 }
    }

    fn emit(&mut self, job: &str, event: BatchEvent) -> AnalyticsResult<()> {
        self.seq += 1;
        let entry = BatchLogEntry {
            id:         None,
            run_id:     self.run_id.to_string(),
            seq:        self.seq,
            job:        job.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(&event)?,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.store.append_log(&entry)
    }
}
