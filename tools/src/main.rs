//! analytics-runner: headless batch runner for the customer analytics store.
//!
//! Usage:
//!   analytics-runner --db analytics.db --import-sales data/retail.csv --recompute
//!   analytics-runner --import-forecast data/forecast.csv \
//!                    --import-monthly-forecast data/monthly.csv --recompute
//!   analytics-runner --config analytics.json --recompute --today 2011-12-10
//!   analytics-runner --verify

use analytics_core::{
    clock::local_today,
    config::AnalyticsConfig,
    engine::{BatchEngine, BatchReport, JobStatus},
    ingest,
    snapshot::TableState,
    store::{tables, AnalyticsStore},
};
use anyhow::Result;
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match flag_value(&args, "--config") {
        Some(path) => AnalyticsConfig::load(path)?,
        None => AnalyticsConfig::from_env()?,
    };
    if let Some(db) = flag_value(&args, "--db") {
        config.database.path = db.to_string();
    }
    let today = match flag_value(&args, "--today") {
        Some(text) => ingest::parse_date(text)?,
        None => local_today(),
    };
    let recompute = has_flag(&args, "--recompute");
    let verify = has_flag(&args, "--verify");
    let sales_csv = flag_value(&args, "--import-sales");
    let forecast_csv = flag_value(&args, "--import-forecast");
    let monthly_csv = flag_value(&args, "--import-monthly-forecast");

    println!("analytics-runner: customer analytics batch");
    println!("  db:        {}", config.database.path);
    println!("  today:     {today}");
    println!();

    let store = AnalyticsStore::open_with_timeout(&config.database.path, config.database.busy_timeout())?;
    store.migrate()?;

    let import_run = format!("import-{}", chrono::Utc::now().timestamp());
    if let Some(path) = sales_csv {
        let n = ingest::import_sales(&store, &import_run, Path::new(path))?;
        println!("  imported {n} transactions");
    }
    if let Some(path) = forecast_csv {
        let n = ingest::import_forecast(&store, &import_run, Path::new(path))?;
        println!("  imported {n} forecast days");
    }
    if let Some(path) = monthly_csv {
        let n = ingest::import_monthly_forecast(&store, &import_run, Path::new(path))?;
        println!("  imported {n} forecast months");
    }

    if recompute {
        let mut engine = BatchEngine::build(config.clone(), store);
        let report = engine.run(today)?;
        print_report(&report);
        if verify {
            print_tables(engine.store())?;
        }
        if report.failed() > 0 {
            anyhow::bail!("{} job(s) failed", report.failed());
        }
    } else if verify {
        print_tables(&store)?;
    }

    Ok(())
}

fn print_report(report: &BatchReport) {
    println!();
    println!("=== BATCH SUMMARY ===");
    println!("  run_id:         {}", report.run_id);
    println!("  analysis date:  {}", report.analysis_date);
    println!("  succeeded:      {}", report.succeeded());
    println!("  failed:         {}", report.failed());
    println!("  rejected:       {}", report.rejected());
    for job in &report.jobs {
        let status = match &job.status {
            JobStatus::Succeeded => "ok".to_string(),
            JobStatus::Rejected { table } => format!("rejected ({table} locked)"),
            JobStatus::Failed { error } => format!("FAILED: {error}"),
        };
        let rows: Vec<String> = job.tables.iter().map(|(t, n)| format!("{t}={n}")).collect();
        println!("  {:<18} {status} {}", job.job, rows.join(" "));
    }
}

fn print_tables(store: &AnalyticsStore) -> Result<()> {
    println!();
    println!("=== TABLES ===");
    for table in tables::ALL {
        let state = store.table_state(table)?;
        let line = match state {
            TableState::Absent => "absent".to_string(),
            TableState::Unpopulated => "never populated".to_string(),
            TableState::Populated { as_of } => format!(
                "{} rows, as of {}",
                store.row_count(table)?,
                as_of.unwrap_or_else(|| "unversioned".to_string())
            ),
        };
        println!("  {table:<20} {line}");
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
