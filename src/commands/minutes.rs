use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::pipeline::{self, DateRange, Selection};
use crate::services::storage::SaveOptions;

pub fn run(
    config: &Config,
    code: Option<String>,
    market: Option<u8>,
    start_date: Option<String>,
    end_date: Option<String>,
    csv_only: bool,
    db_only: bool,
) {
    match execute(config, code, market, start_date, end_date, csv_only, db_only) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn execute(
    config: &Config,
    code: Option<String>,
    market: Option<u8>,
    start_date: Option<String>,
    end_date: Option<String>,
    csv_only: bool,
    db_only: bool,
) -> Result<()> {
    let selection = Selection::from_args(code, market)?;
    let range = DateRange::parse(start_date.as_deref(), end_date.as_deref())?;
    let opts = SaveOptions::from_flags(csv_only, db_only);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| AppError::Io(format!("Failed to create runtime: {}", e)))?;
    let report = runtime.block_on(pipeline::run_minutes(config, &selection, &range, opts))?;

    if report.rows == 0 {
        println!("⚠️  No minute data after filtering");
    } else {
        println!(
            "✅ Saved {} minute rows across 5/15/30/60 tiers for {} symbols",
            report.rows, report.symbols
        );
    }
    Ok(())
}
