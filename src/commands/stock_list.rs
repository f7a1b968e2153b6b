use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::pipeline;
use crate::services::storage::SaveOptions;

pub fn run(config: &Config, csv_only: bool, db_only: bool) {
    match execute(config, csv_only, db_only) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn execute(config: &Config, csv_only: bool, db_only: bool) -> Result<()> {
    let opts = SaveOptions::from_flags(csv_only, db_only);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| AppError::Io(format!("Failed to create runtime: {}", e)))?;
    let report = runtime.block_on(pipeline::run_stock_list(config, opts))?;

    println!("✅ Saved {} symbols to stock_info", report.symbols);
    Ok(())
}
