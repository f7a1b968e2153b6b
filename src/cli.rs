use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "tdx2db")]
#[command(about = "Build a local market-data warehouse from TDX terminal binary files", long_about = None)]
pub struct Cli {
    /// TDX terminal installation directory (overrides TDX_PATH)
    #[arg(long, global = true, value_name = "DIR")]
    pub tdx_path: Option<PathBuf>,

    /// Directory for CSV output files (overrides CSV_OUTPUT_PATH)
    #[arg(long, global = true, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// SQLite database file (overrides DB_PATH)
    #[arg(long, global = true, value_name = "FILE")]
    pub db_path: Option<PathBuf>,

    /// Rows per database insert transaction
    #[arg(long, global = true, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Disable the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover listed symbols and save the catalog
    StockList {
        /// Save to CSV only
        #[arg(long)]
        csv_only: bool,
        /// Save to the database only
        #[arg(long)]
        db_only: bool,
    },
    /// Decode daily bars and save them
    Daily {
        /// Symbol code; the whole catalog when omitted
        #[arg(long, requires = "market")]
        code: Option<String>,
        /// Market code: 0 = Shenzhen, 1 = Shanghai
        #[arg(long, requires = "code", value_parser = clap::value_parser!(u8).range(0..=1))]
        market: Option<u8>,
        /// Keep bars on or after this date
        #[arg(long = "start_date", value_name = "YYYY-MM-DD")]
        start_date: Option<String>,
        /// Keep bars on or before this date
        #[arg(long = "end_date", value_name = "YYYY-MM-DD")]
        end_date: Option<String>,
        /// Save to CSV only
        #[arg(long)]
        csv_only: bool,
        /// Save to the database only
        #[arg(long)]
        db_only: bool,
    },
    /// Decode 5-minute bars, derive the 15/30/60-minute tiers and save them
    Minutes {
        /// Symbol code; the whole catalog when omitted
        #[arg(long, requires = "market")]
        code: Option<String>,
        /// Market code: 0 = Shenzhen, 1 = Shanghai
        #[arg(long, requires = "code", value_parser = clap::value_parser!(u8).range(0..=1))]
        market: Option<u8>,
        /// Keep bars on or after this date
        #[arg(long = "start_date", value_name = "YYYY-MM-DD")]
        start_date: Option<String>,
        /// Keep bars on or before this date
        #[arg(long = "end_date", value_name = "YYYY-MM-DD")]
        end_date: Option<String>,
        /// Save to CSV only
        #[arg(long)]
        csv_only: bool,
        /// Save to the database only
        #[arg(long)]
        db_only: bool,
    },
    /// Extract block/sector membership (not supported)
    BlockRelation {
        /// Save to CSV only
        #[arg(long)]
        csv_only: bool,
        /// Save to the database only
        #[arg(long)]
        db_only: bool,
    },
}

pub fn run() {
    let cli = Cli::parse();

    let config = match Config::resolve(
        cli.tdx_path.clone(),
        cli.output.clone(),
        cli.db_path.clone(),
        cli.batch_size,
        cli.no_progress,
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::StockList { csv_only, db_only } => {
            commands::stock_list::run(&config, csv_only, db_only);
        }
        Commands::Daily {
            code,
            market,
            start_date,
            end_date,
            csv_only,
            db_only,
        } => {
            commands::daily::run(&config, code, market, start_date, end_date, csv_only, db_only);
        }
        Commands::Minutes {
            code,
            market,
            start_date,
            end_date,
            csv_only,
            db_only,
        } => {
            commands::minutes::run(&config, code, market, start_date, end_date, csv_only, db_only);
        }
        Commands::BlockRelation { csv_only, db_only } => {
            commands::block_relation::run(&config, csv_only, db_only);
        }
    }
}
