//! Persistence of processed series to CSV files and SQLite
//!
//! The pipeline hands each fully-processed series to this module tagged
//! with its logical target (`daily_data`, `minute{5,15,30,60}_data`,
//! `stock_info`); the caller's `--csv-only` / `--db-only` flags decide
//! which sinks receive it. Re-runs are idempotent: CSV targets are
//! truncated the first time a run touches them, and the database uses a
//! unique `(code, datetime)` index with `INSERT OR REPLACE`.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{DailyBar, MinuteBar, MovingAverages, Timeframe};
use crate::services::catalog::CatalogEntry;

/// Which sinks a run writes to, from the caller's flags.
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    pub to_csv: bool,
    pub to_db: bool,
}

impl SaveOptions {
    pub fn from_flags(csv_only: bool, db_only: bool) -> Self {
        Self {
            to_csv: !db_only,
            to_db: !csv_only,
        }
    }
}

/// Bar-table column list shared by the CSV header and the insert statement.
const BAR_COLUMNS: [&str; 21] = [
    "code", "market", "datetime", "date", "open", "high", "low", "close", "volume", "amount",
    "ma5", "ma10", "ma13", "ma21", "ma34", "ma55", "ma60", "ma89", "ma144", "ma233", "ma250",
];

/// One persisted bar row, common to both bar variants. Daily bars carry
/// their date at midnight in the `datetime` column.
struct BarRow<'a> {
    code: &'a str,
    market: i64,
    datetime: NaiveDateTime,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    amount: f64,
    ma: &'a MovingAverages,
}

impl<'a> From<&'a DailyBar> for BarRow<'a> {
    fn from(bar: &'a DailyBar) -> Self {
        Self {
            code: &bar.code,
            market: bar.market.code() as i64,
            datetime: bar.date.and_hms_opt(0, 0, 0).unwrap(),
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            amount: bar.amount,
            ma: &bar.ma,
        }
    }
}

impl<'a> From<&'a MinuteBar> for BarRow<'a> {
    fn from(bar: &'a MinuteBar) -> Self {
        Self {
            code: &bar.code,
            market: bar.market.code() as i64,
            datetime: bar.datetime,
            date: bar.date(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            amount: bar.amount,
            ma: &bar.ma,
        }
    }
}

fn float_cell(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}

fn ma_cell(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

/// CSV sink: one file per logical target under the output directory.
pub struct CsvStore {
    out_dir: PathBuf,
    /// Targets already written this run; the first write truncates so a
    /// re-run replaces the previous output instead of appending to it.
    started: HashSet<String>,
}

impl CsvStore {
    pub fn new(out_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(out_dir)?;
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
            started: HashSet::new(),
        })
    }

    fn open_target(&mut self, target: &str) -> Result<(csv::Writer<File>, bool)> {
        let path = self.out_dir.join(format!("{}.csv", target));
        let fresh = self.started.insert(target.to_string());
        let file = if fresh {
            File::create(&path)?
        } else {
            OpenOptions::new().create(true).append(true).open(&path)?
        };
        Ok((csv::Writer::from_writer(file), fresh))
    }

    fn append_bar_rows(&mut self, target: &str, rows: &[BarRow<'_>]) -> Result<PathBuf> {
        let (mut writer, fresh) = self.open_target(target)?;
        if fresh {
            writer.write_record(BAR_COLUMNS)?;
        }

        for row in rows {
            writer.write_record(&[
                row.code.to_string(),
                row.market.to_string(),
                row.datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
                row.date.format("%Y-%m-%d").to_string(),
                float_cell(row.open),
                float_cell(row.high),
                float_cell(row.low),
                float_cell(row.close),
                float_cell(row.volume),
                float_cell(row.amount),
                ma_cell(row.ma.ma5),
                ma_cell(row.ma.ma10),
                ma_cell(row.ma.ma13),
                ma_cell(row.ma.ma21),
                ma_cell(row.ma.ma34),
                ma_cell(row.ma.ma55),
                ma_cell(row.ma.ma60),
                ma_cell(row.ma.ma89),
                ma_cell(row.ma.ma144),
                ma_cell(row.ma.ma233),
                ma_cell(row.ma.ma250),
            ])?;
        }

        writer.flush()?;
        Ok(self.out_dir.join(format!("{}.csv", target)))
    }

    fn write_catalog(&mut self, entries: &[CatalogEntry]) -> Result<PathBuf> {
        let (mut writer, fresh) = self.open_target("stock_info")?;
        if fresh {
            writer.write_record(["code", "name", "market"])?;
        }
        for entry in entries {
            writer.write_record(&[
                entry.code.clone(),
                entry.name.clone(),
                entry.market.code().to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(self.out_dir.join("stock_info.csv"))
    }
}

/// SQLite sink built on a WAL-mode connection pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(db_path: &Path) -> Result<Self> {
        info!("Opening SQLite database at {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePool::connect_with(options).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        for timeframe in [
            Timeframe::Daily,
            Timeframe::Minute5,
            Timeframe::Minute15,
            Timeframe::Minute30,
            Timeframe::Minute60,
        ] {
            let table = timeframe.table_name();
            let create = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    code TEXT NOT NULL,
                    market INTEGER NOT NULL,
                    datetime DATETIME NOT NULL,
                    date DATE NOT NULL,
                    open REAL,
                    high REAL,
                    low REAL,
                    close REAL,
                    volume REAL,
                    amount REAL,
                    ma5 REAL, ma10 REAL, ma13 REAL, ma21 REAL, ma34 REAL, ma55 REAL,
                    ma60 REAL, ma89 REAL, ma144 REAL, ma233 REAL, ma250 REAL
                )
                "#
            );
            sqlx::query(&create).execute(&self.pool).await?;

            // Dedup key for INSERT OR REPLACE idempotency
            let unique = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_code_datetime \
                 ON {table}(code, datetime)"
            );
            sqlx::query(&unique).execute(&self.pool).await?;

            let by_time = format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_datetime ON {table}(datetime)"
            );
            sqlx::query(&by_time).execute(&self.pool).await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_info (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL UNIQUE,
                name TEXT,
                market INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Database schema ready");
        Ok(())
    }

    async fn insert_bar_rows(
        &self,
        table: &str,
        rows: &[BarRow<'_>],
        batch_size: usize,
    ) -> Result<u64> {
        let placeholders: Vec<String> = (1..=BAR_COLUMNS.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            table,
            BAR_COLUMNS.join(", "),
            placeholders.join(", ")
        );

        let mut inserted = 0u64;
        for chunk in rows.chunks(batch_size.max(1)) {
            let mut tx = self.pool.begin().await?;
            for row in chunk {
                sqlx::query(&sql)
                    .bind(row.code)
                    .bind(row.market)
                    .bind(row.datetime)
                    .bind(row.date)
                    .bind(row.open)
                    .bind(row.high)
                    .bind(row.low)
                    .bind(row.close)
                    .bind(row.volume)
                    .bind(row.amount)
                    .bind(row.ma.ma5)
                    .bind(row.ma.ma10)
                    .bind(row.ma.ma13)
                    .bind(row.ma.ma21)
                    .bind(row.ma.ma34)
                    .bind(row.ma.ma55)
                    .bind(row.ma.ma60)
                    .bind(row.ma.ma89)
                    .bind(row.ma.ma144)
                    .bind(row.ma.ma233)
                    .bind(row.ma.ma250)
                    .execute(&mut *tx)
                    .await?;
                inserted += 1;
            }
            tx.commit().await?;
        }

        debug!("Inserted {} rows into {}", inserted, table);
        Ok(inserted)
    }

    async fn insert_catalog(&self, entries: &[CatalogEntry], batch_size: usize) -> Result<u64> {
        let sql = "INSERT OR REPLACE INTO stock_info (code, name, market) VALUES (?1, ?2, ?3)";

        let mut inserted = 0u64;
        for chunk in entries.chunks(batch_size.max(1)) {
            let mut tx = self.pool.begin().await?;
            for entry in chunk {
                sqlx::query(sql)
                    .bind(&entry.code)
                    .bind(&entry.name)
                    .bind(entry.market.code() as i64)
                    .execute(&mut *tx)
                    .await?;
                inserted += 1;
            }
            tx.commit().await?;
        }
        Ok(inserted)
    }
}

/// Facade the pipeline driver hands finished series to.
pub struct Storage {
    csv: Option<CsvStore>,
    db: Option<SqliteStore>,
    batch_size: usize,
}

impl Storage {
    /// Open the sinks selected by `opts`. The database connection is only
    /// established when the run actually writes to it.
    pub async fn open(config: &Config, opts: SaveOptions) -> Result<Self> {
        if !opts.to_csv && !opts.to_db {
            return Err(AppError::Config(
                "--csv-only and --db-only together leave nothing to write".to_string(),
            ));
        }

        let csv = if opts.to_csv {
            Some(CsvStore::new(&config.csv_output_path)?)
        } else {
            None
        };
        let db = if opts.to_db {
            Some(SqliteStore::connect(&config.db_path).await?)
        } else {
            None
        };

        Ok(Self {
            csv,
            db,
            batch_size: config.batch_size,
        })
    }

    pub async fn save_daily(&mut self, bars: &[DailyBar]) -> Result<()> {
        let rows: Vec<BarRow<'_>> = bars.iter().map(BarRow::from).collect();
        self.save_rows(Timeframe::Daily.table_name(), &rows).await
    }

    pub async fn save_minutes(&mut self, timeframe: Timeframe, bars: &[MinuteBar]) -> Result<()> {
        let rows: Vec<BarRow<'_>> = bars.iter().map(BarRow::from).collect();
        self.save_rows(timeframe.table_name(), &rows).await
    }

    async fn save_rows(&mut self, target: &str, rows: &[BarRow<'_>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        if let Some(csv) = self.csv.as_mut() {
            csv.append_bar_rows(target, rows)?;
        }
        if let Some(db) = self.db.as_ref() {
            db.insert_bar_rows(target, rows, self.batch_size).await?;
        }
        Ok(())
    }

    pub async fn save_catalog(&mut self, entries: &[CatalogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        if let Some(csv) = self.csv.as_mut() {
            let path = csv.write_catalog(entries)?;
            info!("Catalog written to {}", path.display());
        }
        if let Some(db) = self.db.as_ref() {
            db.insert_catalog(entries, self.batch_size).await?;
        }
        Ok(())
    }
}
