//! SQLite price provider.

use crate::domain::config_validation::parse_number;
use crate::domain::error::AlphaSimError;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::{PriceProvider, PriceRow};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_error(e: r2d2::Error) -> AlphaSimError {
    AlphaSimError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> AlphaSimError {
    AlphaSimError::Database {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AlphaSimError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| AlphaSimError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = match parse_number::<u32>(config, "sqlite", "pool_size")? {
            None => 4,
            Some(0) => {
                return Err(AlphaSimError::ConfigInvalid {
                    section: "sqlite".into(),
                    key: "pool_size".into(),
                    reason: "pool_size must be at least 1".into(),
                });
            }
            Some(size) => size,
        };

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_error)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, AlphaSimError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(db_error)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AlphaSimError> {
        self.pool.get().map_err(db_error)
    }

    pub fn initialize_schema(&self) -> Result<(), AlphaSimError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS prices (
                    code TEXT NOT NULL,
                    date TEXT NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume INTEGER NOT NULL,
                    PRIMARY KEY (code, date)
                );
                CREATE INDEX IF NOT EXISTS idx_prices_date ON prices(date);",
            )
            .map_err(query_error)
    }

    pub fn insert_rows(&self, code: &str, rows: &[PriceRow]) -> Result<(), AlphaSimError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        for row in rows {
            tx.execute(
                "INSERT OR REPLACE INTO prices (code, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    code,
                    row.date,
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.volume as i64
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)
    }
}

impl PriceProvider for SqliteAdapter {
    fn fetch_historical(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRow>, AlphaSimError> {
        let conn = self.conn()?;

        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();

        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, volume
                 FROM prices
                 WHERE code = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![code, start_str, end_str], |row| {
                let volume: i64 = row.get(5)?;
                Ok(PriceRow {
                    date: row.get(0)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: volume.max(0) as u64,
                })
            })
            .map_err(query_error)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(query_error)?);
        }
        Ok(out)
    }
}
