//! SQLite export of run artifacts.
//!
//! RULE: Only store.rs talks to the database.
//! The pipeline never reads ground truth back from here; the store is an
//! output sink for external reporting.

use crate::{
    activity::WeeklyActivityPoint,
    config::SimConfig,
    engine::{ConfusionCounts, ConfusionStatus, RunSummary, SimulationRun},
    error::{SimError, SimResult},
    lifecycle::Customer,
    types::EntityId,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL is ignored for in-memory URIs.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_run.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, config: &SimConfig, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, config_json) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, config.seed as i64, version, serde_json::to_string(config)?],
        )?;
        Ok(())
    }

    /// Write every table of a finished run in one transaction.
    pub fn save_run(&self, run: &SimulationRun, config: &SimConfig, version: &str) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let run_id = run.summary.run_id.as_str();
        self.insert_run(run_id, config, version)?;
        self.save_customers(run_id, &run.customers)?;
        self.save_activity(run_id, &run.activity)?;
        self.save_summary(&run.summary)?;
        tx.commit()?;
        log::info!(
            "store: exported run {run_id} ({} customers, {} activity rows)",
            run.customers.len(),
            run.activity.len()
        );
        Ok(())
    }

    // ── Customers ──────────────────────────────────────────────

    pub fn save_customers(&self, run_id: &str, customers: &[Customer]) -> SimResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO customer (
                run_id, customer_id, name, industry, country, plan,
                contract_start, contract_end, churn_date, churn_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for c in customers {
            stmt.execute(params![
                run_id,
                c.customer_id,
                c.name,
                c.industry.display_name(),
                c.country.display_name(),
                c.plan.display_name(),
                c.contract_start.format(DATE_FORMAT).to_string(),
                c.contract_end.format(DATE_FORMAT).to_string(),
                c.churn.map(|e| e.date.format(DATE_FORMAT).to_string()),
                c.churn.map(|e| e.reason.display_name()),
            ])?;
        }
        Ok(())
    }

    pub fn customer_count(&self, run_id: &str) -> SimResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM customer WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn churn_date(&self, run_id: &str, customer_id: &str) -> SimResult<Option<NaiveDate>> {
        let raw: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT churn_date FROM customer WHERE run_id = ?1 AND customer_id = ?2",
                params![run_id, customer_id],
                |row| row.get(0),
            )
            .optional()?;
        raw.flatten().map(|s| parse_date(&s)).transpose()
    }

    // ── Activity ───────────────────────────────────────────────

    pub fn save_activity(&self, run_id: &str, points: &[WeeklyActivityPoint]) -> SimResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO weekly_activity (run_id, customer_id, channel, iso_year, iso_week, post_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for p in points {
            stmt.execute(params![
                run_id,
                p.customer_id,
                p.channel.display_name(),
                p.iso_year,
                p.iso_week,
                p.post_count,
            ])?;
        }
        Ok(())
    }

    pub fn activity_count(&self, run_id: &str) -> SimResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM weekly_activity WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    // ── Results ────────────────────────────────────────────────

    pub fn save_summary(&self, summary: &RunSummary) -> SimResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO detection_result (
                run_id, customer_id, actual_date, detected_date, error_weeks, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in &summary.results {
            stmt.execute(params![
                summary.run_id,
                r.customer_id,
                r.actual_churn.map(|e| e.date.format(DATE_FORMAT).to_string()),
                r.detected_churn.map(|e| e.date.format(DATE_FORMAT).to_string()),
                r.error_weeks,
                r.status.as_str(),
            ])?;
        }

        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO evaluation_failure (run_id, customer_id, error) VALUES (?1, ?2, ?3)",
        )?;
        for f in &summary.failures {
            stmt.execute(params![summary.run_id, f.customer_id, f.error])?;
        }
        Ok(())
    }

    /// Confusion counts recomputed from the stored rows.
    pub fn confusion_counts(&self, run_id: &str) -> SimResult<ConfusionCounts> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM detection_result WHERE run_id = ?1 GROUP BY status",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = ConfusionCounts::default();
        for (label, n) in rows {
            let status = ConfusionStatus::ALL
                .into_iter()
                .find(|s| s.as_str() == label)
                .ok_or_else(|| SimError::Other(anyhow::anyhow!("unknown status {label:?}")))?;
            for _ in 0..n {
                counts.record(status);
            }
        }
        Ok(counts)
    }

    pub fn failed_customers(&self, run_id: &str) -> SimResult<Vec<EntityId>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id FROM evaluation_failure WHERE run_id = ?1 ORDER BY customer_id",
        )?;
        let ids = stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

fn parse_date(raw: &str) -> SimResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| SimError::Other(anyhow::anyhow!("bad stored date {raw:?}: {e}")))
}
