use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

use crate::core::reports::{GeneratedReport, ReportStore, ReportStoreError};

/// Generated scheduled reports, one row per run.
pub struct SqliteReportStore {
    pool: Pool<Sqlite>,
}

impl SqliteReportStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database file and runs the migration.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS generated_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                report_name TEXT NOT NULL,
                property_id TEXT NOT NULL,
                generated_at TEXT NOT NULL,
                content TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_generated_reports_name ON generated_reports (report_name, generated_at)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn last_generated(
        &self,
        report_name: &str,
    ) -> Result<Option<DateTime<Utc>>, ReportStoreError> {
        let row = sqlx::query(
            "SELECT generated_at FROM generated_reports WHERE report_name = ? ORDER BY generated_at DESC LIMIT 1",
        )
        .bind(report_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReportStoreError::Database(e.to_string()))?;

        Ok(row.map(|row| row.get::<DateTime<Utc>, _>("generated_at")))
    }

    async fn save(&self, report: &GeneratedReport) -> Result<(), ReportStoreError> {
        sqlx::query(
            r#"
            INSERT INTO generated_reports (report_name, property_id, generated_at, content)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&report.report_name)
        .bind(&report.property_id)
        .bind(report.generated_at)
        .bind(&report.content)
        .execute(&self.pool)
        .await
        .map_err(|e| ReportStoreError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn generated(name: &str, at: DateTime<Utc>) -> GeneratedReport {
        GeneratedReport {
            report_name: name.to_string(),
            property_id: "123".to_string(),
            generated_at: at,
            content: format!("# {}\n\nbody", name),
        }
    }

    #[tokio::test]
    async fn test_last_generated_tracks_newest_run() {
        let dir = tempdir().unwrap();
        let store = SqliteReportStore::open(dir.path().join("reports.db"))
            .await
            .unwrap();

        assert_eq!(store.last_generated("Weekly").await.unwrap(), None);

        let first = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap();
        let second = first + Duration::days(7);
        store.save(&generated("Weekly", first)).await.unwrap();
        store.save(&generated("Weekly", second)).await.unwrap();
        store.save(&generated("Daily", first)).await.unwrap();

        assert_eq!(store.last_generated("Weekly").await.unwrap(), Some(second));
        assert_eq!(store.last_generated("Daily").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.db");
        let store = SqliteReportStore::open(&path).await.unwrap();
        store.save(&generated("Weekly", Utc::now())).await.unwrap();
        drop(store);

        let reopened = SqliteReportStore::open(&path).await.unwrap();
        assert!(reopened.last_generated("Weekly").await.unwrap().is_some());
    }
}
