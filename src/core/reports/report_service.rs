use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::analytics::{DateRange, ReportRequest};
use crate::core::tooling::ApiError;

/// Reports are only generated from this local hour onwards.
const BUSINESS_START_HOUR: u32 = 9;

#[derive(Debug, Error)]
pub enum ReportStoreError {
    #[error("report storage failed: {0}")]
    Database(String),
}

#[derive(Debug, Error)]
pub enum ReportRunError {
    #[error("not authenticated with Google")]
    NotAuthenticated,
    #[error("Google Analytics API error: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] ReportStoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ReportFrequency {
    /// Unknown values behave like `weekly`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => ReportFrequency::Daily,
            "monthly" => ReportFrequency::Monthly,
            _ => ReportFrequency::Weekly,
        }
    }

    pub fn interval(self) -> Duration {
        match self {
            ReportFrequency::Daily => Duration::days(1),
            ReportFrequency::Weekly => Duration::days(7),
            ReportFrequency::Monthly => Duration::days(30),
        }
    }

    /// Window the report covers.
    pub fn date_range(self) -> DateRange {
        match self {
            ReportFrequency::Daily => DateRange::Yesterday,
            ReportFrequency::Weekly => DateRange::Last7Days,
            ReportFrequency::Monthly => DateRange::Last30Days,
        }
    }
}

/// One entry of the `SCHEDULED_REPORTS` setup list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReport {
    pub report_name: String,
    pub frequency: ReportFrequency,
    pub property_id: String,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
}

impl ScheduledReport {
    pub fn request(&self) -> ReportRequest {
        ReportRequest::new(
            &self.property_id,
            self.frequency.date_range(),
            self.metrics.clone(),
            self.dimensions.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReport {
    pub report_name: String,
    pub property_id: String,
    pub generated_at: DateTime<Utc>,
    pub content: String,
}

/// Persistence for generated reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn last_generated(
        &self,
        report_name: &str,
    ) -> Result<Option<DateTime<Utc>>, ReportStoreError>;
    async fn save(&self, report: &GeneratedReport) -> Result<(), ReportStoreError>;
}

/// Produces the text of a report.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn render(&self, request: &ReportRequest) -> Result<String, ReportRunError>;
}

/// Weekday business hours in the configured time zone.
#[derive(Debug, Clone, Copy)]
pub struct ReportWindow {
    tz: Tz,
}

impl ReportWindow {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.tz);
        let weekday = !matches!(local.weekday(), Weekday::Sat | Weekday::Sun);
        weekday && local.hour() >= BUSINESS_START_HOUR
    }
}

impl Default for ReportWindow {
    fn default() -> Self {
        Self::new(chrono_tz::UTC)
    }
}

pub fn is_due(
    report: &ScheduledReport,
    last_generated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match last_generated {
        Some(last) => now - last >= report.frequency.interval(),
        None => true,
    }
}

/// Generates configured reports when they are due and stores the results.
pub struct ScheduledReportService<S: ReportSource, R: ReportStore> {
    source: S,
    store: R,
    window: ReportWindow,
    reports: Vec<ScheduledReport>,
}

impl<S, R> ScheduledReportService<S, R>
where
    S: ReportSource,
    R: ReportStore,
{
    pub fn new(source: S, store: R, window: ReportWindow, reports: Vec<ScheduledReport>) -> Self {
        Self {
            source,
            store,
            window,
            reports,
        }
    }

    pub fn reports(&self) -> &[ScheduledReport] {
        &self.reports
    }

    /// Runs every due report once. A failing report is logged and skipped.
    pub async fn run_due(&self, now: DateTime<Utc>) -> Vec<GeneratedReport> {
        if !self.window.is_open(now) {
            tracing::debug!("Outside the report window, skipping scheduled reports");
            return Vec::new();
        }

        let mut generated = Vec::new();
        for report in &self.reports {
            match self.run_if_due(report, now).await {
                Ok(Some(done)) => {
                    tracing::info!(report = %done.report_name, property = %done.property_id, "Scheduled report generated");
                    generated.push(done);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(report = %report.report_name, "Scheduled report failed: {}", e);
                }
            }
        }
        generated
    }

    async fn run_if_due(
        &self,
        report: &ScheduledReport,
        now: DateTime<Utc>,
    ) -> Result<Option<GeneratedReport>, ReportRunError> {
        let last = self.store.last_generated(&report.report_name).await?;
        if !is_due(report, last, now) {
            return Ok(None);
        }

        let body = self.source.render(&report.request()).await?;
        let generated = GeneratedReport {
            report_name: report.report_name.clone(),
            property_id: report.property_id.clone(),
            generated_at: now,
            content: format!("# {}\n\n{}", report.report_name, body),
        };
        self.store.save(&generated).await?;
        Ok(Some(generated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockReportStore {
        saved: Arc<DashMap<String, GeneratedReport>>,
    }

    #[async_trait]
    impl ReportStore for MockReportStore {
        async fn last_generated(
            &self,
            report_name: &str,
        ) -> Result<Option<DateTime<Utc>>, ReportStoreError> {
            Ok(self.saved.get(report_name).map(|r| r.generated_at))
        }

        async fn save(&self, report: &GeneratedReport) -> Result<(), ReportStoreError> {
            self.saved
                .insert(report.report_name.clone(), report.clone());
            Ok(())
        }
    }

    /// Fails for one property id, succeeds for the rest.
    struct MockSource {
        failing_property: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ReportSource for MockSource {
        async fn render(&self, request: &ReportRequest) -> Result<String, ReportRunError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.property_id == self.failing_property {
                return Err(ReportRunError::NotAuthenticated);
            }
            Ok(format!("rows for {}", request.property_id))
        }
    }

    fn report(name: &str, property: &str, frequency: ReportFrequency) -> ScheduledReport {
        ScheduledReport {
            report_name: name.to_string(),
            frequency,
            property_id: property.to_string(),
            metrics: vec!["totalUsers".to_string()],
            dimensions: vec!["date".to_string()],
        }
    }

    // 2024-01-08 is a Monday.
    fn monday_at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 8, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!(ReportFrequency::parse("Daily"), ReportFrequency::Daily);
        assert_eq!(ReportFrequency::parse("monthly"), ReportFrequency::Monthly);
        assert_eq!(ReportFrequency::parse("hourly"), ReportFrequency::Weekly);
        assert_eq!(ReportFrequency::Monthly.interval(), Duration::days(30));
    }

    #[test]
    fn test_window_weekdays_after_nine() {
        let window = ReportWindow::default();
        assert!(window.is_open(monday_at(9)));
        assert!(!window.is_open(monday_at(8)));

        let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap();
        assert!(!window.is_open(saturday));
    }

    #[test]
    fn test_window_uses_local_time() {
        // 12:00 UTC is 07:00 in New York.
        let window = ReportWindow::new(chrono_tz::America::New_York);
        assert!(!window.is_open(monday_at(12)));
        assert!(window.is_open(monday_at(15)));
    }

    #[test]
    fn test_is_due() {
        let weekly = report("Weekly", "1", ReportFrequency::Weekly);
        let now = monday_at(10);
        assert!(is_due(&weekly, None, now));
        assert!(!is_due(&weekly, Some(now - Duration::days(6)), now));
        assert!(is_due(&weekly, Some(now - Duration::days(7)), now));
    }

    #[tokio::test]
    async fn test_failed_report_does_not_block_others() {
        let saved = Arc::new(DashMap::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let service = ScheduledReportService::new(
            MockSource {
                failing_property: "bad",
                calls: Arc::clone(&calls),
            },
            MockReportStore {
                saved: Arc::clone(&saved),
            },
            ReportWindow::default(),
            vec![
                report("Broken", "bad", ReportFrequency::Daily),
                report("Traffic", "123", ReportFrequency::Weekly),
            ],
        );

        let generated = service.run_due(monday_at(10)).await;
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].report_name, "Traffic");
        assert!(generated[0].content.starts_with("# Traffic\n\nrows for 123"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Second tick an hour later: Traffic is not due again, Broken is retried.
        let again = service.run_due(monday_at(11)).await;
        assert!(again.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_runs_outside_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = ScheduledReportService::new(
            MockSource {
                failing_property: "",
                calls: Arc::clone(&calls),
            },
            MockReportStore {
                saved: Arc::new(DashMap::new()),
            },
            ReportWindow::default(),
            vec![report("Traffic", "123", ReportFrequency::Daily)],
        );

        assert!(service.run_due(monday_at(7)).await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
