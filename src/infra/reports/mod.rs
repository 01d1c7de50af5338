#[path = "sqlite_report_store.rs"]
pub mod sqlite_report_store;

pub use sqlite_report_store::SqliteReportStore;
