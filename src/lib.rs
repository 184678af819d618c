pub mod batch;
pub mod cache;
pub mod client;
pub mod error;
pub mod jql;
pub mod models;
pub mod pagination;
pub mod report;
pub mod service;

pub use client::{Credentials, JiraClient};
pub use error::Error;
pub use models::*;

// Cache re-exports
pub use cache::{CACHE_TTL_MINUTES, Clock, ManualClock, ReportCaches, SystemClock, TtlCache};

// Batch executor re-exports
pub use batch::{DEFAULT_CONCURRENCY, process_batch};

// Pagination re-exports
pub use pagination::{OFFSET_PAGE_SIZE, collect_offset_pages, collect_search_pages};

// Report aggregation re-exports
pub use report::{aggregate_epic_summary, aggregate_ranged_report, entry_in_window, range_window};

// Service re-export
pub use service::WorklogService;
