//! Built-in executors.
//!
//! Each one handles a single category, takes an `Arc<Storage>`, and never
//! touches the filesystem except through it. The two network executors
//! (B3, B6) only make GET requests and cap the body at the sandbox's file
//! size limit. Failures come back as
//! [`ExecutorResult::Failure`](taskgate_core::ExecutorResult::Failure).
//!
//! Writes go through `Storage::write`, which replaces the target atomically.
//! An executor that writes a single output is therefore all-or-nothing; none
//! of the built-ins write more than one file.

mod api_fetch;
mod count_weekdays;
mod csv_filter;
mod extract_email;
mod fetch;
mod markdown_index;
mod markdown_to_html;
mod recent_logs;
mod sort_contacts;
mod sql_query;
mod sqlite;
mod ticket_sales;
mod web_scraping;

pub use api_fetch::ApiFetchExecutor;
pub use count_weekdays::CountWeekdaysExecutor;
pub use csv_filter::CsvFilterExecutor;
pub use extract_email::ExtractEmailExecutor;
pub use markdown_index::MarkdownIndexExecutor;
pub use markdown_to_html::MarkdownToHtmlExecutor;
pub use recent_logs::RecentLogsExecutor;
pub use sort_contacts::SortContactsExecutor;
pub use sql_query::SqlQueryExecutor;
pub use ticket_sales::TicketSalesExecutor;
pub use web_scraping::WebScrapingExecutor;

use taskgate_core::{Category, TaskError, TaskParams};

/// Error for parameters of another category.
fn mismatched(expected: Category, params: &TaskParams) -> TaskError {
    TaskError::ExecutionFailure(format!(
        "{} executor received parameters for {}",
        expected.id(),
        params.category().id()
    ))
}
