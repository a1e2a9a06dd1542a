//! HTTP request handlers.

mod categories;
mod health;
mod read;
mod run;

pub use categories::list_categories;
pub use health::{health_check, metrics_handler};
pub use read::read_file;
pub use run::run_task;
