//! The closed task taxonomy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Kind of task requested, from a fixed closed set.
///
/// Identifiers are `A1`..`A10` (operations tasks) and `B3`..`B10`
/// (business tasks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    A8,
    A9,
    A10,
    B3,
    B4,
    B5,
    B6,
    B7,
    B8,
    B9,
    B10,
}

impl Category {
    /// Every category, in taxonomy order.
    pub const ALL: [Category; 18] = [
        Category::A1,
        Category::A2,
        Category::A3,
        Category::A4,
        Category::A5,
        Category::A6,
        Category::A7,
        Category::A8,
        Category::A9,
        Category::A10,
        Category::B3,
        Category::B4,
        Category::B5,
        Category::B6,
        Category::B7,
        Category::B8,
        Category::B9,
        Category::B10,
    ];

    /// Identifier as used in the taxonomy prompt ("A3", "B10", ...).
    pub fn id(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::A6 => "A6",
            Self::A7 => "A7",
            Self::A8 => "A8",
            Self::A9 => "A9",
            Self::A10 => "A10",
            Self::B3 => "B3",
            Self::B4 => "B4",
            Self::B5 => "B5",
            Self::B6 => "B6",
            Self::B7 => "B7",
            Self::B8 => "B8",
            Self::B9 => "B9",
            Self::B10 => "B10",
        }
    }

    /// Short snake_case task name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::A1 => "datagen",
            Self::A2 => "format_markdown",
            Self::A3 => "count_weekdays",
            Self::A4 => "sort_contacts",
            Self::A5 => "recent_logs",
            Self::A6 => "markdown_index",
            Self::A7 => "extract_email",
            Self::A8 => "extract_card",
            Self::A9 => "similar_comments",
            Self::A10 => "ticket_sales",
            Self::B3 => "api_fetch",
            Self::B4 => "git_operations",
            Self::B5 => "sql_query",
            Self::B6 => "web_scraping",
            Self::B7 => "image_processing",
            Self::B8 => "audio_transcription",
            Self::B9 => "markdown_to_html",
            Self::B10 => "csv_filter",
        }
    }

    /// One-line description embedded in the classification prompt.
    pub fn description(&self) -> &'static str {
        match self {
            Self::A1 => "install and run a data generation script",
            Self::A2 => "format a markdown file with a code formatter",
            Self::A3 => "count how many dates in a file fall on a given weekday",
            Self::A4 => "sort a JSON list of contacts by name fields",
            Self::A5 => "collect the first line of the most recent log files",
            Self::A6 => "index markdown files by their first heading",
            Self::A7 => "extract the sender's email address from an email message",
            Self::A8 => "extract a credit card number from an image",
            Self::A9 => "find the most similar pair of comments",
            Self::A10 => "compute total ticket sales for a ticket type from a SQLite database",
            Self::B3 => "fetch data from an API and save it",
            Self::B4 => "clone a git repository and make a commit",
            Self::B5 => "run a SQL query on a SQLite database",
            Self::B6 => "scrape data from a website",
            Self::B7 => "compress or resize an image",
            Self::B8 => "transcribe audio from an MP3 file",
            Self::B9 => "convert markdown to HTML",
            Self::B10 => "filter a CSV file and return JSON records",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Category {
    type Err = TaskError;

    /// Parse a bare identifier, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                TaskError::ClassificationFailure("reply is not a recognized category".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.id().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_parse_ignores_case() {
        assert_eq!("b10".parse::<Category>().unwrap(), Category::B10);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for bad in ["", "A0", "A11", "B1", "B2", "A3 ", "count_weekdays"] {
            let err = bad.parse::<Category>().unwrap_err();
            assert!(matches!(err, TaskError::ClassificationFailure(_)), "{bad}");
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Category::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Category::ALL.len());
    }
}
