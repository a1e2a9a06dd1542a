//! Parameter records produced by extraction.
//!
//! The model replies with a loose [`ParameterRecord`]. Before anything reaches
//! an executor it is checked against the per-category schema and turned into
//! a typed [`TaskParams`] variant. Paths are kept as plain strings here: they
//! are untrusted until an executor routes them through the sandbox.

use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::category::Category;
use crate::error::TaskError;

/// Raw parameter schema requested from the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterRecord {
    /// Input file (or directory / database) path, if any.
    #[serde(default)]
    pub input_file: Option<String>,

    /// Output file path, if any.
    #[serde(default)]
    pub output_file: Option<String>,

    /// Any other task-specific parameters.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Typed parameters, one variant per category schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskParams {
    CountWeekdays {
        input: String,
        output: String,
        weekday: Weekday,
    },
    SortContacts {
        input: String,
        output: String,
        keys: Vec<String>,
    },
    RecentLogs {
        input_dir: String,
        output: String,
        count: usize,
    },
    MarkdownIndex {
        input_dir: String,
        output: String,
    },
    ExtractEmail {
        input: String,
        output: String,
    },
    TicketSales {
        database: String,
        output: String,
        ticket_type: String,
    },
    ApiFetch {
        url: String,
        headers: BTreeMap<String, String>,
        output: String,
    },
    SqlQuery {
        database: String,
        query: String,
        output: String,
    },
    WebScraping {
        url: String,
        selectors: Vec<String>,
        output: String,
    },
    MarkdownToHtml {
        input: String,
        output: String,
    },
    CsvFilter {
        input: String,
        output: Option<String>,
        column: String,
        value: String,
    },
    /// Categories without a typed schema keep the raw record.
    Generic {
        category: Category,
        record: ParameterRecord,
    },
}

/// Default number of log files for `RecentLogs`.
pub const DEFAULT_RECENT_LOGS: usize = 10;

impl TaskParams {
    /// Check a raw record against the schema for `category`.
    ///
    /// Fails with `ExtractionFailure` when a required field is missing,
    /// a value has the wrong type, or a parameter key is not part of the
    /// schema.
    pub fn from_record(category: Category, record: ParameterRecord) -> Result<Self, TaskError> {
        let mut fields = Fields::new(record);

        let params = match category {
            Category::A3 => TaskParams::CountWeekdays {
                input: fields.input()?,
                output: fields.output()?,
                weekday: match fields.optional_string("weekday")? {
                    Some(day) => day.parse::<Weekday>().map_err(|_| {
                        TaskError::ExtractionFailure(format!("unknown weekday '{day}'"))
                    })?,
                    None => Weekday::Wed,
                },
            },
            Category::A4 => TaskParams::SortContacts {
                input: fields.input()?,
                output: fields.output()?,
                keys: fields
                    .optional_string_list("sort_keys")?
                    .unwrap_or_else(|| vec!["last_name".to_string(), "first_name".to_string()]),
            },
            Category::A5 => TaskParams::RecentLogs {
                input_dir: fields.input()?,
                output: fields.output()?,
                count: fields
                    .optional_usize("count")?
                    .unwrap_or(DEFAULT_RECENT_LOGS),
            },
            Category::A6 => TaskParams::MarkdownIndex {
                input_dir: fields.input()?,
                output: fields.output()?,
            },
            Category::A7 => TaskParams::ExtractEmail {
                input: fields.input()?,
                output: fields.output()?,
            },
            Category::A10 => TaskParams::TicketSales {
                database: fields.input()?,
                output: fields.output()?,
                ticket_type: fields
                    .optional_string("ticket_type")?
                    .unwrap_or_else(|| "Gold".to_string()),
            },
            Category::B3 => {
                fields.get_only()?;
                TaskParams::ApiFetch {
                    url: fields.url()?,
                    headers: fields.optional_string_map("headers")?.unwrap_or_default(),
                    output: fields.output()?,
                }
            }
            Category::B5 => TaskParams::SqlQuery {
                database: fields.input()?,
                query: fields.string("query")?,
                output: fields.output()?,
            },
            Category::B6 => TaskParams::WebScraping {
                url: fields.url()?,
                selectors: fields
                    .optional_string_list("selectors")?
                    .ok_or_else(|| missing("selectors"))?,
                output: fields.output()?,
            },
            Category::B9 => TaskParams::MarkdownToHtml {
                input: fields.input()?,
                output: fields.output()?,
            },
            Category::B10 => TaskParams::CsvFilter {
                input: fields.input()?,
                output: fields.optional_output(),
                column: fields.string("column")?,
                value: fields.string("value")?,
            },
            _ => {
                return Ok(TaskParams::Generic {
                    category,
                    record: fields.into_record(),
                })
            }
        };

        fields.finish()?;
        Ok(params)
    }

    /// Parameter names (beyond input/output) each typed schema accepts.
    pub fn schema_keys(category: Category) -> &'static [&'static str] {
        match category {
            Category::A3 => &["weekday"],
            Category::A4 => &["sort_keys"],
            Category::A5 => &["count"],
            Category::A10 => &["ticket_type"],
            Category::B3 => &["url", "method", "headers"],
            Category::B5 => &["query"],
            Category::B6 => &["url", "selectors"],
            Category::B10 => &["column", "value"],
            _ => &[],
        }
    }

    /// Category the parameters were extracted for.
    pub fn category(&self) -> Category {
        match self {
            Self::CountWeekdays { .. } => Category::A3,
            Self::SortContacts { .. } => Category::A4,
            Self::RecentLogs { .. } => Category::A5,
            Self::MarkdownIndex { .. } => Category::A6,
            Self::ExtractEmail { .. } => Category::A7,
            Self::TicketSales { .. } => Category::A10,
            Self::ApiFetch { .. } => Category::B3,
            Self::SqlQuery { .. } => Category::B5,
            Self::WebScraping { .. } => Category::B6,
            Self::MarkdownToHtml { .. } => Category::B9,
            Self::CsvFilter { .. } => Category::B10,
            Self::Generic { category, .. } => *category,
        }
    }
}

/// Consumes record fields, remembering which parameter keys were used.
struct Fields {
    input_file: Option<String>,
    output_file: Option<String>,
    parameters: Map<String, Value>,
}

impl Fields {
    fn new(record: ParameterRecord) -> Self {
        Self {
            input_file: non_blank(record.input_file),
            output_file: non_blank(record.output_file),
            parameters: record.parameters,
        }
    }

    fn input(&mut self) -> Result<String, TaskError> {
        self.input_file
            .take()
            .ok_or_else(|| missing("input_file"))
    }

    fn output(&mut self) -> Result<String, TaskError> {
        self.output_file
            .take()
            .ok_or_else(|| missing("output_file"))
    }

    fn optional_output(&mut self) -> Option<String> {
        self.output_file.take()
    }

    fn string(&mut self, key: &str) -> Result<String, TaskError> {
        self.optional_string(key)?.ok_or_else(|| missing(key))
    }

    fn optional_string(&mut self, key: &str) -> Result<Option<String>, TaskError> {
        match self.parameters.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(non_blank(Some(s))),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(wrong_type(key, "a string")),
        }
    }

    fn optional_usize(&mut self, key: &str) -> Result<Option<usize>, TaskError> {
        match self.parameters.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| usize::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| wrong_type(key, "a non-negative integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<usize>()
                .map(Some)
                .map_err(|_| wrong_type(key, "a non-negative integer")),
            Some(_) => Err(wrong_type(key, "a non-negative integer")),
        }
    }

    fn optional_string_list(&mut self, key: &str) -> Result<Option<Vec<String>>, TaskError> {
        match self.parameters.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s])),
            Some(Value::Array(items)) => {
                let list = items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s),
                        _ => Err(wrong_type(key, "a list of strings")),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if list.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(list))
                }
            }
            Some(_) => Err(wrong_type(key, "a list of strings")),
        }
    }

    /// Only plain GET requests are made; any other method is refused.
    fn get_only(&mut self) -> Result<(), TaskError> {
        match self.optional_string("method")? {
            Some(method) if !method.trim().eq_ignore_ascii_case("GET") => Err(
                TaskError::ExtractionFailure(format!("unsupported HTTP method '{method}'")),
            ),
            _ => Ok(()),
        }
    }

    fn url(&mut self) -> Result<String, TaskError> {
        let url = self.string("url")?.trim().to_string();
        let scheme = url.split_once("://").map(|(scheme, _)| scheme);
        match scheme {
            Some(s) if s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https") => {
                Ok(url)
            }
            _ => Err(wrong_type("url", "an http or https URL")),
        }
    }

    fn optional_string_map(
        &mut self,
        key: &str,
    ) -> Result<Option<BTreeMap<String, String>>, TaskError> {
        match self.parameters.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(entries)) => entries
                .into_iter()
                .map(|(name, value)| match value {
                    Value::String(s) => Ok((name, s)),
                    _ => Err(wrong_type(key, "an object of string values")),
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Some),
            Some(_) => Err(wrong_type(key, "an object of string values")),
        }
    }

    fn into_record(self) -> ParameterRecord {
        ParameterRecord {
            input_file: self.input_file,
            output_file: self.output_file,
            parameters: self.parameters,
        }
    }

    /// Reject parameter keys the schema did not consume.
    fn finish(self) -> Result<(), TaskError> {
        if let Some(key) = self.parameters.keys().next() {
            return Err(TaskError::ExtractionFailure(format!(
                "unexpected parameter '{key}'"
            )));
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn missing(field: &str) -> TaskError {
    TaskError::ExtractionFailure(format!("missing required field '{field}'"))
}

fn wrong_type(field: &str, expected: &str) -> TaskError {
    TaskError::ExtractionFailure(format!("field '{field}' must be {expected}"))
}
