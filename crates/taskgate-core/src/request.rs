//! Inbound task request.

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// A validated, immutable task description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    description: String,
}

impl TaskRequest {
    /// Validate a raw description.
    ///
    /// Rejects empty or whitespace-only text and text carrying control
    /// characters other than ordinary whitespace.
    pub fn new(description: impl Into<String>) -> Result<Self, TaskError> {
        let description = description.into();

        if description.trim().is_empty() {
            return Err(TaskError::InvalidInput(
                "task description is empty".to_string(),
            ));
        }

        if description
            .chars()
            .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(TaskError::InvalidInput(
                "task description contains control characters".to_string(),
            ));
        }

        Ok(Self { description })
    }

    /// The description text.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Consume and return the description.
    pub fn into_inner(self) -> String {
        self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_text() {
        let req = TaskRequest::new("Count the Wednesdays\nin /data/dates.txt").unwrap();
        assert!(req.description().starts_with("Count"));
    }

    #[test]
    fn test_rejects_blank() {
        assert!(matches!(
            TaskRequest::new("   \n\t"),
            Err(TaskError::InvalidInput(_))
        ));
        assert!(matches!(TaskRequest::new(""), Err(TaskError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_control_characters() {
        assert!(matches!(
            TaskRequest::new("read /data/a.txt\0"),
            Err(TaskError::InvalidInput(_))
        ));
    }
}
