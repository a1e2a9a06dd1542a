//! Sort a JSON list of contacts.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::mismatched;
use crate::registry::TaskExecutor;

/// Stable-sorts an array of objects by a list of keys.
///
/// A record missing a key sorts before records that have it.
pub struct SortContactsExecutor {
    storage: Arc<Storage>,
}

impl SortContactsExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::SortContacts { input, output, keys } = params else {
            return Err(mismatched(Category::A4, params));
        };

        let contacts: Value = self.storage.read_json(input).await?;
        let Value::Array(mut contacts) = contacts else {
            return Err(TaskError::MalformedData(
                "contacts must be a JSON array".to_string(),
            ));
        };
        if contacts.iter().any(|c| !c.is_object()) {
            return Err(TaskError::MalformedData(
                "every contact must be a JSON object".to_string(),
            ));
        }

        contacts.sort_by(|a, b| {
            keys.iter()
                .map(|key| compare(a.get(key), b.get(key)))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        self.storage.write_json(output, &contacts).await?;
        Ok(Payload::from_iter([
            ("count".to_string(), json!(contacts.len())),
            ("sort_keys".to_string(), json!(keys)),
        ]))
    }
}

#[async_trait]
impl TaskExecutor for SortContactsExecutor {
    fn category(&self) -> Category {
        Category::A4
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgate_core::ErrorKind;
    use taskgate_sandbox::SandboxConfig;
    use tempfile::TempDir;

    fn setup(contacts: Value) -> (TempDir, SortContactsExecutor) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("contacts.json"), contacts.to_string()).unwrap();
        let storage = Arc::new(Storage::new(&SandboxConfig::new(dir.path())).unwrap());
        (dir, SortContactsExecutor::new(storage))
    }

    fn params(keys: &[&str]) -> TaskParams {
        TaskParams::SortContacts {
            input: "contacts.json".to_string(),
            output: "contacts-sorted.json".to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn read_sorted(dir: &TempDir) -> Value {
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("contacts-sorted.json")).unwrap())
            .unwrap()
    }

    #[tokio::test]
    async fn test_sorts_by_last_then_first_name() {
        let (dir, executor) = setup(json!([
            {"first_name": "Zoe", "last_name": "Adams", "email": "z@example.com"},
            {"first_name": "Bob", "last_name": "Clark"},
            {"first_name": "Amy", "last_name": "Adams"},
            {"first_name": "Nobody"}
        ]));

        let result = executor.execute(&params(&["last_name", "first_name"])).await;
        assert!(result.is_success());

        let names: Vec<_> = read_sorted(&dir)
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["first_name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Nobody", "Amy", "Zoe", "Bob"]);
    }

    #[tokio::test]
    async fn test_sort_is_stable() {
        let (dir, executor) = setup(json!([
            {"city": "Pune", "id": 1},
            {"city": "Agra", "id": 2},
            {"city": "Pune", "id": 3},
            {"city": "Agra", "id": 4}
        ]));

        assert!(executor.execute(&params(&["city"])).await.is_success());
        let ids: Vec<_> = read_sorted(&dir)
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[tokio::test]
    async fn test_rejects_non_array() {
        let (_dir, executor) = setup(json!({"first_name": "Ann"}));
        match executor.execute(&params(&["first_name"])).await {
            ExecutorResult::Failure(failure) => assert_eq!(failure.kind, ErrorKind::MalformedData),
            other => panic!("Expected Failure, got {other:?}"),
        }
    }
}
