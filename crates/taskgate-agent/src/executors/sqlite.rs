//! Read-only SQLite access through the sandbox.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{json, Value};

use taskgate_core::TaskError;
use taskgate_sandbox::Storage;

/// Resolve `database` inside the sandbox and return the path to open.
///
/// The path is re-validated by the storage layer; callers open it
/// immediately.
pub(super) async fn resolve(storage: &Storage, database: &str) -> Result<(PathBuf, String), TaskError> {
    let resolved = storage.resolve_for_open(database).await?;
    Ok((resolved.as_path().to_path_buf(), resolved.display_name()))
}

/// Open a database that cannot be written through this connection.
///
/// SQLite reads the file header lazily, so the schema version is queried
/// here to reject files that are not databases before any statement runs.
pub(super) fn open_read_only(path: &Path, name: &str) -> Result<Connection, TaskError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| TaskError::MalformedData(format!("{name} is not a usable SQLite database: {e}")))?;

    conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
        .map_err(|err| match query_error(err) {
            TaskError::MalformedData(_) => {
                TaskError::MalformedData(format!("{name} is not a SQLite database"))
            }
            other => other,
        })?;
    Ok(conn)
}

/// Map a failure while querying.
pub(super) fn query_error(err: rusqlite::Error) -> TaskError {
    match err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::NotADatabase =>
        {
            TaskError::MalformedData("file is not a SQLite database".to_string())
        }
        other => TaskError::ExecutionFailure(format!("query failed: {other}")),
    }
}

/// Convert one SQLite value to JSON.
pub(super) fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| json!(b)).collect()),
    }
}
