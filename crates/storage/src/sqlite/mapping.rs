use serde_json::{Map, Value};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(id: u64) -> Result<i64, StorageError> {
    i64::try_from(id).map_err(|_| StorageError::Serialization("id overflow".into()))
}

pub(crate) fn id_from_i64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization("id sign overflow".into()))
}

/// Splits an entity into its JSON object fields, rejecting any other shape.
pub(crate) fn into_fields(entity: Value, what: &str) -> Result<Map<String, Value>, StorageError> {
    match entity {
        Value::Object(fields) => Ok(fields),
        _ => Err(StorageError::Serialization(format!(
            "{what} must be a JSON object"
        ))),
    }
}

/// Decodes a stored body and stamps it with the row id.
pub(crate) fn map_document_row(row: &sqlx::sqlite::SqliteRow) -> Result<Value, StorageError> {
    let id = id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let body: String = row.try_get("body").map_err(ser)?;
    let mut fields = into_fields(serde_json::from_str(&body)?, "stored document")?;
    fields.insert("id".into(), Value::from(id));
    Ok(Value::Object(fields))
}
