use sqlx::{Row, TypeInfo, ValueRef};
use tax_core::RepositoryError;

/// Reads a text column, NULL as an empty string.
///
/// Date and amount columns have TEXT affinity, so SQLite converts numbers
/// written by other tools to text on insert. Only a BLOB can still arrive
/// here as something else, and that is an error.
pub fn get_text(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<String, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    if value_ref.is_null() {
        return Ok(String::new());
    }

    let type_info = value_ref.type_info();
    match type_info.name() {
        "TEXT" => row.try_get(column).map_err(|e| {
            RepositoryError::Database(format!("Failed to get TEXT from '{}': {}", column, e))
        }),
        other => Err(RepositoryError::Database(format!(
            "Unexpected type '{}' for column '{}'",
            other, column
        ))),
    }
}

/// Like [`get_text`], but NULL is `None`.
pub fn get_optional_text(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Option<String>, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    if value_ref.is_null() {
        return Ok(None);
    }

    get_text(row, column).map(Some)
}
