//! Pure edit operations over [`ConnectorConfig`].
//!
//! Every function returns a new config and leaves its input untouched. Table
//! fields are ordered sequences of row objects; row positions are 0-based and
//! shift down after a removal, so callers must not hold indices across one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SyncError;
use crate::model::ConnectorConfig;

/// One field-level edit, as the orchestrator receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    SetField { key: String, value: Value },
    AddRow { column: String, row: Value },
    RemoveRow { column: String, index: usize },
    MoveRowUp { column: String, order: usize },
    MoveRowDown { column: String, order: usize },
}

impl Mutation {
    pub fn apply(&self, config: &ConnectorConfig) -> ConnectorConfig {
        match self {
            Mutation::SetField { key, value } => set_field(config, key, value.clone()),
            Mutation::AddRow { column, row } => add_row(config, column, row.clone()),
            Mutation::RemoveRow { column, index } => remove_row(config, column, *index),
            Mutation::MoveRowUp { column, order } => move_row_up(config, column, *order),
            Mutation::MoveRowDown { column, order } => move_row_down(config, column, *order),
        }
    }

    /// Checks the preconditions [`Mutation::apply`] would otherwise panic on.
    pub fn check(&self, config: &ConnectorConfig) -> Result<(), SyncError> {
        let (column, index) = match self {
            Mutation::SetField { key, .. } if key.is_empty() => {
                return Err(SyncError::InvalidInput("field key is empty".to_string()))
            }
            Mutation::SetField { .. } => return Ok(()),
            Mutation::AddRow { column, .. } => {
                return match config.get(column) {
                    None | Some(Value::Null) | Some(Value::Array(_)) => Ok(()),
                    Some(_) => Err(SyncError::InvalidInput(format!(
                        "`{}` is not a table field",
                        column
                    ))),
                }
            }
            Mutation::RemoveRow { column, index }
            | Mutation::MoveRowUp {
                column,
                order: index,
            }
            | Mutation::MoveRowDown {
                column,
                order: index,
            } => (column, *index),
        };

        let rows = config
            .rows(column)
            .ok_or_else(|| SyncError::InvalidInput(format!("`{}` is not a table field", column)))?;
        if index >= rows.len() {
            return Err(SyncError::InvalidInput(format!(
                "row {} out of range for `{}` ({} rows)",
                index,
                column,
                rows.len()
            )));
        }
        Ok(())
    }
}

pub fn set_field(config: &ConnectorConfig, key: &str, value: Value) -> ConnectorConfig {
    config.with(key, value)
}

/// Appends `row` to the table at `column_key`, starting the table if the key is unset.
///
/// # Panics
/// If `column_key` holds a non-sequence value.
pub fn add_row(config: &ConnectorConfig, column_key: &str, row: Value) -> ConnectorConfig {
    let mut rows = match config.get(column_key) {
        None | Some(Value::Null) => Vec::new(),
        Some(_) => table_rows(config, column_key),
    };
    rows.push(row);
    config.with(column_key, Value::Array(rows))
}

/// # Panics
/// If `column_key` is not a table field or `index` is out of range.
pub fn remove_row(config: &ConnectorConfig, column_key: &str, index: usize) -> ConnectorConfig {
    let mut rows = table_rows(config, column_key);
    rows.remove(index);
    config.with(column_key, Value::Array(rows))
}

/// Swaps the row at `order` with the one above it. No-op for the first row.
///
/// # Panics
/// If `column_key` is not a table field.
pub fn move_row_up(config: &ConnectorConfig, column_key: &str, order: usize) -> ConnectorConfig {
    let mut rows = table_rows(config, column_key);
    if order == 0 || order >= rows.len() {
        return config.clone();
    }
    rows.swap(order - 1, order);
    config.with(column_key, Value::Array(rows))
}

/// Swaps the row at `order` with the one below it. No-op for the last row.
///
/// # Panics
/// If `column_key` is not a table field.
pub fn move_row_down(config: &ConnectorConfig, column_key: &str, order: usize) -> ConnectorConfig {
    let mut rows = table_rows(config, column_key);
    if order + 1 >= rows.len() {
        return config.clone();
    }
    rows.swap(order, order + 1);
    config.with(column_key, Value::Array(rows))
}

fn table_rows(config: &ConnectorConfig, column_key: &str) -> Vec<Value> {
    match config.rows(column_key) {
        Some(rows) => rows.clone(),
        None => panic!("`{}` is not a table field", column_key),
    }
}
