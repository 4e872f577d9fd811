//! Tables for connector settings.
//!
//! Fields print in form order (group, then position). Password values are
//! masked, table fields collapse to a row count here and get their own
//! table below the settings.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};
use flowdesk_core::{EditorSnapshot, FieldDefinition, FieldKind};
use serde_json::Value;

/// Terminal width for formatting (default fallback)
const DEFAULT_WIDTH: usize = 80;

/// Widest a single value may print before it is cut.
const MAX_VALUE_WIDTH: usize = 60;

pub const MASK: &str = "********";

pub fn connector_table(snapshot: &EditorSnapshot) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(terminal_width() as u16)
        .set_header(vec!["Field", "Value", "Type", "Group"]);

    let (Some(definition), Some(config)) = (&snapshot.definition, &snapshot.config) else {
        return table;
    };

    for field in definition.ordered() {
        let value = config
            .get(&field.key)
            .map(|v| display_value(Some(field), v))
            .unwrap_or_default();
        let missing = snapshot.missing_required.contains(&field.key);

        let mut label = field.display_name.clone();
        if field.required {
            label.push_str(" *");
        }
        if missing {
            label.push_str(" (missing)");
        } else if !field.editable {
            label.push_str(" (read-only)");
        }

        table.add_row(vec![
            Cell::new(label),
            Cell::new(value),
            Cell::new(format!("{:?}", field.kind).to_uppercase()),
            Cell::new(field.group.as_deref().unwrap_or("")),
        ]);
    }

    // settings the worker does not describe
    for (key, value) in config.as_map() {
        if definition.field(key).is_none() {
            table.add_row(vec![
                Cell::new(key),
                Cell::new(display_value(None, value)),
                Cell::new(""),
                Cell::new(""),
            ]);
        }
    }
    table
}

pub fn rows_table(field: &FieldDefinition, rows: &[Value]) -> Table {
    let columns: Vec<String> = if field.table_keys.is_empty() {
        rows.iter()
            .filter_map(|row| row.as_object())
            .flat_map(|row| row.keys().cloned())
            .fold(Vec::new(), |mut keys, key| {
                if !keys.contains(&key) {
                    keys.push(key);
                }
                keys
            })
    } else {
        field.table_keys.clone()
    };

    let mut header = vec!["#".to_string()];
    header.extend(columns.iter().cloned());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(terminal_width() as u16)
        .set_header(header);

    for (index, row) in rows.iter().enumerate() {
        let mut cells = vec![Cell::new(index)];
        for column in &columns {
            let value = row.get(column).map(|v| display_value(None, v)).unwrap_or_default();
            cells.push(Cell::new(value));
        }
        table.add_row(cells);
    }
    table
}

pub fn display_value(field: Option<&FieldDefinition>, value: &Value) -> String {
    let kind = field.map(|f| f.kind);
    match (kind, value) {
        (_, Value::Null) => String::new(),
        (Some(FieldKind::Password), Value::String(s)) if s.is_empty() => String::new(),
        (Some(FieldKind::Password), _) => MASK.to_string(),
        (Some(FieldKind::Table), Value::Array(rows)) => match rows.len() {
            1 => "1 row".to_string(),
            n => format!("{} rows", n),
        },
        (_, Value::String(s)) => truncate_str(s, MAX_VALUE_WIDTH),
        (_, other) => truncate_str(&other.to_string(), MAX_VALUE_WIDTH),
    }
}

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_WIDTH)
}
