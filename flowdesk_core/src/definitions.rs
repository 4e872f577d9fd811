use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The form schema of one connector class, as advertised by a worker cluster.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorDefinition {
    pub class_name: String,
    #[serde(default)]
    pub definitions: Vec<FieldDefinition>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub key: String,
    pub display_name: String,
    #[serde(rename = "valueType")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_editable")]
    pub editable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub order_in_group: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    /// Column names of a TABLE field's rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_keys: Vec<String>,
}

fn default_editable() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    String,
    Number,
    Password, // Never echo these back to a terminal
    Table,
    Boolean,
    Class,
    List,
    #[serde(other)]
    Unknown,
}

impl FieldDefinition {
    pub fn is_table(&self) -> bool {
        self.kind == FieldKind::Table
    }
}

impl ConnectorDefinition {
    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.definitions.iter().find(|def| def.key == key)
    }

    /// Definitions in form order: by group, then by position inside the group.
    pub fn ordered(&self) -> Vec<&FieldDefinition> {
        let mut defs: Vec<&FieldDefinition> = self.definitions.iter().collect();
        defs.sort_by(|a, b| {
            a.group
                .cmp(&b.group)
                .then(a.order_in_group.cmp(&b.order_in_group))
        });
        defs
    }
}
