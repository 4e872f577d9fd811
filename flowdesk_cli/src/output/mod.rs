use crate::cli::OutputFormat;
use crate::commands::Result;
use flowdesk_core::lifecycle::LifecycleAction;
use flowdesk_core::{
    ConnectorConfig, ConnectorRuntimeState, EditorSnapshot, FieldKind, ValidationReport,
};
use serde::Serialize;
use serde_json::Value;

mod pretty;
use pretty::{connector_table, rows_table, MASK};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OutputData {
    Connector(EditorSnapshot),
    Validation {
        connector: String,
        report: ValidationReport,
    },
    Lifecycle {
        connector: String,
        action: LifecycleAction,
        state: Option<ConnectorRuntimeState>,
    },
    Deleted {
        connector: String,
        pipeline: String,
        deleted: bool,
    },
    ConfigInfo(Value),
    Message(String),
}

pub fn format_output(data: &OutputData, format: &OutputFormat) -> Result<()> {
    let masked;
    let data = match data {
        OutputData::Connector(snapshot) => {
            masked = OutputData::Connector(mask_secrets(snapshot));
            &masked
        }
        other => other,
    };
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        OutputFormat::Text => {
            format_text_output(data)?;
        }
        OutputFormat::Pretty => {
            format_pretty_output(data)?;
        }
    }
    Ok(())
}

/// Copy of the snapshot with every non-empty PASSWORD value replaced by the mask.
fn mask_secrets(snapshot: &EditorSnapshot) -> EditorSnapshot {
    let mut masked = snapshot.clone();
    let (Some(definition), Some(config)) = (&snapshot.definition, &snapshot.config) else {
        return masked;
    };
    let map = config
        .as_map()
        .iter()
        .map(|(key, value)| {
            let secret = definition
                .field(key)
                .is_some_and(|f| f.kind == FieldKind::Password);
            let value = match value {
                Value::Null => Value::Null,
                Value::String(s) if s.is_empty() => value.clone(),
                _ if secret => Value::String(MASK.to_string()),
                _ => value.clone(),
            };
            (key.clone(), value)
        })
        .collect();
    masked.config = Some(ConnectorConfig::from_map(map));
    masked
}

fn format_text_output(data: &OutputData) -> Result<()> {
    match data {
        OutputData::Connector(snapshot) => {
            if let Some(config) = &snapshot.config {
                for (key, value) in config.as_map() {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => serde_json::to_string(other)?,
                    };
                    println!("{}={}", key, value);
                }
            }
        }
        OutputData::Validation { connector, report } => {
            println!(
                "{}\t{}",
                connector,
                if report.is_success { "passed" } else { "failed" }
            );
        }
        OutputData::Lifecycle {
            connector, state, ..
        } => match state {
            Some(state) => println!("{}\t{}", connector, state),
            None => println!("{}\tunchanged", connector),
        },
        OutputData::Deleted {
            connector, deleted, ..
        } => {
            println!(
                "{}\t{}",
                connector,
                if *deleted { "deleted" } else { "not deleted" }
            );
        }
        OutputData::ConfigInfo(config) => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputData::Message(msg) => {
            println!("{}", msg);
        }
    }
    Ok(())
}

fn format_pretty_output(data: &OutputData) -> Result<()> {
    use owo_colors::OwoColorize;

    match data {
        OutputData::Connector(snapshot) => {
            let id = snapshot.connector_id.as_deref().unwrap_or("-");
            let name = snapshot.connector_name.as_deref().unwrap_or(id);
            println!();
            println!(
                "{} {} {} {}",
                name.cyan().bold(),
                format!("({})", id).dimmed(),
                "state:".dimmed(),
                state_colored(snapshot.runtime_state)
            );
            if let Some(definition) = &snapshot.definition {
                println!("{}", definition.class_name.dimmed());
            }
            println!();
            println!("{}", connector_table(snapshot));

            if let (Some(definition), Some(config)) = (&snapshot.definition, &snapshot.config) {
                for field in definition.ordered().into_iter().filter(|f| f.is_table()) {
                    let Some(rows) = config.rows(&field.key) else {
                        continue;
                    };
                    if rows.is_empty() {
                        continue;
                    }
                    println!();
                    println!("{}", field.display_name.bold());
                    println!("{}", rows_table(field, rows));
                }
            }

            if !snapshot.missing_required.is_empty() {
                println!();
                println!(
                    "{} {}",
                    "Missing required:".yellow().bold(),
                    snapshot.missing_required.join(", ").yellow()
                );
            }
            if !snapshot.topic_names.is_empty() {
                println!();
                println!(
                    "{} {}",
                    "Pipeline topics:".dimmed(),
                    snapshot.topic_names.join(", ")
                );
            }
            if let Some(saved) = snapshot.last_saved_at {
                println!();
                println!(
                    "{} {}",
                    "Saved at".green(),
                    saved.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            println!();
        }
        OutputData::Validation { connector, report } => {
            if report.is_success {
                println!("{} {}", "✓ Test passed for".green().bold(), connector.cyan());
            } else {
                println!("{} {}", "✗ Test failed for".red().bold(), connector.cyan());
            }
        }
        OutputData::Lifecycle {
            connector,
            action,
            state,
        } => match state {
            Some(state) => println!(
                "{} {} {}",
                connector.cyan().bold(),
                "is now".dimmed(),
                state_colored(*state)
            ),
            None => println!(
                "{} {:?} {} {}",
                "Could not".red().bold(),
                action,
                connector.cyan(),
                "(backend did not confirm)".dimmed()
            ),
        },
        OutputData::Deleted {
            connector,
            pipeline,
            deleted,
        } => {
            if *deleted {
                println!(
                    "{} {} {} {}",
                    "Deleted".green().bold(),
                    connector.cyan(),
                    "from pipeline".dimmed(),
                    pipeline
                );
            } else {
                println!("{} {}", "Could not delete".red().bold(), connector.cyan());
            }
        }
        OutputData::ConfigInfo(config) => {
            println!("{}", "Configuration".cyan().bold());
            println!();
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputData::Message(msg) => {
            println!("{}", msg);
        }
    }
    Ok(())
}

fn state_colored(state: ConnectorRuntimeState) -> String {
    use owo_colors::OwoColorize;

    match state {
        ConnectorRuntimeState::Running => state.to_string().green().to_string(),
        ConnectorRuntimeState::Failed => state.to_string().red().to_string(),
        ConnectorRuntimeState::Stopped => state.to_string().yellow().to_string(),
        ConnectorRuntimeState::Unknown => state.to_string().dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdesk_core::{ConnectorDefinition, Phase};
    use serde_json::json;

    fn snapshot() -> EditorSnapshot {
        let definition: ConnectorDefinition = serde_json::from_value(json!({
            "className": "c",
            "definitions": [
                {"key": "name", "displayName": "Name", "valueType": "STRING"},
                {"key": "secret", "displayName": "Secret", "valueType": "PASSWORD"},
                {"key": "token", "displayName": "Token", "valueType": "PASSWORD"}
            ]
        }))
        .unwrap();
        EditorSnapshot {
            connector_id: Some("c1".to_string()),
            connector_name: Some("perf".to_string()),
            pipeline_id: None,
            phase: Phase::Ready,
            dirty: false,
            validating: false,
            runtime_state: ConnectorRuntimeState::Running,
            definition: Some(definition),
            config: Some(
                serde_json::from_value(json!({"name": "perf", "secret": "s3cr3t", "token": ""}))
                    .unwrap(),
            ),
            topic_names: Vec::new(),
            missing_required: Vec::new(),
            load_error: None,
            last_saved_at: None,
        }
    }

    #[test]
    fn test_structured_output_masks_passwords() {
        let masked = mask_secrets(&snapshot());
        let config = masked.config.as_ref().unwrap();
        assert_eq!(config.get("secret"), Some(&json!(MASK)));
        assert_eq!(config.get("token"), Some(&json!("")));
        assert_eq!(config.get("name"), Some(&json!("perf")));

        let json = serde_json::to_string(&OutputData::Connector(masked.clone())).unwrap();
        assert!(!json.contains("s3cr3t"));
        let yaml = serde_yaml::to_string(&OutputData::Connector(masked)).unwrap();
        assert!(!yaml.contains("s3cr3t"));
    }
}
