use crate::cli::{Cli, RowsAction};
use crate::commands::session::Session;
use crate::commands::{CommandError, Result};
use crate::output::{format_output, OutputData};
use flowdesk_core::Mutation;
use serde_json::Value;

pub async fn run_set(cli: &Cli, connector: &str, assignments: &[String]) -> Result<()> {
    let mutations = assignments
        .iter()
        .map(|raw| parse_assignment(raw).map(|(key, value)| Mutation::SetField { key, value }))
        .collect::<Result<Vec<_>>>()?;
    apply(cli, connector, mutations).await
}

pub async fn run_rows(cli: &Cli, action: RowsAction) -> Result<()> {
    let connector = action.connector().to_string();
    let mutation = match action {
        RowsAction::Add { column, row, .. } => {
            let row: Value = serde_json::from_str(&row).map_err(|e| {
                CommandError::InvalidArgument(format!("row must be a JSON object: {}", e))
            })?;
            if !row.is_object() {
                return Err(CommandError::InvalidArgument(
                    "row must be a JSON object".to_string(),
                ));
            }
            Mutation::AddRow { column, row }
        }
        RowsAction::Remove { column, index, .. } => Mutation::RemoveRow { column, index },
        RowsAction::Up { column, order, .. } => Mutation::MoveRowUp { column, order },
        RowsAction::Down { column, order, .. } => Mutation::MoveRowDown { column, order },
    };
    apply(cli, &connector, vec![mutation]).await
}

async fn apply(cli: &Cli, connector: &str, mutations: Vec<Mutation>) -> Result<()> {
    let session = Session::open(cli, connector).await?;
    for mutation in mutations {
        session.handle.edit(mutation).await?;
    }
    session.wait_for_save().await?;

    let snapshot = session.handle.snapshot().await?;
    session.close();
    format_output(&OutputData::Connector(snapshot), &cli.output)
}

/// Splits `key=value`. The value is read as JSON when it parses, else as a plain string.
pub fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        CommandError::InvalidArgument(format!("expected KEY=VALUE, got '{}'", raw))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CommandError::InvalidArgument(format!(
            "missing key in '{}'",
            raw
        )));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
