use crate::cli::Cli;
use crate::commands::session::{spinner, Session};
use crate::commands::{CommandError, Result};
use crate::output::{format_output, OutputData};
use flowdesk_core::lifecycle::LifecycleAction;
use flowdesk_core::SyncError;

pub async fn validate(cli: &Cli, connector: &str) -> Result<()> {
    let session = Session::open(cli, connector).await?;
    let progress = spinner(cli.output, format!("Testing {}...", connector));
    let report = session.handle.validate().await;
    progress.finish_and_clear();
    session.close();

    let report = report?;
    let passed = report.is_success;
    format_output(
        &OutputData::Validation {
            connector: connector.to_string(),
            report,
        },
        &cli.output,
    )?;

    // non-zero exit for scripts
    if passed {
        Ok(())
    } else {
        Err(SyncError::ValidationFailure.into())
    }
}

pub async fn trigger(cli: &Cli, connector: &str, action: LifecycleAction) -> Result<()> {
    let session = Session::open(cli, connector).await?;
    let state = match action {
        LifecycleAction::Start => session.handle.start().await?,
        LifecycleAction::Stop => session.handle.stop().await?,
    };
    session.close();

    format_output(
        &OutputData::Lifecycle {
            connector: connector.to_string(),
            action,
            state,
        },
        &cli.output,
    )
}

pub async fn delete(cli: &Cli, connector: &str) -> Result<()> {
    let pipeline = cli.pipeline.clone().ok_or_else(|| {
        CommandError::InvalidArgument("deleting a connector needs --pipeline".to_string())
    })?;
    let session = Session::open(cli, connector).await?;
    let deleted = session.handle.delete().await?;
    session.close();

    format_output(
        &OutputData::Deleted {
            connector: connector.to_string(),
            pipeline,
            deleted,
        },
        &cli.output,
    )
}
