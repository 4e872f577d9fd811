use crate::cli::Cli;
use crate::commands::session::Session;
use crate::commands::Result;
use crate::output::{format_output, OutputData};

pub async fn run(cli: &Cli, connector: &str) -> Result<()> {
    let session = Session::open(cli, connector).await?;
    let snapshot = session.handle.snapshot().await?;
    session.close();
    format_output(&OutputData::Connector(snapshot), &cli.output)
}
