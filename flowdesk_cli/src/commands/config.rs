use crate::cli::{Cli, ConfigAction, OutputFormat};
use crate::commands::session::{load_settings, settings_file};
use crate::commands::Result;
use crate::output::{format_output, OutputData};
use flowdesk_core::Settings;
use owo_colors::OwoColorize;
use serde_json::json;

pub async fn run(cli: &Cli, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => {
            let file = settings_file(cli);
            format_output(
                &OutputData::ConfigInfo(json!({
                    "path": file.path(),
                    "exists": file.exists(),
                })),
                &cli.output,
            )
        }
        ConfigAction::Init { force } => init_config(cli, force),
    }
}

fn show_config(cli: &Cli) -> Result<()> {
    let file = settings_file(cli);
    let settings = load_settings(cli)?;

    match cli.output {
        OutputFormat::Pretty => {
            println!();
            println!("{}", "Flowdesk Settings".bold().cyan());
            println!("{}", "=================".cyan());
            println!();
            let source = if file.exists() {
                file.path().display().to_string()
            } else {
                format!("{} (not found, using defaults)", file.path().display())
            };
            println!("Config file: {}", source.dimmed());
            println!();
            println!("  {:<16} {}", "base_url".cyan(), settings.base_url);
            println!(
                "  {:<16} {}",
                "worker_cluster".cyan(),
                settings
                    .worker_cluster
                    .as_deref()
                    .unwrap_or("(not set)")
            );
            println!("  {:<16} {} ms", "debounce".cyan(), settings.debounce_ms);
            println!();
            println!(
                "Environment overrides: {}",
                "FLOWDESK_BASE_URL, FLOWDESK_WORKER_CLUSTER, FLOWDESK_DEBOUNCE_MS".dimmed()
            );
            println!();
        }
        _ => {
            format_output(
                &OutputData::ConfigInfo(serde_json::to_value(&settings)?),
                &cli.output,
            )?;
        }
    }
    Ok(())
}

fn init_config(cli: &Cli, force: bool) -> Result<()> {
    let file = settings_file(cli);
    if file.exists() && !force {
        format_output(
            &OutputData::Message(format!(
                "{} already exists; pass --force to overwrite it",
                file.path().display()
            )),
            &cli.output,
        )?;
        return Ok(());
    }

    let mut settings = Settings::default();
    if let Some(base_url) = &cli.base_url {
        settings.base_url = base_url.clone();
    }
    settings.worker_cluster = cli.worker.clone();
    settings.validate()?;
    file.save(&settings)?;

    format_output(
        &OutputData::Message(format!("Wrote {}", file.path().display())),
        &cli.output,
    )
}
