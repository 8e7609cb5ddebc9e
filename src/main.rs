mod billing;
mod cli;
mod config;
mod epics;
mod error;
mod mail;
mod orchestrator;

use billing::BillingReport;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::{BillingError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use orchestrator::Orchestrator;
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(&cli).await {
        let code = report_failure(&e, &mut std::io::stderr());
        std::process::exit(code);
    }
}

/// Print the run's error and return the process exit code
fn report_failure(err: &BillingError, out: &mut impl Write) -> i32 {
    let _ = writeln!(out, "Error: {}", err);
    1
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    // Handle subcommands
    if let Some(command) = &cli.command {
        return handle_command(command, cli);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.send {
        config.email.send_via_graph = true;
    }
    config.validate()?;

    run_billing(config, cli).await
}

async fn run_billing(config: Config, cli: &Cli) -> Result<()> {
    println!("story-billing v{}", env!("CARGO_PKG_VERSION"));

    let orchestrator = Orchestrator::new(config)?;

    let spinner = cli.show_spinner().then(|| {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Fetching statuses and stories from Epics...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        spinner
    });

    let result = orchestrator.run().await;

    let report = match (result, spinner) {
        (Ok(report), Some(spinner)) => {
            spinner.finish_with_message(format!(
                "Billed {} of {} stories",
                report.lines.len(),
                report.stories_fetched
            ));
            report
        }
        (Ok(report), None) => report,
        (Err(e), spinner) => {
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            return Err(e);
        }
    };

    print_report(&report, cli);

    if orchestrator.config().email.send_via_graph {
        orchestrator.send_report(&report).await?;
        println!("\nEmail sent to {}.", orchestrator.config().email.to.as_deref().unwrap_or("-"));
    } else {
        println!(
            "\nEmail NOT sent (SEND_VIA_GRAPH=false). Copy the body above into your email \
             client or enable Graph sending with --send."
        );
    }

    Ok(())
}

fn print_report(report: &BillingReport, cli: &Cli) {
    println!(
        "Generated at: {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if cli.show_text() {
        println!("\n=== EMAIL (Plain Text) ===");
        println!("{}", report.to_text());
    }

    if cli.show_html() {
        println!("\n=== EMAIL (HTML) ===");
        println!("{}", report.to_html());
    }
}

fn handle_command(command: &Commands, cli: &Cli) -> Result<()> {
    match command {
        Commands::Init { force } => {
            let config_path = match &cli.config {
                Some(path) => path.clone(),
                None => Config::default_config_path()?,
            };

            if config_path.exists() && !force {
                return Err(BillingError::config(format!(
                    "Config file already exists at: {} (use --force to overwrite)",
                    config_path.display()
                )));
            }

            Config::create_default_at(&config_path)?;
            println!("✓ Created config file at: {}", config_path.display());
            println!("\nSet your credentials either in that file or via environment:");
            println!("  MENDIX_PAT=<personal access token>");
            println!("  MENDIX_APP_ID=<app id>");
        }
        Commands::Config => {
            let config = Config::load(cli.config.as_deref())?;
            let toml_str = toml::to_string_pretty(&config.redacted())?;
            println!("Current configuration:\n");
            println!("{}", toml_str);
        }
    }
    Ok(())
}
