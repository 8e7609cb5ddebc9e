use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "story-billing")]
#[command(author, version)]
#[command(
    about = "Billing summary for completed Mendix Epics stories",
    long_about = "story-billing fetches every story of a Mendix Epics project, prices the \
                  completed ones at a fixed rate per story point and prints the billing email \
                  as plain text and HTML. It can optionally send the email through Microsoft Graph. \
                  Settings come from a TOML config file and environment variables such as \
                  MENDIX_PAT and MENDIX_APP_ID."
)]
pub struct Cli {
    /// Path to config file (default: ~/.config/story-billing/config.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Send the email via Microsoft Graph (same as SEND_VIA_GRAPH=true)
    #[arg(long)]
    pub send: bool,

    /// Print only the plain-text email
    #[arg(long, conflicts_with = "html_only")]
    pub text_only: bool,

    /// Print only the HTML email
    #[arg(long)]
    pub html_only: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration (secrets masked)
    Config,
}

impl Cli {
    /// Default log filter for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Spinner only when log lines would not interleave with it
    pub fn show_spinner(&self) -> bool {
        self.verbose == 0
    }

    pub fn show_text(&self) -> bool {
        !self.html_only
    }

    pub fn show_html(&self) -> bool {
        !self.text_only
    }
}
