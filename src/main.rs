use anyhow::Result;
use clap::{Parser, Subcommand};

use xstat::cli;

#[derive(Debug, Parser)]
#[command(name = "xstat")]
#[command(about = "Status dashboard for the Xray core: observatory, traffic, balancers and DNS")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll the metrics endpoint and show the dashboard in the terminal
    Watch {
        /// Seconds between polls (default: general.refresh_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
        /// Fetch once, print and exit
        #[arg(long)]
        once: bool,
        /// Only show one tab: observatory, outbounds, inbounds, dns, fake_dns
        #[arg(long)]
        tab: Option<String>,
    },
    /// Decode a routing identifier against the config store
    Describe {
        /// Outbound chain (e.g. extra_inbound:in1@tcp_outbound:srv) or inbound tag
        tag: String,
        /// Treat the tag as an inbound tag
        #[arg(long)]
        inbound: bool,
        /// Output format: text (default), json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Serve the dashboard in the browser
    Web {
        /// Listen address (default: web.addr)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Check config, store, metrics endpoint and poll journal
    Health,
    /// Show poll journal statistics
    Stats {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        /// Only include the last N days of data
        #[arg(long)]
        days: Option<u32>,
    },
    /// Manage xstat configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.xstat/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `telemetry.port 28888`
    Set { key: String, value: String },
    /// Reset ~/.xstat/config.toml to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Watch {
            interval,
            once,
            tab,
        } => cli::run_watch(interval, once, tab.as_deref()),
        Commands::Describe {
            tag,
            inbound,
            format,
        } => cli::run_describe(&tag, inbound, format == "json"),
        Commands::Web { addr } => cli::run_web(addr.as_deref()),
        Commands::Health => cli::run_health(),
        Commands::Stats { format, days } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_stats(fmt, days)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
