use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use corenet_dns::{
    CancellationToken, ClientConfig, Provider, Record, RecordProvider, config::DEFAULT_BASE_URL,
};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, rename_all = "kebab-case")]
struct Cli {
    /// API login name
    #[arg(long, env = "CORENETWORKS_USER", value_name = "USER")]
    user: String,
    /// API password
    #[arg(long, env = "CORENETWORKS_PASSWORD", value_name = "PASSWORD", hide_env_values = true)]
    password: String,
    /// Base URL of the core-networks API
    #[arg(long, env = "CORENETWORKS_API_URL", value_name = "URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,
    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List zones of the account
    Zones,
    /// Show details of one zone
    Zone { zone: String },
    /// List records of a zone
    List { zone: String },
    /// Create records whose name and type are not present yet
    Append {
        zone: String,
        /// Record as NAME:TYPE:TTL:DATA (repeat for multiple values)
        #[arg(long = "record", value_name = "RECORD", required = true, value_parser = parse_record)]
        records: Vec<Record>,
    },
    /// Create or update records
    Set {
        zone: String,
        /// Record as NAME:TYPE:TTL:DATA (repeat for multiple values)
        #[arg(long = "record", value_name = "RECORD", required = true, value_parser = parse_record)]
        records: Vec<Record>,
    },
    /// Delete records; empty fields match anything
    Delete {
        zone: String,
        /// Record as NAME:TYPE:TTL:DATA (repeat for multiple values)
        #[arg(long = "record", value_name = "RECORD", required = true, value_parser = parse_record)]
        records: Vec<Record>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::new(&cli.user, &cli.password)
        .with_base_url(&cli.api_url)
        .with_timeout(Duration::from_secs(cli.timeout));
    let provider = Provider::new(&config).context("failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    run(&provider, cli.command, &cancel).await
}

async fn run(provider: &Provider, command: Command, cancel: &CancellationToken) -> Result<()> {
    match command {
        Command::Zones => {
            for zone in provider.zones(cancel).await.context("failed to list zones")? {
                println!("{}\t{}", zone.name, zone.zone_type);
            }
        }
        Command::Zone { zone } => {
            let details = provider
                .zone(&zone, cancel)
                .await
                .with_context(|| format!("failed to fetch zone {zone}"))?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::List { zone } => {
            let records = provider
                .get_records(&zone, cancel)
                .await
                .with_context(|| format!("failed to list records of {zone}"))?;
            for record in records {
                println!("{record}");
            }
        }
        Command::Append { zone, records } => {
            report(provider.append_records(&zone, &records, cancel).await, records.len())?
        }
        Command::Set { zone, records } => {
            report(provider.set_records(&zone, &records, cancel).await, records.len())?
        }
        Command::Delete { zone, records } => {
            report(provider.delete_records(&zone, &records, cancel).await, records.len())?
        }
    }
    Ok(())
}

fn report(outcome: Result<Vec<Record>, corenet_dns::BatchError>, requested: usize) -> Result<()> {
    match outcome {
        Ok(applied) => {
            for record in &applied {
                println!("{record}");
            }
            if applied.len() < requested {
                warn!("{} of {requested} record(s) were not applied", requested - applied.len());
            }
            Ok(())
        }
        Err(err) => {
            for record in &err.applied {
                println!("{record}");
            }
            error!("some records may already be applied; list the zone to confirm");
            Err(err.into())
        }
    }
}

fn parse_record(input: &str) -> Result<Record> {
    let mut parts = input.splitn(4, ':');
    let (Some(name), Some(rtype), Some(ttl), Some(data)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("expected NAME:TYPE:TTL:DATA, got '{input}'");
    };

    let ttl = if ttl.is_empty() {
        0
    } else {
        ttl.parse::<u64>()
            .with_context(|| format!("invalid TTL '{ttl}'"))?
    };

    Ok(Record::new(
        name,
        rtype.to_ascii_uppercase(),
        data,
        Duration::from_secs(ttl),
    ))
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if let Err(err) = signal::ctrl_c().await {
        error!("failed to install CTRL+C handler: {err}");
        return;
    }
    info!("interrupt received, abandoning remaining requests");
    cancel.cancel();
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
