//! uplift CLI
//!
//! Command-line interface for the uplift daemon

use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use serde::Serialize;
use uplift_api::requests::{CancelRequest, UpgradeRequest};
use uplift_client::{HttpClient, WsClient};

mod output;

#[derive(Parser)]
#[command(name = "uplift")]
#[command(about = "Middleware upgrade orchestration CLI", long_about = None)]
struct Cli {
    /// Daemon base URL
    #[arg(long, env = "UPLIFT_URL", default_value = "http://127.0.0.1:8081", global = true)]
    url: String,

    /// Print raw JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade one component on one host
    Upgrade {
        /// Host identifier
        host: String,
        /// Component name
        component: String,
        /// Version to install
        version: String,
        /// Recorded as the upgrade's actor
        #[arg(long, default_value = "CLI_USER")]
        actor: String,
        /// Wait for the upgrade to finish and print its audit record
        #[arg(long)]
        wait: bool,
    },
    /// Cancel a running upgrade
    Cancel {
        /// Host identifier
        host: String,
        /// Component name
        component: String,
    },
    /// List all hosts
    Hosts,
    /// Show one host with its components
    Host {
        /// Host identifier
        id: String,
    },
    /// Show the audit trail
    History {
        /// Only this host, most recent first
        #[arg(long)]
        host: Option<String>,
    },
    /// List running upgrades
    Active,
    /// Stream upgrade events
    Watch,
}

fn print<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

/// Poll until the target is no longer running
async fn wait_until_idle(client: &HttpClient, host: &str, component: &str) -> Result<()> {
    loop {
        let active = client.active_upgrades().await?;
        let running = active
            .iter()
            .any(|a| a.host_id == host && a.component_name.eq_ignore_ascii_case(component));
        if !running {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = HttpClient::new(&cli.url)?;
    tracing::debug!(url = %cli.url, "using daemon");

    match cli.command {
        Commands::Upgrade {
            host,
            component,
            version,
            actor,
            wait,
        } => {
            let accepted = client
                .trigger_upgrade(&UpgradeRequest {
                    host_id: host.clone(),
                    component_name: component,
                    target_version: version,
                    actor,
                })
                .await?;
            print(cli.json, &accepted, output::accepted)?;

            if wait {
                wait_until_idle(&client, &accepted.host_id, &accepted.component_name).await?;
                let history = client.history(Some(&host)).await?;
                let record = history
                    .iter()
                    .find(|r| r.component_name == accepted.component_name)
                    .ok_or_else(|| eyre::eyre!("upgrade finished without an audit record"))?;
                print(cli.json, record, output::record)?;
                if record.status != "SUCCESS" {
                    eyre::bail!("upgrade {}", record.status);
                }
            }
        }
        Commands::Cancel { host, component } => {
            client
                .cancel_upgrade(&CancelRequest {
                    host_id: host.clone(),
                    component_name: component.clone(),
                })
                .await?;
            println!("cancellation requested for {host}/{component}");
        }
        Commands::Hosts => {
            let hosts = client.list_hosts().await?;
            print(cli.json, &hosts, |h| output::hosts(h))?;
        }
        Commands::Host { id } => {
            let host = client.get_host(&id).await?;
            print(cli.json, &host, output::host)?;
        }
        Commands::History { host } => {
            let records = client.history(host.as_deref()).await?;
            print(cli.json, &records, |r| output::history(r))?;
        }
        Commands::Active => {
            let active = client.active_upgrades().await?;
            print(cli.json, &active, |a| output::active(a))?;
        }
        Commands::Watch => {
            let mut events = WsClient::connect(client.events_url()?).await?;
            while let Some(event) = events.recv().await {
                if cli.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{}", output::event(&event));
                }
            }
        }
    }

    Ok(())
}
