use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;

use bshlocal_lib::api::{BshLocalApi, DEFAULT_POLL_WAIT_SECONDS};
use bshlocal_lib::config::ClientConfig;
use bshlocal_lib::device::{dispatch_poll_results, Device, UpdatedService};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    handle_cli(cli).await
}

/// This struct defines the command line interface of the application
#[derive(Parser)]
#[clap(
    name = "bshlocal",
    about = "Talks to the local API of a smart-home controller",
    version
)]
pub struct Cli {
    /// YAML file with the connection settings
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// IP address of the controller (overrides the config file)
    #[clap(long, global = true)]
    pub ip: Option<String>,

    /// Port of the controller's local API (overrides the config file)
    #[clap(long, global = true)]
    pub port: Option<u16>,

    /// PEM client certificate registered with the controller (overrides the config file)
    #[clap(long, global = true)]
    pub cert: Option<PathBuf>,

    /// PEM private key of the client certificate (overrides the config file)
    #[clap(long, global = true)]
    pub key: Option<PathBuf>,

    /// Output format
    #[clap(short, long, value_enum, global = true, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// JSON format.
    Json,
    /// YAML format.
    Yaml,
}

/// Subcommands available for the CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Lists the rooms known to the controller.
    #[clap(name = "rooms")]
    Rooms,
    /// Lists the devices known to the controller.
    #[clap(name = "devices")]
    Devices,
    /// Reads or writes the state of one device service.
    #[clap(name = "service")]
    Service {
        #[clap(subcommand)]
        action: ServiceAction,
    },
    /// Subscribes to change notifications and prints every updated service state.
    #[clap(name = "watch")]
    Watch {
        /// Seconds the controller may hold each poll open
        #[clap(long, default_value_t = DEFAULT_POLL_WAIT_SECONDS)]
        wait: u32,

        /// Stop after this many polls instead of running until interrupted
        #[clap(long)]
        count: Option<usize>,
    },
}

/// Actions available under the `service` subcommand
#[derive(Subcommand)]
pub enum ServiceAction {
    /// Prints the current data of a device service.
    #[clap(name = "get")]
    Get {
        /// Device id, e.g. hdm:HomeMaticIP:3014F711A0000000000001
        #[clap(long)]
        device: String,

        /// Device service id, e.g. PowerSwitch
        #[clap(long)]
        service: String,
    },
    /// Writes a partial state to a device service.
    #[clap(name = "set")]
    Set {
        #[clap(long)]
        device: String,

        #[clap(long)]
        service: String,

        /// JSON object with the fields to change, e.g. '{"@type":"powerSwitchState","switchState":"ON"}'
        #[clap(long)]
        state: String,
    },
}

/// One line of `watch` output.
#[derive(Serialize)]
struct StateChange<'a> {
    device_id: &'a str,
    device_name: &'a str,
    service_id: &'a str,
    state: &'a serde_json::Map<String, serde_json::Value>,
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_yaml::from_str::<ClientConfig>(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => {
            let ip = cli
                .ip
                .clone()
                .ok_or_else(|| anyhow!("Either --config or --ip is required"))?;
            let cert = cli
                .cert
                .clone()
                .ok_or_else(|| anyhow!("Either --config or --cert is required"))?;
            let key = cli
                .key
                .clone()
                .ok_or_else(|| anyhow!("Either --config or --key is required"))?;
            ClientConfig::new(ip, cert, key)
        }
    };

    if let Some(ip) = &cli.ip {
        config.controller_ip = ip.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(cert) = &cli.cert {
        config.client_cert = cert.clone();
    }
    if let Some(key) = &cli.key {
        config.client_key = key.clone();
    }
    Ok(config)
}

fn print_output<T: Serialize>(output: OutputFormat, value: &T) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

async fn handle_cli(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let api = BshLocalApi::new(&config)
        .await
        .context("Failed to set up the controller connection")?;

    match cli.command {
        Commands::Rooms => {
            let rooms = api.get_rooms().await?;
            print_output(cli.output, &rooms)?;
        }
        Commands::Devices => {
            let devices = api.get_devices().await?;
            print_output(cli.output, &devices)?;
        }
        Commands::Service { action } => match action {
            ServiceAction::Get { device, service } => {
                let data = api.get_device_service(&device, &service).await?;
                print_output(cli.output, &data)?;
            }
            ServiceAction::Set {
                device,
                service,
                state,
            } => {
                let update: serde_json::Value =
                    serde_json::from_str(&state).context("--state is not valid JSON")?;
                if !update.is_object() {
                    return Err(anyhow!("--state must be a JSON object"));
                }
                api.put_device_service_state(&device, &service, &update)
                    .await?;
                print_output(
                    cli.output,
                    &json!({"device_id": device, "service_id": service, "state": update}),
                )?;
            }
        },
        Commands::Watch { wait, count } => {
            watch(&api, cli.output, wait, count).await?;
        }
    }

    Ok(())
}

async fn watch(
    api: &BshLocalApi,
    output: OutputFormat,
    wait: u32,
    count: Option<usize>,
) -> Result<()> {
    let mut devices = HashMap::new();
    for raw in api.get_devices().await? {
        let device = Device::new(api, raw).await?;
        devices.insert(device.id().to_string(), device);
    }
    info!("Watching {} device(s)", devices.len());

    let subscription = api.subscribe().await?;
    let mut polls = 0;

    let result: Result<()> = loop {
        if count.is_some_and(|count| polls >= count) {
            break Ok(());
        }

        let records = tokio::select! {
            records = subscription.poll_with_wait(wait) => records,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, unsubscribing");
                break Ok(());
            }
        };
        polls += 1;

        let records = match records {
            Ok(records) => records,
            Err(e) => break Err(e.into()),
        };
        let updated = match dispatch_poll_results(&mut devices, &records) {
            Ok(updated) => updated,
            Err(e) => break Err(e.into()),
        };
        if let Err(e) = print_changes(&devices, &updated, output) {
            break Err(e);
        }
    };

    if let Err(e) = subscription.unsubscribe().await {
        warn!("Failed to unsubscribe: {}", e);
    }
    result
}

fn print_changes(
    devices: &HashMap<String, Device>,
    updated: &[UpdatedService],
    output: OutputFormat,
) -> Result<()> {
    for change in updated {
        let Some(device) = devices.get(&change.device_id) else {
            continue;
        };
        let Some(service) = device.device_service(&change.service_id) else {
            continue;
        };
        let line = StateChange {
            device_id: device.id(),
            device_name: device.name(),
            service_id: service.id(),
            state: service.state(),
        };
        match output {
            OutputFormat::Json => println!("{}", serde_json::to_string(&line)?),
            OutputFormat::Yaml => println!("---\n{}", serde_yaml::to_string(&line)?),
        }
    }
    Ok(())
}
