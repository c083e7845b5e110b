use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use pinlink_lib::commands;
use pinlink_lib::pins::{Designation, PinId};
use pinlink_lib::{ClientSettings, SessionManager};

/// Configure and monitor the GPIO pins of a pinDesignation/pinValues device
#[derive(Parser)]
#[command(name = "pinlink", version)]
struct Cli {
    /// Device hostname or IP (defaults to `default_host` from the settings file)
    #[arg(long, global = true)]
    host: Option<String>,

    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the board layout
    Layout,
    /// Connect and print every pin's designation and value
    Show,
    /// Change one pin and push the configuration
    Set {
        #[arg(long)]
        pin: PinId,
        /// none, pwm, digital or fastled
        #[arg(long, value_parser = commands::parse_designation)]
        designation: Option<Designation>,
        #[arg(long, allow_negative_numbers = true)]
        value: Option<i32>,
        /// Print the payloads instead of pushing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Give every available pin the same designation and value, then push
    ApplyAll {
        #[arg(long, value_parser = commands::parse_designation)]
        designation: Designation,
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        value: i32,
        #[arg(long)]
        dry_run: bool,
    },
    /// Refresh periodically and print the pins until Ctrl-C
    Watch {
        /// Refresh interval in milliseconds (100-10000)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Print the device log
    Log {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Print device information
    DeviceInfo,
    /// Check that the device's web server answers
    Status,
    /// Manage the device's stored Wi-Fi networks
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },
}

#[derive(Subcommand)]
enum NetworkAction {
    /// List stored networks
    List,
    /// Store a network, replacing one with the same SSID
    Add {
        #[arg(long)]
        ssid: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        default: bool,
    },
    /// Forget a stored network
    Delete {
        #[arg(long)]
        ssid: String,
    },
    /// Join a network until the next restart
    Join {
        #[arg(long)]
        ssid: String,
        #[arg(long)]
        password: Option<String>,
    },
}

fn init_logging(settings: &ClientSettings, verbose: u8) {
    let level = match verbose {
        0 => settings.log_level.parse().unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    // RUST_LOG still wins when set
    builder.parse_env(env_logger::Env::default());
    let _ = builder.try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = ClientSettings::load(cli.config.as_deref())?;
    init_logging(&settings, cli.verbose);

    if let Command::Layout = cli.command {
        commands::print_layout(&settings.catalog());
        return Ok(());
    }

    let Some(host) = cli.host.clone().or_else(|| settings.default_host.clone()) else {
        bail!("No device given: pass --host or set default_host in the settings file");
    };
    let manager = SessionManager::from_settings(&settings);

    let result = match cli.command {
        Command::Layout => Ok(()),
        Command::Show => commands::show(&manager, &host).await,
        Command::Set {
            pin,
            designation,
            value,
            dry_run,
        } => commands::set_pin(&manager, &host, pin, designation, value, dry_run).await,
        Command::ApplyAll {
            designation,
            value,
            dry_run,
        } => commands::apply_all(&manager, &host, designation, value, dry_run).await,
        Command::Watch { interval_ms } => {
            let mut settings = settings.clone();
            if let Some(ms) = interval_ms {
                settings.refresh_interval_ms = ms;
            }
            commands::watch(&manager, &host, settings.refresh_interval()).await
        }
        Command::Log { limit } => commands::device_log(&manager, &host, limit).await,
        Command::DeviceInfo => commands::device_info(&manager, &host).await,
        Command::Status => commands::server_status(&manager, &host).await,
        Command::Network { action } => match action {
            NetworkAction::List => commands::list_networks(&manager, &host).await,
            NetworkAction::Add {
                ssid,
                password,
                default,
            } => commands::add_network(&manager, &host, &ssid, &password, default).await,
            NetworkAction::Delete { ssid } => commands::delete_network(&manager, &host, &ssid).await,
            NetworkAction::Join { ssid, password } => {
                commands::join_network(&manager, &host, &ssid, password.as_deref()).await
            }
        },
    };

    manager.close_all().await;
    result
}
