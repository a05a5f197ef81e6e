//! webos-remote
//!
//! Command-line remote control for webOS televisions.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use remote::config::{default_config_path, Config};
use remote::protocol::operations::OPERATIONS;
use remote::WebOsClient;
use serde_json::Value;

/// webos-remote - control a webOS television from the command line.
#[derive(Parser, Debug)]
#[command(name = "webos-remote")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Television address (overrides the configuration)
    #[arg(short, long, global = true, value_name = "ADDR")]
    pub address: Option<String>,

    /// Key file (overrides the configuration)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub key_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Pair with the television (accept the prompt on screen)
    Pair,

    /// Turn the television off
    PowerOff,

    /// Turn the television on
    PowerOn,

    /// Show or change the volume
    Volume {
        #[command(subcommand)]
        action: Option<VolumeAction>,
    },

    /// Mute or unmute
    Mute {
        /// true to mute, false to unmute
        #[arg(action = ArgAction::Set)]
        state: bool,
    },

    /// List installed apps
    Apps,

    /// Show the foreground app
    CurrentApp,

    /// Launch an app
    Launch {
        /// App id
        app: String,

        /// Launch parameters as a JSON object
        #[arg(long, value_name = "JSON")]
        params: Option<String>,
    },

    /// Close an app
    CloseApp {
        /// App id
        app: String,
    },

    /// List external inputs
    Inputs,

    /// Switch to an external input
    SetInput {
        /// Input id
        input: String,
    },

    /// List TV channels
    Channels,

    /// Show or change the TV channel
    Channel {
        #[command(subcommand)]
        action: Option<ChannelAction>,
    },

    /// Media playback controls
    Media {
        /// Action to perform
        #[arg(value_enum)]
        action: MediaAction,
    },

    /// Show a notification on screen
    Notify {
        /// Message text
        message: String,

        /// Icon file to show next to the message
        #[arg(long, value_name = "FILE")]
        icon: Option<PathBuf>,
    },

    /// Open a URL in the browser
    OpenUrl {
        /// URL to open
        url: String,
    },

    /// Close the web browser
    CloseWeb,

    /// Show software information
    SoftwareInfo,

    /// List services offered by the television
    Services,

    /// Run any operation by name
    Call {
        /// Operation name (see `operations`)
        operation: String,

        /// Payload as a JSON object
        #[arg(long, value_name = "JSON")]
        payload: Option<String>,
    },

    /// List the available operations
    Operations,

    /// Write the effective configuration to the config file
    InitConfig {
        /// Replace an existing file
        #[arg(long, short)]
        force: bool,
    },
}

/// Subcommands for volume control.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum VolumeAction {
    /// Show the current volume
    Get,

    /// Set the volume (negative values become 0)
    Set {
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },

    /// Raise the volume one step
    Up,

    /// Lower the volume one step
    Down,
}

/// Subcommands for channel control.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ChannelAction {
    /// Show the current channel
    Current,

    /// Show programme information for the current channel
    Info,

    /// Next channel
    Up,

    /// Previous channel
    Down,

    /// Switch to a channel by id
    Set {
        /// Channel id
        id: String,
    },
}

/// Media playback actions.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    Play,
    Pause,
    Stop,
    Rewind,
    FastForward,
    Close,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Apply environment variable overrides, then command-line overrides
    config.apply_env_overrides();
    if let Some(address) = &cli.address {
        config.device.address = address.clone();
    }
    if let Some(key_file) = &cli.key_file {
        config.device.key_file = Some(key_file.clone());
    }

    // Initialize tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.log_level.to_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Operations => {
            print_operations();
            return Ok(());
        }
        Commands::InitConfig { force } => {
            let path = cli.config.clone().unwrap_or_else(default_config_path);
            config.save(&path, force)?;
            println!("Configuration written to {}", path.display());
            return Ok(());
        }
        _ => {}
    }

    config.validate()?;

    let client = WebOsClient::new(config.client_config())?;
    run_command(&client, cli.command).await
}

async fn run_command(client: &WebOsClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Pair => {
            client.register().await?;
            if client.is_registered().await {
                println!(
                    "Paired with {} (key stored in {})",
                    client.address(),
                    client.key_file().display()
                );
            } else {
                anyhow::bail!("{} did not issue a client key", client.address());
            }
        }
        Commands::PowerOff => client.power_off().await?,
        Commands::PowerOn => client.power_on().await?,
        Commands::Volume { action } => match action.unwrap_or(VolumeAction::Get) {
            VolumeAction::Get => println!("{}", client.get_volume().await?),
            VolumeAction::Set { level } => client.set_volume(level).await?,
            VolumeAction::Up => client.volume_up().await?,
            VolumeAction::Down => client.volume_down().await?,
        },
        Commands::Mute { state } => client.set_mute(state).await?,
        Commands::Apps => print_json(&client.get_apps().await?)?,
        Commands::CurrentApp => match client.get_current_app().await? {
            Some(app) => println!("{}", app),
            None => println!("unknown"),
        },
        Commands::Launch { app, params } => match params {
            Some(params) => {
                let params = parse_json("--params", &params)?;
                client.launch_app_with_params(&app, params).await?;
            }
            None => client.launch_app(&app).await?,
        },
        Commands::CloseApp { app } => client.close_app(&app).await?,
        Commands::Inputs => print_json(&client.get_inputs().await?)?,
        Commands::SetInput { input } => client.set_input(&input).await?,
        Commands::Channels => print_json(&client.get_channels().await?)?,
        Commands::Channel { action } => match action.unwrap_or(ChannelAction::Current) {
            ChannelAction::Current => print_json(&client.get_current_channel().await?)?,
            ChannelAction::Info => print_json(&client.get_channel_info().await?)?,
            ChannelAction::Up => client.channel_up().await?,
            ChannelAction::Down => client.channel_down().await?,
            ChannelAction::Set { id } => client.set_channel(&id).await?,
        },
        Commands::Media { action } => match action {
            MediaAction::Play => client.play().await?,
            MediaAction::Pause => client.pause().await?,
            MediaAction::Stop => client.stop().await?,
            MediaAction::Rewind => client.rewind().await?,
            MediaAction::FastForward => client.fast_forward().await?,
            MediaAction::Close => client.close().await?,
        },
        Commands::Notify { message, icon } => {
            client.send_message(&message, icon.as_deref()).await?
        }
        Commands::OpenUrl { url } => client.open_url(&url).await?,
        Commands::CloseWeb => client.close_web().await?,
        Commands::SoftwareInfo => print_json(&client.get_software_info().await?)?,
        Commands::Services => print_json(&client.get_services().await?)?,
        Commands::Call { operation, payload } => {
            let payload = payload
                .map(|p| parse_json("--payload", &p))
                .transpose()?;
            let result = client.call(&operation, payload).await?;
            if !result.is_null() {
                print_json(&result)?;
            }
        }
        Commands::Operations => print_operations(),
        Commands::InitConfig { .. } => {
            anyhow::bail!("init-config does not talk to the television")
        }
    }

    Ok(())
}

fn parse_json(flag: &str, text: &str) -> anyhow::Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{} is not valid JSON", flag))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_operations() {
    let width = OPERATIONS.iter().map(|op| op.name.len()).max().unwrap_or(0);
    for op in OPERATIONS {
        println!(
            "{:<width$}  {:<7}  ssap://{}",
            op.name,
            op.kind.as_str(),
            op.endpoint,
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "webos-remote",
            "--address",
            "192.168.1.20",
            "--key-file",
            "/tmp/keys.json",
            "-v",
            "power-off",
        ])
        .unwrap();

        assert_eq!(cli.address.as_deref(), Some("192.168.1.20"));
        assert_eq!(cli.key_file, Some(PathBuf::from("/tmp/keys.json")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::PowerOff));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["webos-remote", "apps", "-a", "tv.lan"]).unwrap();
        assert_eq!(cli.address.as_deref(), Some("tv.lan"));
        assert!(matches!(cli.command, Commands::Apps));
    }

    #[test]
    fn test_volume_defaults_to_get() {
        let cli = Cli::try_parse_from(["webos-remote", "volume"]).unwrap();
        match cli.command {
            Commands::Volume { action } => assert_eq!(action, None),
            _ => panic!("Expected Volume command"),
        }
    }

    #[test]
    fn test_volume_set() {
        let cli = Cli::try_parse_from(["webos-remote", "volume", "set", "25"]).unwrap();
        match cli.command {
            Commands::Volume { action } => assert_eq!(action, Some(VolumeAction::Set { level: 25 })),
            _ => panic!("Expected Volume command"),
        }
    }

    #[test]
    fn test_volume_set_negative() {
        let cli = Cli::try_parse_from(["webos-remote", "volume", "set", "-5"]).unwrap();
        match cli.command {
            Commands::Volume { action } => assert_eq!(action, Some(VolumeAction::Set { level: -5 })),
            _ => panic!("Expected Volume command"),
        }
    }

    #[test]
    fn test_mute() {
        let cli = Cli::try_parse_from(["webos-remote", "mute", "false"]).unwrap();
        match cli.command {
            Commands::Mute { state } => assert!(!state),
            _ => panic!("Expected Mute command"),
        }

        assert!(Cli::try_parse_from(["webos-remote", "mute", "maybe"]).is_err());
    }

    #[test]
    fn test_launch_with_params() {
        let cli = Cli::try_parse_from([
            "webos-remote",
            "launch",
            "youtube.leanback.v4",
            "--params",
            r#"{"contentTarget":"abc"}"#,
        ])
        .unwrap();

        match cli.command {
            Commands::Launch { app, params } => {
                assert_eq!(app, "youtube.leanback.v4");
                assert_eq!(params.as_deref(), Some(r#"{"contentTarget":"abc"}"#));
            }
            _ => panic!("Expected Launch command"),
        }
    }

    #[test]
    fn test_channel_set() {
        let cli = Cli::try_parse_from(["webos-remote", "channel", "set", "1_12_4_0_0_1234_0"]).unwrap();
        match cli.command {
            Commands::Channel { action } => assert_eq!(
                action,
                Some(ChannelAction::Set {
                    id: "1_12_4_0_0_1234_0".to_string()
                })
            ),
            _ => panic!("Expected Channel command"),
        }
    }

    #[test]
    fn test_media_actions() {
        let cli = Cli::try_parse_from(["webos-remote", "media", "fast-forward"]).unwrap();
        match cli.command {
            Commands::Media { action } => assert_eq!(action, MediaAction::FastForward),
            _ => panic!("Expected Media command"),
        }

        assert!(Cli::try_parse_from(["webos-remote", "media", "eject"]).is_err());
    }

    #[test]
    fn test_notify_with_icon() {
        let cli = Cli::try_parse_from(["webos-remote", "notify", "Dinner is ready", "--icon", "bell.png"]).unwrap();
        match cli.command {
            Commands::Notify { message, icon } => {
                assert_eq!(message, "Dinner is ready");
                assert_eq!(icon, Some(PathBuf::from("bell.png")));
            }
            _ => panic!("Expected Notify command"),
        }
    }

    #[test]
    fn test_init_config() {
        let cli = Cli::try_parse_from(["webos-remote", "init-config"]).unwrap();
        assert!(matches!(cli.command, Commands::InitConfig { force: false }));

        let cli = Cli::try_parse_from([
            "webos-remote",
            "--config",
            "/tmp/tv.toml",
            "init-config",
            "--force",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::InitConfig { force: true }));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/tv.toml")));
    }

    #[test]
    fn test_call_with_payload() {
        let cli = Cli::try_parse_from([
            "webos-remote",
            "call",
            "set_volume",
            "--payload",
            r#"{"volume":5}"#,
        ])
        .unwrap();

        match cli.command {
            Commands::Call { operation, payload } => {
                assert_eq!(operation, "set_volume");
                assert_eq!(payload.as_deref(), Some(r#"{"volume":5}"#));
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_parse_json() {
        assert_eq!(
            parse_json("--payload", r#"{"volume":5}"#).unwrap(),
            serde_json::json!({ "volume": 5 })
        );

        let err = parse_json("--payload", "{volume").unwrap_err().to_string();
        assert!(err.contains("--payload"));
    }

    #[test]
    fn test_missing_command_fails() {
        assert!(Cli::try_parse_from(["webos-remote"]).is_err());
    }
}
