//! fileshare
//!
//! Shares one folder with every device on the local network over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use daemon::config::{default_config_path, Config};
use daemon::network::{advertised_addr, local_ip, share_url};
use daemon::orchestrator::{OrchestratorEvent, ShareOrchestrator};
use daemon::ui::qr::ShareCode;

/// fileshare - share a folder with every device on your network.
#[derive(Parser, Debug)]
#[command(name = "fileshare")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

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
    /// Start sharing a folder
    Start {
        /// Folder to share (overrides the configured root)
        #[arg(long, short, value_name = "DIR")]
        folder: Option<PathBuf>,

        /// Address to bind (default: 0.0.0.0)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Port to listen on (default: 5000, 0 picks a free port)
        #[arg(long, short)]
        port: Option<u16>,

        /// Also save the share QR code as a PNG file
        #[arg(long, value_name = "FILE")]
        qr_png: Option<PathBuf>,

        /// Do not print the QR code
        #[arg(long)]
        no_qr: bool,
    },

    /// Print the QR code for the share URL without starting the server
    Qr {
        /// Port the server listens on (default: configured port)
        #[arg(long, short)]
        port: Option<u16>,

        /// Output format for the QR code
        #[arg(long, short, value_enum, default_value = "terminal")]
        format: QrFormat,

        /// Output file path for PNG format (defaults to ./fileshare-qr.png)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// Output format for QR codes.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrFormat {
    /// Display as text in terminal
    Terminal,
    /// Generate a PNG QR code
    Png,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    // Init must work even when the existing file no longer parses.
    if let Commands::Config(ConfigCommands::Init { force }) = cli.command {
        return init_config(&config_path, force);
    }

    let mut config = Config::load(&config_path)?;
    let overrides = config.apply_env_overrides();

    let _log_guard = daemon::logging::init(
        &config.daemon.log_level,
        cli.verbose,
        config.daemon.log_file.as_deref(),
    )?;
    for env_override in &overrides {
        env_override.log();
    }
    tracing::debug!("Using config file: {}", config_path.display());

    match cli.command {
        Commands::Start {
            folder,
            bind,
            port,
            qr_png,
            no_qr,
        } => {
            if let Some(folder) = folder {
                config.share.root = Some(folder);
            }
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let mut orchestrator = ShareOrchestrator::new(config)?;
            run_server(&mut orchestrator, qr_png.as_deref(), !no_qr).await?;
        }
        Commands::Qr {
            port,
            format,
            output,
        } => {
            let port = port.unwrap_or(config.server.port);
            let url = share_url(std::net::SocketAddr::new(local_ip(), port));
            let code = ShareCode::new(url.as_str())?;

            match format {
                QrFormat::Terminal => {
                    println!("\nScan this QR code to open the share:\n");
                    println!("{}", code.to_terminal(false));
                    println!("URL: {}", url);
                }
                QrFormat::Png => {
                    let output_path = output.unwrap_or_else(|| PathBuf::from("fileshare-qr.png"));
                    code.save_png(&output_path)?;
                    println!("QR code saved to: {}", output_path.display());
                    println!("URL: {}", url);
                }
            }
        }
        Commands::Config(ConfigCommands::Show) => {
            print!("{}", config.to_toml()?);
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            init_config(&config_path, force)?;
        }
    }

    Ok(())
}

/// Write a default configuration file.
fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    Config::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Start the server, print how to reach it and run until a shutdown signal.
async fn run_server(
    orchestrator: &mut ShareOrchestrator,
    qr_png: Option<&Path>,
    print_qr: bool,
) -> anyhow::Result<()> {
    // Subscribe before starting so no event is missed.
    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                OrchestratorEvent::StateChanged(state) => {
                    tracing::debug!("Server state: {:?}", state);
                }
                OrchestratorEvent::Listening { addr } => {
                    tracing::debug!("Listener bound to {}", addr);
                }
                OrchestratorEvent::DeviceConnected(device) => {
                    tracing::info!("Device connected: {}", device);
                }
                OrchestratorEvent::FilesUploaded { names } => {
                    tracing::info!("Uploaded: {}", names.join(", "));
                }
                OrchestratorEvent::Error { message } => {
                    tracing::error!("Server error: {}", message);
                }
            }
        }
    });

    let bound = orchestrator.start().await?;
    let url = share_url(advertised_addr(bound));

    match &orchestrator.config().share.root {
        Some(root) => println!("Sharing {} at {}", root.display(), url),
        None => println!("Server running at {} (no folder selected)", url),
    }

    let code = ShareCode::new(url.as_str())?;
    if print_qr {
        println!("\nScan to open on your phone:\n");
        println!("{}", code.to_terminal(false));
    }
    if let Some(path) = qr_png {
        code.save_png(path)?;
        println!("QR code saved to: {}", path.display());
    }
    println!("Press Ctrl+C to stop.");

    wait_for_shutdown_signal().await;
    tracing::info!("Received shutdown signal");

    orchestrator.stop().await?;
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to register SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT");
        }
    }
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
