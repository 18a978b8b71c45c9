use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use archipelago::{
    AppState, Config, create_router,
    gallery::Gallery,
    settings::{Settings, SettingsStore},
    startup_checks, webhook,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Manage gallery sections
    #[command(subcommand)]
    Section(SectionCommands),

    /// Inspect or reset the persisted display settings
    #[command(subcommand)]
    Settings(SettingsCommands),
}

#[derive(Subcommand, Debug)]
enum SectionCommands {
    /// List sections with their image counts
    List,
    /// Create a section (the name is sanitized)
    Create { name: String },
    /// Delete a section and every image in it
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum SettingsCommands {
    /// Print the effective settings as JSON
    Show,
    /// Overwrite the settings file with defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Section(cmd)) => handle_section_command(&config, cmd),
        Some(Commands::Settings(cmd)) => handle_settings_command(&config, cmd),
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, &cli.config, port, host, quit_after).await,
        None => {
            // Default to serve command if no subcommand specified
            run_server(config, &cli.config, None, None, None).await
        }
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        Ok(toml_edit::de::from_str::<Config>(&config_content)?)
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

fn handle_section_command(
    config: &Config,
    cmd: SectionCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let gallery = Gallery::new(config.storage.clone());
    gallery.initialize()?;

    match cmd {
        SectionCommands::List => {
            let sections = gallery.section_summaries();
            if sections.is_empty() {
                println!("No sections in {:?}", gallery.root());
            } else {
                println!("Sections in {:?}:", gallery.root());
                for section in sections {
                    println!("  {} ({} images)", section.name, section.image_count);
                }
            }
        }
        SectionCommands::Create { name } => match gallery.try_create_section(&name) {
            Ok(clean_name) => println!("Created section '{}'", clean_name),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        SectionCommands::Delete { name } => {
            let report = gallery.delete_section(&name)?;
            println!(
                "Removed {} files and {} directories",
                report.files_removed, report.dirs_removed
            );
            if !report.is_complete() {
                eprintln!(
                    "Warning: {} files and {} directories could not be removed",
                    report.files_failed, report.dirs_failed
                );
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn handle_settings_command(
    config: &Config,
    cmd: SettingsCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SettingsStore::new(config.storage.settings_path());

    match cmd {
        SettingsCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&store.load())?);
        }
        SettingsCommands::Reset => {
            if store.save(&Settings::default()) {
                println!("Settings reset to defaults in {:?}", store.path());
            } else {
                eprintln!("Error: failed to write {:?}", store.path());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_server(
    config: Config,
    config_path: &Path,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Configuration loaded from: {:?}", config_path);
    info!("Storage root: {:?}", config.storage.root);
    info!("Settings file: {:?}", config.storage.settings_path());

    // Perform startup checks
    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app_state = AppState::new(config);

    info!("Starting background webhook auto-ping checks every minute");
    webhook::start_auto_ping(
        app_state.webhook.clone(),
        app_state.settings_store.clone(),
        Duration::from_secs(60),
    );

    let app = create_router(app_state);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::sleep;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
