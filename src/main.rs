use std::path::{Path, PathBuf};

use clap::Parser;
use saml_idp_config::{
    AppState, build_app_with_body_limit,
    config::AppConfig,
    observability,
    schema::{ConfigSchema, FieldKind, IdpConfigSchema, RawFields},
    store,
};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(version, about = "SAML2 IdP binding configuration service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Validate a TOML table of raw IdP fields and print the resulting record
    Validate {
        /// TOML file with one `key = value` per field
        file: PathBuf,
    },
    /// Print the IdP configuration fields and their defaults
    Fields,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Validate { file }) => run_validate(&file),
        Some(Command::Fields) => run_fields(),
        Some(Command::Serve) | None => run_server(args.config.as_deref()).await,
    }
}

fn load_config(path: Option<&Path>) -> AppConfig {
    let Some(path) = path else {
        return AppConfig::default();
    };

    match AppConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

async fn run_server(config_path: Option<&Path>) {
    let config = load_config(config_path);

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    tracing::info!(
        config_file = ?config_path.map(Path::display),
        "Starting IdP configuration service"
    );

    let store = match store::from_config(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open IdP configuration store");
            std::process::exit(1);
        }
    };

    let state = AppState::new(store)
        .with_default_logout_url(config.server.default_logout_url.as_str());
    let app = build_app_with_body_limit(state, config.server.body_limit_bytes);

    let bind_addr = config.server.socket_addr();
    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Validate raw fields read from a TOML file
fn run_validate(file: &Path) {
    let raw = match read_raw_fields(file) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match IdpConfigSchema.validate(&raw) {
        Ok(config) => match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        Err(errors) => {
            eprintln!("{} invalid field(s) in {}:", errors.errors().len(), file.display());
            for error in errors.errors() {
                eprintln!("  {:<26} {}", error.field(), error);
            }
            std::process::exit(1);
        }
    }
}

/// Read a flat TOML table into raw string fields. Booleans become `1`/`0`.
fn read_raw_fields(file: &Path) -> Result<RawFields, String> {
    let contents = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    let table: toml::Table = toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", file.display(), e))?;

    table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Boolean(b) => (if b { "1" } else { "0" }).to_string(),
                toml::Value::Integer(i) => i.to_string(),
                other => {
                    return Err(format!(
                        "Field '{}' must be a string, boolean or integer, got {}",
                        key,
                        other.type_str()
                    ));
                }
            };
            Ok((key, value))
        })
        .collect()
}

/// Print the field table
fn run_fields() {
    for spec in IdpConfigSchema.fields() {
        let widget = match spec.kind {
            FieldKind::YesNo => "yes/no".to_string(),
            FieldKind::Select { options } => format!("one of {}", options.join(" | ")),
            FieldKind::Text { max_length } => format!("text, max {max_length} chars"),
            FieldKind::Url => "http(s) URL".to_string(),
            FieldKind::Hidden => "hidden".to_string(),
        };
        println!("{}", spec.key);
        println!("  {}", spec.label);
        println!("  widget:  {widget}");
        if let Some(default) = spec.default {
            println!("  default: {default:?}");
        }
        println!("  {}", spec.help);
        println!();
    }
}
