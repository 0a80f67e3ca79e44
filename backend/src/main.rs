//! Boardsync CLI - validate and format monday.com column values
//!
//! # Main Commands
//!
//! ```bash
//! boardsync serve                          # Start HTTP server (port 3000)
//! boardsync validate status "done"         # Check a value against a board column
//! boardsync format rating_1 4              # Print the wire value for a column
//! boardsync tool create_board_item --args '{"item_name": "Acme"}'
//! ```
//!
//! # Board Inspection
//!
//! ```bash
//! boardsync columns                        # Columns with validation rules
//! boardsync column status                  # One column
//! ```
//!
//! # Offline Commands (no board needed)
//!
//! ```bash
//! boardsync check --type date "15/03/2024"
//! boardsync check --type status --settings '{"labels": {"1": "Done"}}' don
//! boardsync types                          # Supported column types
//! ```
//!
//! Values are parsed as JSON when possible, otherwise taken as strings.
//! Results go to stdout as JSON; diagnostics go to stderr (`RUST_LOG`).

use std::sync::Arc;

use boardsync::models::Settings;
use boardsync::{BoardTools, Config, HandlerRegistry, LocationCache, NominatimGeocoder};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "boardsync")]
#[command(about = "Validate and format monday.com board column values", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Show board info and every column with its validation rules
    Columns,

    /// Show one column
    Column {
        /// Column id
        id: String,
    },

    /// Validate a value against a board column (id or title)
    Validate {
        column: String,
        value: String,
    },

    /// Print the wire value for a board column
    Format {
        column: String,
        value: String,
    },

    /// Validate and format a value for a column type, without a board
    Check {
        /// Column type tag (e.g. status, date, phone)
        #[arg(short = 't', long = "type")]
        column_type: String,

        /// Column settings as JSON
        #[arg(short, long)]
        settings: Option<String>,

        value: String,
    },

    /// List supported column types
    Types,

    /// Call a board tool
    Tool {
        /// Tool name (see `GET /api/tools`)
        name: String,

        /// Tool arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => cmd_serve(port).await,
        Commands::Columns => cmd_columns().await,
        Commands::Column { id } => cmd_column(&id).await,
        Commands::Validate { column, value } => cmd_validate(&column, &value).await,
        Commands::Format { column, value } => cmd_format(&column, &value).await,
        Commands::Check {
            column_type,
            settings,
            value,
        } => cmd_check(&column_type, settings.as_deref(), &value).await,
        Commands::Types => cmd_types(),
        Commands::Tool { name, args } => cmd_tool(&name, args.as_deref()).await,
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

/// Logs to stderr so stdout carries only JSON.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boardsync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

type CmdResult = Result<bool, Box<dyn std::error::Error>>;

/// JSON when it parses, the raw string otherwise.
fn parse_cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn succeeded(result: &Value) -> bool {
    result.get("success").and_then(Value::as_bool).unwrap_or(true)
}

fn load_tools() -> Result<BoardTools, Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    Ok(BoardTools::from_config(&config))
}

async fn cmd_serve(port: u16) -> CmdResult {
    let tools = Arc::new(load_tools()?);
    if let Err(e) = tools.schema().initialize().await {
        // the server still starts; tools report the error per call
        tracing::warn!(error = %e, "board schema not loaded at startup");
    }
    boardsync::server::start_server(port, tools).await?;
    Ok(true)
}

async fn cmd_columns() -> CmdResult {
    let tools = load_tools()?;
    let info = tools.board_schema_resource().await;
    print_json(&info)?;
    Ok(succeeded(&info))
}

async fn cmd_column(id: &str) -> CmdResult {
    let tools = load_tools()?;
    let column = tools.column_resource(id).await;
    print_json(&column)?;
    Ok(succeeded(&column))
}

async fn cmd_validate(column: &str, raw: &str) -> CmdResult {
    let tools = load_tools()?;
    let out = tools.validate_column_value(column, &parse_cli_value(raw)).await;
    print_json(&out)?;
    let valid = out
        .pointer("/validation/is_valid")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(valid)
}

async fn cmd_format(column: &str, raw: &str) -> CmdResult {
    let tools = load_tools()?;
    let schema = tools.schema();
    schema.ensure_fresh().await?;
    let column_id = schema.resolve_column_id(column)?;

    match schema.format_value(&column_id, &parse_cli_value(raw)).await {
        Ok(wire) => {
            print_json(&json!({ "column_id": column_id, "value": wire }))?;
            Ok(true)
        }
        Err(e) => {
            print_json(&json!({ "column_id": column_id, "code": e.code(), "error": e.to_string() }))?;
            Ok(false)
        }
    }
}

async fn cmd_check(column_type: &str, settings: Option<&str>, raw: &str) -> CmdResult {
    let config = Config::from_env()?;
    let geocoder = Arc::new(NominatimGeocoder::new(
        config.geocoder_url.clone(),
        config.geocoder_user_agent.clone(),
        config.geocode_timeout,
    ));
    let registry = HandlerRegistry::with_location_cache(
        geocoder,
        Arc::new(LocationCache::with_capacity(config.location_cache_capacity)),
    );

    let handler = registry
        .get(column_type)
        .ok_or_else(|| format!("No handler available for column type: {}", column_type))?;
    let settings = match settings {
        Some(raw) => Settings::from_json_str(raw)?,
        None => Settings::default(),
    };

    let formatted = handler.format_value(&parse_cli_value(raw), &settings).await?;
    print_json(&serde_json::to_value(&formatted)?)?;
    Ok(formatted.validation_result.is_valid)
}

fn cmd_types() -> CmdResult {
    let registry = HandlerRegistry::new(Arc::new(NominatimGeocoder::default()));
    for tag in registry.supported_types() {
        println!("{}", tag);
    }
    Ok(true)
}

async fn cmd_tool(name: &str, args: Option<&str>) -> CmdResult {
    let args = match args {
        Some(raw) => serde_json::from_str::<Value>(raw)?,
        None => json!({}),
    };
    let tools = load_tools()?;
    let out = tools.call(name, &args).await;
    print_json(&out)?;
    Ok(succeeded(&out))
}
