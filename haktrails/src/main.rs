//! haktrails CLI Application
//!
//! Streams domains from stdin through the SecurityTrails API. This binary
//! resolves configuration, sets up logging and hands the selected command
//! to haktrails-lib.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use haktrails_lib::{load_env_config, parse_timeout_string, ConfigManager, EnvConfig, FileConfig};
use haktrails_lib::{CommandRegistry, Engine, OutputMode, RecordType, TrailsConfig, TrailsError};
use std::process;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for haktrails
#[derive(Parser, Debug)]
#[command(name = "haktrails")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stream domains from stdin through the SecurityTrails API")]
#[command(
    long_about = "Stream domains from stdin through the SecurityTrails API.\n\nEach input line is looked up concurrently; results go to stdout and per-domain errors to stderr."
)]
#[command(disable_help_subcommand = true)]
#[command(styles = STYLES)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Number of concurrent workers. Keep in mind that the API has rate limits [default: 2]
    #[arg(short = 't', long = "threads", value_name = "N", global = true)]
    pub threads: Option<usize>,

    /// Hostnames per request for the submit command [default: 100]
    #[arg(short = 'b', long = "batch-size", value_name = "N", global = true)]
    pub batch_size: Option<usize>,

    /// Config file location
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config: Option<String>,

    /// Output format: list, or json for the raw API payload [default: list]
    #[arg(short = 'o', long = "output", value_name = "FORMAT", global = true)]
    pub output: Option<OutputMode>,

    /// Per-request timeout, e.g. 30s or 2m; 0 disables it [default: 30s]
    #[arg(long = "timeout", value_name = "DURATION", global = true)]
    pub timeout: Option<String>,

    /// Show progress logs on stderr
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Show request-level debug logs on stderr
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Subdomains of each domain
    Subdomains,
    /// Domains associated with each domain
    #[command(name = "associateddomains")]
    AssociatedDomains,
    /// IPs whose PTR record contains each domain
    #[command(name = "associatedips")]
    AssociatedIps,
    /// Company owning each domain
    Company,
    /// Current DNS records of each domain
    Details,
    /// Tags of each domain
    Tags,
    /// Current WHOIS data of each domain
    Whois,
    /// Historical DNS records of each domain
    #[command(name = "historicaldns")]
    HistoricalDns {
        /// DNS record type: a, aaaa, mx, ns, soa, txt
        #[arg(long = "type", value_name = "TYPE", default_value = "a")]
        record_type: RecordType,
    },
    /// Historical WHOIS contact emails of each domain
    #[command(name = "historicalwhois")]
    HistoricalWhois,
    /// Submit hostnames to SecurityTrails in batches
    Submit,
    /// Run a DSL query (https://docs.securitytrails.com/docs/how-to-use-the-dsl)
    Dsl {
        /// The query to run
        #[arg(long = "query", value_name = "QUERY")]
        query: Option<String>,
    },
    /// Check that the API key works
    Ping,
    /// Show API quota usage
    Usage,
    /// Show the banner
    Banner,
    /// Show the usage hint
    Help,
}

impl Commands {
    /// Registry name of the command, or `None` for the local ones.
    fn remote_name(&self) -> Option<&'static str> {
        match self {
            Commands::Subdomains => Some("subdomains"),
            Commands::AssociatedDomains => Some("associateddomains"),
            Commands::AssociatedIps => Some("associatedips"),
            Commands::Company => Some("company"),
            Commands::Details => Some("details"),
            Commands::Tags => Some("tags"),
            Commands::Whois => Some("whois"),
            Commands::HistoricalDns { .. } => Some("historicaldns"),
            Commands::HistoricalWhois => Some("historicalwhois"),
            Commands::Submit => Some("submit"),
            Commands::Dsl { .. } => Some("dsl"),
            Commands::Ping => Some("ping"),
            Commands::Usage => Some("usage"),
            Commands::Banner | Commands::Help => None,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    let command = match &args.command {
        Some(command) => command.clone(),
        None => {
            ui::print_hint();
            process::exit(1);
        }
    };

    let name = match command.remote_name() {
        Some(name) => name,
        None => {
            match command {
                Commands::Banner => ui::print_banner(),
                _ => ui::print_hint(),
            }
            return;
        }
    };

    if let Err(e) = run_command(name, &args).await {
        ui::print_fatal(&fatal_message(&e));
        process::exit(1);
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins; otherwise `-d` selects debug, `-v` info, and the
/// default only shows warnings.
fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve configuration, then run one command over stdin.
async fn run_command(name: &str, args: &Args) -> Result<(), TrailsError> {
    let registry = CommandRegistry::builtin();
    let handler = registry
        .get(name)
        .ok_or_else(|| TrailsError::internal(format!("unknown command '{}'", name)))?;

    let config = build_config(args)?;
    tracing::info!(
        "{} with {} workers, output {}",
        name,
        config.concurrency,
        config.output_mode
    );

    let engine = Engine::new(config)?;
    let summary = engine.run(handler, tokio::io::stdin()).await?;

    tracing::info!(
        "done: {} items, {} calls, {} succeeded, {} failed",
        summary.items_read,
        summary.calls,
        summary.succeeded,
        summary.failed
    );
    Ok(())
}

/// Build configuration with proper precedence.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (SECURITYTRAILS_KEY, HAKTRAILS_*)
/// 3. Config file (--config, HAKTRAILS_CONFIG, or discovered files)
/// 4. Built-in defaults
fn build_config(args: &Args) -> Result<TrailsConfig, TrailsError> {
    let env_config = load_env_config();
    let config_manager = ConfigManager::new();

    let file_config = match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => {
            tracing::debug!("using explicit config file {}", path);
            config_manager.load_file(path)?
        }
        None => config_manager.discover_and_load(),
    };

    let config = merge_file_config(TrailsConfig::default(), file_config)?;
    let config = apply_environment_config(config, &env_config);
    let config = apply_cli_args(config, args)?;
    config.validate()?;
    Ok(config)
}

/// Apply values from a config file.
fn merge_file_config(
    mut config: TrailsConfig,
    file_config: FileConfig,
) -> Result<TrailsConfig, TrailsError> {
    if let Some(api) = file_config.securitytrails {
        if let Some(key) = api.key {
            config = config.with_api_key(key);
        }
        if let Some(base_url) = api.base_url {
            config = config.with_base_url(base_url);
        }
    }

    if let Some(defaults) = file_config.defaults {
        if let Some(threads) = defaults.threads {
            config = config.with_concurrency(threads);
        }
        if let Some(batch_size) = defaults.batch_size {
            config = config.with_batch_size(batch_size);
        }
        if let Some(output) = defaults.output {
            config = config.with_output_mode(output.parse()?);
        }
        if let Some(timeout) = defaults.timeout {
            config = config.with_timeout(Some(parse_timeout(&timeout)?));
        }
    }

    Ok(config)
}

/// Apply environment variables. Invalid values were already dropped.
fn apply_environment_config(mut config: TrailsConfig, env_config: &EnvConfig) -> TrailsConfig {
    if let Some(key) = &env_config.api_key {
        config = config.with_api_key(key.clone());
    }
    if let Some(base_url) = &env_config.base_url {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(threads) = env_config.threads {
        config = config.with_concurrency(threads);
    }
    if let Some(batch_size) = env_config.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(output) = env_config.output {
        config = config.with_output_mode(output);
    }
    if let Some(timeout) = env_config.timeout {
        config = config.with_timeout(Some(timeout));
    }
    config
}

/// Apply CLI arguments (highest precedence).
fn apply_cli_args(mut config: TrailsConfig, args: &Args) -> Result<TrailsConfig, TrailsError> {
    if let Some(threads) = args.threads {
        config = config.with_concurrency(threads);
    }
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(output) = args.output {
        config = config.with_output_mode(output);
    }
    if let Some(timeout) = &args.timeout {
        config = config.with_timeout(Some(parse_timeout(timeout)?));
    }

    match &args.command {
        Some(Commands::HistoricalDns { record_type }) => {
            config = config.with_record_type(*record_type);
        }
        Some(Commands::Dsl { query: Some(query) }) => {
            config = config.with_query(query.clone());
        }
        _ => {}
    }

    Ok(config)
}

fn parse_timeout(value: &str) -> Result<std::time::Duration, TrailsError> {
    parse_timeout_string(value).ok_or_else(|| {
        TrailsError::config(format!(
            "Invalid timeout '{}'. Use format like '30s', '2m', or 0 to disable",
            value
        ))
    })
}

/// Fatal errors are printed behind our own `Error:` prefix, so drop the
/// variant's.
fn fatal_message(err: &TrailsError) -> String {
    match err {
        TrailsError::Config { message } => message.clone(),
        other => other.to_string(),
    }
}
