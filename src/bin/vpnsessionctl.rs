//! vpnsessionctl - VPN session inspection tool
//!
//! Works on the state directory of a vpnsession client: validates wire
//! documents, inspects the discovery cache and edits app settings.
//!
//! # Usage
//!
//! ```bash
//! # Validate a provider document and print it normalized
//! vpnsessionctl parse discovered-api info.json
//!
//! # Show and purge the discovery cache
//! vpnsessionctl --state-dir ~/.local/state/vpnsession cache show
//! vpnsessionctl cache purge
//!
//! # Force TCP for the next connection
//! vpnsessionctl settings set --force-tcp true
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use libvpnsession::preferences::{self, FilePreferenceStore, Preferences};
use libvpnsession::serializer;
use libvpnsession::vpn::{parse_ips_from_log_message, EngineLevel, OpenVpnProfileStore, VpnStatus};
use libvpnsession::{SessionConfig, SessionContext};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// VPN session inspection tool
#[derive(Parser, Debug)]
#[command(name = "vpnsessionctl")]
#[command(version)]
#[command(about = "Inspect and edit vpnsession client state", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State directory, overrides the configuration
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a wire document and print it normalized
    Parse {
        /// Document kind
        #[arg(value_enum)]
        kind: DocumentKind,
        /// File to read
        file: PathBuf,
    },

    /// Discovery cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// App settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// List stored preference documents
    Prefs,

    /// Extract tunnel addresses from an engine log line
    ParseLog { line: String },

    /// Map an engine level name to the user-facing status
    Level { name: String },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show cached discovery results
    Show,
    /// Remove expired discovery results
    Purge,
}

#[derive(Subcommand, Debug)]
enum SettingsCommands {
    /// Print current settings
    Get,
    /// Change settings
    Set {
        #[arg(long)]
        use_custom_tabs: Option<bool>,
        #[arg(long)]
        force_tcp: Option<bool>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DocumentKind {
    ProfileList,
    Instance,
    InstanceList,
    DiscoveredApi,
    MessageList,
    SavedTokens,
    SavedProfiles,
    SavedKeyPairs,
    DiscoveryCache,
    Settings,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose { "debug" } else { &cli.log_level };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("libvpnsession={},vpnsessionctl={}", log_level, log_level))
    });

    // Logs go to stderr, stdout carries command output
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Parse { kind, file } => handle_parse(*kind, file, cli),
        Commands::ParseLog { line } => handle_parse_log(line, cli),
        Commands::Level { name } => handle_level(name, cli),
        Commands::Cache(cmd) => handle_cache(cmd, cli).await,
        Commands::Settings(cmd) => handle_settings(cmd, cli).await,
        Commands::Prefs => handle_prefs(cli).await,
    }
}

fn load_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(dir) = &cli.state_dir {
        config.paths.state_dir = dir.clone();
    }
    debug!("Using state directory {:?}", config.paths.state_dir);
    Ok(config)
}

async fn open_context(cli: &Cli) -> Result<SessionContext> {
    let config = load_config(cli)?;
    let store = FilePreferenceStore::new(config.paths.state_dir.clone());
    let prefs = Preferences::new(Arc::new(store));
    SessionContext::load(config, prefs, Arc::new(OpenVpnProfileStore::new()))
        .await
        .context("loading session state")
}

fn print_output(cli: &Cli, json: Value, text: String) -> Result<()> {
    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json)?),
        OutputFormat::Text => println!("{}", text),
    }
    Ok(())
}

// === Documents ===

fn handle_parse(kind: DocumentKind, file: &Path, cli: &Cli) -> Result<()> {
    let content = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let value = serializer::parse_document(&content).with_context(|| format!("parsing {}", file.display()))?;
    let (normalized, summary) = normalize_document(kind, &value)
        .with_context(|| format!("{} is not a valid {:?} document", file.display(), kind))?;

    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&normalized)?),
        OutputFormat::Text => println!("OK: {}", summary),
    }
    Ok(())
}

/// Deserialize then serialize again, returning the result and a summary
fn normalize_document(kind: DocumentKind, value: &Value) -> Result<(Value, String)> {
    let out = match kind {
        DocumentKind::ProfileList => {
            let list = serializer::deserialize_profile_list(value)?;
            (serializer::serialize_profile_list(&list), format!("{} profile(s)", list.len()))
        }
        DocumentKind::Instance => {
            let instance = serializer::deserialize_instance(value)?;
            let summary = format!("instance {}", instance.base_uri);
            (serializer::serialize_instance(&instance), summary)
        }
        DocumentKind::InstanceList => {
            let list = serializer::deserialize_instance_list(value)?;
            let summary = format!("{} instance(s)", list.instances.len());
            (serializer::serialize_instance_list(&list), summary)
        }
        DocumentKind::DiscoveredApi => {
            let api = serializer::deserialize_discovered_api(value)?;
            let summary = format!("authorization endpoint {}", api.authorization_endpoint);
            (serializer::serialize_discovered_api(&api), summary)
        }
        DocumentKind::MessageList => {
            let list = serializer::deserialize_message_list(value)?;
            (serializer::serialize_message_list(&list), format!("{} message(s)", list.len()))
        }
        DocumentKind::SavedTokens => {
            let list = serializer::deserialize_saved_token_list(value)?;
            (serializer::serialize_saved_token_list(&list), format!("{} saved token(s)", list.len()))
        }
        DocumentKind::SavedProfiles => {
            let list = serializer::deserialize_saved_profile_list(value)?;
            (serializer::serialize_saved_profile_list(&list), format!("{} saved profile(s)", list.len()))
        }
        DocumentKind::SavedKeyPairs => {
            let list = serializer::deserialize_saved_key_pair_list(value)?;
            (serializer::serialize_saved_key_pair_list(&list), format!("{} saved key pair(s)", list.len()))
        }
        DocumentKind::DiscoveryCache => {
            let cache = serializer::deserialize_discovered_api_ttl_cache(value)?;
            let summary = format!("{} cache entries", cache.len());
            (serializer::serialize_discovered_api_ttl_cache(&cache), summary)
        }
        DocumentKind::Settings => {
            let settings = serializer::deserialize_app_settings(value)?;
            let summary = format!(
                "use_custom_tabs={} force_tcp={}",
                settings.use_custom_tabs, settings.force_tcp
            );
            (serializer::serialize_app_settings(&settings), summary)
        }
    };
    Ok(out)
}

fn handle_parse_log(line: &str, cli: &Cli) -> Result<()> {
    let addresses = parse_ips_from_log_message(line)
        .context("log line does not have the expected 7 comma separated fields")?;
    let json = json!({
        "ipv4": addresses.ipv4.map(|a| a.to_string()),
        "ipv6": addresses.ipv6.map(|a| a.to_string()),
    });
    print_output(cli, json, addresses.to_string())
}

fn handle_level(name: &str, cli: &Cli) -> Result<()> {
    let level: EngineLevel = name.parse()?;
    let status = VpnStatus::from(level);
    let json = json!({ "level": level.as_str(), "status": status.description() });
    print_output(cli, json, format!("{} -> {}", level, status))
}

// === State directory ===

async fn handle_cache(cmd: &CacheCommands, cli: &Cli) -> Result<()> {
    let ctx = open_context(cli).await?;

    match cmd {
        CacheCommands::Show => {
            let cache = ctx.discovery_cache_snapshot().await;
            let now = Utc::now();
            let mut entries: Vec<_> = cache.get_entries().iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let json_entries: Vec<Value> = entries
                .iter()
                .map(|(key, (inserted, api))| {
                    json!({
                        "key": key,
                        "entry_date": inserted.to_rfc3339(),
                        "expired": cache.get_at(key, now).is_none(),
                        "authorization_endpoint": api.authorization_endpoint,
                    })
                })
                .collect();

            let mut text = format!("TTL: {}s", cache.purge_after_seconds());
            for (key, (inserted, _)) in &entries {
                let state = if cache.get_at(key, now).is_some() { "valid" } else { "expired" };
                text.push_str(&format!("\n{}  {}  {}", key, inserted.format("%Y-%m-%d %H:%M:%S"), state));
            }

            let json = json!({
                "purge_after_seconds": cache.purge_after_seconds(),
                "entries": json_entries,
            });
            print_output(cli, json, text)
        }
        CacheCommands::Purge => {
            let removed = ctx.purge_discovery_cache().await?;
            print_output(cli, json!({ "removed": removed }), format!("Removed {} expired entries", removed))
        }
    }
}

async fn handle_settings(cmd: &SettingsCommands, cli: &Cli) -> Result<()> {
    let ctx = open_context(cli).await?;
    let prefs = ctx.preferences();

    let settings = match cmd {
        SettingsCommands::Get => prefs.app_settings().await?,
        SettingsCommands::Set { use_custom_tabs, force_tcp } => {
            let mut settings = prefs.app_settings().await?;
            if let Some(v) = use_custom_tabs {
                settings.use_custom_tabs = *v;
            }
            if let Some(v) = force_tcp {
                settings.force_tcp = *v;
            }
            ctx.config().ensure_directories()?;
            prefs.store_app_settings(&settings).await?;
            settings
        }
    };

    let text = format!(
        "use_custom_tabs: {}\nforce_tcp: {}",
        settings.use_custom_tabs, settings.force_tcp
    );
    print_output(cli, serializer::serialize_app_settings(&settings), text)
}

async fn handle_prefs(cli: &Cli) -> Result<()> {
    let ctx = open_context(cli).await?;
    let store = ctx.preferences().store();

    let mut json_entries = Vec::new();
    let mut text = String::from("KEY  SUMMARY");
    for key in store.keys().await? {
        let summary = match store.get(&key).await {
            Ok(Some(value)) => preferences::describe_document(&key, &value)
                .unwrap_or_else(|e| format!("invalid: {}", e)),
            Ok(None) => continue,
            Err(e) => format!("unreadable: {}", e),
        };
        text.push_str(&format!("\n{}  {}", key, summary));
        json_entries.push(json!({ "key": key, "summary": summary }));
    }
    print_output(cli, Value::Array(json_entries), text)
}
