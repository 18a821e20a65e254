//! Settings Cascade CLI
//!
//! Entry point for the `settings-cascade` command-line tool.

use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use settings_cascade::config::DEFAULT_CONFIG_FILE;
use settings_cascade::{
    Edit, FsStore, MergeEngine, RpcHandler, ServiceConfig, SettingsService, SettingsStore, Subject,
    UpdateRequest,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Author recorded for edits made from the command line without `--author`.
const CLI_AUTHOR: &str = "cli";

#[derive(Parser)]
#[command(name = "settings-cascade")]
#[command(about = "Layered settings with optimistic concurrency", version)]
struct Cli {
    /// Path to service config file (default: ./settings-cascade.toml if present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Settings store directory (overrides store.root)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (overrides log.filter)
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged settings for a subject
    Get {
        /// Subject: global, org:<name>, or user:<name>
        subject: String,

        /// Print the full view (version, sources, digest) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set one top-level property on a subject's own settings
    Set {
        subject: String,

        key: String,

        /// New value, as JSON
        value: String,

        /// Version of the subject's document last seen (0 if none)
        #[arg(long)]
        last_version: u64,

        #[arg(long)]
        author: Option<String>,
    },

    /// Remove one top-level property from a subject's own settings
    Unset {
        subject: String,

        key: String,

        #[arg(long)]
        last_version: u64,

        #[arg(long)]
        author: Option<String>,
    },

    /// Merge settings files (lowest precedence first) and print the result
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List stored versions of a subject's settings
    History { subject: String },

    /// Manage organizations and users
    Subjects {
        #[command(subcommand)]
        action: SubjectsCommands,
    },

    /// Serve one JSON RPC request from stdin
    Rpc,
}

#[derive(Subcommand)]
enum SubjectsCommands {
    /// Register an organization
    AddOrg { name: String },

    /// Register a user
    AddUser {
        name: String,

        /// Organization the user belongs to (repeatable)
        #[arg(long = "org")]
        orgs: Vec<String>,
    },

    /// Add an existing user to an existing organization
    Join { user: String, org: String },
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter.as_str().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(message) = run(cli.command, &config) {
        eprintln!("Error: {}", message);
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ServiceConfig, String> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    let config_path = match &cli.config {
        Some(path) => Some(path.as_path()),
        None if default_path.exists() => Some(default_path),
        None => None,
    };

    let mut overrides = serde_json::Map::new();
    if let Some(store) = &cli.store {
        overrides.insert(
            "store".to_string(),
            serde_json::json!({ "root": store.to_string_lossy() }),
        );
    }
    if let Some(filter) = &cli.log_filter {
        overrides.insert("log".to_string(), serde_json::json!({ "filter": filter }));
    }
    let overrides = (!overrides.is_empty()).then(|| serde_json::Value::Object(overrides));

    ServiceConfig::build(config_path, overrides).map_err(|e| e.to_string())
}

fn run(command: Commands, config: &ServiceConfig) -> Result<(), String> {
    match command {
        Commands::Get { subject, json } => run_get(config, &subject, json),
        Commands::Set {
            subject,
            key,
            value,
            last_version,
            author,
        } => {
            let value: serde_json::Value =
                serde_json::from_str(&value).map_err(|e| format!("value is not valid JSON: {}", e))?;
            run_edit(config, &subject, key, Edit::Set(value), last_version, author)
        }
        Commands::Unset {
            subject,
            key,
            last_version,
            author,
        } => run_edit(config, &subject, key, Edit::Remove, last_version, author),
        Commands::Merge { files } => run_merge(config, &files),
        Commands::History { subject } => run_history(config, &subject),
        Commands::Subjects { action } => run_subjects(config, action),
        Commands::Rpc => {
            let handler = RpcHandler::new(open_service(config)?);
            handler.run().map_err(|e| format!("rpc I/O failed: {}", e))
        }
    }
}

fn open_store(config: &ServiceConfig) -> Result<Arc<FsStore>, String> {
    FsStore::open(&config.store_root)
        .map(Arc::new)
        .map_err(|e| format!("cannot open store at {}: {}", config.store_root.display(), e))
}

fn open_service(config: &ServiceConfig) -> Result<SettingsService, String> {
    Ok(SettingsService::with_store(open_store(config)?, config.merge_policy()))
}

fn parse_subject(subject: &str) -> Result<Subject, String> {
    subject.parse().map_err(|e| format!("{}", e))
}

fn run_get(config: &ServiceConfig, subject: &str, json: bool) -> Result<(), String> {
    let service = open_service(config)?;
    let merged = service
        .merged(&parse_subject(subject)?)
        .map_err(|e| e.to_string())?;

    let output = if json {
        serde_json::to_string_pretty(&merged.to_view()).map_err(|e| e.to_string())?
    } else {
        merged.to_pretty_json().map_err(|e| e.to_string())?
    };
    println!("{}", output);
    Ok(())
}

fn run_edit(
    config: &ServiceConfig,
    subject: &str,
    key: String,
    edit: Edit,
    last_version: u64,
    author: Option<String>,
) -> Result<(), String> {
    let service = open_service(config)?;
    let document = service
        .update_configuration(UpdateRequest {
            subject: parse_subject(subject)?,
            expected_version: last_version,
            key,
            edit,
            author: author.unwrap_or_else(|| CLI_AUTHOR.to_string()),
        })
        .map_err(|e| e.to_string())?;

    println!("{} now at version {}", document.subject, document.version);
    Ok(())
}

fn run_merge(config: &ServiceConfig, files: &[PathBuf]) -> Result<(), String> {
    let contents = files
        .iter()
        .map(|path| fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e)))
        .collect::<Result<Vec<_>, _>>()?;

    let engine = MergeEngine::new(config.merge_policy());
    let merged = engine.merge(contents.as_slice()).map_err(|e| {
        format!("{}: {}", files[e.index()].display(), e)
    })?;

    let output = cascade_merge::to_sorted_pretty(&merged).map_err(|e| e.to_string())?;
    println!("{}", output);
    Ok(())
}

fn run_history(config: &ServiceConfig, subject: &str) -> Result<(), String> {
    let store = open_store(config)?;
    let history = store
        .history(&parse_subject(subject)?)
        .map_err(|e| e.to_string())?;

    if history.is_empty() {
        println!("No settings stored for {}", subject);
        return Ok(());
    }

    println!("{:<8} {:<25} AUTHOR", "VERSION", "CREATED");
    for document in history {
        println!(
            "{:<8} {:<25} {}",
            document.version,
            document.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            document.author
        );
    }
    Ok(())
}

fn run_subjects(config: &ServiceConfig, action: SubjectsCommands) -> Result<(), String> {
    let store = open_store(config)?;
    match action {
        SubjectsCommands::AddOrg { name } => {
            let subject = store.register_org(&name).map_err(|e| e.to_string())?;
            println!("Registered {}", subject);
        }
        SubjectsCommands::AddUser { name, orgs } => {
            let subject = store.register_user(&name, &orgs).map_err(|e| e.to_string())?;
            println!("Registered {}", subject);
        }
        SubjectsCommands::Join { user, org } => {
            store.join(&user, &org).map_err(|e| e.to_string())?;
            println!("user:{} joined org:{}", user, org);
        }
    }
    Ok(())
}
