//! Padlock CLI - manage and back up a local password vault over WebDAV
//!
//! Local capture plus the full backup workflow: configure, test, backup,
//! list, restore, delete, and a foreground auto-backup watcher.

mod error;

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use padlock_core::backup::BackupService;
use padlock_core::config::WebDavConfig;
use padlock_core::db::{
    Database, PasswordRepository, SecureItemRepository, SqlitePasswordRepository,
    SqliteSecureItemRepository,
};
use padlock_core::models::BackupPreferences;
use padlock_core::remote::BackupFile;
use padlock_core::scheduler::{spawn_auto_backup, trigger_backup_now};
use padlock_core::{PasswordEntry, SecureItem, SecureItemType};
use serde::Serialize;

use crate::error::CliError;

const DEFAULT_WATCH_INTERVAL_SECS: u64 = 60 * 60;

#[derive(Parser)]
#[command(name = "padlock")]
#[command(about = "Back up a local password vault to a WebDAV server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to the local vault database file
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Test and store WebDAV server credentials
    Configure {
        /// Server base URL (http:// or https://)
        #[arg(long)]
        server_url: String,
        /// Basic auth username
        #[arg(long)]
        username: String,
        /// Basic auth password (or app password)
        #[arg(long)]
        password: String,
    },
    /// Remove stored WebDAV credentials
    Unconfigure,
    /// Show configuration and backup state
    Status,
    /// Test the stored connection
    Test,
    /// Create and upload a backup now
    Backup,
    /// List remote backups, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download a backup and merge it into the local vault
    Restore {
        /// Remote backup file name (see `padlock list`)
        name: String,
    },
    /// Delete a remote backup
    Delete {
        /// Remote backup file name
        name: String,
    },
    /// Show or update backup content preferences
    Prefs {
        /// Include password entries
        #[arg(long)]
        passwords: Option<bool>,
        /// Include TOTP authenticator items
        #[arg(long)]
        authenticators: Option<bool>,
        /// Include document items
        #[arg(long)]
        documents: Option<bool>,
        /// Include bank card items
        #[arg(long)]
        bank_cards: Option<bool>,
    },
    /// Switch scheduled backups on or off
    AutoBackup {
        /// Desired state
        #[arg(value_enum)]
        state: SwitchState,
    },
    /// Run the auto-backup trigger in the foreground
    Watch {
        /// Seconds between scheduled checks
        #[arg(long, default_value_t = DEFAULT_WATCH_INTERVAL_SECS)]
        interval_secs: u64,
    },
    /// Add a password entry to the local vault
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        website: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        favorite: bool,
    },
    /// List local password entries
    Entries {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a secure item to the local vault
    AddItem {
        /// Item category: totp, document, bank-card, or note
        #[arg(long)]
        item_type: String,
        #[arg(long)]
        title: String,
        /// Opaque item payload
        #[arg(long)]
        data: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        favorite: bool,
    },
    /// List local secure items
    Items {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum SwitchState {
    On,
    Off,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("padlock=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Configure {
            server_url,
            username,
            password,
        } => run_configure(&server_url, &username, &password, &db_path).await?,
        Commands::Unconfigure => run_unconfigure(&db_path)?,
        Commands::Status => run_status(&db_path)?,
        Commands::Test => run_test(&db_path).await?,
        Commands::Backup => run_backup(&db_path).await?,
        Commands::List { json } => run_list(json, &db_path).await?,
        Commands::Restore { name } => run_restore(&name, &db_path).await?,
        Commands::Delete { name } => run_delete(&name, &db_path).await?,
        Commands::Prefs {
            passwords,
            authenticators,
            documents,
            bank_cards,
        } => run_prefs(passwords, authenticators, documents, bank_cards, &db_path)?,
        Commands::AutoBackup { state } => run_auto_backup(state, &db_path)?,
        Commands::Watch { interval_secs } => run_watch(interval_secs, &db_path).await?,
        Commands::Add {
            title,
            website,
            username,
            password,
            notes,
            favorite,
        } => run_add(&title, &website, &username, &password, &notes, favorite, &db_path)?,
        Commands::Entries { json } => run_entries(json, &db_path)?,
        Commands::AddItem {
            item_type,
            title,
            data,
            notes,
            favorite,
        } => run_add_item(&item_type, &title, &data, &notes, favorite, &db_path)?,
        Commands::Items { json } => run_items(json, &db_path)?,
    }

    Ok(())
}

async fn run_configure(
    server_url: &str,
    username: &str,
    password: &str,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let config = WebDavConfig::new(server_url, username, password)?;

    service.test_and_save_config(config).await?;
    println!("Connection OK, configuration saved");
    Ok(())
}

fn run_unconfigure(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    service.config().clear_webdav_config()?;
    println!("WebDAV configuration cleared");
    Ok(())
}

fn run_status(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let config_service = service.config();

    match config_service.webdav_config()? {
        Some(config) => println!("Server:       {} (user {})", config.server_url, config.username),
        None => println!("Server:       not configured"),
    }

    let auto = config_service.auto_backup_enabled()?;
    println!("Auto backup:  {}", if auto { "on" } else { "off" });

    let now_ms = Utc::now().timestamp_millis();
    match config_service.last_backup_time()? {
        Some(timestamp_ms) => {
            println!("Last backup:  {}", format_relative_time(timestamp_ms, now_ms));
        }
        None => println!("Last backup:  never"),
    }

    println!(
        "Categories:   {}",
        prefs_summary(config_service.backup_preferences()?)
    );
    Ok(())
}

async fn run_test(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    service.test_connection().await?;
    println!("Connection OK");
    Ok(())
}

async fn run_backup(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let name = trigger_backup_now(&service).await?;
    println!("{name}");
    Ok(())
}

async fn run_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let files = service.list_backups().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("No remote backups.");
        return Ok(());
    }

    for line in format_backup_lines(&files) {
        println!("{line}");
    }
    Ok(())
}

async fn run_restore(name: &str, db_path: &Path) -> Result<(), CliError> {
    let name = normalize_backup_name(name)?;
    let service = open_service(db_path)?;

    let summary = service.restore_backup(&name).await?;
    println!("{summary}");
    Ok(())
}

async fn run_delete(name: &str, db_path: &Path) -> Result<(), CliError> {
    let name = normalize_backup_name(name)?;
    let service = open_service(db_path)?;

    service.delete_backup(&name).await?;
    println!("{name}");
    Ok(())
}

fn run_prefs(
    passwords: Option<bool>,
    authenticators: Option<bool>,
    documents: Option<bool>,
    bank_cards: Option<bool>,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let config_service = service.config();
    let current = config_service.backup_preferences()?;

    let updated = apply_pref_overrides(current, passwords, authenticators, documents, bank_cards);

    if updated != current {
        if !updated.has_any_enabled() {
            return Err(CliError::NoCategoriesEnabled);
        }
        config_service.save_backup_preferences(&updated)?;
    }

    println!("Categories: {}", prefs_summary(updated));
    Ok(())
}

fn run_auto_backup(state: SwitchState, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let enabled = state == SwitchState::On;
    service.config().set_auto_backup_enabled(enabled)?;

    if enabled {
        println!("Auto backup on. Run `padlock watch` to keep the trigger running.");
    } else {
        println!("Auto backup off.");
    }
    Ok(())
}

async fn run_watch(interval_secs: u64, db_path: &Path) -> Result<(), CliError> {
    let service = Arc::new(BackupService::new(open_database(db_path)?));

    if !service.config().is_configured()? {
        return Err(CliError::NotConfigured);
    }
    if !service.config().auto_backup_enabled()? {
        println!("Auto backup is off; enable it with `padlock auto-backup on`.");
    }

    println!("Watching; checking every {interval_secs}s. Ctrl-C to stop.");
    let handle = spawn_auto_backup(Arc::clone(&service), Duration::from_secs(interval_secs));
    handle.await.ok();
    Ok(())
}

fn run_add(
    title: &str,
    website: &str,
    username: &str,
    password: &str,
    notes: &str,
    favorite: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    if title.trim().is_empty() {
        return Err(CliError::EmptyTitle);
    }

    let db = open_database(db_path)?;
    let conn = db.lock()?;
    let repo = SqlitePasswordRepository::new(&conn);

    let mut entry = PasswordEntry::new(title.trim(), website, username, password);
    entry.notes = notes.to_string();
    entry.is_favorite = favorite;

    let inserted = repo.insert(&entry)?;
    println!("{}", inserted.id);
    Ok(())
}

#[derive(Debug, Serialize)]
struct EntryListItem {
    id: i64,
    title: String,
    username: String,
    website: String,
    favorite: bool,
}

fn run_entries(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let conn = db.lock()?;
    let entries = SqlitePasswordRepository::new(&conn).list()?;

    if as_json {
        let items = entries
            .iter()
            .map(|entry| EntryListItem {
                id: entry.id,
                title: entry.title.clone(),
                username: entry.username.clone(),
                website: entry.website.clone(),
                favorite: entry.is_favorite,
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    for entry in entries {
        let marker = if entry.is_favorite { "*" } else { " " };
        println!(
            "{:>4} {marker} {:<24}  {:<20}  {}",
            entry.id, entry.title, entry.username, entry.website
        );
    }
    Ok(())
}

fn run_add_item(
    item_type: &str,
    title: &str,
    data: &str,
    notes: &str,
    favorite: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    if title.trim().is_empty() {
        return Err(CliError::EmptyTitle);
    }
    let item_type = parse_item_type(item_type)?;

    let db = open_database(db_path)?;
    let conn = db.lock()?;
    let repo = SqliteSecureItemRepository::new(&conn);

    let mut item = SecureItem::new(item_type, title.trim(), data);
    item.notes = notes.to_string();
    item.is_favorite = favorite;

    let inserted = repo.insert(&item)?;
    println!("{}", inserted.id);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ItemListItem {
    id: i64,
    item_type: String,
    title: String,
    updated_at: i64,
    favorite: bool,
}

fn run_items(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let conn = db.lock()?;
    let items = SqliteSecureItemRepository::new(&conn).list()?;

    if as_json {
        let listed = items
            .iter()
            .map(|item| ItemListItem {
                id: item.id,
                item_type: item.item_type.to_string(),
                title: item.title.clone(),
                updated_at: item.updated_at,
                favorite: item.is_favorite,
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No secure items.");
        return Ok(());
    }

    let now_ms = Utc::now().timestamp_millis();
    for item in items {
        let marker = if item.is_favorite { "*" } else { " " };
        println!(
            "{:>4} {marker} {:<10}  {:<24}  {}",
            item.id,
            item.item_type.as_str(),
            item.title,
            format_relative_time(item.updated_at, now_ms)
        );
    }
    Ok(())
}

fn open_database(path: &Path) -> Result<Arc<Database>, CliError> {
    tracing::debug!("opening vault database at {}", path.display());
    Ok(Arc::new(Database::open(path)?))
}

fn open_service(db_path: &Path) -> Result<BackupService, CliError> {
    Ok(BackupService::new(open_database(db_path)?))
}

fn format_backup_lines(files: &[BackupFile]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    files
        .iter()
        .map(|file| {
            format!(
                "{:<44}  {:>10}  {}",
                file.name,
                format_size(file.size),
                format_relative_time(file.modified, now_ms)
            )
        })
        .collect()
}

fn prefs_summary(prefs: BackupPreferences) -> String {
    let mut enabled = Vec::new();
    if prefs.include_passwords {
        enabled.push("passwords");
    }
    if prefs.include_authenticators {
        enabled.push("authenticators");
    }
    if prefs.include_documents {
        enabled.push("documents");
    }
    if prefs.include_bank_cards {
        enabled.push("bank cards");
    }

    if enabled.is_empty() {
        "none".to_string()
    } else {
        enabled.join(", ")
    }
}

fn apply_pref_overrides(
    current: BackupPreferences,
    passwords: Option<bool>,
    authenticators: Option<bool>,
    documents: Option<bool>,
    bank_cards: Option<bool>,
) -> BackupPreferences {
    BackupPreferences {
        include_passwords: passwords.unwrap_or(current.include_passwords),
        include_authenticators: authenticators.unwrap_or(current.include_authenticators),
        include_documents: documents.unwrap_or(current.include_documents),
        include_bank_cards: bank_cards.unwrap_or(current.include_bank_cards),
    }
}

fn parse_item_type(raw: &str) -> Result<SecureItemType, CliError> {
    let tag = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
    let item_type = tag
        .parse::<SecureItemType>()
        .map_err(padlock_core::Error::from)?;
    Ok(item_type)
}

fn normalize_backup_name(name: &str) -> Result<String, CliError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyBackupName)
    } else {
        Ok(trimmed.to_string())
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    if timestamp_ms <= 0 {
        return "unknown".to_string();
    }

    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("PADLOCK_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("padlock")
        .join("padlock.db")
}
