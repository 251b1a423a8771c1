use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc;

use newsdesk::api::NewsClient;
use newsdesk::app::{App, AppEvent, EVENT_CHANNEL_CAPACITY};
use newsdesk::config::Config;
use newsdesk::preferences::{
    resolve_api_key, PreferenceManager, API_KEY, AUTO_REFRESH, DARK_MODE, KNOWN_KEYS,
    NOTIFICATIONS_ENABLED, SELECTED_CATEGORY,
};
use newsdesk::storage::{now_millis, Database, DatabaseError};
use newsdesk::view;

/// Get the config directory path (~/.config/newsdesk/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newsdesk"))
}

#[derive(Parser, Debug)]
#[command(
    name = "newsdesk",
    version,
    about = "Terminal client for NewsAPI headlines and search"
)]
struct Args {
    /// Reset database (delete and recreate)
    #[arg(long, global = true)]
    reset_db: bool,

    /// Config file to use instead of ~/.config/newsdesk/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Top headlines for a category (defaults to the selected one)
    Headlines {
        #[arg(long, short)]
        category: Option<String>,
    },
    /// Keyword search across all sources
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Show one article in full
    Show { url: String },
    /// List or change favorite articles
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },
    /// Recent searches
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Delete all recorded searches
        #[arg(long)]
        clear: bool,
    },
    /// List categories or change the selected one
    Categories {
        #[arg(long, value_name = "NAME")]
        select: Option<String>,
    },
    /// Notifications recorded after headline loads
    Notifications {
        #[arg(long)]
        unread: bool,
        #[arg(long, value_name = "ID")]
        mark_read: Option<i64>,
        #[arg(long)]
        clear: bool,
    },
    /// Read or change preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Inspect or prune articles cached from searches
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Open an article link in the browser
    Open { url: String },
    /// Print share text for an article
    Share { url: String },
}

#[derive(Subcommand, Debug)]
enum FavoritesAction {
    List,
    /// Add or remove a favorite by url
    Toggle { url: String },
    Clear,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Get { key: Option<String> },
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    List {
        #[arg(long, value_name = "QUERY")]
        query: Option<String>,
    },
    Prune {
        #[arg(long, value_name = "HOURS")]
        older_than_hours: u32,
    },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        eprintln!("Created config directory: {}", config_dir.display());
    }

    // User-only access: the database may hold an API key
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let db_path = config_dir.join("news.db");
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        eprintln!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of newsdesk appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    db.seed_default_categories()
        .await
        .context("Failed to seed categories")?;

    let prefs = match PreferenceManager::load(&config, &db).await {
        Ok(prefs) => prefs,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load stored preferences, using config only");
            PreferenceManager::from_config(&config)
        }
    };

    let client = NewsClient::new(config.base_url.as_deref(), resolve_api_key(&config, &prefs))
        .context("Failed to create NewsAPI client")?;

    let mut app = App::new(db, client, prefs, config);
    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(EVENT_CHANNEL_CAPACITY);

    let command = args.command.unwrap_or(Command::Headlines { category: None });
    run(&mut app, command, &event_tx, &mut event_rx).await?;

    // Persistence tasks spawned along the way finish before exit
    app.drain(&mut event_rx, &event_tx).await;

    if let Some(error) = app.last_error.take() {
        eprintln!("{error}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    app: &mut App,
    command: Command,
    event_tx: &mpsc::Sender<AppEvent>,
    event_rx: &mut mpsc::Receiver<AppEvent>,
) -> Result<()> {
    match command {
        Command::Headlines { category } => {
            app.load_headlines(category.as_deref(), event_tx);
            app.drain(event_rx, event_tx).await;
            if app.last_error.is_none() {
                let category = app.headlines_category.clone().unwrap_or_default();
                println!("{}", view::render_headlines(&category, &app.headlines));
            }
        }
        Command::Search { query } => {
            let query = query.join(" ");
            if !app.submit_search(&query, event_tx) {
                bail!(
                    "{}",
                    app.status_message.as_deref().unwrap_or("Invalid search query")
                );
            }
            app.drain(event_rx, event_tx).await;
            if app.last_error.is_none() {
                let heading = format!("RESULTS for \"{}\"", query.trim());
                println!("{}", view::render_article_list(&heading, &app.search_results));
            }
        }
        Command::Show { url } => {
            let Some(article) = app.resolve_article(&url).await? else {
                bail!("No saved or cached article with url {url}");
            };
            println!("{}", view::render_detail(&article));
        }
        Command::Favorites { action } => match action.unwrap_or(FavoritesAction::List) {
            FavoritesAction::List => {
                let favorites = app.db.get_favorites().await?;
                println!("{}", view::render_favorites(&favorites));
            }
            FavoritesAction::Toggle { url } => {
                let Some(article) = app.resolve_article(&url).await? else {
                    bail!("No article snapshot for {url}. Find it with `search` first.");
                };
                app.toggle_favorite(&article, event_tx);
                app.drain(event_rx, event_tx).await;
                if let Some(status) = app.status_message.as_deref() {
                    println!("{status}");
                }
            }
            FavoritesAction::Clear => {
                let removed = app.db.delete_all_favorites().await?;
                println!("Removed {removed} favorites");
            }
        },
        Command::History { limit, clear } => {
            if clear {
                let removed = app.db.clear_search_history().await?;
                println!("Cleared {removed} searches");
            } else {
                let recent = app.db.get_recent_searches(limit).await?;
                println!("{}", view::render_history(&recent));
                let total = app.db.count_searches().await?;
                println!("\n{total} searches recorded");
            }
        }
        Command::Categories { select } => {
            if let Some(name) = select {
                let category = app.select_category(name.trim()).await?;
                println!("Selected {}", category.display_name);
            }
            let categories = app.db.get_categories().await?;
            println!("{}", view::render_categories(&categories));
        }
        Command::Notifications {
            unread,
            mark_read,
            clear,
        } => {
            if clear {
                let removed = app.db.delete_all_notifications().await?;
                println!("Removed {removed} notifications");
            } else if let Some(id) = mark_read {
                if !app.db.mark_notification_read(id).await? {
                    bail!("No notification with id {id}");
                }
                println!("Marked #{id} as read");
            } else {
                let items = if unread {
                    app.db.get_unread_notifications().await?
                } else {
                    app.db.get_notifications().await?
                };
                println!("{}", view::render_notifications(&items));
            }
        }
        Command::Settings { action } => run_settings(app, action).await?,
        Command::Cache { action } => match action {
            CacheAction::List { query } => {
                let articles = match query {
                    Some(q) => app.db.get_cached_by_query(q.trim()).await?,
                    None => app.db.get_all_cached().await?,
                };
                println!("{}", view::render_cached(&articles));
            }
            CacheAction::Prune { older_than_hours } => {
                let cutoff = now_millis() - i64::from(older_than_hours) * 3_600_000;
                let removed = app.db.delete_cached_older_than(cutoff).await?;
                println!("Pruned {removed} cached articles");
            }
            CacheAction::Clear => {
                let removed = app.db.delete_all_cached().await?;
                println!("Removed {removed} cached articles");
            }
        },
        Command::Open { url } => App::open_article(&url)?,
        Command::Share { url } => match app.resolve_article(&url).await? {
            Some(article) => println!("{}", App::share_text(&article)),
            None => println!("{url}"),
        },
    }
    Ok(())
}

async fn run_settings(app: &mut App, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Get { key: None } => {
            println!("{}", view::render_settings(&app.prefs.entries()));
        }
        SettingsAction::Get { key: Some(key) } => {
            let Some((_, value)) = app.prefs.entries().into_iter().find(|(k, _)| *k == key) else {
                bail!("Setting not found: {key}");
            };
            println!("{value}");
        }
        SettingsAction::Set { key, value } => {
            let key = key.trim();
            let value = value.trim();
            if !KNOWN_KEYS.contains(&key) {
                bail!("Unknown setting: {key}. Known settings: {}", KNOWN_KEYS.join(", "));
            }
            match key {
                SELECTED_CATEGORY => {
                    app.select_category(value).await?;
                }
                DARK_MODE | NOTIFICATIONS_ENABLED | AUTO_REFRESH => {
                    let flag: bool = value
                        .parse()
                        .with_context(|| format!("{key} expects true or false"))?;
                    app.prefs.set_bool(&app.db, key, flag).await?;
                }
                _ => app.prefs.set(&app.db, key, value).await?,
            }
            if key == API_KEY {
                println!("Saved {key}");
            } else {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}
