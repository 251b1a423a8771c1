//! Application state and the event loop that keeps it current.
//!
//! `App` is owned by a single task. Anything slow (HTTP, SQLite writes) is
//! spawned from [`tasks`] and reported back as an [`AppEvent`] over an
//! `mpsc` channel; `handle_event` folds those results into the state.

mod tasks;

use std::borrow::Cow;

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::{ApiError, Article, ArticleSplit, HeadlinesQuery, NewsClient, SearchQuery};
use crate::config::Config;
use crate::preferences::{PreferenceManager, SELECTED_CATEGORY};
use crate::storage::{Category, Database};
use crate::util::{validate_article_url, MAX_SEARCH_QUERY_LENGTH};

/// Capacity of the channel between background tasks and the app.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

// ============================================================================
// Events
// ============================================================================

/// Why a headlines or search load produced nothing to show.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("No news found")]
    NoResults,
}

impl LoadError {
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Api(e) => e.user_message(),
            LoadError::NoResults => self.to_string(),
        }
    }
}

/// Results posted back by background tasks. Each spawned task sends exactly
/// one of these.
#[derive(Debug)]
pub enum AppEvent {
    HeadlinesLoaded {
        generation: u64,
        category: String,
        result: Result<ArticleSplit, LoadError>,
    },
    SearchCompleted {
        generation: u64,
        query: String,
        result: Result<Vec<Article>, LoadError>,
    },
    /// The favorites table now says `is_favorite` for `url`.
    FavoriteToggled {
        url: Option<String>,
        is_favorite: bool,
    },
    /// A fire-and-forget write finished. `error` is logged, never shown.
    Persisted {
        task: &'static str,
        error: Option<String>,
    },
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::HeadlinesLoaded { .. } => "HeadlinesLoaded",
            AppEvent::SearchCompleted { .. } => "SearchCompleted",
            AppEvent::FavoriteToggled { .. } => "FavoriteToggled",
            AppEvent::Persisted { .. } => "Persisted",
            AppEvent::TaskPanicked { .. } => "TaskPanicked",
        }
    }
}

// ============================================================================
// App State
// ============================================================================

pub struct App {
    pub db: Database,
    pub client: NewsClient,
    pub prefs: PreferenceManager,
    pub config: Config,

    /// Last headlines load, already split into trending and latest.
    pub headlines: ArticleSplit,
    pub headlines_category: Option<String>,
    pub search_results: Vec<Article>,
    pub last_query: Option<String>,

    pub status_message: Option<Cow<'static, str>>,
    /// Set when the last load failed; cleared by the next success.
    pub last_error: Option<String>,
    pub loading: bool,

    /// Spawned tasks whose event has not been handled yet.
    pending: usize,
    /// Bumped per load so a slow, superseded response is dropped.
    headlines_generation: u64,
    search_generation: u64,
}

impl App {
    pub fn new(db: Database, client: NewsClient, prefs: PreferenceManager, config: Config) -> Self {
        Self {
            db,
            client,
            prefs,
            config,
            headlines: ArticleSplit::default(),
            headlines_category: None,
            search_results: Vec::new(),
            last_query: None,
            status_message: None,
            last_error: None,
            loading: false,
            pending: 0,
            headlines_generation: 0,
            search_generation: 0,
        }
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some(msg.into());
    }

    pub fn pending_tasks(&self) -> usize {
        self.pending
    }

    // ========================================================================
    // Loads
    // ========================================================================

    /// Fetch headlines for `category`, or the selected category when `None`.
    pub fn load_headlines(&mut self, category: Option<&str>, event_tx: &mpsc::Sender<AppEvent>) {
        let category = category
            .map(str::to_owned)
            .unwrap_or_else(|| self.prefs.selected_category().to_owned());
        let query = HeadlinesQuery {
            category,
            page_size: self.config.headline_page_size,
            country: self.config.country.clone(),
        };

        self.headlines_generation += 1;
        self.loading = true;
        self.set_status(format!("Loading {} headlines...", query.category));
        self.pending += 1;
        tasks::spawn_headlines_load(
            self.headlines_generation,
            query,
            self.client.clone(),
            self.db.clone(),
            event_tx.clone(),
        );
    }

    /// Record and run a keyword search. Returns `false` (and does nothing)
    /// for a blank or oversized query.
    pub fn submit_search(&mut self, raw_query: &str, event_tx: &mpsc::Sender<AppEvent>) -> bool {
        let query = raw_query.trim();
        if query.is_empty() {
            self.set_status("Enter a search query");
            return false;
        }
        if query.chars().count() > MAX_SEARCH_QUERY_LENGTH {
            self.set_status(format!(
                "Search query too long (max {MAX_SEARCH_QUERY_LENGTH} characters)"
            ));
            return false;
        }

        // Results are not known yet, so the history row carries 0.
        self.record_search(query, 0, event_tx);

        let mut search = SearchQuery::new(query);
        search.page_size = self.config.search_page_size;
        search.sort_by = self.prefs.sort_by().to_owned();
        search.language = self.config.language.clone();

        self.search_generation += 1;
        self.loading = true;
        self.last_query = Some(query.to_owned());
        self.set_status(format!("Searching for \"{query}\"..."));
        self.pending += 1;
        tasks::spawn_search(
            self.search_generation,
            search,
            self.client.clone(),
            self.db.clone(),
            event_tx.clone(),
        );
        true
    }

    /// Append one search-history row. Blank queries are skipped.
    pub fn record_search(
        &mut self,
        query: &str,
        result_count: i64,
        event_tx: &mpsc::Sender<AppEvent>,
    ) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        self.pending += 1;
        tasks::spawn_search_record(
            query.to_owned(),
            result_count,
            self.db.clone(),
            event_tx.clone(),
        );
        true
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    /// Flip the favorite state of `article` and return the new in-memory state.
    ///
    /// The flag changes immediately in every list holding the url; the write
    /// happens in the background and a failed write only gets logged.
    pub fn toggle_favorite(&mut self, article: &Article, event_tx: &mpsc::Sender<AppEvent>) -> bool {
        let now_favorite = !article.is_favorite;
        if let Some(url) = article.url.as_deref() {
            self.set_favorite_flag(url, now_favorite);
        }
        self.set_status(if now_favorite {
            "Added to favorites"
        } else {
            "Removed from favorites"
        });

        self.pending += 1;
        tasks::spawn_favorite_toggle(article.to_favorite(), self.db.clone(), event_tx.clone());
        now_favorite
    }

    /// Whether a favorite row exists for `url`. Lookup errors read as `false`.
    pub async fn is_favorite(&self, url: &str) -> bool {
        match self.db.is_favorite(url).await {
            Ok(flag) => flag,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Favorite lookup failed");
                false
            }
        }
    }

    fn set_favorite_flag(&mut self, url: &str, flag: bool) {
        self.headlines
            .iter_mut()
            .chain(self.search_results.iter_mut())
            .filter(|a| a.url.as_deref() == Some(url))
            .for_each(|a| a.is_favorite = flag);
    }

    /// First in-memory article with this url: headlines, then search results.
    pub fn find_article(&self, url: &str) -> Option<&Article> {
        self.headlines
            .iter()
            .chain(self.search_results.iter())
            .find(|a| a.url.as_deref() == Some(url))
    }

    /// Find an article snapshot for `url` in memory, the favorites table or
    /// the article cache, with `is_favorite` filled in.
    pub async fn resolve_article(&self, url: &str) -> Result<Option<Article>> {
        if let Some(article) = self.find_article(url) {
            return Ok(Some(article.clone()));
        }
        if let Some(favorite) = self.db.get_favorite_by_url(url).await? {
            return Ok(Some(Article::from(favorite)));
        }
        if let Some(cached) = self.db.get_cached_by_url(url).await? {
            let mut article = Article::from(cached);
            article.is_favorite = self.is_favorite(url).await;
            return Ok(Some(article));
        }
        Ok(None)
    }

    // ========================================================================
    // Categories & Intents
    // ========================================================================

    /// Mark `name` as the selected category and remember it as a preference.
    pub async fn select_category(&mut self, name: &str) -> Result<Category> {
        let category = self.db.select_category(name).await?;
        self.prefs
            .set(&self.db, SELECTED_CATEGORY, &category.name)
            .await?;
        tracing::info!(category = %category.name, "Category selected");
        Ok(category)
    }

    /// Text handed to the share intent.
    pub fn share_text(article: &Article) -> String {
        format!(
            "{}\n{}",
            article.display_title(),
            article.url.as_deref().unwrap_or_default()
        )
    }

    /// Validate `url` and hand it to the system browser.
    pub fn open_article(url: &str) -> Result<()> {
        let url = validate_article_url(url).context("Refusing to open article link")?;
        open::that(url.as_str()).with_context(|| format!("Failed to open browser for {url}"))?;
        tracing::info!(url = %url, "Opened article in browser");
        Ok(())
    }

    // ========================================================================
    // Event Handling
    // ========================================================================

    /// Handle events until every spawned task has reported back.
    pub async fn drain(
        &mut self,
        event_rx: &mut mpsc::Receiver<AppEvent>,
        event_tx: &mpsc::Sender<AppEvent>,
    ) {
        while self.pending > 0 {
            match event_rx.recv().await {
                Some(event) => self.handle_event(event, event_tx),
                None => break,
            }
        }
    }

    pub fn handle_event(&mut self, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
        self.pending = self.pending.saturating_sub(1);

        match event {
            AppEvent::HeadlinesLoaded {
                generation,
                category,
                result,
            } => {
                if generation != self.headlines_generation {
                    tracing::debug!(generation, "Dropping stale headlines result");
                    return;
                }
                self.loading = false;
                self.handle_headlines(category, result, event_tx);
            }
            AppEvent::SearchCompleted {
                generation,
                query,
                result,
            } => {
                if generation != self.search_generation {
                    tracing::debug!(generation, query = %query, "Dropping stale search result");
                    return;
                }
                self.loading = false;
                self.handle_search(query, result, event_tx);
            }
            AppEvent::FavoriteToggled { url, is_favorite } => {
                if let Some(url) = url {
                    self.set_favorite_flag(&url, is_favorite);
                }
            }
            AppEvent::Persisted { task, error } => {
                if let Some(error) = error {
                    tracing::warn!(task, error = %error, "Background write failed");
                }
            }
            AppEvent::TaskPanicked { task, error } => {
                tracing::error!(task, error = %error, "Background task panicked");
                self.loading = false;
                self.set_status(format!("Internal error in {task} task"));
            }
        }
    }

    fn handle_headlines(
        &mut self,
        category: String,
        result: Result<ArticleSplit, LoadError>,
        event_tx: &mpsc::Sender<AppEvent>,
    ) {
        match result {
            Ok(split) => {
                tracing::info!(
                    category = %category,
                    trending = split.trending.len(),
                    latest = split.latest.len(),
                    "Headlines loaded"
                );
                if self.prefs.notifications_enabled() {
                    if let Some(top) = split.trending.first() {
                        self.pending += 1;
                        tasks::spawn_notification(
                            top.display_title().to_owned(),
                            top.description.clone(),
                            top.url.clone(),
                            self.db.clone(),
                            event_tx.clone(),
                        );
                    }
                }
                self.set_status(format!("{} articles", split.len()));
                self.headlines = split;
                self.headlines_category = Some(category);
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "Headlines load failed");
                if matches!(e, LoadError::NoResults) {
                    self.headlines = ArticleSplit::default();
                }
                let message = e.user_message();
                self.set_status(message.clone());
                self.last_error = Some(message);
            }
        }
    }

    fn handle_search(
        &mut self,
        query: String,
        result: Result<Vec<Article>, LoadError>,
        event_tx: &mpsc::Sender<AppEvent>,
    ) {
        match result {
            Ok(articles) => {
                tracing::info!(query = %query, results = articles.len(), "Search completed");
                let cached: Vec<_> = articles.iter().filter_map(|a| a.to_cached(&query)).collect();
                if !cached.is_empty() {
                    self.pending += 1;
                    tasks::spawn_cache_write(cached, self.db.clone(), event_tx.clone());
                }
                self.set_status(format!("{} results for \"{}\"", articles.len(), query));
                self.search_results = articles;
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Search failed");
                if matches!(e, LoadError::NoResults) {
                    self.search_results.clear();
                }
                let message = e.user_message();
                self.set_status(message.clone());
                self.last_error = Some(message);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
