//! Background work: every network or database call the app makes runs here
//! as a tokio task that reports back with exactly one [`AppEvent`].

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

use super::{AppEvent, LoadError};
use crate::api::{
    split_trending_latest, Article, ArticleSplit, HeadlinesQuery, NewsClient, SearchQuery,
};
use crate::storage::{CachedArticle, Database, NewFavorite};

/// Run `future`, turning a panic into `Err(message)`.
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future).catch_unwind().await.map_err(|panic| {
        if let Some(s) = panic.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        }
    })
}

/// Send `event`, logging instead of failing when the receiver is gone.
pub(super) async fn send_event(tx: &mpsc::Sender<AppEvent>, event: AppEvent) {
    let name = event.name();
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, event = name, "Channel send failed (receiver dropped)");
    }
}

/// Spawn `work` and post whatever event it yields. A panic is reported as
/// [`AppEvent::TaskPanicked`] so the owner still sees one event per task.
fn spawn_reporting<F>(task: &'static str, tx: mpsc::Sender<AppEvent>, work: F)
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let event = match catch_task_panic(work).await {
            Ok(event) => event,
            Err(panic_msg) => {
                tracing::error!(task, error = %panic_msg, "Background task panicked");
                AppEvent::TaskPanicked {
                    task,
                    error: panic_msg,
                }
            }
        };
        send_event(&tx, event).await;
    });
}

/// Set `is_favorite` on each article from the favorites table.
async fn mark_favorites(db: &Database, articles: &mut [Article]) {
    for article in articles.iter_mut() {
        let Some(url) = article.url.as_deref() else {
            continue;
        };
        article.is_favorite = match db.is_favorite(url).await {
            Ok(flag) => flag,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Favorite lookup failed");
                false
            }
        };
    }
}

// ============================================================================
// Remote Fetches
// ============================================================================

async fn fetch_headlines(
    client: &NewsClient,
    db: &Database,
    query: &HeadlinesQuery,
) -> Result<ArticleSplit, LoadError> {
    let response = client.top_headlines(query).await?;
    if response.articles.is_empty() {
        return Err(LoadError::NoResults);
    }
    let mut split = split_trending_latest(response.articles);
    mark_favorites(db, &mut split.trending).await;
    mark_favorites(db, &mut split.latest).await;
    Ok(split)
}

async fn fetch_search(
    client: &NewsClient,
    db: &Database,
    query: &SearchQuery,
) -> Result<Vec<Article>, LoadError> {
    let response = client.search(query).await?;
    if response.articles.is_empty() {
        return Err(LoadError::NoResults);
    }
    let mut articles = response.articles;
    mark_favorites(db, &mut articles).await;
    Ok(articles)
}

pub(super) fn spawn_headlines_load(
    generation: u64,
    query: HeadlinesQuery,
    client: NewsClient,
    db: Database,
    tx: mpsc::Sender<AppEvent>,
) {
    spawn_reporting("headlines", tx, async move {
        let result = fetch_headlines(&client, &db, &query).await;
        AppEvent::HeadlinesLoaded {
            generation,
            category: query.category,
            result,
        }
    });
}

pub(super) fn spawn_search(
    generation: u64,
    query: SearchQuery,
    client: NewsClient,
    db: Database,
    tx: mpsc::Sender<AppEvent>,
) {
    spawn_reporting("search", tx, async move {
        let result = fetch_search(&client, &db, &query).await;
        AppEvent::SearchCompleted {
            generation,
            query: query.query,
            result,
        }
    });
}

// ============================================================================
// Persistence
// ============================================================================

pub(super) fn spawn_favorite_toggle(
    favorite: NewFavorite,
    db: Database,
    tx: mpsc::Sender<AppEvent>,
) {
    spawn_reporting("toggle_favorite", tx, async move {
        match db.toggle_favorite(&favorite).await {
            Ok(is_favorite) => AppEvent::FavoriteToggled {
                url: favorite.url,
                is_favorite,
            },
            Err(e) => AppEvent::Persisted {
                task: "toggle_favorite",
                error: Some(e.to_string()),
            },
        }
    });
}

pub(super) fn spawn_search_record(
    query: String,
    result_count: i64,
    db: Database,
    tx: mpsc::Sender<AppEvent>,
) {
    spawn_reporting("record_search", tx, async move {
        let error = db
            .insert_search(&query, result_count)
            .await
            .err()
            .map(|e| e.to_string());
        AppEvent::Persisted {
            task: "record_search",
            error,
        }
    });
}

pub(super) fn spawn_cache_write(
    articles: Vec<CachedArticle>,
    db: Database,
    tx: mpsc::Sender<AppEvent>,
) {
    spawn_reporting("cache_articles", tx, async move {
        let error = match db.insert_cached_batch(&articles).await {
            Ok(written) => {
                tracing::debug!(written, "Cached search results");
                None
            }
            Err(e) => Some(e.to_string()),
        };
        AppEvent::Persisted {
            task: "cache_articles",
            error,
        }
    });
}

pub(super) fn spawn_notification(
    title: String,
    message: Option<String>,
    article_url: Option<String>,
    db: Database,
    tx: mpsc::Sender<AppEvent>,
) {
    spawn_reporting("notify", tx, async move {
        let error = db
            .insert_notification(&title, message.as_deref(), article_url.as_deref())
            .await
            .err()
            .map(|e| e.to_string());
        AppEvent::Persisted {
            task: "notify",
            error,
        }
    });
}
