//! Integration tests for the local store: favorites, search history, cache
//! and notifications working together.
//!
//! Each test creates its own in-memory SQLite database for isolation. The
//! concurrency tests need several pool connections, so they use a file.

use newsdesk::api::{Article, Source};
use newsdesk::storage::{Database, NewFavorite};
use proptest::prelude::*;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

async fn file_db(name: &str) -> (Database, std::path::PathBuf) {
    let dir = std::env::temp_dir().join(format!(
        "newsdesk_lifecycle_{name}_{}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("news.db");
    let _ = std::fs::remove_file(&path);
    let db = Database::open(path.to_str().unwrap()).await.unwrap();
    (db, dir)
}

fn snapshot(url: &str) -> NewFavorite {
    NewFavorite {
        title: Some(format!("Title for {url}")),
        url: Some(url.to_string()),
        source_name: Some("Wire".to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Favorites
// ============================================================================

#[tokio::test]
async fn test_toggle_adds_then_removes() {
    let db = test_db().await;
    let fav = snapshot("https://example.com/a");

    assert!(db.toggle_favorite(&fav).await.unwrap());
    assert!(db.is_favorite("https://example.com/a").await.unwrap());

    assert!(!db.toggle_favorite(&fav).await.unwrap());
    assert!(!db.is_favorite("https://example.com/a").await.unwrap());
    assert!(db.get_favorites().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_double_add_keeps_one_row() {
    let db = test_db().await;
    let fav = snapshot("https://example.com/b");

    let first = db.add_favorite_if_absent(&fav).await.unwrap();
    let second = db.add_favorite_if_absent(&fav).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(db.get_favorites().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_favorite_keeps_article_snapshot() {
    let db = test_db().await;
    let article = Article {
        source: Some(Source {
            id: Some("bbc-news".to_string()),
            name: Some("BBC News".to_string()),
        }),
        author: Some("Reporter".to_string()),
        title: Some("Snapshot".to_string()),
        description: Some("Kept".to_string()),
        url: Some("https://example.com/snap".to_string()),
        url_to_image: Some("https://example.com/snap.jpg".to_string()),
        published_at: Some("2024-05-01T10:00:00Z".to_string()),
        content: Some("Body".to_string()),
        is_favorite: false,
    };

    db.toggle_favorite(&article.to_favorite()).await.unwrap();
    let stored = db
        .get_favorite_by_url("https://example.com/snap")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stored.title.as_deref(), Some("Snapshot"));
    assert_eq!(stored.source_name.as_deref(), Some("BBC News"));
    assert_eq!(stored.author.as_deref(), Some("Reporter"));
    assert_eq!(
        stored.url_to_image.as_deref(),
        Some("https://example.com/snap.jpg")
    );
    assert!(stored.saved_at > 0);

    let back = Article::from(stored);
    assert!(back.is_favorite);
    assert_eq!(back.source_name(), Some("BBC News"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_cancel_out() {
    let (db, dir) = file_db("toggle").await;
    let fav = snapshot("https://example.com/race");

    for round in 0..50 {
        let first = tokio::spawn({
            let db = db.clone();
            let fav = fav.clone();
            async move { db.toggle_favorite(&fav).await.unwrap() }
        });
        let second = tokio::spawn({
            let db = db.clone();
            let fav = fav.clone();
            async move { db.toggle_favorite(&fav).await.unwrap() }
        });
        let (first, second) = (first.await.unwrap(), second.await.unwrap());

        // One toggle adds, the other removes what it added
        assert_ne!(first, second, "round {round}");
        assert!(
            !db.is_favorite("https://example.com/race").await.unwrap(),
            "round {round}"
        );
        assert!(db.get_favorites().await.unwrap().is_empty(), "round {round}");
    }

    drop(db);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_keep_one_row() {
    let (db, dir) = file_db("add").await;
    let fav = snapshot("https://example.com/once");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            let fav = fav.clone();
            tokio::spawn(async move { db.add_favorite_if_absent(&fav).await.unwrap() })
        })
        .collect();
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    let favorites = db.get_favorites().await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert!(ids.iter().all(|id| *id == favorites[0].id));

    drop(db);
    std::fs::remove_dir_all(&dir).ok();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn toggle_parity(toggles in 1usize..9) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let exists = rt.block_on(async {
            let db = test_db().await;
            let fav = snapshot("https://example.com/parity");
            for _ in 0..toggles {
                db.toggle_favorite(&fav).await.unwrap();
            }
            db.is_favorite("https://example.com/parity").await.unwrap()
        });
        prop_assert_eq!(exists, toggles % 2 == 1);
    }
}

// ============================================================================
// Search History
// ============================================================================

#[tokio::test]
async fn test_history_grows_by_one_per_query() {
    let db = test_db().await;

    for (i, query) in ["rust", "rust", "elections", "weather"].iter().enumerate() {
        db.insert_search(query, 0).await.unwrap();
        assert_eq!(db.count_searches().await.unwrap(), i as i64 + 1);
    }

    // No de-duplication
    let history = db.get_search_history().await.unwrap();
    assert_eq!(history.iter().filter(|h| h.query == "rust").count(), 2);

    let recent = db.get_recent_searches(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].query, "weather");

    assert_eq!(db.clear_search_history().await.unwrap(), 4);
    assert_eq!(db.count_searches().await.unwrap(), 0);
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_cache_prune_keeps_fresh_rows() {
    let db = test_db().await;

    let mut old = Article {
        url: Some("https://example.com/old".to_string()),
        ..Default::default()
    }
    .to_cached("rust")
    .unwrap();
    old.cached_at = 1_000;
    let fresh = Article {
        url: Some("https://example.com/fresh".to_string()),
        ..Default::default()
    }
    .to_cached("rust")
    .unwrap();

    db.insert_cached_batch(&[old, fresh.clone()]).await.unwrap();
    assert_eq!(db.delete_cached_older_than(2_000).await.unwrap(), 1);

    let remaining = db.get_cached_by_query("rust").await.unwrap();
    assert_eq!(remaining, vec![fresh]);
}

// ============================================================================
// Tables are independent
// ============================================================================

#[tokio::test]
async fn test_clearing_favorites_leaves_other_tables() {
    let db = test_db().await;
    db.toggle_favorite(&snapshot("https://example.com/x"))
        .await
        .unwrap();
    db.insert_search("x", 3).await.unwrap();
    db.insert_notification("Trending", None, Some("https://example.com/x"))
        .await
        .unwrap();

    db.delete_all_favorites().await.unwrap();

    assert_eq!(db.count_searches().await.unwrap(), 1);
    assert_eq!(db.get_notifications().await.unwrap().len(), 1);
}
