//! End-to-end tests: a mock NewsAPI server, an in-memory database and the
//! `App` event loop wired together the way the binary wires them.

use newsdesk::api::NewsClient;
use newsdesk::app::{App, AppEvent, EVENT_CHANNEL_CAPACITY};
use newsdesk::config::Config;
use newsdesk::preferences::{PreferenceManager, NOTIFICATIONS_ENABLED};
use newsdesk::storage::{Database, NewFavorite};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn body_with(n: usize) -> String {
    let articles: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            serde_json::json!({
                "source": {"id": null, "name": "Wire"},
                "author": null,
                "title": format!("Story {i}"),
                "description": format!("About story {i}"),
                "url": format!("https://example.com/story/{i}"),
                "urlToImage": null,
                "publishedAt": "2024-05-01T10:00:00Z",
                "content": null
            })
        })
        .collect();
    serde_json::json!({"status": "ok", "totalResults": n, "articles": articles}).to_string()
}

async fn app_for(
    server: &MockServer,
    config: Config,
) -> (App, mpsc::Sender<AppEvent>, mpsc::Receiver<AppEvent>) {
    let db = Database::open(":memory:").await.unwrap();
    db.seed_default_categories().await.unwrap();
    let prefs = PreferenceManager::load(&config, &db).await.unwrap();
    let client = NewsClient::new(
        Some(&server.uri()),
        Some(SecretString::from("test-key".to_string())),
    )
    .unwrap();
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (App::new(db, client, prefs, config), tx, rx)
}

async fn mount_json(server: &MockServer, endpoint: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_headlines_split_and_notification() {
    let server = MockServer::start().await;
    mount_json(&server, "/top-headlines", body_with(30)).await;
    let (mut app, tx, mut rx) = app_for(&server, Config::default()).await;

    app.load_headlines(None, &tx);
    app.drain(&mut rx, &tx).await;

    assert_eq!(app.last_error, None);
    assert_eq!(app.headlines_category.as_deref(), Some("general"));
    assert_eq!(app.headlines.trending.len(), 5);
    assert_eq!(app.headlines.latest.len(), 20);
    assert_eq!(
        app.headlines.latest[0].title.as_deref(),
        Some("Story 5")
    );

    let notifications = app.db.get_notifications().await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Story 0");
    assert_eq!(
        notifications[0].article_url.as_deref(),
        Some("https://example.com/story/0")
    );
    assert!(!notifications[0].is_read);
}

#[tokio::test]
async fn test_headlines_without_notifications() {
    let server = MockServer::start().await;
    mount_json(&server, "/top-headlines", body_with(3)).await;
    let (mut app, tx, mut rx) = app_for(&server, Config::default()).await;
    let db = app.db.clone();
    app.prefs
        .set_bool(&db, NOTIFICATIONS_ENABLED, false)
        .await
        .unwrap();

    app.load_headlines(Some("science"), &tx);
    app.drain(&mut rx, &tx).await;

    assert_eq!(app.headlines.trending.len(), 3);
    assert!(app.headlines.latest.is_empty());
    assert!(app.db.get_notifications().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_selected_category_used_for_headlines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/top-headlines"))
        .and(query_param("category", "sports"))
        .and(query_param("country", "us"))
        .and(query_param("pageSize", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body_with(1)))
        .expect(1)
        .mount(&server)
        .await;
    let (mut app, tx, mut rx) = app_for(&server, Config::default()).await;

    app.select_category("sports").await.unwrap();
    app.load_headlines(None, &tx);
    app.drain(&mut rx, &tx).await;

    assert_eq!(app.headlines_category.as_deref(), Some("sports"));
}

#[tokio::test]
async fn test_zero_articles_is_error_path() {
    let server = MockServer::start().await;
    mount_json(&server, "/top-headlines", body_with(0)).await;
    let (mut app, tx, mut rx) = app_for(&server, Config::default()).await;

    app.load_headlines(None, &tx);
    app.drain(&mut rx, &tx).await;

    assert!(app.headlines.is_empty());
    assert_eq!(app.last_error.as_deref(), Some("No news found"));
    assert!(app.db.get_notifications().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_html_challenge_page_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string("<!DOCTYPE html><title>Just a moment...</title>"),
        )
        .mount(&server)
        .await;
    let (mut app, tx, mut rx) = app_for(&server, Config::default()).await;

    app.load_headlines(None, &tx);
    app.drain(&mut rx, &tx).await;

    let error = app.last_error.unwrap();
    assert!(error.contains("HTML instead of JSON"), "got: {error}");
}

#[tokio::test]
async fn test_search_records_history_caches_and_marks_favorites() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/everything"))
        .and(query_param("q", "climate"))
        .and(query_param("sortBy", "publishedAt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body_with(4)))
        .mount(&server)
        .await;
    let (mut app, tx, mut rx) = app_for(&server, Config::default()).await;
    app.db
        .insert_favorite(&NewFavorite {
            url: Some("https://example.com/story/2".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(app.submit_search("climate", &tx));
    app.drain(&mut rx, &tx).await;

    assert_eq!(app.search_results.len(), 4);
    let flags: Vec<bool> = app.search_results.iter().map(|a| a.is_favorite).collect();
    assert_eq!(flags, vec![false, false, true, false]);

    assert_eq!(app.db.count_searches().await.unwrap(), 1);
    let cached = app.db.get_cached_by_query("climate").await.unwrap();
    assert_eq!(cached.len(), 4);
}

#[tokio::test]
async fn test_history_counts_every_submission() {
    let server = MockServer::start().await;
    mount_json(&server, "/everything", body_with(0)).await;
    let (mut app, tx, mut rx) = app_for(&server, Config::default()).await;

    for query in ["one", "two", "  ", "two"] {
        app.submit_search(query, &tx);
        app.drain(&mut rx, &tx).await;
    }

    // Empty results still count; the blank query does not
    assert_eq!(app.db.count_searches().await.unwrap(), 3);
    assert!(app.db.get_all_cached().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_toggle_from_search_results() {
    let server = MockServer::start().await;
    mount_json(&server, "/everything", body_with(2)).await;
    let (mut app, tx, mut rx) = app_for(&server, Config::default()).await;

    app.submit_search("anything", &tx);
    app.drain(&mut rx, &tx).await;

    let target = app.search_results[1].clone();
    assert!(app.toggle_favorite(&target, &tx));
    app.drain(&mut rx, &tx).await;
    assert!(app.is_favorite("https://example.com/story/1").await);

    let target = app.search_results[1].clone();
    assert!(target.is_favorite);
    assert!(!app.toggle_favorite(&target, &tx));
    app.drain(&mut rx, &tx).await;
    assert!(!app.is_favorite("https://example.com/story/1").await);
    assert_eq!(app.pending_tasks(), 0);
}
