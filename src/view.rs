//! Plain-text rendering for the terminal.
//!
//! Every string that came from the API or the database passes through
//! `clean` before it is printed.
use std::borrow::Cow;

use chrono::{DateTime, Utc};

use crate::api::{Article, ArticleSplit};
use crate::storage::{
    CachedArticle, Category, FavoriteArticle, NotificationItem, SearchHistoryEntry,
};
use crate::util::{single_line, strip_control_chars, truncate_chars};

const TITLE_WIDTH: usize = 90;
const FAVORITE_MARK: &str = "★";
const PLAIN_MARK: &str = " ";

fn clean(s: &str) -> Cow<'_, str> {
    strip_control_chars(s)
}

fn one_line(s: &str, max: usize) -> String {
    truncate_chars(&single_line(&clean(s)), max).into_owned()
}

/// Relative age of an epoch-seconds timestamp against `now`.
pub fn format_relative_time(timestamp: Option<i64>, now: i64) -> String {
    let Some(ts) = timestamp else {
        return String::new();
    };
    let diff = now - ts;

    if diff < 60 {
        return "now".to_string();
    }
    if diff < 3600 {
        return format!("{}m", diff / 60);
    }
    if diff < 86400 {
        return format!("{}h", diff / 3600);
    }
    if diff < 604800 {
        return format!("{}d", diff / 86400);
    }
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%b %d").to_string())
        .unwrap_or_default()
}

/// Epoch seconds for an RFC 3339 `publishedAt` value.
pub fn parse_published(published_at: Option<&str>) -> Option<i64> {
    published_at
        .and_then(|p| DateTime::parse_from_rfc3339(p.trim()).ok())
        .map(|dt| dt.timestamp())
}

/// `publishedAt` as `YYYY-MM-DD HH:MM` UTC, or the raw value if it does not parse.
pub fn format_published(published_at: Option<&str>) -> String {
    match parse_published(published_at).and_then(|ts| DateTime::from_timestamp(ts, 0)) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => published_at.map(|p| clean(p).into_owned()).unwrap_or_default(),
    }
}

pub fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn article_row(index: usize, article: &Article, now: i64) -> String {
    let mark = if article.is_favorite { FAVORITE_MARK } else { PLAIN_MARK };
    let age = format_relative_time(parse_published(article.published_at.as_deref()), now);
    let source = article.source_name().map(|s| one_line(s, 30)).unwrap_or_default();
    let mut row = format!(
        "{mark} {index:>2}. {}",
        one_line(article.display_title(), TITLE_WIDTH)
    );
    let meta: Vec<String> = [source, age].into_iter().filter(|s| !s.is_empty()).collect();
    if !meta.is_empty() {
        row.push_str(&format!("  [{}]", meta.join(", ")));
    }
    if let Some(url) = article.url.as_deref() {
        row.push_str(&format!("\n      {}", clean(url)));
    }
    row
}

/// A titled, numbered list of articles.
pub fn render_article_list(heading: &str, articles: &[Article]) -> String {
    let now = Utc::now().timestamp();
    let mut lines = vec![heading.to_string()];
    if articles.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(
        articles
            .iter()
            .enumerate()
            .map(|(i, a)| article_row(i + 1, a, now)),
    );
    lines.join("\n")
}

/// Trending strip followed by the latest list.
pub fn render_headlines(category: &str, split: &ArticleSplit) -> String {
    let mut out = render_article_list(
        &format!("TRENDING ({})", clean(category)),
        &split.trending,
    );
    out.push_str("\n\n");
    out.push_str(&render_article_list("LATEST", &split.latest));
    out
}

/// Single-article detail view.
pub fn render_detail(article: &Article) -> String {
    let mut lines = vec![clean(article.display_title()).into_owned()];
    if let Some(source) = article.source_name() {
        lines.push(format!("Source:    {}", clean(source)));
    }
    if let Some(author) = article.author.as_deref() {
        lines.push(format!("Author:    {}", clean(author)));
    }
    if article.published_at.is_some() {
        lines.push(format!(
            "Published: {}",
            format_published(article.published_at.as_deref())
        ));
    }
    lines.push(format!(
        "Favorite:  {}",
        if article.is_favorite { "yes" } else { "no" }
    ));
    if let Some(url) = article.url.as_deref() {
        lines.push(format!("Link:      {}", clean(url)));
    }
    for body in [article.description.as_deref(), article.content.as_deref()]
        .into_iter()
        .flatten()
    {
        lines.push(String::new());
        lines.push(clean(body).into_owned());
    }
    lines.join("\n")
}

pub fn render_favorites(favorites: &[FavoriteArticle]) -> String {
    if favorites.is_empty() {
        return "No favorites yet".to_string();
    }
    favorites
        .iter()
        .map(|f| {
            format!(
                "{FAVORITE_MARK} {}  (saved {})\n      {}",
                one_line(f.title.as_deref().unwrap_or("(untitled)"), TITLE_WIDTH),
                format_millis(f.saved_at),
                f.url.as_deref().map(clean).unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_history(entries: &[SearchHistoryEntry]) -> String {
    if entries.is_empty() {
        return "No searches yet".to_string();
    }
    entries
        .iter()
        .map(|e| {
            format!(
                "{}  {}  ({} results)",
                format_millis(e.searched_at),
                one_line(&e.query, TITLE_WIDTH),
                e.result_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_categories(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| {
            format!(
                "{} {:<14} {}",
                if c.is_selected { "*" } else { " " },
                c.name,
                c.display_name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_notifications(items: &[NotificationItem]) -> String {
    if items.is_empty() {
        return "No notifications".to_string();
    }
    items
        .iter()
        .map(|n| {
            let mut row = format!(
                "#{:<4} {} {}  {}",
                n.id,
                if n.is_read { " " } else { "●" },
                format_millis(n.created_at),
                one_line(&n.title, TITLE_WIDTH)
            );
            if let Some(message) = n.message.as_deref() {
                row.push_str(&format!("\n        {}", one_line(message, TITLE_WIDTH)));
            }
            row
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_cached(articles: &[CachedArticle]) -> String {
    if articles.is_empty() {
        return "Cache is empty".to_string();
    }
    articles
        .iter()
        .map(|a| {
            format!(
                "{}  [{}] {}\n      {}",
                format_millis(a.cached_at),
                a.query.as_deref().map(|q| one_line(q, 30)).unwrap_or_default(),
                one_line(a.title.as_deref().unwrap_or("(untitled)"), TITLE_WIDTH),
                clean(&a.url)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_settings(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(k, v)| format!("{k} = {}", clean(v)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Source;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_relative_time() {
        let now = 1_700_000_000;
        assert_eq!(format_relative_time(None, now), "");
        assert_eq!(format_relative_time(Some(now + 500), now), "now");
        assert_eq!(format_relative_time(Some(now - 30), now), "now");
        assert_eq!(format_relative_time(Some(now - 600), now), "10m");
        assert_eq!(format_relative_time(Some(now - 7200), now), "2h");
        assert_eq!(format_relative_time(Some(now - 3 * 86400), now), "3d");
        assert_eq!(format_relative_time(Some(0), now), "Jan 01");
    }

    #[test]
    fn test_format_published() {
        assert_eq!(
            format_published(Some("2024-05-01T10:30:00Z")),
            "2024-05-01 10:30 UTC"
        );
        assert_eq!(format_published(Some("yesterday")), "yesterday");
        assert_eq!(format_published(None), "");
    }

    #[test]
    fn test_detail_strips_escape_sequences() {
        let article = Article {
            title: Some("\x1b[2JHeadline".to_string()),
            description: Some("Desc\x07".to_string()),
            url: Some("https://example.com/a".to_string()),
            source: Some(Source {
                id: None,
                name: Some("Wire".to_string()),
            }),
            is_favorite: true,
            ..Default::default()
        };
        let out = render_detail(&article);
        assert!(!out.contains('\x1b'));
        assert!(!out.contains('\x07'));
        assert!(out.starts_with("Headline"));
        assert!(out.contains("Source:    Wire"));
        assert!(out.contains("Favorite:  yes"));
    }

    #[test]
    fn test_headlines_sections() {
        let split = ArticleSplit {
            trending: vec![Article {
                title: Some("Top".to_string()),
                is_favorite: true,
                ..Default::default()
            }],
            latest: Vec::new(),
        };
        let out = render_headlines("science", &split);
        assert!(out.starts_with("TRENDING (science)"));
        assert!(out.contains("★  1. Top"));
        assert!(out.contains("LATEST\n  (none)"));
    }

    #[test]
    fn test_history_rows() {
        let entries = vec![SearchHistoryEntry {
            id: 1,
            query: "rust\nlang".to_string(),
            searched_at: 0,
            result_count: 0,
        }];
        assert_eq!(
            render_history(&entries),
            "1970-01-01 00:00  rust lang  (0 results)"
        );
        assert_eq!(render_history(&[]), "No searches yet");
    }

    #[test]
    fn test_categories_mark_selected() {
        let categories = vec![
            Category {
                id: 1,
                name: "general".to_string(),
                display_name: "General".to_string(),
                is_selected: true,
                sort_order: 0,
            },
            Category {
                id: 2,
                name: "sports".to_string(),
                display_name: "Sports".to_string(),
                is_selected: false,
                sort_order: 1,
            },
        ];
        let out = render_categories(&categories);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("* general"));
        assert!(lines[1].starts_with("  sports"));
    }
}
