use serde::{Deserialize, Serialize};

use crate::storage::{now_millis, CachedArticle, FavoriteArticle, NewFavorite};

/// Number of leading articles shown in the trending strip.
pub const TRENDING_COUNT: usize = 5;
/// Maximum number of articles shown in the latest list after trending.
pub const LATEST_COUNT: usize = 20;

/// Top-level NewsAPI response body.
///
/// Error responses share the envelope: `status` is `"error"` and `code` /
/// `message` are set instead of `articles`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl NewsResponse {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }
}

/// Publisher attribution attached to each article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Source {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// An article as delivered by the API. `url` is its identity.
///
/// Every text field is optional on the wire; NewsAPI regularly sends `null`
/// authors, images and content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Derived from the favorites table; never sent by the API or persisted.
    #[serde(skip)]
    pub is_favorite: bool,
}

impl Article {
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.name.as_deref())
    }

    /// Title, or a placeholder for the odd article the API sends without one.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    /// Snapshot of the display fields that a favorite row keeps.
    pub fn to_favorite(&self) -> NewFavorite {
        NewFavorite {
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            url_to_image: self.url_to_image.clone(),
            author: self.author.clone(),
            published_at: self.published_at.clone(),
            source_name: self.source_name().map(str::to_owned),
        }
    }

    /// Cache row for this article under `query`. `None` when the article has
    /// no url to key it by.
    pub fn to_cached(&self, query: &str) -> Option<CachedArticle> {
        let url = self.url.clone()?;
        Some(CachedArticle {
            url,
            title: self.title.clone(),
            description: self.description.clone(),
            url_to_image: self.url_to_image.clone(),
            author: self.author.clone(),
            published_at: self.published_at.clone(),
            source_name: self.source_name().map(str::to_owned),
            query: Some(query.to_owned()),
            cached_at: now_millis(),
        })
    }
}

impl From<CachedArticle> for Article {
    fn from(cached: CachedArticle) -> Self {
        Self {
            source: cached.source_name.map(|name| Source {
                id: None,
                name: Some(name),
            }),
            author: cached.author,
            title: cached.title,
            description: cached.description,
            url: Some(cached.url),
            url_to_image: cached.url_to_image,
            published_at: cached.published_at,
            content: None,
            is_favorite: false,
        }
    }
}

impl From<FavoriteArticle> for Article {
    fn from(favorite: FavoriteArticle) -> Self {
        Self {
            source: favorite.source_name.map(|name| Source {
                id: None,
                name: Some(name),
            }),
            author: favorite.author,
            title: favorite.title,
            description: favorite.description,
            url: favorite.url,
            url_to_image: favorite.url_to_image,
            published_at: favorite.published_at,
            content: None,
            is_favorite: true,
        }
    }
}

/// A response list partitioned for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleSplit {
    /// The first [`TRENDING_COUNT`] articles.
    pub trending: Vec<Article>,
    /// Up to [`LATEST_COUNT`] articles following the trending ones.
    pub latest: Vec<Article>,
}

impl ArticleSplit {
    pub fn is_empty(&self) -> bool {
        self.trending.is_empty() && self.latest.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trending.len() + self.latest.len()
    }

    /// Iterate trending then latest, in original response order.
    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.trending.iter().chain(self.latest.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Article> {
        self.trending.iter_mut().chain(self.latest.iter_mut())
    }
}

/// Split a response list positionally: `trending = min(5, n)` items, then
/// `latest = min(20, n - trending)` items. Anything past 25 is dropped.
pub fn split_trending_latest(mut articles: Vec<Article>) -> ArticleSplit {
    articles.truncate(TRENDING_COUNT + LATEST_COUNT);
    let latest = if articles.len() > TRENDING_COUNT {
        articles.split_off(TRENDING_COUNT)
    } else {
        Vec::new()
    };
    ArticleSplit {
        trending: articles,
        latest,
    }
}
