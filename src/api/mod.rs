//! NewsAPI remote client.
//!
//! - [`client`] - HTTP requests, response classification, error taxonomy
//! - [`models`] - JSON wire types and the trending/latest split

mod client;
mod models;

pub use client::{
    classify_response, is_placeholder_key, ApiError, HeadlinesQuery, NewsClient, SearchQuery,
    DEFAULT_BASE_URL, PLACEHOLDER_API_KEY,
};
pub use models::{
    split_trending_latest, Article, ArticleSplit, NewsResponse, Source, LATEST_COUNT,
    TRENDING_COUNT,
};
