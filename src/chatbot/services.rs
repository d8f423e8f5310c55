use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRef},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, instrument};

use super::{
    dto::{ChatReply, ChatResponse, ProductCard},
    repo::{ProductCatalog, ProductFilter, ProductSort},
};
use crate::state::AppState;

const SEARCH_LIMIT: i64 = 10;
const POPULAR_LIMIT: i64 = 6;
const RECOMMEND_LIMIT: i64 = 5;

const HELP_TEXT: &str = "I can help you find food by name or category, filter by price \
(for example \"under ₹150\"), show popular items or recommend something. What are you craving?";

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "can", "craving", "dish", "dishes", "do", "food", "foods",
    "for", "get", "give", "have", "hungry", "i", "is", "item", "items", "like", "me", "need",
    "of", "order", "please", "show", "some", "something", "the", "to", "want", "what", "with",
    "would", "you", "find", "cheap", "price", "rs", "inr", "hi", "hello", "hey", "thanks",
];

const RECOMMEND_WORDS: &[&str] = &[
    "recommend", "recommended", "recommendation", "recommendations", "suggest", "suggestion",
    "suggestions",
];

const POPULAR_WORDS: &[&str] = &["popular", "best", "top", "trending", "bestseller", "bestsellers"];

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message is required")]
    EmptyMessage,
    #[error("Invalid request body")]
    InvalidBody,
    #[error(transparent)]
    Catalog(#[from] anyhow::Error),
}

impl From<JsonRejection> for ChatError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "chat body rejected");
        Self::InvalidBody
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match self {
            Self::EmptyMessage | Self::InvalidBody => {
                (StatusCode::BAD_REQUEST, Json(ChatResponse::failed(self.to_string())))
                    .into_response()
            }
            Self::Catalog(e) => {
                error!(error = %e, "chat catalog lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ChatResponse::failed("Could not look up the menu right now")),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Search,
    Popular,
    Recommend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatQuery {
    pub intent: Intent,
    pub keyword: Option<String>,
    pub max_price: Option<i32>,
}

/// Reads intent, price ceiling and search keywords out of free text.
pub fn parse_query(message: &str) -> ChatQuery {
    lazy_static! {
        static ref PRICE_RE: Regex = Regex::new(
            r"(?:under|below|less than|within|up ?to)\s*(?:₹|rs\.?|inr)?\s*(\d+)"
        )
        .unwrap();
        static ref WORD_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
    }

    let lower = message.to_lowercase();
    // a ceiling too large for i32 means no ceiling
    let max_price = PRICE_RE
        .captures(&lower)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok());
    let rest = PRICE_RE.replace_all(&lower, " ");

    let tokens: Vec<&str> = WORD_RE.find_iter(&lower).map(|m| m.as_str()).collect();
    let has = |words: &[&str]| tokens.iter().any(|t| words.contains(t));
    let intent = if has(RECOMMEND_WORDS) {
        Intent::Recommend
    } else if has(POPULAR_WORDS) {
        Intent::Popular
    } else {
        Intent::Search
    };

    let words: Vec<String> = WORD_RE
        .find_iter(&rest)
        .map(|m| m.as_str())
        .filter(|w| {
            !STOP_WORDS.contains(w) && !RECOMMEND_WORDS.contains(w) && !POPULAR_WORDS.contains(w)
        })
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .map(singular)
        .collect();
    let keyword = (!words.is_empty()).then(|| words.join(" "));

    ChatQuery {
        intent,
        keyword,
        max_price,
    }
}

fn singular(word: &str) -> String {
    match word.strip_suffix('s') {
        Some(stem) if stem.chars().count() >= 3 && !stem.ends_with('s') => stem.to_string(),
        _ => word.to_string(),
    }
}

fn price_suffix(max_price: Option<i32>) -> String {
    max_price
        .map(|p| format!(" under ₹{p}"))
        .unwrap_or_default()
}

/// Answers chat widget queries from the product catalog.
#[derive(Clone)]
pub struct ChatService {
    catalog: Arc<dyn ProductCatalog>,
}

impl FromRef<AppState> for ChatService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.catalog.clone())
    }
}

impl ChatService {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { catalog }
    }

    async fn top_rated(&self, max_price: Option<i32>, limit: i64) -> anyhow::Result<Vec<ProductCard>> {
        let filter = ProductFilter {
            keyword: None,
            max_price,
            sort: ProductSort::Rating,
            limit,
        };
        Ok(cards(self.catalog.search(&filter).await?))
    }

    #[instrument(skip(self))]
    pub async fn reply(&self, message: &str) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let query = parse_query(message);
        debug!(?query, "chat query parsed");
        let suffix = price_suffix(query.max_price);

        let reply = match (query.intent, &query.keyword, query.max_price) {
            (Intent::Recommend, _, max) => {
                let recommendations = self.top_rated(max, RECOMMEND_LIMIT).await?;
                let message = if recommendations.is_empty() {
                    format!("I don't have anything to recommend{suffix} right now.")
                } else {
                    format!("You might enjoy these{suffix}:")
                };
                ChatReply {
                    message,
                    products: Vec::new(),
                    recommendations,
                }
            }
            (Intent::Popular, _, max) => {
                let products = self.top_rated(max, POPULAR_LIMIT).await?;
                let message = if products.is_empty() {
                    format!("Nothing popular{suffix} is available right now.")
                } else {
                    format!("Here are our most popular dishes{suffix}:")
                };
                ChatReply {
                    message,
                    products,
                    recommendations: Vec::new(),
                }
            }
            (Intent::Search, Some(keyword), max) => {
                let filter = ProductFilter {
                    keyword: Some(keyword.clone()),
                    max_price: max,
                    sort: ProductSort::Rating,
                    limit: SEARCH_LIMIT,
                };
                let products = cards(self.catalog.search(&filter).await?);
                if products.is_empty() {
                    ChatReply {
                        message: format!(
                            "Sorry, I couldn't find anything matching \"{keyword}\"{suffix}. \
                             Here are some popular picks instead."
                        ),
                        products,
                        recommendations: self.top_rated(max, RECOMMEND_LIMIT).await?,
                    }
                } else {
                    ChatReply {
                        message: format!(
                            "Found {} item(s) matching \"{keyword}\"{suffix}:",
                            products.len()
                        ),
                        products,
                        recommendations: Vec::new(),
                    }
                }
            }
            (Intent::Search, None, Some(max)) => {
                let filter = ProductFilter {
                    keyword: None,
                    max_price: Some(max),
                    sort: ProductSort::PriceAsc,
                    limit: SEARCH_LIMIT,
                };
                let products = cards(self.catalog.search(&filter).await?);
                let message = if products.is_empty() {
                    format!("Sorry, nothing is available under ₹{max} right now.")
                } else {
                    format!("Here are {} item(s) under ₹{max}:", products.len())
                };
                ChatReply {
                    message,
                    products,
                    recommendations: Vec::new(),
                }
            }
            (Intent::Search, None, None) => ChatReply {
                message: HELP_TEXT.to_string(),
                products: Vec::new(),
                recommendations: self.top_rated(None, 3).await?,
            },
        };
        Ok(reply)
    }
}

fn cards(products: Vec<super::repo::Product>) -> Vec<ProductCard> {
    products.into_iter().map(ProductCard::from).collect()
}
