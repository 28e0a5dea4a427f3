use url::form_urlencoded;

use crate::data::Dataset;
use crate::topics::TopicCatalog;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: String,
    pub topic_names_path: String,
    pub bind_addr: String,
    pub min_year: i32,
    pub top_n_default: usize,
    pub top_n_max: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_path: std::env::var("DATA_PATH")
                .unwrap_or_else(|_| "./data/topic_counts.csv".to_string()),
            topic_names_path: std::env::var("TOPIC_NAMES_PATH")
                .unwrap_or_else(|_| "./data/topic_names.txt".to_string()),
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8050".to_string()),
            min_year: std::env::var("MIN_YEAR").ok().and_then(|v| v.parse().ok()).unwrap_or(2000),
            top_n_default: std::env::var("TOP_N_DEFAULT").ok().and_then(|v| v.parse().ok()).unwrap_or(20),
            top_n_max: std::env::var("TOP_N_MAX").ok().and_then(|v| v.parse().ok()).unwrap_or(40),
        }
    }
}

/// Everything the recompute functions read: configuration plus the
/// immutable dataset and label catalog. Built once in `main`, passed by
/// reference everywhere, never mutated.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub dataset: Dataset,
    pub catalog: TopicCatalog,
}

/// Per-request filter values. The browser owns the live control state;
/// the server re-parses it from the query string on every request and
/// stores nothing between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub top_n: usize,
    /// Explicitly selected topic keys. Empty means "all available topics".
    pub selected: Vec<String>,
    pub year_range: (i32, i32),
}

impl Filters {
    pub fn defaults(ctx: &AppContext) -> Self {
        Self {
            top_n: ctx.config.top_n_default,
            selected: Vec::new(),
            year_range: ctx.dataset.year_bounds(),
        }
    }

    /// Parse `top_n`, repeated `topics`, `year_min`, `year_max` from a URL
    /// query string. Missing or unparseable parameters fall back to the
    /// defaults; `top_n` is clamped to the configured maximum.
    pub fn from_query(query: &str, ctx: &AppContext) -> Self {
        let mut filters = Self::defaults(ctx);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "top_n" => {
                    if let Ok(n) = value.parse::<usize>() {
                        filters.top_n = n.min(ctx.config.top_n_max);
                    }
                }
                "topics" => {
                    if !value.is_empty() {
                        filters.selected.push(value.into_owned());
                    }
                }
                "year_min" => {
                    if let Ok(y) = value.parse::<i32>() {
                        filters.year_range.0 = y;
                    }
                }
                "year_max" => {
                    if let Ok(y) = value.parse::<i32>() {
                        filters.year_range.1 = y;
                    }
                }
                _ => {}
            }
        }
        filters
    }
}
