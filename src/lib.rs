//! Topic-trends dashboard: an HTTP service over a pre-aggregated table of
//! topic-occurrence counts per (year, month).
//!
//! The dataset and topic label catalog are loaded once at startup into an
//! immutable [`state::AppContext`]. Every figure endpoint recomputes its
//! plotly-shaped chart descriptor from scratch out of the context plus the
//! request's filter parameters, so the server holds no per-user state.

pub mod data;
pub mod figures;
pub mod logging;
pub mod select;
pub mod series;
pub mod server;
pub mod state;
pub mod topics;
