//! Chart descriptor builders.
//!
//! Each builder is a pure function from the immutable [`AppContext`] plus
//! the request's [`Filters`] to a plotly-shaped figure: a trace list and a
//! layout object, rebuilt from scratch on every call. An empty result
//! (no rows in range, no topics) yields an empty trace list, never an
//! error.

use anyhow::{Context, Result};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};

use crate::select::top_topics;
use crate::series::{first_difference, mask_counts, mask_falsy, topic_values};
use crate::state::{AppContext, Filters};

/// Trace list plus layout, serialized as-is for the plotting frontend.
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
}

/// Cosmetic x-axis display window for the two line charts. This is layout
/// only; it never filters data.
const LINE_AXIS_WINDOW: [&str; 2] = ["2000-01", "2018-07"];

const WORD_CLOUD_WORDS: [&str; 8] = [
    "just", "some", "random", "words", "and", "more", "other", "things",
];

const WORD_CLOUD_POINTS: usize = 30;

/// The default plotly trace palette; the word cloud draws from indices 1..10.
const PALETTE: [&str; 10] = [
    "rgb(31, 119, 180)",
    "rgb(255, 127, 14)",
    "rgb(44, 160, 44)",
    "rgb(214, 39, 40)",
    "rgb(148, 103, 189)",
    "rgb(140, 86, 75)",
    "rgb(227, 119, 194)",
    "rgb(127, 127, 127)",
    "rgb(188, 189, 34)",
    "rgb(23, 190, 207)",
];

/// Empty selection means "all currently available topics": substitute the
/// top-N option list computed from the same filters.
fn effective_topics(ctx: &AppContext, filters: &Filters) -> Result<Vec<String>> {
    if filters.selected.is_empty() {
        let options = top_topics(
            &ctx.dataset,
            &ctx.catalog,
            filters.top_n,
            filters.year_range,
        )?;
        Ok(options.into_iter().map(|o| o.value).collect())
    } else {
        Ok(filters.selected.clone())
    }
}

fn topic_column(ctx: &AppContext, key: &str) -> Result<usize> {
    ctx.dataset
        .topic_index(key)
        .with_context(|| format!("unknown topic key '{}'", key))
}

pub fn stacked_bar(ctx: &AppContext, filters: &Filters) -> Result<Figure> {
    let topics = effective_topics(ctx, filters)?;
    let rows = ctx.dataset.rows_in_range(filters.year_range);
    let x: Vec<&str> = rows.iter().map(|r| r.year_month.as_str()).collect();

    let mut data = Vec::with_capacity(topics.len());
    for key in &topics {
        let column = topic_column(ctx, key)?;
        let y = mask_counts(&topic_values(&rows, column));
        data.push(json!({
            "type": "bar",
            "x": &x,
            "y": y,
            "name": ctx.catalog.label(key)?,
        }));
    }

    Ok(Figure {
        data,
        layout: json!({
            "title": "Stacked Bar Chart",
            "barmode": "stack",
            "yaxis": { "hoverformat": ".0f" },
        }),
    })
}

pub fn line(ctx: &AppContext, filters: &Filters) -> Result<Figure> {
    let topics = effective_topics(ctx, filters)?;
    let rows = ctx.dataset.rows_in_range(filters.year_range);
    let x: Vec<&str> = rows.iter().map(|r| r.year_month.as_str()).collect();

    let mut data = Vec::with_capacity(topics.len());
    for key in &topics {
        let column = topic_column(ctx, key)?;
        let y = mask_counts(&topic_values(&rows, column));
        data.push(json!({
            "type": "scatter",
            "mode": "lines+markers",
            "x": &x,
            "y": y,
            "name": ctx.catalog.label(key)?,
        }));
    }

    Ok(Figure {
        data,
        layout: line_layout("Line Chart"),
    })
}

pub fn first_difference_line(ctx: &AppContext, filters: &Filters) -> Result<Figure> {
    let topics = effective_topics(ctx, filters)?;
    let rows = ctx.dataset.rows_in_range(filters.year_range);
    let x: Vec<&str> = rows.iter().map(|r| r.year_month.as_str()).collect();

    let mut data = Vec::with_capacity(topics.len());
    for key in &topics {
        let column = topic_column(ctx, key)?;
        let y = mask_falsy(&first_difference(&topic_values(&rows, column)));
        data.push(json!({
            "type": "scatter",
            "mode": "lines+markers",
            "x": &x,
            "y": y,
            "name": ctx.catalog.label(key)?,
        }));
    }

    Ok(Figure {
        data,
        layout: line_layout("First Difference Line Chart"),
    })
}

fn line_layout(title: &str) -> Value {
    json!({
        "title": title,
        "yaxis": { "type": "linear" },
        "xaxis": {
            "type": "date",
            "showline": true,
            "range": LINE_AXIS_WINDOW,
            "showgrid": false,
        },
    })
}

/// One box-and-whisker per topic over the raw filtered counts. Unlike the
/// time-series charts this keeps zeros; only truly missing cells are null.
pub fn box_plot(ctx: &AppContext, filters: &Filters) -> Result<Figure> {
    let topics = effective_topics(ctx, filters)?;
    let rows = ctx.dataset.rows_in_range(filters.year_range);

    let mut data = Vec::with_capacity(topics.len());
    for key in &topics {
        let column = topic_column(ctx, key)?;
        data.push(json!({
            "type": "box",
            "y": topic_values(&rows, column),
            "name": ctx.catalog.label(key)?,
        }));
    }

    Ok(Figure {
        data,
        layout: json!({
            "title": "Vertical Box Plot",
            "showlegend": false,
            "yaxis": { "hoverformat": ".0f" },
        }),
    })
}

/// Decorative placeholder, reproduced as-is: a fixed vocabulary scattered
/// at fresh random positions with random sizes and palette colors on every
/// call. Ignores all filters. Positions intentionally outnumber words.
pub fn word_cloud() -> Figure {
    let mut rng = rand::thread_rng();
    let colors: Vec<&str> = (0..WORD_CLOUD_WORDS.len())
        .map(|_| PALETTE[rng.gen_range(1..10)])
        .collect();
    let sizes: Vec<u32> = (0..WORD_CLOUD_WORDS.len())
        .map(|_| rng.gen_range(15..=35))
        .collect();
    let xs: Vec<f64> = (0..WORD_CLOUD_POINTS).map(|_| rng.gen::<f64>()).collect();
    let ys: Vec<f64> = (0..WORD_CLOUD_POINTS).map(|_| rng.gen::<f64>()).collect();

    let hidden_axis = json!({
        "showgrid": false,
        "showticklabels": false,
        "zeroline": false,
    });

    Figure {
        data: vec![json!({
            "type": "scatter",
            "mode": "text",
            "x": xs,
            "y": ys,
            "text": WORD_CLOUD_WORDS,
            "marker": { "opacity": 0.3 },
            "textfont": { "size": sizes, "color": colors },
        })],
        layout: json!({
            "title": "Word Cloud",
            "xaxis": hidden_axis.clone(),
            "yaxis": hidden_axis,
        }),
    }
}
