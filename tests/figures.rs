use std::fs;
use std::path::Path;
use tempfile::TempDir;

use topictrends::data::load_dataset;
use topictrends::figures;
use topictrends::select::top_topics;
use topictrends::server::respond_to;
use topictrends::state::{AppContext, Config, Filters};
use topictrends::topics::TopicCatalog;

fn write_csv(path: &Path, header: &str, rows: &[&str]) {
    let mut out = String::new();
    out.push_str(header);
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

/// Three topics over 2000-01..2002-01, with a zero and a missing cell in
/// topic_1 to exercise the falsy conflation.
fn context(dir: &TempDir) -> AppContext {
    let path = dir.path().join("counts.csv");
    write_csv(
        &path,
        "year,month,topic_0,topic_1,topic_2",
        &[
            "2000,1,5,0,30",
            "2000,2,8,,25",
            "2001,1,2,4,40",
            "2002,1,7,9,10",
        ],
    );
    let dataset = load_dataset(&path, 2000).unwrap();
    let catalog =
        TopicCatalog::from_labels(vec!["Politics".into(), "Sport".into(), "Science".into()]);
    AppContext {
        config: Config {
            data_path: path.display().to_string(),
            topic_names_path: String::new(),
            bind_addr: "127.0.0.1:0".to_string(),
            min_year: 2000,
            top_n_default: 20,
            top_n_max: 40,
        },
        dataset,
        catalog,
    }
}

fn filters(ctx: &AppContext) -> Filters {
    Filters::defaults(ctx)
}

#[test]
fn year_range_filter_is_inclusive() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let rows = ctx.dataset.rows_in_range((2000, 2001));
    let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![2000, 2000, 2001]);
    assert!(ctx.dataset.rows_in_range((2005, 2010)).is_empty());
}

#[test]
fn empty_selection_equals_selecting_all_available() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let implicit = filters(&ctx);
    let all_keys: Vec<String> =
        top_topics(&ctx.dataset, &ctx.catalog, implicit.top_n, implicit.year_range)
            .unwrap()
            .into_iter()
            .map(|o| o.value)
            .collect();
    let explicit = Filters {
        selected: all_keys,
        ..implicit.clone()
    };

    let a = serde_json::to_value(figures::stacked_bar(&ctx, &implicit).unwrap()).unwrap();
    let b = serde_json::to_value(figures::stacked_bar(&ctx, &explicit).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn stacked_bar_conflates_zero_and_missing_to_null() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let f = Filters {
        selected: vec!["topic_1".to_string()],
        ..filters(&ctx)
    };
    let figure = figures::stacked_bar(&ctx, &f).unwrap();

    assert_eq!(figure.data.len(), 1);
    let y = figure.data[0]["y"].as_array().unwrap().clone();
    // raw column: [0, missing, 4, 9] -> both falsy cells emit null
    assert_eq!(y, vec![
        serde_json::Value::Null,
        serde_json::Value::Null,
        serde_json::json!(4),
        serde_json::json!(9),
    ]);
    assert_eq!(figure.layout["barmode"], "stack");
    assert_eq!(figure.data[0]["name"], "Sport");
}

#[test]
fn box_plot_keeps_zeros_and_suppresses_legend() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let f = Filters {
        selected: vec!["topic_1".to_string()],
        ..filters(&ctx)
    };
    let figure = figures::box_plot(&ctx, &f).unwrap();

    let y = figure.data[0]["y"].as_array().unwrap().clone();
    assert_eq!(y, vec![
        serde_json::json!(0),
        serde_json::Value::Null,
        serde_json::json!(4),
        serde_json::json!(9),
    ]);
    assert_eq!(figure.layout["showlegend"], false);
}

#[test]
fn first_difference_line_matches_worked_example() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("counts.csv");
    write_csv(
        &path,
        "year,month,topic_0",
        &["2000,1,5", "2000,2,8"],
    );
    let dataset = load_dataset(&path, 2000).unwrap();
    let catalog = TopicCatalog::from_labels(vec!["Politics".into()]);
    let ctx = AppContext {
        config: Config {
            data_path: path.display().to_string(),
            topic_names_path: String::new(),
            bind_addr: "127.0.0.1:0".to_string(),
            min_year: 2000,
            top_n_default: 20,
            top_n_max: 40,
        },
        dataset,
        catalog,
    };

    let figure = figures::first_difference_line(&ctx, &filters(&ctx)).unwrap();
    let y = figure.data[0]["y"].as_array().unwrap().clone();
    // differences [0, 3]; the leading 0 is falsy and emits null
    assert_eq!(y, vec![serde_json::Value::Null, serde_json::json!(3)]);
    assert_eq!(y.len(), figure.data[0]["x"].as_array().unwrap().len());
}

#[test]
fn line_charts_pin_the_display_window() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let figure = figures::line(&ctx, &filters(&ctx)).unwrap();
    assert_eq!(
        figure.layout["xaxis"]["range"],
        serde_json::json!(["2000-01", "2018-07"])
    );
    assert_eq!(figure.data[0]["mode"], "lines+markers");
}

#[test]
fn empty_year_window_renders_empty_figures() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let f = Filters {
        year_range: (2010, 2012),
        ..filters(&ctx)
    };

    // no rows -> every topic sums to zero but still appears in the option
    // list; each trace is present with empty x/y
    let stacked = figures::stacked_bar(&ctx, &f).unwrap();
    for trace in &stacked.data {
        assert!(trace["x"].as_array().unwrap().is_empty());
        assert!(trace["y"].as_array().unwrap().is_empty());
    }
    assert!(figures::line(&ctx, &f).is_ok());
    assert!(figures::first_difference_line(&ctx, &f).is_ok());
    assert!(figures::box_plot(&ctx, &f).is_ok());

    // with top_n=0 the implicit "all" set is empty too
    let none = Filters { top_n: 0, ..f };
    assert!(figures::stacked_bar(&ctx, &none).unwrap().data.is_empty());
}

#[test]
fn top_topics_options_pair_keys_with_labels() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let options = top_topics(&ctx.dataset, &ctx.catalog, 2, (2000, 2002)).unwrap();
    // sums: topic_0=22, topic_1=13, topic_2=105
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].value, "topic_2");
    assert_eq!(options[0].label, "Science");
    assert_eq!(options[1].value, "topic_0");
}

#[test]
fn filters_parse_query_with_defaults_and_clamping() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let defaults = Filters::from_query("", &ctx);
    assert_eq!(defaults.top_n, 20);
    assert!(defaults.selected.is_empty());
    assert_eq!(defaults.year_range, (2000, 2002));

    let parsed = Filters::from_query(
        "top_n=90&topics=topic_0&topics=topic_2&year_min=2001&year_max=2002",
        &ctx,
    );
    assert_eq!(parsed.top_n, 40);
    assert_eq!(parsed.selected, vec!["topic_0", "topic_2"]);
    assert_eq!(parsed.year_range, (2001, 2002));
}

#[test]
fn routes_serve_json_and_unknown_paths_404() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let (status, _, body) = respond_to(&ctx, "/api/health", "");
    assert_eq!(status, "200 OK");
    assert_eq!(body, r#"{"status":"ok"}"#);

    let (status, ctype, body) = respond_to(&ctx, "/api/figure/line", "top_n=10");
    assert_eq!(status, "200 OK");
    assert_eq!(ctype, "application/json");
    let figure: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(figure["data"].is_array());
    assert_eq!(figure["layout"]["title"], "Line Chart");

    let (status, _, body) = respond_to(&ctx, "/api/manifest", "");
    assert_eq!(status, "200 OK");
    let manifest: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(manifest["topic_count"], 3);

    let (status, _, _) = respond_to(&ctx, "/api/nope", "");
    assert_eq!(status, "404 NOT FOUND");

    let (status, _, body) = respond_to(&ctx, "/", "");
    assert_eq!(status, "200 OK");
    assert!(body.contains("Plotly"));
}

#[test]
fn word_cloud_ignores_filters() {
    let figure = figures::word_cloud();
    let trace = &figure.data[0];
    assert_eq!(trace["mode"], "text");
    assert_eq!(trace["text"].as_array().unwrap().len(), 8);
    assert_eq!(figure.layout["title"], "Word Cloud");
    assert_eq!(figure.layout["xaxis"]["showticklabels"], false);
}
