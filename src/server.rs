//! HTTP surface: the embedded dashboard page plus the JSON endpoints the
//! page polls on every control change.
//!
//! Connections are accepted and handled one at a time, which serializes
//! recomputes exactly like the original one-callback-at-a-time runtime.

use anyhow::{Context, Result};
use serde_json::json;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::figures;
use crate::logging::{log, obj, v_num, v_str, Domain, Level};
use crate::select::top_topics;
use crate::state::{AppContext, Filters};

const INDEX_HTML: &str = include_str!("../assets/index.html");

pub async fn serve(ctx: &AppContext) -> Result<()> {
    let listener = TcpListener::bind(&ctx.config.bind_addr)
        .await
        .with_context(|| format!("binding {}", ctx.config.bind_addr))?;
    log(
        Level::Info,
        Domain::Server,
        "listening",
        obj(&[("addr", v_str(&ctx.config.bind_addr))]),
    );

    loop {
        let (stream, _) = listener.accept().await?;
        if let Err(err) = handle(ctx, stream).await {
            log(
                Level::Warn,
                Domain::Server,
                "connection_error",
                obj(&[("error", v_str(&format!("{:#}", err)))]),
            );
        }
    }
}

async fn handle(ctx: &AppContext, mut stream: TcpStream) -> Result<()> {
    let mut reader = BufReader::new(&mut stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let started = Instant::now();
    let (method, target) = match parse_request_line(&request_line) {
        Some(parts) => parts,
        None => return Ok(()), // empty or garbled request line, drop it
    };
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };

    let (status, content_type, body) = if method == "GET" {
        respond_to(ctx, path, query)
    } else {
        (
            "405 METHOD NOT ALLOWED",
            "application/json",
            json!({ "error": "only GET is supported" }).to_string(),
        )
    };

    log(
        Level::Debug,
        Domain::Server,
        "request",
        obj(&[
            ("method", v_str(method)),
            ("path", v_str(path)),
            ("status", v_str(status)),
            ("elapsed_ms", v_num(started.elapsed().as_secs_f64() * 1000.0)),
        ]),
    );

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nAccess-Control-Allow-Origin: *\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method, target))
}

/// Route a GET to its response. Pure over the context and the request,
/// which keeps it callable from tests without a socket.
pub fn respond_to(
    ctx: &AppContext,
    path: &str,
    query: &str,
) -> (&'static str, &'static str, String) {
    match path {
        "/" => ("200 OK", "text/html; charset=utf-8", INDEX_HTML.to_string()),
        "/api/health" => ("200 OK", "application/json", r#"{"status":"ok"}"#.to_string()),
        "/api/manifest" => match serde_json::to_string(&ctx.dataset.manifest) {
            Ok(body) => ("200 OK", "application/json", body),
            Err(err) => recompute_error("manifest", &err.to_string()),
        },
        "/api/topics" => {
            let filters = Filters::from_query(query, ctx);
            match top_topics(
                &ctx.dataset,
                &ctx.catalog,
                filters.top_n,
                filters.year_range,
            ) {
                Ok(options) => match serde_json::to_string(&options) {
                    Ok(body) => ("200 OK", "application/json", body),
                    Err(err) => recompute_error("topics", &err.to_string()),
                },
                Err(err) => recompute_error("topics", &format!("{:#}", err)),
            }
        }
        "/api/figure/stacked-bar" => figure_response(ctx, query, "stacked-bar"),
        "/api/figure/line" => figure_response(ctx, query, "line"),
        "/api/figure/first-difference" => figure_response(ctx, query, "first-difference"),
        "/api/figure/box" => figure_response(ctx, query, "box"),
        "/api/figure/word-cloud" => figure_response(ctx, query, "word-cloud"),
        _ => (
            "404 NOT FOUND",
            "application/json",
            json!({ "error": "not found" }).to_string(),
        ),
    }
}

fn figure_response(
    ctx: &AppContext,
    query: &str,
    chart: &str,
) -> (&'static str, &'static str, String) {
    let filters = Filters::from_query(query, ctx);
    let figure = match chart {
        "stacked-bar" => figures::stacked_bar(ctx, &filters),
        "line" => figures::line(ctx, &filters),
        "first-difference" => figures::first_difference_line(ctx, &filters),
        "box" => figures::box_plot(ctx, &filters),
        "word-cloud" => Ok(figures::word_cloud()),
        other => Err(anyhow::anyhow!("unknown chart '{}'", other)),
    };

    match figure {
        Ok(figure) => {
            log(
                Level::Debug,
                Domain::Figure,
                "recompute",
                obj(&[
                    ("chart", v_str(chart)),
                    ("traces", v_num(figure.data.len() as f64)),
                    ("top_n", v_num(filters.top_n as f64)),
                ]),
            );
            match serde_json::to_string(&figure) {
                Ok(body) => ("200 OK", "application/json", body),
                Err(err) => recompute_error(chart, &err.to_string()),
            }
        }
        Err(err) => recompute_error(chart, &format!("{:#}", err)),
    }
}

fn recompute_error(chart: &str, message: &str) -> (&'static str, &'static str, String) {
    log(
        Level::Error,
        Domain::Figure,
        "recompute_failed",
        obj(&[("chart", v_str(chart)), ("error", v_str(message))]),
    );
    (
        "500 INTERNAL SERVER ERROR",
        "application/json",
        json!({ "error": message }).to_string(),
    )
}
