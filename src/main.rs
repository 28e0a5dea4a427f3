use anyhow::{Context, Result};
use std::path::Path;

use topictrends::logging::{log, obj, v_num, v_str, Domain, Level};
use topictrends::state::{AppContext, Config};
use topictrends::{data, server, topics};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    let dataset = data::load_dataset(Path::new(&config.data_path), config.min_year)
        .with_context(|| format!("loading dataset from {}", config.data_path))?;
    let catalog = topics::TopicCatalog::load(Path::new(&config.topic_names_path))
        .with_context(|| format!("loading topic names from {}", config.topic_names_path))?;
    catalog.check_matches(&dataset)?;

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("rows", v_num(dataset.rows.len() as f64)),
            ("topics", v_num(dataset.topic_keys.len() as f64)),
            ("min_year", v_num(dataset.min_year as f64)),
            ("max_year", v_num(dataset.max_year as f64)),
            ("dataset_sha256", v_str(&dataset.manifest.hash_sha256)),
        ]),
    );

    let ctx = AppContext {
        config,
        dataset,
        catalog,
    };
    server::serve(&ctx).await
}
