use anyhow::Result;
use serde::Serialize;

use crate::data::Dataset;
use crate::topics::TopicCatalog;

/// One entry of the topic multi-select: the column key plus its display name.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TopicOption {
    pub value: String,
    pub label: String,
}

/// Sum of each topic column over the rows inside the inclusive year range.
/// Missing cells count as zero. Index *i* of the result is `topic_i`.
pub fn topic_sums(dataset: &Dataset, year_range: (i32, i32)) -> Vec<u64> {
    let mut sums = vec![0u64; dataset.topic_keys.len()];
    for row in dataset.rows_in_range(year_range) {
        for (i, count) in row.counts.iter().enumerate() {
            sums[i] += count.unwrap_or(0);
        }
    }
    sums
}

/// The `top_n` topics by sum over the year range, descending. The sort is
/// stable, so topics with equal sums keep ascending column order. This
/// list populates the multi-select options and doubles as the implicit
/// "all" set when the user has selected nothing.
pub fn top_topics(
    dataset: &Dataset,
    catalog: &TopicCatalog,
    top_n: usize,
    year_range: (i32, i32),
) -> Result<Vec<TopicOption>> {
    let sums = topic_sums(dataset, year_range);
    let mut order: Vec<usize> = (0..sums.len()).collect();
    order.sort_by(|a, b| sums[*b].cmp(&sums[*a]));
    order.truncate(top_n);

    let mut options = Vec::with_capacity(order.len());
    for index in order {
        let value = TopicCatalog::key(index);
        let label = catalog.label(&value)?.to_string();
        options.push(TopicOption { value, label });
    }
    Ok(options)
}
