use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::data::model::{Column, Table};
use crate::labels::column_label;

/// Which table a summary describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Which {
    Videos,
    Channels,
    /// The videos of a single channel.
    Single,
}

/// Descriptive statistics of one numeric column. Undefined statistics are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRow {
    pub column: &'static str,
    pub label: String,
    /// Number of present (non-missing) values.
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatsTable {
    rows: Vec<StatsRow>,
}

impl StatsTable {
    pub fn rows(&self) -> &[StatsRow] {
        &self.rows
    }

    pub fn get(&self, column: &str) -> Option<&StatsRow> {
        self.rows.iter().find(|r| r.column == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Describe every numeric column of `table`. Missing values are skipped;
/// a table with no rows gives one all-`None` row per column.
pub fn summarize<T: Table>(table: &T) -> StatsTable {
    let rows = <T::Column as Column>::numeric()
        .into_iter()
        .map(|column| {
            let values: Vec<f64> = table
                .column_values(column)
                .iter()
                .filter_map(|v| v.as_f64())
                .collect();
            describe(column.name(), &values)
        })
        .collect();
    StatsTable { rows }
}

fn describe(column: &'static str, values: &[f64]) -> StatsRow {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let count = sorted.len();
    let mean = (count > 0).then(|| sorted.iter().sum::<f64>() / count as f64);
    let std = mean.filter(|_| count > 1).map(|m| {
        let ss: f64 = sorted.iter().map(|v| (v - m).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    StatsRow {
        column,
        label: column_label(column),
        count,
        mean,
        std,
        min: sorted.first().copied(),
        median: quantile(&sorted, 0.5),
        max: sorted.last().copied(),
    }
}

/// Linear interpolation between the order statistics around `q * (n - 1)`.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
