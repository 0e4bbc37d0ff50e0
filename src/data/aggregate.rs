use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use super::model::{
    ChannelCategory, Column, ColumnKind, Table, Value, VideoColumn, VideoRecord, VideoTable,
};

// ---------------------------------------------------------------------------
// Channel table schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelColumn {
    Channel,
    ChannelCategory,
    Subscribers,
    TimesInTrending,
    AvgViews,
    AvgLikes,
    AvgDislikes,
    AvgCommentCount,
    AvgTagsInTitle,
    AvgDaysTrending,
    AvgDaysToTrending,
    AvgTagsCount,
}

impl Column for ChannelColumn {
    const ALL: &'static [ChannelColumn] = &[
        ChannelColumn::Channel,
        ChannelColumn::ChannelCategory,
        ChannelColumn::Subscribers,
        ChannelColumn::TimesInTrending,
        ChannelColumn::AvgViews,
        ChannelColumn::AvgLikes,
        ChannelColumn::AvgDislikes,
        ChannelColumn::AvgCommentCount,
        ChannelColumn::AvgTagsInTitle,
        ChannelColumn::AvgDaysTrending,
        ChannelColumn::AvgDaysToTrending,
        ChannelColumn::AvgTagsCount,
    ];

    fn name(self) -> &'static str {
        match self {
            ChannelColumn::Channel => "channel",
            ChannelColumn::ChannelCategory => "channel_category",
            ChannelColumn::Subscribers => "subscribers",
            ChannelColumn::TimesInTrending => "times_in_trending",
            ChannelColumn::AvgViews => "avg_views",
            ChannelColumn::AvgLikes => "avg_likes",
            ChannelColumn::AvgDislikes => "avg_dislikes",
            ChannelColumn::AvgCommentCount => "avg_comment_count",
            ChannelColumn::AvgTagsInTitle => "avg_tags_in_title",
            ChannelColumn::AvgDaysTrending => "avg_days_trending",
            ChannelColumn::AvgDaysToTrending => "avg_days_to_trending",
            ChannelColumn::AvgTagsCount => "avg_tags_count",
        }
    }

    fn kind(self) -> ColumnKind {
        match self {
            ChannelColumn::Channel | ChannelColumn::ChannelCategory => ColumnKind::Categorical,
            ChannelColumn::Subscribers | ChannelColumn::TimesInTrending => ColumnKind::Integer,
            _ => ColumnKind::Float,
        }
    }

    fn canonical(self, value: &Value) -> Option<Value> {
        match self {
            ChannelColumn::ChannelCategory => ChannelCategory::canonical_code(value),
            _ => Some(value.clone()),
        }
    }
}

/// Per-channel summary of the videos in a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelAggregate {
    pub channel: String,
    pub channel_category: ChannelCategory,
    /// Largest observed subscriber count.
    pub subscribers: Option<u64>,
    pub times_in_trending: u64,
    pub avg_views: Option<f64>,
    pub avg_likes: Option<f64>,
    pub avg_dislikes: Option<f64>,
    pub avg_comment_count: Option<f64>,
    pub avg_tags_in_title: Option<f64>,
    pub avg_days_trending: Option<f64>,
    pub avg_days_to_trending: Option<f64>,
    pub avg_tags_count: Option<f64>,
}

impl ChannelAggregate {
    fn empty(first: &VideoRecord) -> Self {
        Self {
            channel: first.channel.clone(),
            channel_category: first.channel_category,
            subscribers: None,
            times_in_trending: 0,
            avg_views: None,
            avg_likes: None,
            avg_dislikes: None,
            avg_comment_count: None,
            avg_tags_in_title: None,
            avg_days_trending: None,
            avg_days_to_trending: None,
            avg_tags_count: None,
        }
    }

    fn mean_slot(&mut self, column: ChannelColumn) -> Option<&mut Option<f64>> {
        match column {
            ChannelColumn::AvgViews => Some(&mut self.avg_views),
            ChannelColumn::AvgLikes => Some(&mut self.avg_likes),
            ChannelColumn::AvgDislikes => Some(&mut self.avg_dislikes),
            ChannelColumn::AvgCommentCount => Some(&mut self.avg_comment_count),
            ChannelColumn::AvgTagsInTitle => Some(&mut self.avg_tags_in_title),
            ChannelColumn::AvgDaysTrending => Some(&mut self.avg_days_trending),
            ChannelColumn::AvgDaysToTrending => Some(&mut self.avg_days_to_trending),
            ChannelColumn::AvgTagsCount => Some(&mut self.avg_tags_count),
            _ => None,
        }
    }

    fn assign(&mut self, target: ChannelColumn, value: Value) {
        match target {
            ChannelColumn::ChannelCategory => {
                if let Some(category) = match &value {
                    Value::Text(code) => code.parse::<ChannelCategory>().ok(),
                    _ => None,
                } {
                    self.channel_category = category;
                }
            }
            ChannelColumn::Subscribers => self.subscribers = as_count(&value),
            ChannelColumn::TimesInTrending => {
                self.times_in_trending = as_count(&value).unwrap_or(0);
            }
            mean => {
                if let Some(slot) = self.mean_slot(mean) {
                    *slot = value.as_f64();
                }
            }
        }
    }

    pub fn value(&self, column: ChannelColumn) -> Value {
        match column {
            ChannelColumn::Channel => Value::Text(self.channel.clone()),
            ChannelColumn::ChannelCategory => Value::Text(self.channel_category.code().to_string()),
            ChannelColumn::Subscribers => Value::from_count(self.subscribers),
            ChannelColumn::TimesInTrending => Value::from_count(Some(self.times_in_trending)),
            ChannelColumn::AvgViews => Value::from_mean(self.avg_views),
            ChannelColumn::AvgLikes => Value::from_mean(self.avg_likes),
            ChannelColumn::AvgDislikes => Value::from_mean(self.avg_dislikes),
            ChannelColumn::AvgCommentCount => Value::from_mean(self.avg_comment_count),
            ChannelColumn::AvgTagsInTitle => Value::from_mean(self.avg_tags_in_title),
            ChannelColumn::AvgDaysTrending => Value::from_mean(self.avg_days_trending),
            ChannelColumn::AvgDaysToTrending => Value::from_mean(self.avg_days_to_trending),
            ChannelColumn::AvgTagsCount => Value::from_mean(self.avg_tags_count),
        }
    }

    /// Whether every aggregated column has a defined value.
    pub fn is_complete(&self) -> bool {
        ChannelColumn::ALL
            .iter()
            .all(|&column| !self.value(column).is_null())
    }
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(i) => u64::try_from(*i).ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChannelTable {
    rows: Vec<ChannelAggregate>,
}

impl ChannelTable {
    pub fn new(rows: Vec<ChannelAggregate>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ChannelAggregate] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChannelAggregate> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelAggregate> {
        self.rows.iter().find(|r| r.channel == channel)
    }
}

impl Table for ChannelTable {
    type Column = ChannelColumn;

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, column: ChannelColumn) -> Value {
        self.rows
            .get(row)
            .map(|r| r.value(column))
            .unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Aggregation plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// First non-missing value in row order.
    First,
    /// Largest non-missing value.
    Max,
    /// Number of rows in the group.
    Count,
    /// Arithmetic mean; undefined if any row is missing the value.
    Mean,
}

/// One `(source column, function, target column)` step of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSpec {
    pub source: VideoColumn,
    pub function: Aggregation,
    pub target: ChannelColumn,
}

const fn step(source: VideoColumn, function: Aggregation, target: ChannelColumn) -> AggregateSpec {
    AggregateSpec {
        source,
        function,
        target,
    }
}

pub const CHANNEL_AGGREGATES: [AggregateSpec; 11] = [
    step(VideoColumn::ChannelCategory, Aggregation::First, ChannelColumn::ChannelCategory),
    step(VideoColumn::Subscribers, Aggregation::Max, ChannelColumn::Subscribers),
    step(VideoColumn::VideoId, Aggregation::Count, ChannelColumn::TimesInTrending),
    step(VideoColumn::Views, Aggregation::Mean, ChannelColumn::AvgViews),
    step(VideoColumn::Likes, Aggregation::Mean, ChannelColumn::AvgLikes),
    step(VideoColumn::Dislikes, Aggregation::Mean, ChannelColumn::AvgDislikes),
    step(VideoColumn::CommentCount, Aggregation::Mean, ChannelColumn::AvgCommentCount),
    step(VideoColumn::TagsInTitle, Aggregation::Mean, ChannelColumn::AvgTagsInTitle),
    step(VideoColumn::DaysInTrending, Aggregation::Mean, ChannelColumn::AvgDaysTrending),
    step(VideoColumn::DaysToTrending, Aggregation::Mean, ChannelColumn::AvgDaysToTrending),
    step(VideoColumn::TagsCount, Aggregation::Mean, ChannelColumn::AvgTagsCount),
];

/// What to do with channels whose aggregates are not all defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregatePolicy {
    pub drop_incomplete_groups: bool,
}

impl Default for AggregatePolicy {
    fn default() -> Self {
        Self {
            drop_incomplete_groups: true,
        }
    }
}

#[derive(Debug, Clone)]
enum Accumulator {
    First(Option<Value>),
    Max(Option<Value>),
    Count(u64),
    Mean { sum: f64, n: u64, missing: bool },
}

impl Accumulator {
    fn new(function: Aggregation) -> Self {
        match function {
            Aggregation::First => Accumulator::First(None),
            Aggregation::Max => Accumulator::Max(None),
            Aggregation::Count => Accumulator::Count(0),
            Aggregation::Mean => Accumulator::Mean {
                sum: 0.0,
                n: 0,
                missing: false,
            },
        }
    }

    fn push(&mut self, value: Value) {
        match self {
            Accumulator::First(first) => {
                if first.is_none() && !value.is_null() {
                    *first = Some(value);
                }
            }
            Accumulator::Max(max) => {
                if !value.is_null() && max.as_ref().map_or(true, |m| value > *m) {
                    *max = Some(value);
                }
            }
            Accumulator::Count(n) => *n += 1,
            Accumulator::Mean { sum, n, missing } => match value.as_f64() {
                Some(v) => {
                    *sum += v;
                    *n += 1;
                }
                None => *missing = true,
            },
        }
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::First(v) | Accumulator::Max(v) => v.unwrap_or(Value::Null),
            Accumulator::Count(n) => Value::from_count(Some(n)),
            Accumulator::Mean { sum, n, missing } => {
                if missing || n == 0 {
                    Value::Null
                } else {
                    Value::Float(sum / n as f64)
                }
            }
        }
    }
}

/// Group videos by channel and evaluate [`CHANNEL_AGGREGATES`] on each group.
///
/// Rows come out in first-seen channel order. Under
/// `drop_incomplete_groups`, channels with any undefined aggregate are
/// removed from the result.
pub fn aggregate_channels(table: &VideoTable, policy: AggregatePolicy) -> ChannelTable {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(ChannelAggregate, Vec<Accumulator>)> = Vec::new();

    for row in table.iter() {
        let slot = *index.entry(row.channel.as_str()).or_insert_with(|| {
            let accumulators = CHANNEL_AGGREGATES
                .iter()
                .map(|s| Accumulator::new(s.function))
                .collect();
            groups.push((ChannelAggregate::empty(row), accumulators));
            groups.len() - 1
        });
        let accumulators = &mut groups[slot].1;
        for (spec, acc) in CHANNEL_AGGREGATES.iter().zip(accumulators.iter_mut()) {
            acc.push(row.value(spec.source));
        }
    }

    let total = groups.len();
    let rows: Vec<ChannelAggregate> = groups
        .into_iter()
        .map(|(mut aggregate, accumulators)| {
            for (spec, acc) in CHANNEL_AGGREGATES.iter().zip(accumulators) {
                aggregate.assign(spec.target, acc.finish());
            }
            aggregate
        })
        .filter(|aggregate| !policy.drop_incomplete_groups || aggregate.is_complete())
        .collect();

    if rows.len() < total {
        debug!("dropped {} incomplete channel groups", total - rows.len());
    }
    debug!("aggregated {} videos into {} channels", table.len(), rows.len());
    ChannelTable::new(rows)
}
