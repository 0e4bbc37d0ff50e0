use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::Serialize;

use super::model::{Column, Table, Value, VideoTable};
use crate::error::FilterError;

// ---------------------------------------------------------------------------
// Filter predicate: per-column constraints
// ---------------------------------------------------------------------------

/// A single column constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Keep rows whose value is one of these. Empty means "no filter".
    OneOf(BTreeSet<Value>),
    /// Keep rows whose value lies in `[min, max]`, both ends inclusive.
    Between { min: Value, max: Value },
}

/// Column name → constraint. Entries are combined with AND; columns not
/// named here are unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FilterSpec {
    entries: BTreeMap<String, Constraint>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `column` to a set of values.
    pub fn one_of<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let set = values.into_iter().map(Into::into).collect();
        self.entries.insert(column.to_string(), Constraint::OneOf(set));
        self
    }

    /// Restrict `column` to an inclusive range.
    pub fn between(mut self, column: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.entries.insert(
            column.to_string(),
            Constraint::Between {
                min: min.into(),
                max: max.into(),
            },
        );
        self
    }

    pub fn insert(&mut self, column: &str, constraint: Constraint) {
        self.entries.insert(column.to_string(), constraint);
    }

    pub fn get(&self, column: &str) -> Option<&Constraint> {
        self.entries.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Resolve column names and check every constraint against the column type.
/// Values are brought to the column's canonical form. Empty value-sets are
/// dropped here since they never restrict anything.
fn compile<C: Column>(spec: &FilterSpec) -> Result<Vec<(C, Constraint)>, FilterError> {
    let mut active = Vec::new();
    for (name, constraint) in spec.iter() {
        let column = C::from_name(name).ok_or_else(|| FilterError::UnknownColumn(name.to_string()))?;
        let kind = column.kind();
        let mismatch = |value: &Value| FilterError::TypeMismatch {
            column: name.to_string(),
            value: value.to_string(),
            expected: kind.describe(),
        };
        let canonical = |value: &Value| {
            column.canonical(value).ok_or_else(|| FilterError::TypeMismatch {
                column: name.to_string(),
                value: value.to_string(),
                expected: "a known value",
            })
        };

        let compiled = match constraint {
            Constraint::OneOf(values) => {
                if values.is_empty() {
                    continue;
                }
                if let Some(bad) = values.iter().find(|v| !kind.accepts(v)) {
                    return Err(mismatch(bad));
                }
                Constraint::OneOf(values.iter().map(canonical).collect::<Result<_, _>>()?)
            }
            Constraint::Between { min, max } => {
                for bound in [min, max] {
                    if bound.is_null() || !kind.accepts(bound) {
                        return Err(mismatch(bound));
                    }
                }
                let (min, max) = (canonical(min)?, canonical(max)?);
                match min.compare(&max) {
                    Some(Ordering::Greater) => {
                        return Err(FilterError::InvertedRange {
                            column: name.to_string(),
                            min: min.to_string(),
                            max: max.to_string(),
                        })
                    }
                    Some(_) => {}
                    None => return Err(mismatch(&max)),
                }
                Constraint::Between { min, max }
            }
        };
        active.push((column, compiled));
    }
    Ok(active)
}

fn satisfies(value: &Value, constraint: &Constraint) -> bool {
    match constraint {
        Constraint::OneOf(values) => values.contains(value),
        Constraint::Between { min, max } => {
            matches!(value.compare(min), Some(Ordering::Greater | Ordering::Equal))
                && matches!(value.compare(max), Some(Ordering::Less | Ordering::Equal))
        }
    }
}

/// Return indices of rows that pass all active constraints.
///
/// A row passes a column constraint when:
/// * The column is not present in `spec` → passes (no constraint)
/// * The value set for that column is empty → passes (no constraint)
/// * The row's value is in the set, or within the inclusive range
pub fn filtered_indices<T: Table>(table: &T, spec: &FilterSpec) -> Result<Vec<usize>, FilterError> {
    let active = compile::<T::Column>(spec)?;
    Ok((0..table.row_count())
        .filter(|&row| {
            active
                .iter()
                .all(|(column, constraint)| satisfies(&table.cell(row, *column), constraint))
        })
        .collect())
}

/// Apply `spec` to a video table, returning the matching rows as a new table.
pub fn filter(table: &VideoTable, spec: &FilterSpec) -> Result<VideoTable, FilterError> {
    if spec.is_empty() {
        return Ok(table.clone());
    }
    let indices = filtered_indices(table, spec)?;
    debug!("filter kept {} of {} videos", indices.len(), table.len());
    let rows = table.rows();
    Ok(indices.into_iter().map(|i| rows[i].clone()).collect())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::{ChannelCategory, VideoRecord};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 1, d).unwrap()
    }

    fn video(
        id: &str,
        channel: &str,
        cat: ChannelCategory,
        subs: Option<u64>,
        trending: u32,
    ) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            channel: channel.to_string(),
            channel_category: cat,
            video_category: "Comedy".to_string(),
            subscribers: subs,
            views: Some(100),
            likes: Some(10),
            dislikes: Some(1),
            comment_count: Some(5),
            tags_in_title: Some(1),
            tags_count: Some(4),
            days_in_trending: Some(3),
            days_to_trending: Some(1),
            publish_date: day(1),
            last_trending_date: day(trending),
        }
    }

    fn sample() -> VideoTable {
        VideoTable::new(vec![
            video("a", "Alpha", ChannelCategory::Youtuber, Some(1_000), 2),
            video("b", "Alpha", ChannelCategory::Youtuber, Some(1_500), 5),
            video("c", "Beta", ChannelCategory::Music, Some(90_000), 9),
            video("d", "Gamma", ChannelCategory::Commercial, None, 12),
        ])
    }

    fn ids(table: &VideoTable) -> Vec<&str> {
        table.iter().map(|r| r.video_id.as_str()).collect()
    }

    #[test]
    fn empty_spec_is_identity() {
        let table = sample();
        assert_eq!(filter(&table, &FilterSpec::new()).unwrap(), table);
    }

    #[test]
    fn empty_value_set_does_not_restrict() {
        let table = sample();
        let spec = FilterSpec::new().one_of("channel_category", Vec::<&str>::new());
        assert_eq!(filter(&table, &spec).unwrap(), table);
    }

    #[test]
    fn constraints_combine_with_and() {
        let spec = FilterSpec::new()
            .one_of("channel_category", ["YT", "MU"])
            .between("subscribers", 0_i64, 10_000_i64);
        let out = filter(&sample(), &spec).unwrap();
        assert_eq!(ids(&out), vec!["a", "b"]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let spec = FilterSpec::new().between("last_trending_date", day(5), day(9));
        assert_eq!(ids(&filter(&sample(), &spec).unwrap()), vec!["b", "c"]);
    }

    #[test]
    fn missing_values_fail_ranges() {
        let spec = FilterSpec::new().between("subscribers", 0_i64, i64::MAX);
        assert_eq!(ids(&filter(&sample(), &spec).unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn numeric_set_matches_across_int_and_float() {
        let spec = FilterSpec::new().one_of("subscribers", [1_000.0_f64]);
        assert_eq!(ids(&filter(&sample(), &spec).unwrap()), vec!["a"]);
    }

    #[test]
    fn large_counts_match_exactly_in_mixed_sets() {
        let big = 1_i64 << 53;
        let mut table = sample().into_rows();
        table[0].views = Some(big as u64 + 1);
        table[1].views = Some(big as u64);
        let table = VideoTable::new(table);

        let spec = FilterSpec::new().one_of("views", [Value::Float(big as f64), Value::Integer(big + 1)]);
        assert_eq!(ids(&filter(&table, &spec).unwrap()), vec!["a", "b"]);

        let spec = FilterSpec::new().one_of("views", [Value::Float(big as f64)]);
        assert_eq!(ids(&filter(&table, &spec).unwrap()), vec!["b"]);
    }

    #[test]
    fn channel_category_codes_ignore_case() {
        let spec = FilterSpec::new().one_of("channel_category", ["yt", " mu "]);
        assert_eq!(ids(&filter(&sample(), &spec).unwrap()), vec!["a", "b", "c"]);

        let spec = FilterSpec::new().one_of("channel_category", ["YT", "zz"]);
        assert_eq!(
            filter(&sample(), &spec),
            Err(FilterError::TypeMismatch {
                column: "channel_category".into(),
                value: "zz".into(),
                expected: "a known value",
            })
        );
    }

    #[test]
    fn filtering_is_idempotent() {
        let spec = FilterSpec::new().one_of("channel", ["Alpha", "Gamma"]);
        let once = filter(&sample(), &spec).unwrap();
        let twice = filter(&once, &spec).unwrap();
        assert_eq!(once, twice);
        for row in once.iter() {
            assert!(row.channel == "Alpha" || row.channel == "Gamma");
        }
    }

    #[test]
    fn no_match_is_empty_table() {
        let spec = FilterSpec::new().one_of("video_category", ["Sports"]);
        assert!(filter(&sample(), &spec).unwrap().is_empty());
    }

    #[test]
    fn inverted_range_is_an_error() {
        let spec = FilterSpec::new().between("views", 10_i64, 5_i64);
        assert_eq!(
            filter(&sample(), &spec),
            Err(FilterError::InvertedRange {
                column: "views".into(),
                min: "10".into(),
                max: "5".into(),
            })
        );
    }

    #[test]
    fn unknown_column_is_an_error() {
        let spec = FilterSpec::new().one_of("nope", ["x"]);
        assert_eq!(
            filter(&sample(), &spec),
            Err(FilterError::UnknownColumn("nope".into()))
        );
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let spec = FilterSpec::new().between("publish_date", 1_i64, 2_i64);
        assert!(matches!(
            filter(&sample(), &spec),
            Err(FilterError::TypeMismatch { .. })
        ));
        let spec = FilterSpec::new().one_of("views", ["many"]);
        assert!(matches!(
            filter(&sample(), &spec),
            Err(FilterError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn indices_follow_row_order() {
        let spec = FilterSpec::new().one_of("channel", ["Gamma", "Alpha"]);
        assert_eq!(filtered_indices(&sample(), &spec).unwrap(), vec![0, 1, 3]);
    }
}
