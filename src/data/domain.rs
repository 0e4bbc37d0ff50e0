use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::filter::{Constraint, FilterSpec};
use super::model::{Column, ColumnKind, Table, Value, VideoColumn};

/// Smallest and largest present value of a numeric or date column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bounds {
    pub min: Value,
    pub max: Value,
}

/// The values a filter can meaningfully choose from, per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterDomain {
    /// For each categorical column the sorted set of distinct values.
    pub categories: BTreeMap<String, BTreeSet<Value>>,
    /// For each numeric or date column its bounds; absent when no value is present.
    pub bounds: BTreeMap<String, Bounds>,
}

impl FilterDomain {
    /// Scan every column of `table` once.
    pub fn from_table<T: Table>(table: &T) -> Self {
        let mut domain = FilterDomain::default();

        for &column in <T::Column as Column>::ALL {
            let values = table.column_values(column);
            match column.kind() {
                ColumnKind::Categorical => {
                    let distinct = values.into_iter().filter(|v| !v.is_null()).collect();
                    domain.categories.insert(column.name().to_string(), distinct);
                }
                ColumnKind::Integer | ColumnKind::Float | ColumnKind::Date => {
                    let mut present = values.into_iter().filter(|v| !v.is_null());
                    if let Some(first) = present.next() {
                        let (min, max) = present.fold((first.clone(), first), |(lo, hi), v| {
                            let lo = if v < lo { v.clone() } else { lo };
                            let hi = if v > hi { v } else { hi };
                            (lo, hi)
                        });
                        domain
                            .bounds
                            .insert(column.name().to_string(), Bounds { min, max });
                    }
                }
                ColumnKind::Identifier => {}
            }
        }

        domain
    }

    pub fn bounds(&self, column: &str) -> Option<&Bounds> {
        self.bounds.get(column)
    }

    /// The initial filter of the dashboard controls: no category selected,
    /// subscribers from zero to the largest count, and the full span of
    /// last trending dates.
    pub fn default_filter(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        for column in [VideoColumn::ChannelCategory, VideoColumn::VideoCategory] {
            spec.insert(column.name(), Constraint::OneOf(BTreeSet::new()));
        }
        if let Some(b) = self.bounds(VideoColumn::Subscribers.name()) {
            spec.insert(
                VideoColumn::Subscribers.name(),
                Constraint::Between {
                    min: Value::Integer(0),
                    max: b.max.clone(),
                },
            );
        }
        if let Some(b) = self.bounds(VideoColumn::LastTrendingDate.name()) {
            spec.insert(
                VideoColumn::LastTrendingDate.name(),
                Constraint::Between {
                    min: b.min.clone(),
                    max: b.max.clone(),
                },
            );
        }
        spec
    }
}
