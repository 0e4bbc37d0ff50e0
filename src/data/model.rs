use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Value – a single dynamically-typed cell
// ---------------------------------------------------------------------------

/// A cell value as seen by filters, summaries and loaders.
/// Used in `BTreeSet`s downstream so `Value` must be `Ord`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Integer(_) | Float(_) => 1,
                Date(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Integer(a), Float(b)) => int_float_cmp(*a, *b),
            (Float(a), Integer(b)) => int_float_cmp(*b, *a).reverse(),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Exact comparison of an integer with a float, without rounding the integer
/// through `f64`. NaN sorts by sign beyond every integer, like `total_cmp`.
fn int_float_cmp(i: i64, f: f64) -> Ordering {
    // 2^63, the first float past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    match i.cmp(&(f.trunc() as i64)) {
        Ordering::Equal if f.fract() > 0.0 => Ordering::Less,
        Ordering::Equal if f.fract() < 0.0 => Ordering::Greater,
        other => other,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Wrap an optional count, saturating values that do not fit an `i64`.
    pub fn from_count(count: Option<u64>) -> Self {
        match count {
            Some(c) => Value::Integer(i64::try_from(c).unwrap_or(i64::MAX)),
            None => Value::Null,
        }
    }

    pub fn from_mean(mean: Option<f64>) -> Self {
        mean.map(Value::Float).unwrap_or(Value::Null)
    }

    /// Interpret the value as an `f64`, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Compare two values of the same family (numeric, date, text).
    /// Returns `None` when either side is null or the families differ.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Float(b)) if !b.is_nan() => Some(int_float_cmp(*a, *b)),
            (Value::Float(a), Value::Integer(b)) if !a.is_nan() => {
                Some(int_float_cmp(*b, *a).reverse())
            }
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

// ---------------------------------------------------------------------------
// Columns and tables
// ---------------------------------------------------------------------------

/// What kind of data a column holds. Decides which filters and statistics apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Identifier,
    Categorical,
    Integer,
    Float,
    Date,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    pub fn describe(self) -> &'static str {
        match self {
            ColumnKind::Identifier | ColumnKind::Categorical => "text",
            ColumnKind::Integer | ColumnKind::Float => "number",
            ColumnKind::Date => "date",
        }
    }

    /// Whether `value` belongs to the same family as this column.
    pub fn accepts(self, value: &Value) -> bool {
        match value {
            Value::Text(_) => matches!(self, ColumnKind::Identifier | ColumnKind::Categorical),
            Value::Integer(_) | Value::Float(_) => self.is_numeric(),
            Value::Date(_) => self == ColumnKind::Date,
            Value::Null => true,
        }
    }
}

/// A statically known column of some table.
pub trait Column: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;
    fn kind(self) -> ColumnKind;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// The form a filter value takes in this column's cells, or `None` when
    /// no cell of the column can hold it.
    fn canonical(self, value: &Value) -> Option<Value> {
        Some(value.clone())
    }

    fn numeric() -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|c| c.kind().is_numeric())
            .collect()
    }
}

/// Read-only, column-addressable view over a table of rows.
pub trait Table {
    type Column: Column;

    fn row_count(&self) -> usize;
    fn cell(&self, row: usize, column: Self::Column) -> Value;

    /// All values of one column, in row order.
    fn column_values(&self, column: Self::Column) -> Vec<Value> {
        (0..self.row_count()).map(|r| self.cell(r, column)).collect()
    }
}

// ---------------------------------------------------------------------------
// ChannelCategory – crowdsourced channel classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelCategory {
    #[serde(rename = "TM")]
    TraditionalMedia,
    #[serde(rename = "CO")]
    Commercial,
    #[serde(rename = "UC")]
    Unknown,
    #[serde(rename = "TR")]
    MovieTrailer,
    #[serde(rename = "MU")]
    Music,
    #[serde(rename = "YT")]
    Youtuber,
    #[serde(rename = "CV")]
    Viral,
}

impl ChannelCategory {
    pub const ALL: [ChannelCategory; 7] = [
        ChannelCategory::TraditionalMedia,
        ChannelCategory::Commercial,
        ChannelCategory::Unknown,
        ChannelCategory::MovieTrailer,
        ChannelCategory::Music,
        ChannelCategory::Youtuber,
        ChannelCategory::Viral,
    ];

    /// The two-letter code used in the dataset.
    pub fn code(self) -> &'static str {
        match self {
            ChannelCategory::TraditionalMedia => "TM",
            ChannelCategory::Commercial => "CO",
            ChannelCategory::Unknown => "UC",
            ChannelCategory::MovieTrailer => "TR",
            ChannelCategory::Music => "MU",
            ChannelCategory::Youtuber => "YT",
            ChannelCategory::Viral => "CV",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ChannelCategory::TraditionalMedia => "Traditional Media",
            ChannelCategory::Commercial => "Commercial",
            ChannelCategory::Unknown => "Unknown",
            ChannelCategory::MovieTrailer => "Movie Trailer",
            ChannelCategory::Music => "Music",
            ChannelCategory::Youtuber => "Youtuber",
            ChannelCategory::Viral => "Viral",
        }
    }
}

impl fmt::Display for ChannelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl ChannelCategory {
    /// Map a code written in any case to the stored code. Non-text values
    /// pass through untouched.
    pub(crate) fn canonical_code(value: &Value) -> Option<Value> {
        match value {
            Value::Text(s) => s
                .parse::<ChannelCategory>()
                .ok()
                .map(|c| Value::Text(c.code().to_string())),
            other => Some(other.clone()),
        }
    }
}

impl FromStr for ChannelCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        ChannelCategory::ALL
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| format!("unknown channel category '{code}'"))
    }
}

// ---------------------------------------------------------------------------
// VideoRecord – one row of the primary table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VideoColumn {
    VideoId,
    Channel,
    ChannelCategory,
    VideoCategory,
    Subscribers,
    Views,
    Likes,
    Dislikes,
    CommentCount,
    TagsInTitle,
    TagsCount,
    DaysInTrending,
    DaysToTrending,
    PublishDate,
    LastTrendingDate,
}

impl Column for VideoColumn {
    const ALL: &'static [VideoColumn] = &[
        VideoColumn::VideoId,
        VideoColumn::Channel,
        VideoColumn::ChannelCategory,
        VideoColumn::VideoCategory,
        VideoColumn::Subscribers,
        VideoColumn::Views,
        VideoColumn::Likes,
        VideoColumn::Dislikes,
        VideoColumn::CommentCount,
        VideoColumn::TagsInTitle,
        VideoColumn::TagsCount,
        VideoColumn::DaysInTrending,
        VideoColumn::DaysToTrending,
        VideoColumn::PublishDate,
        VideoColumn::LastTrendingDate,
    ];

    fn name(self) -> &'static str {
        match self {
            VideoColumn::VideoId => "video_id",
            VideoColumn::Channel => "channel",
            VideoColumn::ChannelCategory => "channel_category",
            VideoColumn::VideoCategory => "video_category",
            VideoColumn::Subscribers => "subscribers",
            VideoColumn::Views => "views",
            VideoColumn::Likes => "likes",
            VideoColumn::Dislikes => "dislikes",
            VideoColumn::CommentCount => "comment_count",
            VideoColumn::TagsInTitle => "tags_in_title",
            VideoColumn::TagsCount => "tags_count",
            VideoColumn::DaysInTrending => "days_in_trending",
            VideoColumn::DaysToTrending => "days_to_trending",
            VideoColumn::PublishDate => "publish_date",
            VideoColumn::LastTrendingDate => "last_trending_date",
        }
    }

    fn kind(self) -> ColumnKind {
        match self {
            VideoColumn::VideoId => ColumnKind::Identifier,
            VideoColumn::Channel | VideoColumn::ChannelCategory | VideoColumn::VideoCategory => {
                ColumnKind::Categorical
            }
            VideoColumn::PublishDate | VideoColumn::LastTrendingDate => ColumnKind::Date,
            _ => ColumnKind::Integer,
        }
    }

    fn canonical(self, value: &Value) -> Option<Value> {
        match self {
            VideoColumn::ChannelCategory => ChannelCategory::canonical_code(value),
            _ => Some(value.clone()),
        }
    }
}

/// A single trending video (one row of the source table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub channel: String,
    pub channel_category: ChannelCategory,
    pub video_category: String,
    pub subscribers: Option<u64>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub dislikes: Option<u64>,
    pub comment_count: Option<u64>,
    pub tags_in_title: Option<u64>,
    pub tags_count: Option<u64>,
    pub days_in_trending: Option<u64>,
    pub days_to_trending: Option<u64>,
    pub publish_date: NaiveDate,
    pub last_trending_date: NaiveDate,
}

impl VideoRecord {
    /// Numeric attribute by column; `None` for non-numeric columns.
    pub fn count(&self, column: VideoColumn) -> Option<u64> {
        match column {
            VideoColumn::Subscribers => self.subscribers,
            VideoColumn::Views => self.views,
            VideoColumn::Likes => self.likes,
            VideoColumn::Dislikes => self.dislikes,
            VideoColumn::CommentCount => self.comment_count,
            VideoColumn::TagsInTitle => self.tags_in_title,
            VideoColumn::TagsCount => self.tags_count,
            VideoColumn::DaysInTrending => self.days_in_trending,
            VideoColumn::DaysToTrending => self.days_to_trending,
            _ => None,
        }
    }

    pub fn value(&self, column: VideoColumn) -> Value {
        match column {
            VideoColumn::VideoId => Value::Text(self.video_id.clone()),
            VideoColumn::Channel => Value::Text(self.channel.clone()),
            VideoColumn::ChannelCategory => Value::Text(self.channel_category.code().to_string()),
            VideoColumn::VideoCategory => Value::Text(self.video_category.clone()),
            VideoColumn::PublishDate => Value::Date(self.publish_date),
            VideoColumn::LastTrendingDate => Value::Date(self.last_trending_date),
            numeric => Value::from_count(self.count(numeric)),
        }
    }
}

// ---------------------------------------------------------------------------
// VideoTable – an ordered collection of videos
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VideoTable {
    rows: Vec<VideoRecord>,
}

impl VideoTable {
    pub fn new(rows: Vec<VideoRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[VideoRecord] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VideoRecord> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct channel names.
    pub fn channels(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.channel.as_str()).collect()
    }

    pub fn into_rows(self) -> Vec<VideoRecord> {
        self.rows
    }
}

impl Table for VideoTable {
    type Column = VideoColumn;

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, column: VideoColumn) -> Value {
        self.rows
            .get(row)
            .map(|r| r.value(column))
            .unwrap_or(Value::Null)
    }
}

impl FromIterator<VideoRecord> for VideoTable {
    fn from_iter<I: IntoIterator<Item = VideoRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
