//! Explore a table of trending videos: filter it, aggregate it per channel,
//! and describe the numeric columns of either table.
//!
//! ```no_run
//! use std::path::Path;
//! use trending_explorer::{DatasetService, FilterSpec, ServiceConfig};
//!
//! let service = DatasetService::load(Path::new("videos.csv"), ServiceConfig::default())?;
//! let spec = FilterSpec::new()
//!     .one_of("channel_category", ["YT", "MU"])
//!     .between("subscribers", 0_i64, 1_000_000_i64);
//! let (videos, channels) = service.get_tables(&spec)?;
//! println!("{} videos from {} channels", videos.len(), channels.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod data;
pub mod error;
pub mod export;
pub mod labels;
pub mod service;
pub mod summary;

pub use data::aggregate::{AggregatePolicy, ChannelAggregate, ChannelTable};
pub use data::domain::FilterDomain;
pub use data::filter::{Constraint, FilterSpec};
pub use data::model::{ChannelCategory, Value, VideoRecord, VideoTable};
pub use error::{ExportError, FilterError, LoadError};
pub use service::{DatasetService, ServiceConfig};
pub use summary::{StatsTable, Which};
