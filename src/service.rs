use std::path::Path;

use log::debug;

use crate::data::aggregate::{aggregate_channels, AggregatePolicy, ChannelTable};
use crate::data::domain::FilterDomain;
use crate::data::filter::{filter, FilterSpec};
use crate::data::loader::load_file;
use crate::data::model::VideoTable;
use crate::error::{FilterError, LoadError};
use crate::summary::{summarize, StatsTable, Which};

/// Settings that change how queries are answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub aggregate: AggregatePolicy,
}

/// Owns the immutable base table and answers queries against it.
///
/// Build one at startup and share it by reference; every query is a pure
/// function of the base table and its arguments.
#[derive(Debug, Clone)]
pub struct DatasetService {
    videos: VideoTable,
    config: ServiceConfig,
}

impl DatasetService {
    pub fn new(videos: VideoTable, config: ServiceConfig) -> Self {
        Self { videos, config }
    }

    /// Load the base table from `path`. See [`load_file`] for formats.
    pub fn load(path: &Path, config: ServiceConfig) -> Result<Self, LoadError> {
        Ok(Self::new(load_file(path)?, config))
    }

    pub fn videos(&self) -> &VideoTable {
        &self.videos
    }

    pub fn config(&self) -> ServiceConfig {
        self.config
    }

    pub fn filter(&self, spec: &FilterSpec) -> Result<VideoTable, FilterError> {
        filter(&self.videos, spec)
    }

    pub fn aggregate_channels(&self, videos: &VideoTable) -> ChannelTable {
        aggregate_channels(videos, self.config.aggregate)
    }

    /// Filtered videos and the channel table derived from them.
    pub fn get_tables(&self, spec: &FilterSpec) -> Result<(VideoTable, ChannelTable), FilterError> {
        let videos = self.filter(spec)?;
        let channels = self.aggregate_channels(&videos);
        debug!(
            "tables: {} videos, {} channels",
            videos.len(),
            channels.len()
        );
        Ok((videos, channels))
    }

    /// The filtered videos of one channel in publishing order.
    pub fn channel_history(&self, channel: &str, spec: &FilterSpec) -> Result<VideoTable, FilterError> {
        let mut rows: Vec<_> = self
            .filter(spec)?
            .into_rows()
            .into_iter()
            .filter(|r| r.channel == channel)
            .collect();
        rows.sort_by(|a, b| {
            a.publish_date
                .cmp(&b.publish_date)
                .then(a.last_trending_date.cmp(&b.last_trending_date))
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        Ok(VideoTable::new(rows))
    }

    /// Statistics for the filtered videos, their channels, or one channel's videos.
    ///
    /// `channel` is only read for [`Which::Single`]; without it the summary
    /// covers no rows.
    pub fn summarize(
        &self,
        which: Which,
        spec: &FilterSpec,
        channel: Option<&str>,
    ) -> Result<StatsTable, FilterError> {
        Ok(match which {
            Which::Videos => summarize(&self.filter(spec)?),
            Which::Channels => summarize(&self.get_tables(spec)?.1),
            Which::Single => match channel {
                Some(name) => summarize(&self.channel_history(name, spec)?),
                None => summarize(&VideoTable::default()),
            },
        })
    }

    /// Categories and bounds of the base table.
    pub fn filter_domain(&self) -> FilterDomain {
        FilterDomain::from_table(&self.videos)
    }
}
