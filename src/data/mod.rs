/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → VideoTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply FilterSpec → VideoTable
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  group by channel → ChannelTable
///   └───────────┘
/// ```
///
/// `domain` scans a table for the values its filters can choose from.
pub mod aggregate;
pub mod domain;
pub mod filter;
pub mod loader;
pub mod model;
