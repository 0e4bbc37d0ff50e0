use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use trending_explorer::data::aggregate::ChannelColumn;
use trending_explorer::data::loader::parse_date;
use trending_explorer::data::model::{Column, VideoColumn};
use trending_explorer::export::{pretty, write_table, Exportable};
use trending_explorer::labels::column_options;
use trending_explorer::{
    AggregatePolicy, ChannelCategory, DatasetService, FilterSpec, ServiceConfig, Which,
};

fn parse_range(s: &str) -> std::result::Result<(i64, i64), String> {
    let (lo, hi) = s
        .split_once("..")
        .ok_or_else(|| format!("expected MIN..MAX, got '{s}'"))?;
    let lo = lo.trim().parse::<i64>().map_err(|e| format!("bad minimum '{lo}': {e}"))?;
    let hi = hi.trim().parse::<i64>().map_err(|e| format!("bad maximum '{hi}': {e}"))?;
    Ok((lo, hi))
}

fn parse_day(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("'{s}' is not a date"))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Table,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WhichArg {
    Videos,
    Channels,
    Single,
}

impl From<WhichArg> for Which {
    fn from(w: WhichArg) -> Self {
        match w {
            WhichArg::Videos => Which::Videos,
            WhichArg::Channels => Which::Channels,
            WhichArg::Single => Which::Single,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TableArg {
    Videos,
    Channels,
}

#[derive(Debug, clap::Args)]
struct FilterArgs {
    /// Channel category code (TM, CO, UC, TR, MU, YT, CV); repeatable
    #[arg(long = "channel-category")]
    channel_category: Vec<String>,

    /// Video category name; repeatable
    #[arg(long = "video-category")]
    video_category: Vec<String>,

    /// Subscriber range, MIN..MAX
    #[arg(long, value_parser = parse_range)]
    subscribers: Option<(i64, i64)>,

    /// View count range, MIN..MAX
    #[arg(long, value_parser = parse_range)]
    views: Option<(i64, i64)>,

    #[arg(long, value_parser = parse_day)]
    trending_from: Option<NaiveDate>,

    #[arg(long, value_parser = parse_day)]
    trending_to: Option<NaiveDate>,

    #[arg(long, value_parser = parse_day)]
    published_from: Option<NaiveDate>,

    #[arg(long, value_parser = parse_day)]
    published_to: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Filtered video rows
    Videos,
    /// Per-channel aggregates of the filtered videos
    Channels,
    /// One channel's filtered videos in publishing order
    History { channel: String },
    /// Descriptive statistics
    Summary {
        #[arg(value_enum)]
        which: WhichArg,
        /// Channel to describe with `single`
        #[arg(long)]
        channel: Option<String>,
    },
    /// Categories and bounds available to filters
    Domain,
    /// Numeric columns with their display labels
    Columns {
        #[arg(value_enum)]
        table: TableArg,
    },
}

#[derive(Parser, Debug)]
#[command(version, about = "Filter, aggregate and summarize trending videos")]
struct CliArgs {
    /// Dataset file (.csv, .json or .parquet)
    #[arg(env = "TRENDING_DATA")]
    path: PathBuf,

    #[command(flatten)]
    filters: FilterArgs,

    /// Keep channels whose aggregates are not all defined
    #[arg(long)]
    keep_incomplete: bool,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Write the result to a .json, .csv or .parquet file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Turn a pair of optional date flags into an inclusive range. An open end
/// reaches to the earliest or latest representable date.
fn date_range(
    spec: FilterSpec,
    column: VideoColumn,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> FilterSpec {
    if from.is_none() && to.is_none() {
        return spec;
    }
    let min = from.unwrap_or(NaiveDate::MIN);
    let max = to.unwrap_or(NaiveDate::MAX);
    spec.between(column.name(), min, max)
}

fn build_filter(args: &FilterArgs) -> Result<FilterSpec> {
    let mut codes = Vec::with_capacity(args.channel_category.len());
    for raw in &args.channel_category {
        let category: ChannelCategory = raw.parse().map_err(anyhow::Error::msg)?;
        codes.push(category.code());
    }

    let mut spec = FilterSpec::new()
        .one_of("channel_category", codes)
        .one_of("video_category", args.video_category.iter().map(String::as_str));
    if let Some((lo, hi)) = args.subscribers {
        spec = spec.between("subscribers", lo, hi);
    }
    if let Some((lo, hi)) = args.views {
        spec = spec.between("views", lo, hi);
    }
    spec = date_range(
        spec,
        VideoColumn::LastTrendingDate,
        args.trending_from,
        args.trending_to,
    );
    spec = date_range(
        spec,
        VideoColumn::PublishDate,
        args.published_from,
        args.published_to,
    );
    Ok(spec)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn emit<E: Exportable + Serialize>(table: &E, args: &CliArgs) -> Result<()> {
    if let Some(path) = &args.output {
        return write_table(table, path).with_context(|| format!("writing {}", path.display()));
    }
    match args.format {
        Format::Json => print_json(table),
        Format::Table => {
            println!("{}", pretty(table).context("formatting table")?);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = CliArgs::parse();

    let config = ServiceConfig {
        aggregate: AggregatePolicy {
            drop_incomplete_groups: !args.keep_incomplete,
        },
    };
    let service = DatasetService::load(&args.path, config)
        .with_context(|| format!("loading {}", args.path.display()))?;
    let spec = build_filter(&args.filters)?;

    match &args.command {
        Command::Videos => emit(&service.filter(&spec)?, &args),
        Command::Channels => emit(&service.get_tables(&spec)?.1, &args),
        Command::History { channel } => {
            let history = service.channel_history(channel, &spec)?;
            if history.is_empty() {
                log::warn!("no videos for channel '{channel}'");
            }
            emit(&history, &args)
        }
        Command::Summary { which, channel } => {
            let which = Which::from(*which);
            if which == Which::Single && channel.is_none() {
                bail!("`summary single` needs --channel");
            }
            emit(&service.summarize(which, &spec, channel.as_deref())?, &args)
        }
        Command::Domain => print_json(&service.filter_domain()),
        Command::Columns { table } => {
            let options = match table {
                TableArg::Videos => column_options::<VideoColumn>(),
                TableArg::Channels => column_options::<ChannelColumn>(),
            };
            match args.format {
                Format::Json => print_json(&options),
                Format::Table => {
                    for option in options {
                        println!("{:<24} {}", option.value, option.label);
                    }
                    Ok(())
                }
            }
        }
    }
}
