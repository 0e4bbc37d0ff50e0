use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::TempDir;

use trending_explorer::data::loader::load_file;
use trending_explorer::export::write_table;
use trending_explorer::summary::summarize;
use trending_explorer::{
    AggregatePolicy, ChannelCategory, DatasetService, FilterError, FilterSpec, LoadError,
    ServiceConfig, Which,
};

const HEADER: &str = "video_id,channel,channel_category,video_category,subscribers,views,likes,dislikes,comment_count,tags_in_title,tags_count,days_in_trending,days_to_trending,publish_date,last_trending_date,title";

const ROWS: &[&str] = &[
    "v1,A,YT,Comedy,1000,10,1,0,2,1,5,3,1,2017-11-13,2017-11-17,first",
    "v2,A,YT,Comedy,1200,20,2,0,2,1,5,3,1,2017-12-01,2017-12-05,second",
    "v3,B,MU,Music,50000,100,9,1,7,0,12,6,2,2018-01-10,2018-01-18,third",
    "v4,A,YT,Gaming,1100,30,3,1,4,2,8,2,0,2018-02-02,2018-02-04,fourth",
    "v5,C,TM,News & Politics,,55,4,2,9,0,3,1,1,2018-03-01,2018-03-03,fifth",
];

fn write_csv(dir: &TempDir, rows: &[&str]) -> PathBuf {
    let path = dir.path().join("videos.csv");
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    fs::write(&path, text).unwrap();
    path
}

fn service(path: &Path) -> DatasetService {
    DatasetService::load(path, ServiceConfig::default()).unwrap()
}

#[test]
fn loads_csv_and_builds_tables() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&write_csv(&dir, ROWS));
    assert_eq!(svc.videos().len(), 5);

    let (videos, channels) = svc.get_tables(&FilterSpec::new()).unwrap();
    assert_eq!(videos, *svc.videos());
    // C has no subscriber count, so its group is incomplete.
    assert_eq!(channels.len(), 2);

    let a = channels.get("A").unwrap();
    assert_eq!(a.times_in_trending, 3);
    assert_eq!(a.avg_views, Some(20.0));
    assert_eq!(a.subscribers, Some(1200));
    assert_eq!(a.channel_category, ChannelCategory::Youtuber);

    let b = channels.get("B").unwrap();
    assert_eq!(b.times_in_trending, 1);
    assert_eq!(b.avg_views, Some(100.0));
}

#[test]
fn keep_incomplete_policy_retains_channels() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, ROWS);
    let svc = DatasetService::load(
        &path,
        ServiceConfig {
            aggregate: AggregatePolicy {
                drop_incomplete_groups: false,
            },
        },
    )
    .unwrap();
    let (_, channels) = svc.get_tables(&FilterSpec::new()).unwrap();
    assert_eq!(channels.len(), 3);
    assert_eq!(channels.get("C").unwrap().subscribers, None);
}

#[test]
fn dashboard_filters() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&write_csv(&dir, ROWS));
    let start = NaiveDate::from_ymd_opt(2017, 12, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2018, 2, 28).unwrap();

    let spec = FilterSpec::new()
        .one_of("channel_category", ["YT", "MU"])
        .one_of("video_category", Vec::<&str>::new())
        .between("subscribers", 0_i64, 10_000_i64)
        .between("last_trending_date", start, end);
    let (videos, channels) = svc.get_tables(&spec).unwrap();

    let ids: Vec<_> = videos.iter().map(|r| r.video_id.as_str()).collect();
    assert_eq!(ids, vec!["v2", "v4"]);
    assert_eq!(channels.len(), 1);
    assert_eq!(channels.rows()[0].avg_views, Some(25.0));

    assert_eq!(svc.filter(&spec).unwrap(), videos);
    assert_eq!(
        trending_explorer::data::filter::filter(&videos, &spec).unwrap(),
        videos
    );
}

#[test]
fn malformed_filters_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&write_csv(&dir, ROWS));

    let inverted = FilterSpec::new().between("subscribers", 100_i64, 1_i64);
    assert!(matches!(
        svc.get_tables(&inverted),
        Err(FilterError::InvertedRange { .. })
    ));

    let unknown = FilterSpec::new().one_of("title", ["first"]);
    assert_eq!(
        svc.filter(&unknown),
        Err(FilterError::UnknownColumn("title".into()))
    );
}

#[test]
fn default_filter_from_domain() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&write_csv(&dir, ROWS));
    let domain = svc.filter_domain();
    assert_eq!(domain.categories["channel_category"].len(), 3);

    let (videos, _) = svc.get_tables(&domain.default_filter()).unwrap();
    // Only the row without a subscriber count falls outside [0, max].
    assert_eq!(videos.len(), 4);
}

#[test]
fn summaries_over_filtered_tables() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&write_csv(&dir, ROWS));

    let videos = svc
        .summarize(Which::Videos, &FilterSpec::new(), None)
        .unwrap();
    let views = videos.get("views").unwrap();
    assert_eq!(views.label, "Views");
    assert_eq!(views.count, 5);
    assert_eq!(views.median, Some(30.0));
    assert_eq!(videos.get("subscribers").unwrap().count, 4);

    let single = svc
        .summarize(Which::Single, &FilterSpec::new(), Some("A"))
        .unwrap();
    assert_eq!(single.get("views").unwrap().mean, Some(20.0));

    let nothing = FilterSpec::new().one_of("channel", ["Nobody"]);
    let empty = svc.summarize(Which::Channels, &nothing, None).unwrap();
    assert_eq!(empty.len(), 10);
    assert!(empty.rows().iter().all(|r| r.mean.is_none() && r.max.is_none()));
}

#[test]
fn exports_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&write_csv(&dir, ROWS));

    for name in ["copy.csv", "copy.json", "copy.parquet"] {
        let path = dir.path().join(name);
        write_table(svc.videos(), &path).unwrap();
        let reloaded = load_file(&path).unwrap();
        assert_eq!(&reloaded, svc.videos(), "{name}");
    }

    let channels = svc.get_tables(&FilterSpec::new()).unwrap().1;
    let stats_path = dir.path().join("channels.parquet");
    write_table(&summarize(&channels), &stats_path).unwrap();
    assert!(stats_path.exists());
}

#[test]
fn load_failures() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("absent.csv");
    assert!(matches!(
        load_file(&missing),
        Err(LoadError::Io { .. })
    ));

    let unsupported = dir.path().join("videos.xlsx");
    fs::write(&unsupported, "").unwrap();
    assert!(matches!(
        load_file(&unsupported),
        Err(LoadError::UnsupportedFormat(_))
    ));

    let no_dates = dir.path().join("short.csv");
    fs::write(&no_dates, "video_id,channel,channel_category\nv1,A,YT\n").unwrap();
    assert!(matches!(
        load_file(&no_dates),
        Err(LoadError::MissingColumn(_))
    ));
}
