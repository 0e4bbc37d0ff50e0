use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;

use trending_explorer::export::write_table;
use trending_explorer::{ChannelCategory, VideoRecord, VideoTable};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n.max(1)
    }

    /// Log-normal draw, for heavy-tailed counts like views.
    fn log_normal(&mut self, mu: f64, sigma: f64) -> u64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        (mu + sigma * z).exp() as u64
    }
}

#[derive(Parser, Debug)]
#[command(about = "Write a synthetic trending-videos dataset")]
struct Args {
    /// Output file (.csv, .json or .parquet)
    #[arg(default_value = "sample_videos.csv")]
    output: PathBuf,

    /// Number of videos
    #[arg(long, default_value_t = 400)]
    videos: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let channels = [
        ("Good Mythical Morning", ChannelCategory::Youtuber, 14_000_000u64),
        ("CaseyNeistat", ChannelCategory::Youtuber, 9_000_000),
        ("The Tonight Show", ChannelCategory::TraditionalMedia, 13_000_000),
        ("Marvel Entertainment", ChannelCategory::MovieTrailer, 8_000_000),
        ("Vevo Hits", ChannelCategory::Music, 20_000_000),
        ("Apple", ChannelCategory::Commercial, 7_000_000),
        ("Bored Panda Clips", ChannelCategory::Viral, 300_000),
        ("Some Channel", ChannelCategory::Unknown, 20_000),
    ];
    let video_categories = [
        "Entertainment",
        "Comedy",
        "Music",
        "Film & Animation",
        "People & Blogs",
        "Science & Technology",
    ];
    let first_day = NaiveDate::from_ymd_opt(2017, 11, 14).context("invalid start date")?;

    let rows: Vec<VideoRecord> = (0..args.videos)
        .map(|i| {
            let (channel, category, base_subs) = channels[rng.below(channels.len() as u64) as usize];
            let views = rng.log_normal(13.0, 1.2);
            let publish_date = first_day + Duration::days(rng.below(200) as i64);
            let days_to_trending = rng.below(5);
            let days_in_trending = 1 + rng.below(14);
            VideoRecord {
                video_id: format!("vid{i:05}"),
                channel: channel.to_string(),
                channel_category: category,
                video_category: video_categories[rng.below(video_categories.len() as u64) as usize]
                    .to_string(),
                subscribers: Some(base_subs + rng.below(base_subs / 10 + 1)),
                views: Some(views),
                likes: Some(views / (20 + rng.below(40))),
                dislikes: Some(views / (400 + rng.below(800))),
                comment_count: Some(views / (150 + rng.below(300))),
                tags_in_title: Some(rng.below(4)),
                tags_count: Some(rng.below(30)),
                days_in_trending: Some(days_in_trending),
                days_to_trending: Some(days_to_trending),
                publish_date,
                last_trending_date: publish_date
                    + Duration::days((days_to_trending + days_in_trending) as i64),
            }
        })
        .collect();

    let table = VideoTable::new(rows);
    write_table(&table, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "Wrote {} videos from {} channels to {}",
        table.len(),
        table.channels().len(),
        args.output.display()
    );
    Ok(())
}
