use anyhow::ensure;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use roostcore::config::{DatasetConfig, ScanSource};
use roostcore::prelude::BatchPayload;
use roostcore::records::FieldMap;
use roostcore::source::MemorySource;

pub const SYNTHETIC_DATASET: &str = "synthetic";

/// Configuration for generating a synthetic review batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub station: String,
    pub year: u32,
    pub days: usize,
    pub scans_per_day: usize,
    pub max_tracks_per_day: usize,
    /// Probability that a day carries no detections at all.
    pub quiet_day_ratio: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            station: "KDOX".into(),
            year: 2019,
            days: 5,
            scans_per_day: 12,
            max_tracks_per_day: 3,
            quiet_day_ratio: 0.3,
            seed: 0,
        }
    }
}

impl GeneratorConfig {
    pub fn batch_name(&self) -> String {
        format!("{}{}", self.station, self.year)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.station.len() == 4, "station must have four characters");
        ensure!((1..=28).contains(&self.days), "days must be within 1..=28");
        ensure!(
            (1..=84).contains(&self.scans_per_day),
            "scans_per_day must be within 1..=84"
        );
        ensure!(
            (0.0..=1.0).contains(&self.quiet_day_ratio),
            "quiet_day_ratio must be a probability"
        );
        Ok(())
    }
}

fn fields(pairs: &[(&str, String)]) -> FieldMap {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Generates one batch of scans and detections. Scans are ten minutes apart
/// starting at 10:00 UTC; local time is five hours behind.
pub fn build_batch(config: &GeneratorConfig) -> anyhow::Result<BatchPayload> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut payload = BatchPayload::default();

    for day_index in 0..config.days {
        let date = format!("{}10{:02}", config.year, day_index + 1);
        let frames: Vec<(String, String)> = (0..config.scans_per_day)
            .map(|scan| {
                let minutes = 10 * 60 + scan * 10;
                let utc = format!("{:02}{:02}00", minutes / 60, minutes % 60);
                let local = format!("{:02}{:02}00", minutes / 60 - 5, minutes % 60);
                (
                    format!("{}{}_{}_V06", config.station, date, utc),
                    format!("{}{}", date, local),
                )
            })
            .collect();
        for (filename, local_time) in &frames {
            payload.scan_rows.push(fields(&[
                ("filename", filename.clone()),
                ("local_time", local_time.clone()),
            ]));
        }

        if rng.gen_bool(config.quiet_day_ratio) {
            continue;
        }
        let track_count = rng.gen_range(1..=config.max_tracks_per_day.max(1));
        for track in 0..track_count {
            let start = rng.gen_range(0..frames.len());
            let length = rng.gen_range(1..=4usize).min(frames.len() - start);
            let quality: f64 = rng.gen_range(0.0..1.0);
            let mut x: f64 = rng.gen_range(-150.0..150.0);
            let mut y: f64 = rng.gen_range(-150.0..150.0);
            let mut r: f64 = rng.gen_range(5.0..15.0);
            for (filename, local_time) in &frames[start..start + length] {
                let jitter: f64 = rng.gen_range(-0.1..0.1);
                let score = (quality + jitter).clamp(0.0, 1.0);
                payload.detection_rows.push(fields(&[
                    ("track_id", (track + 1).to_string()),
                    ("filename", filename.clone()),
                    ("local_time", local_time.clone()),
                    ("x", format!("{:.2}", x)),
                    ("y", format!("{:.2}", y)),
                    ("r", format!("{:.2}", r)),
                    ("det_score", format!("{:.3}", score)),
                ]));
                x += rng.gen_range(-3.0..3.0f64);
                y += rng.gen_range(-3.0..3.0f64);
                r += rng.gen_range(0.5..3.0f64);
            }
        }
    }
    Ok(payload)
}

/// In-memory source holding one synthetic dataset with a single batch.
pub fn build_source(config: &GeneratorConfig) -> anyhow::Result<MemorySource> {
    let payload = build_batch(config)?;
    let mut source = MemorySource::new();
    source.insert_dataset(
        SYNTHETIC_DATASET,
        DatasetConfig {
            boxes: "{dataset}/boxes_{batch}.csv".into(),
            scans: ScanSource::Pattern("{dataset}/scans_{batch}.csv".into()),
            urls: vec![
                "img/dz05/{station}/{date}/{filename}.png".into(),
                "img/vr05/{station}/{date}/{filename}.png".into(),
            ],
            ..DatasetConfig::default()
        },
    );
    source.insert_batch(SYNTHETIC_DATASET, &config.batch_name(), payload);
    Ok(source)
}
