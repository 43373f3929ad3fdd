use crate::runner::SeedResult;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

type Extractor = (&'static str, fn(&SeedResult) -> f64);

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub scenario_name: String,
    pub batch_id: String,
    pub generated_at: String,
    pub git_sha: String,
    pub git_dirty: bool,
    pub seed_count: usize,
    pub launched_count: usize,
    pub victory_count: usize,
    pub victory_rate: f64,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

impl SummaryStats {
    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.name == name)
    }
}

pub fn git_sha() -> String {
    env!("GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("GIT_DIRTY") == "true"
}

pub fn compute_summary(scenario_name: &str, results: &[SeedResult]) -> SummaryStats {
    let seed_count = results.len();
    let victory_count = results.iter().filter(|r| r.victory).count();

    let extractors: [Extractor; 7] = [
        ("cycles_survived", |r| r.cycles as f64),
        ("final_energy", |r| f64::from(r.energy)),
        ("final_oxygen", |r| f64::from(r.oxygen)),
        ("final_morale", |r| f64::from(r.morale)),
        ("modules_lost", |r| f64::from(r.modules_lost)),
        ("missions_completed", |r| f64::from(r.missions_completed)),
        ("missions_failed", |r| f64::from(r.missions_failed)),
    ];

    let metrics = extractors
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = results.iter().map(extract).collect();
            compute_metric_summary(name, &values)
        })
        .collect();

    SummaryStats {
        scenario_name: scenario_name.to_string(),
        batch_id: uuid::Uuid::new_v4().to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        git_sha: git_sha(),
        git_dirty: git_dirty(),
        seed_count,
        launched_count: results.iter().filter(|r| r.launched).count(),
        victory_count,
        victory_rate: if seed_count == 0 {
            0.0
        } else {
            victory_count as f64 / seed_count as f64
        },
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    if values.is_empty() {
        return MetricSummary {
            name: name.to_string(),
            mean: 0.0,
            min: 0.0,
            max: 0.0,
            stddev: 0.0,
        };
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    MetricSummary {
        name: name.to_string(),
        mean,
        min,
        max,
        stddev: variance.sqrt(),
    }
}

pub fn write_results_csv(path: &Path, results: &[SeedResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for result in results {
        writer
            .serialize(result)
            .with_context(|| format!("writing seed {} to {}", result.seed, path.display()))?;
    }
    writer.flush().context("flushing results.csv")?;
    Ok(())
}

pub fn write_summary_json(path: &Path, stats: &SummaryStats) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("serializing summary")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

pub fn print_summary(stats: &SummaryStats) {
    println!(
        "\n=== {} ({} seeds) ===\n",
        stats.scenario_name, stats.seed_count
    );
    println!(
        "{:<30} {:>8} {:>8} {:>8} {:>8}",
        "Metric", "Mean", "Min", "Max", "StdDev"
    );
    println!("{}", "-".repeat(70));
    for metric in &stats.metrics {
        println!(
            "{:<30} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            metric.name, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
    println!(
        "{:<30} {}/{} ({:.1}%)",
        "victory_rate",
        stats.victory_count,
        stats.seed_count,
        stats.victory_rate * 100.0
    );
    if stats.launched_count < stats.seed_count {
        println!(
            "{:<30} {}/{}",
            "never_launched",
            stats.seed_count - stats.launched_count,
            stats.seed_count
        );
    }
}
