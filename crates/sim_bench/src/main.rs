use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod runner;
mod scenario;
mod summary;

use runner::SeedResult;
use scenario::Scenario;

#[derive(Parser)]
#[command(
    name = "sim_bench",
    about = "Plays many seeded habitat sessions with the autopilot and reports survival odds"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play every seed of a scenario and write results.csv and summary.json.
    Run {
        /// Scenario JSON: seeds, destination, build order, reserve, max_cycles.
        #[arg(long)]
        scenario: String,
        /// Each batch gets a timestamped directory under this one.
        #[arg(long, default_value = "runs")]
        output_dir: String,
    },
}

/// `<output_dir>/<scenario>_<YYYYMMDD_HHMMSS>`, with the scenario file copied in.
fn prepare_batch_dir(output_dir: &str, scenario_path: &str, scenario: &Scenario) -> Result<PathBuf> {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let batch_dir = PathBuf::from(output_dir).join(format!("{}_{timestamp}", scenario.name));
    std::fs::create_dir_all(&batch_dir)
        .with_context(|| format!("creating batch directory: {}", batch_dir.display()))?;
    std::fs::copy(scenario_path, batch_dir.join("scenario.json"))
        .context("copying scenario file")?;
    Ok(batch_dir)
}

/// Plays every seed in parallel. A seed that fails (IO, usually) is reported
/// and left out of the statistics.
fn play_seeds(
    content: &Arc<sim_core::GameContent>,
    scenario: &Scenario,
    seeds: &[u64],
    batch_dir: &Path,
) -> Vec<SeedResult> {
    let outcomes: Vec<(u64, Result<SeedResult>)> = seeds
        .par_iter()
        .map(|&seed| {
            let seed_dir = batch_dir.join(format!("seed_{seed}"));
            (seed, runner::run_seed(content, seed, scenario, &seed_dir))
        })
        .collect();

    outcomes
        .into_iter()
        .filter_map(|(seed, outcome)| match outcome {
            Ok(result) => Some(result),
            Err(err) => {
                eprintln!("seed {seed} failed: {err:#}");
                None
            }
        })
        .collect()
}

fn run(scenario_path: &str, output_dir: &str) -> Result<()> {
    let scenario = scenario::load_scenario(Path::new(scenario_path))?;
    let seeds = scenario.seeds.expand();
    let plan = scenario.plan();
    let build: Vec<&str> = plan.build.iter().map(|id| id.0.as_str()).collect();

    println!(
        "Scenario '{}': {} seeds at {} building [{}] (reserve {:.0})",
        scenario.name,
        seeds.len(),
        plan.destination,
        build.join(", "),
        plan.reserve,
    );

    let content = Arc::new(sim_world::load_content(&scenario.content_dir)?);
    if content.destination(&plan.destination).is_none() {
        bail!("scenario destination {} is not in the catalog", plan.destination);
    }

    let batch_dir = prepare_batch_dir(output_dir, scenario_path, &scenario)?;
    println!("Output: {}", batch_dir.display());

    let results = play_seeds(&content, &scenario, &seeds, &batch_dir);
    if results.is_empty() {
        bail!("no seed produced a result");
    }

    let stats = summary::compute_summary(&scenario.name, &results);
    summary::print_summary(&stats);

    let results_path = batch_dir.join("results.csv");
    summary::write_results_csv(&results_path, &results)?;
    let summary_path = batch_dir.join("summary.json");
    summary::write_summary_json(&summary_path, &stats)?;

    println!("Per-seed results: {}", results_path.display());
    println!("Summary: {}", summary_path.display());
    Ok(())
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Run {
            scenario,
            output_dir,
        } => run(&scenario, &output_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_scenario(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("scenario.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_batch_dir_is_named_after_scenario_and_holds_a_copy() {
        let temp_dir = TempDir::new().unwrap();
        let json = r#"{"name": "leo_default", "seeds": [1, 2]}"#;
        let scenario_path = write_scenario(temp_dir.path(), json);
        let scenario = scenario::load_scenario(&scenario_path).unwrap();
        let output_dir = temp_dir.path().join("runs");

        let batch_dir = prepare_batch_dir(
            output_dir.to_str().unwrap(),
            scenario_path.to_str().unwrap(),
            &scenario,
        )
        .unwrap();

        assert!(batch_dir.starts_with(&output_dir));
        let dir_name = batch_dir.file_name().unwrap().to_string_lossy();
        assert!(dir_name.starts_with("leo_default_"), "got {dir_name}");
        let copied = std::fs::read_to_string(batch_dir.join("scenario.json")).unwrap();
        assert_eq!(copied, json);
    }

    #[test]
    fn test_play_seeds_returns_one_result_per_seed() {
        let content = Arc::new(sim_world::load_content("../../content").unwrap());
        let temp_dir = TempDir::new().unwrap();
        let scenario: Scenario =
            serde_json::from_str(r#"{"name": "pair", "seeds": [7, 8], "max_cycles": 20}"#).unwrap();

        let mut results = play_seeds(&content, &scenario, &[7, 8], temp_dir.path());
        results.sort_by_key(|result| result.seed);

        assert_eq!(results.iter().map(|r| r.seed).collect::<Vec<_>>(), vec![7, 8]);
        assert!(temp_dir.path().join("seed_7").join("run_info.json").exists());
        assert!(temp_dir.path().join("seed_8").join("run_info.json").exists());
    }
}
