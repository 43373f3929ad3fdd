use crate::scenario::Scenario;
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sim_control::{AutopilotController, CommandSource, Session};
use sim_core::{GameContent, Phase};
use sim_world::RunInfo;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Construction turns are bounded so a plan the catalog cannot satisfy ends
/// the seed instead of spinning.
const MAX_CONSTRUCTION_TURNS: usize = 64;

/// One row of `results.csv`.
#[derive(Debug, Clone, Serialize)]
pub struct SeedResult {
    pub seed: u64,
    pub launched: bool,
    pub victory: bool,
    pub game_over: bool,
    pub cycles: u64,
    pub energy: f32,
    pub oxygen: f32,
    pub morale: f32,
    pub modules_lost: u32,
    pub missions_completed: u32,
    pub missions_failed: u32,
    pub wall_time_ms: u64,
}

pub fn run_seed(
    content: &Arc<GameContent>,
    seed: u64,
    scenario: &Scenario,
    seed_dir: &Path,
) -> Result<SeedResult> {
    let start = Instant::now();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let state = sim_world::build_initial_state(content, seed, &mut rng);
    let mut session = Session::manual(state, Arc::clone(content), rng);
    let mut autopilot = AutopilotController::new(scenario.plan());

    std::fs::create_dir_all(seed_dir)
        .with_context(|| format!("creating seed directory: {}", seed_dir.display()))?;
    sim_world::write_run_info(
        seed_dir,
        &RunInfo {
            run_id: format!("{}_seed{seed}", scenario.name),
            seed,
            start_time: chrono::Utc::now().to_rfc3339(),
            content_version: content.content_version.clone(),
            destination: Some(scenario.destination.0.clone()),
            runner: "sim_bench".to_string(),
            metrics_every: 1,
        },
    )?;
    let mut metrics_writer = sim_core::MetricsFileWriter::new(seed_dir.to_path_buf())
        .with_context(|| format!("opening metrics CSV in {}", seed_dir.display()))?;

    for _ in 0..MAX_CONSTRUCTION_TURNS {
        if session.state().phase != Phase::Construction {
            break;
        }
        for command in autopilot.generate_commands(session.state(), session.content()) {
            session.execute(&command);
        }
    }
    let launched = session.state().phase != Phase::Construction;

    while session.is_ticking() {
        if scenario
            .max_cycles
            .is_some_and(|max| session.state().meta.cycle >= max)
        {
            break;
        }
        session.step();
        for command in autopilot.generate_commands(session.state(), session.content()) {
            session.execute(&command);
        }
        let snapshot = sim_core::compute_metrics(session.state(), content);
        metrics_writer
            .write_row(&snapshot)
            .context("writing metrics row")?;
    }
    metrics_writer.flush().context("flushing metrics")?;

    let state = session.state();
    let final_snapshot = sim_core::compute_metrics(state, content);

    #[allow(clippy::cast_possible_truncation)]
    let wall_time_ms = start.elapsed().as_millis() as u64;

    Ok(SeedResult {
        seed,
        launched,
        victory: state.victory,
        game_over: state.game_over,
        cycles: state.meta.cycle,
        energy: final_snapshot.energy,
        oxygen: final_snapshot.oxygen,
        morale: final_snapshot.morale,
        modules_lost: final_snapshot.modules_lost,
        missions_completed: final_snapshot.missions_completed,
        missions_failed: final_snapshot.missions_failed,
        wall_time_ms,
    })
}
