//! Snapshot metrics computed from `GameState`.
//!
//! A single `compute_metrics(&GameState, &GameContent) -> MetricsSnapshot` function
//! samples the current state for time-series analysis. No state mutation.

use crate::engine::event_chance;
use crate::{GameContent, GameState, MissionStatus, ModuleStatus, Phase};
use serde::Serialize;
use std::io::Write;

/// Current schema version — bump when fields are added/removed/reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub cycle: u64,
    pub metrics_version: u32,
    pub phase: &'static str,

    // Resource pools
    pub energy: f32,
    pub oxygen: f32,
    pub morale: f32,

    // Net per-cycle modifiers from modules and synergies
    pub modifier_energy: f32,
    pub modifier_oxygen: f32,
    pub modifier_morale: f32,

    // Module health
    pub modules_total: u32,
    pub modules_operational: u32,
    pub modules_damaged: u32,
    pub modules_lost: u32,

    // Incidents
    pub incidents_open: u32,
    pub min_incident_countdown: u32,
    pub hazard_pending: bool,

    // Synergies
    pub active_synergies: u32,
    pub decay_multiplier: f32,
    pub event_chance: f32,

    // Missions (run totals)
    pub mission_active: bool,
    pub missions_completed: u32,
    pub missions_failed: u32,
}

pub fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Construction => "construction",
        Phase::Simulation => "simulation",
        Phase::Victory => "victory",
        Phase::GameOver => "game_over",
    }
}

#[allow(clippy::cast_possible_truncation)]
fn count(n: usize) -> u32 {
    n as u32
}

pub fn compute_metrics(state: &GameState, content: &GameContent) -> MetricsSnapshot {
    let status_count = |status: ModuleStatus| {
        count(
            state
                .modules
                .iter()
                .filter(|module| module.status == status)
                .count(),
        )
    };
    let modifiers = &state.derived.resource_modifiers;

    MetricsSnapshot {
        cycle: state.meta.cycle,
        metrics_version: METRICS_VERSION,
        phase: phase_label(state.phase),
        energy: state.resources.energy,
        oxygen: state.resources.oxygen,
        morale: state.resources.morale,
        modifier_energy: modifiers.energy,
        modifier_oxygen: modifiers.oxygen,
        modifier_morale: modifiers.morale,
        modules_total: count(state.modules.len()),
        modules_operational: status_count(ModuleStatus::Operational),
        modules_damaged: status_count(ModuleStatus::Damaged),
        modules_lost: status_count(ModuleStatus::Lost),
        incidents_open: count(state.incidents.len()),
        min_incident_countdown: state
            .incidents
            .iter()
            .map(|incident| incident.cycles_remaining)
            .min()
            .unwrap_or(0),
        hazard_pending: state.pending_hazard.is_some(),
        active_synergies: count(state.derived.synergy.active.len()),
        decay_multiplier: state.derived.synergy.decay_multiplier,
        event_chance: event_chance(state, content, &state.derived.synergy),
        mission_active: state
            .mission
            .as_ref()
            .is_some_and(|mission| mission.status == MissionStatus::Active),
        missions_completed: state.counters.missions_completed,
        missions_failed: state.counters.missions_failed,
    }
}

/// Write the CSV header row for metrics.
pub fn write_metrics_header(writer: &mut impl std::io::Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "cycle,metrics_version,phase,\
         energy,oxygen,morale,\
         modifier_energy,modifier_oxygen,modifier_morale,\
         modules_total,modules_operational,modules_damaged,modules_lost,\
         incidents_open,min_incident_countdown,hazard_pending,\
         active_synergies,decay_multiplier,event_chance,\
         mission_active,missions_completed,missions_failed"
    )
}

/// Append a single metrics snapshot as a CSV row.
pub fn append_metrics_row(
    writer: &mut impl std::io::Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{},{},{},{},{},{},{},{},{:.4},{:.4},{},{},{}",
        snapshot.cycle,
        snapshot.metrics_version,
        snapshot.phase,
        snapshot.energy,
        snapshot.oxygen,
        snapshot.morale,
        snapshot.modifier_energy,
        snapshot.modifier_oxygen,
        snapshot.modifier_morale,
        snapshot.modules_total,
        snapshot.modules_operational,
        snapshot.modules_damaged,
        snapshot.modules_lost,
        snapshot.incidents_open,
        snapshot.min_incident_countdown,
        snapshot.hazard_pending,
        snapshot.active_synergies,
        snapshot.decay_multiplier,
        snapshot.event_chance,
        snapshot.mission_active,
        snapshot.missions_completed,
        snapshot.missions_failed,
    )
}

/// Maximum data rows per CSV file before rotating to a new file.
const MAX_ROWS_PER_FILE: usize = 50_000;

/// Rotating metrics CSV writer. Splits into numbered files
/// (`metrics_000.csv`, `metrics_001.csv`, ...) after [`MAX_ROWS_PER_FILE`] rows each.
pub struct MetricsFileWriter {
    run_dir: std::path::PathBuf,
    file_index: u32,
    rows_in_current_file: usize,
    writer: std::io::BufWriter<std::fs::File>,
}

impl MetricsFileWriter {
    pub fn new(run_dir: std::path::PathBuf) -> std::io::Result<Self> {
        let writer = open_csv_file(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            file_index: 0,
            rows_in_current_file: 0,
            writer,
        })
    }

    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows_in_current_file >= MAX_ROWS_PER_FILE {
            self.writer.flush()?;
            self.file_index += 1;
            self.writer = open_csv_file(&self.run_dir, self.file_index)?;
            self.rows_in_current_file = 0;
        }
        append_metrics_row(&mut self.writer, snapshot)?;
        self.rows_in_current_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn open_csv_file(
    run_dir: &std::path::Path,
    index: u32,
) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    let path = run_dir.join(format!("metrics_{index:03}.csv"));
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_metrics_header(&mut writer)?;
    Ok(writer)
}
