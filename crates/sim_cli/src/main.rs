use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_control::{AutopilotController, AutopilotPlan, CommandSource, Session};
use sim_core::{DestinationId, Event, GameContent, Phase, Snapshot};
use sim_world::{build_initial_state, create_run_dir, generate_run_id, load_content, RunInfo};
use std::path::Path;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "sim_cli", about = "Orbital habitat survival CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one session with the autopilot until victory, game over or --max-cycles.
    Run {
        #[arg(long)]
        seed: Option<u64>,
        /// Defaults to the first unlocked destination in the catalog.
        #[arg(long)]
        destination: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        /// Stop after this many cycles even if the run is still going.
        #[arg(long)]
        max_cycles: Option<u64>,
        #[arg(long, default_value_t = 1)]
        print_every: u64,
        /// Sample metrics every N cycles.
        #[arg(long, default_value_t = 1)]
        metrics_every: u64,
        /// Disable automatic metrics collection to runs/ directory.
        #[arg(long)]
        no_metrics: bool,
    },
    /// List the destinations in the content catalog.
    Destinations {
        #[arg(long, default_value = "./content")]
        content_dir: String,
    },
}

struct RunArgs {
    seed: Option<u64>,
    destination: Option<String>,
    max_cycles: Option<u64>,
    print_every: u64,
    metrics_every: u64,
    no_metrics: bool,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

/// Construction turns are bounded so a plan the catalog cannot satisfy ends
/// the run instead of spinning.
const MAX_CONSTRUCTION_TURNS: usize = 64;

fn open_metrics(
    content: &GameContent,
    seed: u64,
    destination: &DestinationId,
    args: &RunArgs,
) -> Result<Option<sim_core::MetricsFileWriter>> {
    if args.no_metrics {
        return Ok(None);
    }
    let run_id = generate_run_id(seed);
    let run_dir = create_run_dir(Path::new("runs"), &run_id)?;
    sim_world::write_run_info(
        &run_dir,
        &RunInfo {
            run_id: run_id.clone(),
            seed,
            start_time: run_id.split('_').take(2).collect::<Vec<_>>().join("_"),
            content_version: content.content_version.clone(),
            destination: Some(destination.0.clone()),
            runner: "sim_cli".to_string(),
            metrics_every: args.metrics_every,
        },
    )?;
    let writer = sim_core::MetricsFileWriter::new(run_dir.clone())
        .with_context(|| format!("opening metrics CSV in {}", run_dir.display()))?;
    println!("Run directory: {}", run_dir.display());
    Ok(Some(writer))
}

fn run(content_dir: &str, args: &RunArgs) -> Result<()> {
    let content = Arc::new(load_content(content_dir)?);
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let state = build_initial_state(&content, seed, &mut rng);
    let mut session = Session::manual(state, Arc::clone(&content), rng);
    let destination = match (&args.destination, content.default_destination()) {
        (Some(id), _) => DestinationId::from(id.as_str()),
        (None, Some(dest)) => dest.id.clone(),
        (None, None) => bail!("content catalog lists no destinations"),
    };
    let mut autopilot = AutopilotController::new(AutopilotPlan {
        destination: destination.clone(),
        ..AutopilotPlan::default()
    });
    let mut metrics_writer = open_metrics(&content, seed, &destination, args)?;

    println!(
        "Starting session: seed={seed} destination={destination} content_version={}",
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    for _ in 0..MAX_CONSTRUCTION_TURNS {
        if session.state().phase != Phase::Construction {
            break;
        }
        for command in autopilot.generate_commands(session.state(), session.content()) {
            session.execute(&command);
        }
    }
    if !session.is_ticking() {
        println!("Habitat never launched.");
        print_log(&session.snapshot());
        return Ok(());
    }
    print_habitat(&session.snapshot());

    while session.is_ticking() {
        if args.max_cycles.is_some_and(|max| session.state().meta.cycle >= max) {
            break;
        }
        let events = session.step();

        // Print notable events regardless of print_every.
        for event in &events {
            match &event.event {
                Event::ModuleLost { module_id } => {
                    println!("*** MODULE LOST: {module_id} at cycle={:02} ***", event.cycle);
                }
                Event::MissionCompleted { mission_id } => {
                    println!("*** MISSION COMPLETE: {mission_id} ***");
                }
                _ => {}
            }
        }

        for command in autopilot.generate_commands(session.state(), session.content()) {
            session.execute(&command);
        }

        let cycle = session.state().meta.cycle;
        if cycle % args.print_every.max(1) == 0 {
            print_status(&session.snapshot());
        }
        if let Some(ref mut writer) = metrics_writer {
            if cycle % args.metrics_every.max(1) == 0 {
                let snapshot = sim_core::compute_metrics(session.state(), &content);
                writer.write_row(&snapshot).context("writing metrics row")?;
            }
        }
    }

    let snapshot = session.snapshot();
    println!("{}", "-".repeat(80));
    let verdict = match snapshot.phase {
        Phase::Victory => "VICTORY",
        Phase::GameOver => "GAME OVER",
        Phase::Construction | Phase::Simulation => "STOPPED",
    };
    println!("{verdict} at cycle {}:", snapshot.cycle);
    print_status(&snapshot);
    print_log(&snapshot);

    if let Some(ref mut writer) = metrics_writer {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }
    Ok(())
}

fn print_habitat(snapshot: &Snapshot) {
    let names: Vec<&str> = snapshot.modules.iter().map(|m| m.name.as_str()).collect();
    let synergies: Vec<&str> = snapshot
        .synergy
        .active
        .iter()
        .map(|s| s.label.as_str())
        .collect();
    println!(
        "Habitat sealed: {}/{} slots [{}]",
        snapshot.modules.len(),
        snapshot.habitat_slots,
        names.join(", ")
    );
    println!("Synergies: [{}]", synergies.join(", "));
}

fn print_status(snapshot: &Snapshot) {
    let r = &snapshot.resources;
    let damaged = snapshot
        .modules
        .iter()
        .filter(|m| m.status == sim_core::ModuleStatus::Damaged)
        .count();
    let lost = snapshot
        .modules
        .iter()
        .filter(|m| m.status == sim_core::ModuleStatus::Lost)
        .count();
    let mission = snapshot
        .mission
        .as_ref()
        .map_or("-", |m| m.label.as_str());

    println!(
        "[cycle={cycle:02}/{target}]  energy={energy:3}  oxygen={oxygen:3}  morale={morale:3}  \
         damaged={damaged}  lost={lost}  event_chance={chance:.2}  mission={mission}",
        cycle = snapshot.cycle,
        target = snapshot.survival_target,
        energy = r.energy,
        oxygen = r.oxygen,
        morale = r.morale,
        chance = snapshot.event_chance,
    );
}

fn print_log(snapshot: &Snapshot) {
    for entry in snapshot.event_log.iter().rev() {
        println!("  [{:02}] {:?}: {}", entry.cycle, entry.tone, entry.message);
    }
}

fn list_destinations(content_dir: &str) -> Result<()> {
    let content = load_content(content_dir)?;
    let default_id = content.default_destination().map(|dest| dest.id.clone());
    for dest in &content.destinations {
        let slots = dest
            .habitat_slots
            .unwrap_or(content.constants.default_habitat_slots);
        let status = if dest.unlocked { "open" } else { "locked" };
        let marker = if default_id.as_ref() == Some(&dest.id) { "*" } else { " " };
        println!(
            "{marker} {:<14} {:<18} slots={slots:<3} {status:<6} {}",
            dest.id.0, dest.name, dest.summary
        );
        if let (false, Some(message)) = (dest.unlocked, &dest.locked_message) {
            println!("    {message}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            seed,
            destination,
            content_dir,
            max_cycles,
            print_every,
            metrics_every,
            no_metrics,
        } => run(
            &content_dir,
            &RunArgs {
                seed,
                destination,
                max_cycles,
                print_every,
                metrics_every,
                no_metrics,
            },
        )?,
        Commands::Destinations { content_dir } => list_destinations(&content_dir)?,
    }
    Ok(())
}
