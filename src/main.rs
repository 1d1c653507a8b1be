use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use poptap::config::Config;
use poptap::engine::target::Difficulty;
use poptap::engine::variant::{ALL_GAMES, GameKind, GridSize};
use poptap::host::{AudioSetting, ProgressReporter, SharedAudioSetting};
use poptap::sim::{SimOptions, SimReport, Simulation};
use poptap::store::json_store::ProgressStore;
use poptap::store::schema::{ProgressCounters, SessionRecord};

#[derive(Parser)]
#[command(
    name = "poptap",
    version,
    about = "Headless runner for tap-to-find educational mini-games"
)]
struct Cli {
    #[arg(short, long, help = "Mini-game to play (see --list)")]
    game: Option<String>,

    #[arg(short, long, default_value_t = 5, help = "Stop after this many completed rounds")]
    rounds: u32,

    #[arg(short, long, help = "Seed for a reproducible run")]
    seed: Option<u64>,

    #[arg(short, long, default_value_t = 0.85, help = "Chance the player taps a correct item")]
    accuracy: f64,

    #[arg(long, default_value_t = 1200, help = "Milliseconds between taps")]
    tap_interval_ms: u64,

    #[arg(long, help = "Audio setting (full, noSpeech, noSound, mute)")]
    audio: Option<String>,

    #[arg(short, long, help = "Difficulty (easy, hard)")]
    difficulty: Option<String>,

    #[arg(long, help = "Grid side for the color games (3, 4, 5)")]
    grid: Option<usize>,

    #[arg(long, help = "Do not write learning progress")]
    no_save: bool,

    #[arg(long, help = "List available games and exit")]
    list: bool,

    #[arg(short, long, help = "Debug logging")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.list {
        for game in ALL_GAMES {
            println!("{}", game.as_str());
        }
        return Ok(());
    }

    let mut config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "config unreadable, using defaults");
        Config::default()
    });
    apply_overrides(&mut config, &cli)?;

    let store = if cli.no_save {
        None
    } else {
        let store = ProgressStore::with_base_dir(PathBuf::from(&config.progress_dir))
            .with_context(|| format!("opening progress store in {}", config.progress_dir))?;
        Some(Rc::new(RefCell::new(store)))
    };
    let progress: Box<dyn ProgressReporter> = match &store {
        Some(store) => Box::new(Rc::clone(store)),
        None => Box::new(ProgressCounters::default()),
    };

    let options = SimOptions {
        rounds: cli.rounds,
        seed: cli.seed.unwrap_or_else(rand::random),
        accuracy: cli.accuracy,
        tap_interval_ms: cli.tap_interval_ms,
        echo: true,
        ..SimOptions::default()
    };
    let mut sim = Simulation::new(
        config.variant(),
        config.voice(),
        progress,
        Box::new(SharedAudioSetting::new(config.audio)),
        options,
    );
    let report = sim.run();
    print_summary(&report);

    if let Some(store) = store {
        store.borrow_mut().record_session(SessionRecord {
            game: report.game.as_str().to_string(),
            score: report.score,
            rounds: report.rounds_completed,
            accuracy: report.accuracy,
            best_streak: report.best_streak,
            finished_at: Utc::now(),
        })?;
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(game) = &cli.game {
        if GameKind::from_name(game).is_none() {
            bail!("unknown game '{game}', try --list");
        }
        config.game = game.clone();
    }
    if let Some(audio) = &cli.audio {
        let Some(setting) = AudioSetting::from_name(audio) else {
            bail!("unknown audio setting '{audio}'");
        };
        config.audio = setting;
    }
    if let Some(difficulty) = &cli.difficulty {
        let Some(level) = Difficulty::from_name(difficulty) else {
            bail!("unknown difficulty '{difficulty}'");
        };
        config.difficulty = level;
    }
    if let Some(side) = cli.grid {
        if GridSize::from_side(side).is_none() {
            bail!("grid side must be 3, 4 or 5");
        }
        config.grid_side = side;
    }
    if !(0.0..=1.0).contains(&cli.accuracy) {
        bail!("accuracy must be between 0 and 1");
    }
    Ok(())
}

fn print_summary(report: &SimReport) {
    println!();
    println!("game      {}", report.game.as_str());
    println!("seed      {}", report.seed);
    println!("rounds    {}", report.rounds_completed);
    println!("score     {}", report.score);
    println!(
        "taps      {} ({} hits, {} misses, {:.1}% accuracy)",
        report.taps, report.hits, report.misses, report.accuracy
    );
    println!("streak    {}", report.best_streak);
    println!("time      {:.1}s", report.elapsed_ms as f64 / 1000.0);
    if report.replaced > 0 {
        println!("replaced  {}", report.replaced);
    }
    if let Some(reason) = report.finish {
        println!("ended     {reason:?}");
    }
}
