use std::cell::RefCell;
use std::rc::Rc;

use poptap::engine::narration::VoiceOptions;
use poptap::engine::target::Difficulty;
use poptap::engine::variant::{GameKind, GridSize, Variant};
use poptap::host::AudioSetting;
use poptap::sim::{SimOptions, SimReport, Simulation};
use poptap::store::json_store::ProgressStore;
use poptap::store::schema::ProgressCounters;
use tempfile::TempDir;

fn run(game: GameKind, options: SimOptions) -> SimReport {
    let mut sim = Simulation::new(
        Variant::preset(game, Difficulty::Easy, GridSize::Four),
        VoiceOptions::default(),
        Box::new(ProgressCounters::default()),
        Box::new(AudioSetting::Full),
        options,
    );
    sim.run()
}

fn options(seed: u64, rounds: u32) -> SimOptions {
    SimOptions {
        seed,
        rounds,
        ..SimOptions::default()
    }
}

#[test]
fn test_same_seed_same_run() {
    for game in [GameKind::Colors, GameKind::Math, GameKind::FallingShapes] {
        let a = serde_json::to_string(&run(game, options(11, 4))).unwrap();
        let b = serde_json::to_string(&run(game, options(11, 4))).unwrap();
        assert_eq!(a, b, "{} diverged", game.as_str());
    }
}

#[test]
fn test_completes_requested_rounds() {
    for game in [
        GameKind::FreeTap,
        GameKind::Colors,
        GameKind::Letters,
        GameKind::Numbers,
        GameKind::Math,
        GameKind::FallingShapes,
    ] {
        let report = run(game, options(3, 4));
        assert_eq!(report.rounds_completed, 4, "{}", game.as_str());
        assert_eq!(report.finish, None);
    }
}

#[test]
fn test_progress_written_once_per_round() {
    for game in [GameKind::Letters, GameKind::Numbers] {
        let dir = TempDir::new().unwrap();
        let store = Rc::new(RefCell::new(
            ProgressStore::with_base_dir(dir.path().to_path_buf()).unwrap(),
        ));
        let mut sim = Simulation::new(
            Variant::preset(game, Difficulty::Easy, GridSize::Four),
            VoiceOptions::default(),
            Box::new(Rc::clone(&store)),
            Box::new(AudioSetting::Mute),
            options(5, 3),
        );
        let report = sim.run();
        assert_eq!(report.rounds_completed, 3, "{}", game.as_str());
        assert_eq!(report.utterances, 0);

        let reopened = ProgressStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.data().counters.letter, 3, "{}", game.as_str());
        assert_eq!(store.borrow().data().counters.total(), 3);
    }
}
