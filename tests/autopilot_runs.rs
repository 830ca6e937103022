//! Every built-in level must be playable start to finish by the headless runner

use query_quest::autopilot::{DEFAULT_SEED, run_level};
use query_quest::levels::LEVEL_IDS;

#[test]
fn test_every_builtin_level_completes_headless() {
    for id in LEVEL_IDS {
        let report = run_level(id, DEFAULT_SEED).unwrap();
        assert!(report.completed, "{id} did not complete: {report:?}");
    }
}

#[test]
fn test_unknown_level_is_reported() {
    assert!(run_level("no-such-level", DEFAULT_SEED).is_err());
}
