//! Repository for the engine snapshot and the rest interval.

use std::sync::Arc;

use tokio::sync::watch;

use super::{edit_or_log, keys, read_or_empty, PreferenceStore, Preferences};
use crate::types::{
    clamp_rest_interval, EngineState, OperatingMode, Phase, PhaseDurations, DEFAULT_REST_INTERVAL,
};

/// Loads and saves [`EngineState`] and publishes every saved snapshot.
///
/// Saves are fire-and-forget: a failed write is logged and the in-memory
/// snapshot is still published to observers.
pub struct PomodoroRepository {
    store: Arc<dyn PreferenceStore>,
    state_tx: watch::Sender<EngineState>,
    rest_interval_tx: watch::Sender<u32>,
}

impl PomodoroRepository {
    /// Creates a repository and seeds the observers with the stored snapshot.
    pub fn new(store: Arc<dyn PreferenceStore>, durations: &PhaseDurations) -> Self {
        let initial = decode_state(&read_or_empty(store.as_ref()), durations);
        let (state_tx, _) = watch::channel(initial);
        let (rest_interval_tx, _) = watch::channel(initial.rest_interval);
        Self {
            store,
            state_tx,
            rest_interval_tx,
        }
    }

    /// Reads the stored snapshot, substituting defaults for bad keys.
    pub fn load(&self, durations: &PhaseDurations) -> EngineState {
        decode_state(&read_or_empty(self.store.as_ref()), durations)
    }

    /// Writes `state` and publishes it.
    pub fn save(&self, state: &EngineState) {
        edit_or_log(self.store.as_ref(), |prefs| encode_state(prefs, state));
        self.state_tx.send_replace(*state);
        self.rest_interval_tx.send_if_modified(|current| {
            let changed = *current != state.rest_interval;
            *current = state.rest_interval;
            changed
        });
    }

    /// Writes a rest interval, clamped to 1-10, and returns the stored value.
    pub fn update_rest_interval(&self, interval: i64) -> u32 {
        let interval = clamp_rest_interval(interval);
        edit_or_log(self.store.as_ref(), |prefs| {
            prefs.set(keys::REST_INTERVAL, interval)
        });
        self.rest_interval_tx.send_replace(interval);
        interval
    }

    /// Subscribes to saved snapshots.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state_tx.subscribe()
    }

    /// Subscribes to rest interval changes.
    pub fn subscribe_rest_interval(&self) -> watch::Receiver<u32> {
        self.rest_interval_tx.subscribe()
    }
}

fn decode_rest_interval(prefs: &Preferences) -> u32 {
    prefs
        .get_u32(keys::REST_INTERVAL)
        .map_or(DEFAULT_REST_INTERVAL, |v| clamp_rest_interval(i64::from(v)))
}

fn decode_state(prefs: &Preferences, durations: &PhaseDurations) -> EngineState {
    let current_phase = match prefs.get_str(keys::CURRENT_PHASE_NAME) {
        Some(s) => Phase::parse_or_default(s),
        None => Phase::default(),
    };
    let chosen_phase = match prefs.get_str(keys::CHOSEN_PHASE_NAME) {
        Some(s) => Phase::parse_or_default(s),
        None => current_phase,
    };
    let operating_mode = prefs
        .get_str(keys::OPERATING_MODE)
        .map_or_else(OperatingMode::default, OperatingMode::parse_or_default);

    EngineState {
        operating_mode,
        chosen_phase,
        current_phase,
        remaining_seconds: prefs
            .get_u32(keys::CURRENT_SECONDS)
            .unwrap_or_else(|| durations.seconds(current_phase)),
        rest_interval: decode_rest_interval(prefs),
    }
    .clamped(durations)
}

fn encode_state(prefs: &mut Preferences, state: &EngineState) {
    prefs.set(keys::CURRENT_SECONDS, state.remaining_seconds);
    prefs.set(keys::CHOSEN_PHASE_NAME, state.chosen_phase.as_str());
    prefs.set(keys::CURRENT_PHASE_NAME, state.current_phase.as_str());
    prefs.set(keys::OPERATING_MODE, state.operating_mode.as_str());
    prefs.set(keys::REST_INTERVAL, state.rest_interval);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn repository_with(prefs: Preferences) -> (Arc<MemoryStore>, PomodoroRepository) {
        let store = Arc::new(MemoryStore::with_preferences(prefs));
        let repo = PomodoroRepository::new(store.clone(), &PhaseDurations::default());
        (store, repo)
    }

    #[test]
    fn test_empty_store_loads_defaults() {
        let (_store, repo) = repository_with(Preferences::new());
        let state = repo.load(&PhaseDurations::default());
        assert_eq!(state, EngineState::default());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let (_store, repo) = repository_with(Preferences::new());
        let durations = PhaseDurations::default();
        let state = EngineState {
            operating_mode: OperatingMode::Paused,
            chosen_phase: Phase::LongBreak,
            current_phase: Phase::LongBreak,
            remaining_seconds: 431,
            rest_interval: 7,
        };

        repo.save(&state);
        assert_eq!(repo.load(&durations), state);
    }

    #[test]
    fn test_bogus_phase_name_loads_as_work() {
        let mut prefs = Preferences::new();
        prefs.set(keys::CURRENT_PHASE_NAME, "BOGUS");
        prefs.set(keys::CHOSEN_PHASE_NAME, "BOGUS");
        prefs.set(keys::OPERATING_MODE, "sprinting");
        let (_store, repo) = repository_with(prefs);

        let state = repo.load(&PhaseDurations::default());
        assert_eq!(state.current_phase, Phase::Work);
        assert_eq!(state.chosen_phase, Phase::Work);
        assert_eq!(state.operating_mode, OperatingMode::Stopped);
    }

    #[test]
    fn test_bogus_current_phase_follows_chosen_when_stopped() {
        let mut prefs = Preferences::new();
        prefs.set(keys::CURRENT_PHASE_NAME, "BOGUS");
        prefs.set(keys::CHOSEN_PHASE_NAME, "long_break");
        prefs.set(keys::OPERATING_MODE, "stopped");
        prefs.set(keys::CURRENT_SECONDS, 120);
        let (_store, repo) = repository_with(prefs);

        let state = repo.load(&PhaseDurations::default());
        assert_eq!(state.current_phase, Phase::LongBreak);
        assert_eq!(state.chosen_phase, Phase::LongBreak);
        assert_eq!(state.remaining_seconds, 15 * 60);
        assert_eq!(state.operating_mode, OperatingMode::Stopped);
    }

    #[test]
    fn test_load_clamps_out_of_range_values() {
        let mut prefs = Preferences::new();
        prefs.set(keys::CURRENT_PHASE_NAME, "short_break");
        prefs.set(keys::CURRENT_SECONDS, 99_999);
        prefs.set(keys::REST_INTERVAL, 0);
        let (_store, repo) = repository_with(prefs);

        let state = repo.load(&PhaseDurations::default());
        assert_eq!(state.remaining_seconds, 5 * 60);
        assert_eq!(state.rest_interval, 1);
    }

    #[test]
    fn test_read_failure_loads_defaults() {
        let (store, repo) = repository_with(Preferences::new());
        repo.save(&EngineState {
            remaining_seconds: 10,
            ..EngineState::default()
        });
        store.set_fail_reads(true);

        assert_eq!(repo.load(&PhaseDurations::default()), EngineState::default());
    }

    #[test]
    fn test_save_publishes_even_when_write_fails() {
        let (store, repo) = repository_with(Preferences::new());
        let rx = repo.subscribe();
        store.set_fail_writes(true);

        let state = EngineState {
            remaining_seconds: 12,
            ..EngineState::default()
        };
        repo.save(&state);

        assert_eq!(*rx.borrow(), state);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_update_rest_interval_clamps_and_publishes() {
        let (_store, repo) = repository_with(Preferences::new());
        let rx = repo.subscribe_rest_interval();
        assert_eq!(*rx.borrow(), DEFAULT_REST_INTERVAL);

        assert_eq!(repo.update_rest_interval(25), 10);
        assert_eq!(repo.load(&PhaseDurations::default()).rest_interval, 10);
        assert_eq!(*rx.borrow(), 10);

        assert_eq!(repo.update_rest_interval(-1), 1);
        assert_eq!(repo.load(&PhaseDurations::default()).rest_interval, 1);
    }

    #[test]
    fn test_saved_keys_use_storage_names() {
        let (store, repo) = repository_with(Preferences::new());
        repo.save(&EngineState {
            chosen_phase: Phase::ShortBreak,
            current_phase: Phase::ShortBreak,
            remaining_seconds: 300,
            ..EngineState::default()
        });

        let prefs = store.snapshot();
        assert_eq!(prefs.get_str(keys::CHOSEN_PHASE_NAME), Some("short_break"));
        assert_eq!(prefs.get_str(keys::OPERATING_MODE), Some("stopped"));
        assert_eq!(prefs.get_u32(keys::CURRENT_SECONDS), Some(300));
    }
}
