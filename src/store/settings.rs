//! Repository for phase durations and user options.

use std::sync::Arc;

use tokio::sync::watch;

use super::{edit_or_log, keys, read_or_empty, PreferenceStore, Preferences};
use crate::types::{clamp_phase_minutes, Options, PhaseDurations};

/// Typed access to the durations and options keys.
pub struct SettingsRepository {
    store: Arc<dyn PreferenceStore>,
    options_tx: watch::Sender<Options>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        let initial = decode_options(&read_or_empty(store.as_ref()));
        let (options_tx, _) = watch::channel(initial);
        Self { store, options_tx }
    }

    /// Reads the stored durations, clamped into range.
    pub fn durations(&self) -> PhaseDurations {
        let prefs = read_or_empty(self.store.as_ref());
        let defaults = PhaseDurations::default();
        let minutes = |key: &str, default: u32| {
            prefs
                .get_u32(key)
                .map_or(default, |v| clamp_phase_minutes(i64::from(v)))
        };

        PhaseDurations {
            work: minutes(keys::WORK_PHASE_MINUTES, defaults.work),
            short_break: minutes(keys::SHORT_BREAK_PHASE_MINUTES, defaults.short_break),
            long_break: minutes(keys::LONG_BREAK_PHASE_MINUTES, defaults.long_break),
        }
    }

    /// Writes `durations` after clamping and returns what was stored.
    pub fn update_durations(&self, durations: PhaseDurations) -> PhaseDurations {
        let durations = durations.clamped();
        edit_or_log(self.store.as_ref(), |prefs| {
            prefs.set(keys::WORK_PHASE_MINUTES, durations.work);
            prefs.set(keys::SHORT_BREAK_PHASE_MINUTES, durations.short_break);
            prefs.set(keys::LONG_BREAK_PHASE_MINUTES, durations.long_break);
        });
        durations
    }

    /// Reads the stored options.
    pub fn options(&self) -> Options {
        decode_options(&read_or_empty(self.store.as_ref()))
    }

    /// Writes `options` and publishes them.
    pub fn update_options(&self, options: Options) {
        edit_or_log(self.store.as_ref(), |prefs| {
            prefs.set(keys::NOTIFICATION_SOUND, options.notification_sound);
            prefs.set(keys::VIBRATION, options.vibration);
            prefs.set(keys::AUTO_BREAK_START, options.auto_break_start);
            prefs.set(keys::AUTO_POMODORO_START, options.auto_pomodoro_start);
        });
        self.options_tx.send_replace(options);
    }

    /// Subscribes to option changes.
    pub fn subscribe_options(&self) -> watch::Receiver<Options> {
        self.options_tx.subscribe()
    }
}

fn decode_options(prefs: &Preferences) -> Options {
    let defaults = Options::default();
    Options {
        notification_sound: prefs
            .get_bool(keys::NOTIFICATION_SOUND)
            .unwrap_or(defaults.notification_sound),
        vibration: prefs
            .get_bool(keys::VIBRATION)
            .unwrap_or(defaults.vibration),
        auto_break_start: prefs
            .get_bool(keys::AUTO_BREAK_START)
            .unwrap_or(defaults.auto_break_start),
        auto_pomodoro_start: prefs
            .get_bool(keys::AUTO_POMODORO_START)
            .unwrap_or(defaults.auto_pomodoro_start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_defaults_when_empty() {
        let repo = SettingsRepository::new(Arc::new(MemoryStore::new()));
        assert_eq!(repo.durations(), PhaseDurations::default());
        assert_eq!(repo.options(), Options::default());
    }

    #[test]
    fn test_update_durations_clamps() {
        let repo = SettingsRepository::new(Arc::new(MemoryStore::new()));
        let stored = repo.update_durations(PhaseDurations {
            work: 0,
            short_break: 3,
            long_break: 4000,
        });

        assert_eq!(stored.work, 1);
        assert_eq!(stored.short_break, 3);
        assert_eq!(stored.long_break, 999);
        assert_eq!(repo.durations(), stored);
    }

    #[test]
    fn test_stored_out_of_range_minutes_are_clamped() {
        let mut prefs = Preferences::new();
        prefs.set(keys::WORK_PHASE_MINUTES, 0);
        prefs.set(keys::LONG_BREAK_PHASE_MINUTES, "long");
        let repo = SettingsRepository::new(Arc::new(MemoryStore::with_preferences(prefs)));

        let durations = repo.durations();
        assert_eq!(durations.work, 1);
        assert_eq!(durations.long_break, 15);
    }

    #[test]
    fn test_update_options_persists_and_publishes() {
        let store = Arc::new(MemoryStore::new());
        let repo = SettingsRepository::new(store.clone());
        let rx = repo.subscribe_options();

        let options = Options {
            vibration: false,
            auto_break_start: true,
            ..Options::default()
        };
        repo.update_options(options);

        assert_eq!(repo.options(), options);
        assert_eq!(*rx.borrow(), options);
        assert_eq!(store.snapshot().get_bool(keys::VIBRATION), Some(false));
    }
}
