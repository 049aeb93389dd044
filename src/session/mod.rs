//! Listening session: presets, play toggle, sleep timer, usage statistics
//! and settings persistence layered over a [`MixerState`].

pub mod storage;
pub mod timer;
pub mod usage;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dsp::engine::MixerState;
use crate::error::MixerError;

use self::storage::{KeyValueStore, SETTINGS_KEY, USAGE_KEY, load_json, save_json};
use self::timer::SleepTimer;
use self::usage::UsageStats;

/// Preset applied when playback is toggled on with nothing selected.
pub const DEFAULT_PRESET: &str = "sleep";

/// User settings persisted between visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_master_volume")]
    pub master_volume: f64,
    #[serde(default)]
    pub timer_minutes: u32,
}

fn default_master_volume() -> f64 {
    0.8
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            master_volume: default_master_volume(),
            timer_minutes: 0,
        }
    }
}

pub struct Session<S: KeyValueStore> {
    mixer: MixerState,
    store: S,
    settings: Settings,
    timer: SleepTimer,
    usage: UsageStats,
    clock: Box<dyn Fn() -> NaiveDate>,
}

impl<S: KeyValueStore> Session<S> {
    /// Restore settings and usage from `store` (defaults on any failure).
    pub fn new(mut mixer: MixerState, store: S) -> Self {
        let settings: Settings = load_json(&store, SETTINGS_KEY);
        let usage: UsageStats = load_json(&store, USAGE_KEY);
        mixer.set_master_volume(settings.master_volume);
        Session {
            timer: SleepTimer::new(settings.timer_minutes),
            mixer,
            store,
            settings,
            usage,
            clock: Box::new(|| chrono::Local::now().date_naive()),
        }
    }

    /// Replace the source of "today" used for streaks.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // ── Mixer operations ────────────────────────────────────

    pub fn start(&mut self, sound_id: &str, volume: f64) -> Result<(), MixerError> {
        let was_playing = self.mixer.is_playing();
        self.mixer.start(sound_id, volume)?;
        if !was_playing {
            self.usage.record_session((self.clock)());
            save_json(&mut self.store, USAGE_KEY, &self.usage);
            log::debug!("Session #{} started", self.usage.total_sessions);
        }
        Ok(())
    }

    pub fn set_volume(&mut self, sound_id: &str, volume: f64) {
        self.mixer.set_volume(sound_id, volume);
    }

    pub fn stop(&mut self, sound_id: &str) {
        self.mixer.stop(sound_id);
    }

    /// Stop everything and pause the sleep timer.
    pub fn stop_all(&mut self) {
        self.mixer.stop_all();
        self.timer.disarm();
    }

    pub fn set_master_volume(&mut self, level: f64) {
        self.mixer.set_master_volume(level);
        self.settings.master_volume = self.mixer.master_volume();
        save_json(&mut self.store, SETTINGS_KEY, &self.settings);
    }

    /// Slider semantics: 0 stops, otherwise start or retarget.
    pub fn set_level(&mut self, sound_id: &str, volume: f64) -> Result<(), MixerError> {
        if !(volume > 0.0) {
            self.mixer.stop(sound_id);
            Ok(())
        } else if self.mixer.is_active(sound_id) {
            self.mixer.set_volume(sound_id, volume);
            Ok(())
        } else {
            self.start(sound_id, volume)
        }
    }

    /// Set every catalog sound to the preset's level.
    pub fn apply_preset(&mut self, name: &str) -> Result<(), MixerError> {
        let mix = self
            .mixer
            .catalog()
            .preset_mix(name)
            .ok_or_else(|| MixerError::UnknownPreset(name.to_string()))?;
        log::debug!("Applying preset '{name}'");
        for (id, volume) in mix {
            self.set_level(&id, volume)?;
        }
        Ok(())
    }

    /// Play/stop button. Returns whether the session is now playing.
    pub fn toggle_play(&mut self) -> Result<bool, MixerError> {
        if self.mixer.is_playing() {
            self.stop_all();
            return Ok(false);
        }
        self.mixer.ensure_context()?;
        self.apply_preset(DEFAULT_PRESET)?;
        self.timer.arm();
        Ok(true)
    }

    // ── Sleep timer ─────────────────────────────────────────

    /// Choose a timer duration in minutes (0 = off). Starts counting at once
    /// if something is playing.
    pub fn set_timer(&mut self, minutes: u32) {
        self.timer.set_minutes(minutes);
        if self.mixer.is_playing() {
            self.timer.arm();
        }
        self.settings.timer_minutes = minutes;
        save_json(&mut self.store, SETTINGS_KEY, &self.settings);
    }

    /// Advance the sleep timer. Returns true when it expired and stopped
    /// playback.
    pub fn tick(&mut self, seconds: f64) -> bool {
        if !self.timer.tick(seconds) {
            return false;
        }
        log::debug!("Sleep timer expired");
        self.mixer.stop_all();
        true
    }

    pub fn timer_display(&self) -> String {
        self.timer.display()
    }

    pub fn timer(&self) -> &SleepTimer {
        &self.timer
    }

    // ── Usage ───────────────────────────────────────────────

    /// Count a minute of listening if anything is playing.
    pub fn tick_minute(&mut self) {
        if self.mixer.is_playing() {
            self.usage.add_minute();
            save_json(&mut self.store, USAGE_KEY, &self.usage);
        }
    }

    pub fn usage(&self) -> &UsageStats {
        &self.usage
    }

    // ── Access ──────────────────────────────────────────────

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.mixer.process(left, right);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mixer(&self) -> &MixerState {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut MixerState {
        &mut self.mixer
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
