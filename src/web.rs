//! Browser bindings: the `AmbientEngine` class driven from an AudioWorklet
//! or the page, persisting to `localStorage`.

use std::fmt::Display;

use wasm_bindgen::prelude::*;

use crate::catalog::Catalog;
use crate::config::MixerConfig;
use crate::dsp::engine::MixerState;
use crate::dsp::renderer::render_mix_wav;
use crate::dsp::source::StereoBuffer;
use crate::error::{MixerError, StorageError};
use crate::session::Session;
use crate::session::storage::KeyValueStore;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = localStorage, js_name = getItem, catch)]
    fn local_storage_get(key: &str) -> Result<Option<String>, JsValue>;

    #[wasm_bindgen(js_namespace = localStorage, js_name = setItem, catch)]
    fn local_storage_set(key: &str, value: &str) -> Result<(), JsValue>;
}

/// `window.localStorage`. Exceptions (private mode, quota) become
/// [`StorageError::Unavailable`].
#[derive(Debug, Default)]
pub struct LocalStorage;

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        local_storage_get(key).map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        local_storage_set(key, value).map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }
}

impl KeyValueStore for Box<dyn KeyValueStore> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

fn to_js(e: impl Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

#[wasm_bindgen]
pub struct AmbientEngine {
    session: Session<Box<dyn KeyValueStore>>,
}

#[wasm_bindgen]
impl AmbientEngine {
    /// Create an engine rendering at the AudioContext's `sampleRate`.
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f32) -> Result<AmbientEngine, JsValue> {
        let catalog = Catalog::builtin().map_err(to_js)?;
        Ok(Self::with_store(catalog, f64::from(sample_rate), Box::new(LocalStorage)))
    }

    pub fn start(&mut self, sound_id: &str, volume: f64) -> Result<(), JsValue> {
        self.session.start(sound_id, volume).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&mut self, sound_id: &str, volume: f64) {
        self.session.set_volume(sound_id, volume);
    }

    /// Slider input: 0 stops the sound, anything else starts or retargets it.
    #[wasm_bindgen(js_name = setLevel)]
    pub fn set_level(&mut self, sound_id: &str, volume: f64) -> Result<(), JsValue> {
        self.session.set_level(sound_id, volume).map_err(to_js)
    }

    pub fn stop(&mut self, sound_id: &str) {
        self.session.stop(sound_id);
    }

    #[wasm_bindgen(js_name = stopAll)]
    pub fn stop_all(&mut self) {
        self.session.stop_all();
    }

    #[wasm_bindgen(js_name = setMasterVolume)]
    pub fn set_master_volume(&mut self, level: f64) {
        self.session.set_master_volume(level);
    }

    #[wasm_bindgen(js_name = masterVolume)]
    pub fn master_volume(&self) -> f64 {
        self.session.mixer().master_volume()
    }

    #[wasm_bindgen(js_name = applyPreset)]
    pub fn apply_preset(&mut self, name: &str) -> Result<(), JsValue> {
        self.session.apply_preset(name).map_err(to_js)
    }

    #[wasm_bindgen(js_name = togglePlay)]
    pub fn toggle_play(&mut self) -> Result<bool, JsValue> {
        self.session.toggle_play().map_err(to_js)
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.session.mixer().is_playing()
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self, sound_id: &str) -> bool {
        self.session.mixer().is_active(sound_id)
    }

    /// The page was hidden or the worklet paused.
    pub fn suspend(&mut self) {
        self.session.mixer_mut().suspend();
    }

    #[wasm_bindgen(js_name = setTimer)]
    pub fn set_timer(&mut self, minutes: u32) {
        self.session.set_timer(minutes);
    }

    /// Advance the sleep timer; true when it just stopped playback.
    pub fn tick(&mut self, seconds: f64) -> bool {
        self.session.tick(seconds)
    }

    #[wasm_bindgen(js_name = timerDisplay)]
    pub fn timer_display(&self) -> String {
        self.session.timer_display()
    }

    #[wasm_bindgen(js_name = tickMinute)]
    pub fn tick_minute(&mut self) {
        self.session.tick_minute();
    }

    /// Fill one render quantum.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.session.process(left, right);
    }

    /// Use a decoded loop for `soundId` instead of synthesizing it.
    #[wasm_bindgen(js_name = registerStream)]
    pub fn register_stream(&mut self, sound_id: &str, left: Vec<f32>, right: Vec<f32>) {
        self.session
            .mixer_mut()
            .register_stream(sound_id, StereoBuffer::new(left, right));
    }

    #[wasm_bindgen(js_name = soundIds)]
    pub fn sound_ids(&self) -> Result<JsValue, JsValue> {
        let ids: Vec<&str> = self.session.mixer().catalog().sound_ids().collect();
        serde_wasm_bindgen::to_value(&ids).map_err(to_js)
    }

    #[wasm_bindgen(js_name = presetNames)]
    pub fn preset_names(&self) -> Result<JsValue, JsValue> {
        let names: Vec<&str> = self.session.mixer().catalog().preset_names().collect();
        serde_wasm_bindgen::to_value(&names).map_err(to_js)
    }

    #[wasm_bindgen(js_name = usageStats)]
    pub fn usage_stats(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.session.usage()).map_err(to_js)
    }

    /// Render a preset offline to WAV bytes (for download).
    #[wasm_bindgen(js_name = renderPresetWav)]
    pub fn render_preset_wav(
        &self,
        name: &str,
        seconds: f64,
        sample_rate: u32,
    ) -> Result<Vec<u8>, JsValue> {
        self.preset_wav(name, seconds, sample_rate, rand::random())
            .map_err(to_js)
    }
}

impl AmbientEngine {
    pub(crate) fn with_store(
        catalog: Catalog,
        sample_rate: f64,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        let config = MixerConfig {
            sample_rate,
            ..Default::default()
        };
        AmbientEngine {
            session: Session::new(MixerState::new(catalog, config), store),
        }
    }

    fn preset_wav(
        &self,
        name: &str,
        seconds: f64,
        sample_rate: u32,
        seed: u64,
    ) -> Result<Vec<u8>, MixerError> {
        let catalog = self.session.mixer().catalog();
        let mix = catalog
            .preset_mix(name)
            .ok_or_else(|| MixerError::UnknownPreset(name.to_string()))?;
        render_mix_wav(catalog, &mix, seconds, sample_rate, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::{MemoryStore, SETTINGS_KEY};

    fn engine() -> AmbientEngine {
        AmbientEngine::with_store(Catalog::builtin().unwrap(), 8000.0, Box::new(MemoryStore::new()))
    }

    #[test]
    fn toggle_play_produces_audio() {
        let mut e = engine();
        assert!(!e.is_playing());
        assert!(e.toggle_play().is_ok_and(|playing| playing));
        assert!(e.is_active("rain"));

        let mut l = vec![0.0_f32; 128];
        let mut r = vec![0.0_f32; 128];
        e.process(&mut l, &mut r);
        assert!(l.iter().any(|&s| s != 0.0), "Playing engine rendered silence");
    }

    #[test]
    fn boxed_store_persists_settings() {
        let mut e = engine();
        e.set_master_volume(0.25);
        assert_eq!(e.master_volume(), 0.25);
        let saved = e.session.store().get(SETTINGS_KEY).unwrap().unwrap();
        assert!(saved.contains("0.25"));
    }

    #[test]
    fn registered_stream_is_used() {
        let mut e = engine();
        e.register_stream("cafe", vec![0.1; 64], vec![-0.1; 64]);
        assert!(e.set_level("cafe", 0.5).is_ok());
        let kind = e.session.mixer().sound("cafe").map(|s| s.kind());
        assert_eq!(kind, Some(crate::dsp::engine::SoundKind::Streamed));
    }

    #[test]
    fn preset_wav_is_rendered() {
        let e = engine();
        let wav = e.preset_wav("focus", 0.1, 8000, 4).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(wav.len(), 44 + 800 * 4);
        assert!(matches!(
            e.preset_wav("nope", 0.1, 8000, 4),
            Err(MixerError::UnknownPreset(_))
        ));
    }

    #[test]
    fn timer_round_trip() {
        let mut e = engine();
        e.set_timer(45);
        assert_eq!(e.timer_display(), "45:00");
        e.toggle_play().unwrap();
        assert!(!e.tick(60.0));
        assert_eq!(e.timer_display(), "44:00");
        e.stop_all();
        assert!(!e.is_playing());
    }
}
