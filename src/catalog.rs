//! Declarative sound recipes for every ambient texture.
//!
//! The catalog is a data asset (`assets/catalog.json`) rather than code:
//! adding a texture means adding one entry. The JSON mirrors the recipe
//! tables of the web client (`noise`, `gain`, `filters`, `lfo`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dsp::filter::FilterType;
use crate::dsp::noise::NoiseColor;
use crate::error::CatalogError;

pub const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.json");

// ── Recipe types ────────────────────────────────────────────

/// One filter stage in a layer's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(rename = "type")]
    pub kind: FilterType,
    /// Cutoff or center frequency in Hz.
    #[serde(rename = "freq")]
    pub frequency: f64,
    /// Resonance as in `BiquadFilterNode.Q`: dB for lowpass/highpass, linear
    /// for bandpass. Absent means Butterworth.
    #[serde(default, rename = "Q", skip_serializing_if = "Option::is_none")]
    pub q: Option<f64>,
}

/// Sine LFO amplitude modulation, swinging gain within `[1 - depth, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationSpec {
    #[serde(rename = "freq")]
    pub frequency: f64,
    pub depth: f64,
}

/// The smallest independently configured synthesis unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    #[serde(rename = "noise")]
    pub noise_color: NoiseColor,
    #[serde(rename = "gain")]
    pub base_gain: f64,
    /// Applied in declared order.
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default, rename = "lfo", skip_serializing_if = "Option::is_none")]
    pub modulation: Option<ModulationSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundRecipe {
    /// Always synthesized, even when a pre-recorded loop is registered.
    #[serde(default, rename = "synthOnly")]
    pub synth_only: bool,
    pub layers: Vec<LayerSpec>,
}

/// Raw catalog as stored on disk, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(rename = "defaultSound")]
    pub default_sound: String,
    pub sounds: BTreeMap<String, SoundRecipe>,
    /// Preset name → sound id → volume in percent.
    #[serde(default)]
    pub presets: BTreeMap<String, BTreeMap<String, u8>>,
}

// ── Validated catalog ───────────────────────────────────────

/// A validated, immutable recipe table.
#[derive(Debug, Clone)]
pub struct Catalog {
    default_sound: String,
    default_recipe: SoundRecipe,
    sounds: BTreeMap<String, SoundRecipe>,
    presets: BTreeMap<String, BTreeMap<String, u8>>,
}

impl Catalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::try_from(file)
    }

    /// Recipe for `id`, or the default recipe if `id` is unknown.
    pub fn recipe(&self, id: &str) -> &SoundRecipe {
        match self.sounds.get(id) {
            Some(recipe) => recipe,
            None => {
                log::debug!("Unknown sound '{id}', using '{}'", self.default_sound);
                &self.default_recipe
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sounds.contains_key(id)
    }

    pub fn default_sound(&self) -> &str {
        &self.default_sound
    }

    /// Sound ids in stable (sorted) order.
    pub fn sound_ids(&self) -> impl Iterator<Item = &str> {
        self.sounds.keys().map(String::as_str)
    }

    pub fn preset_names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    /// Volumes in [0, 1] for every catalog sound under `preset`
    /// (sounds the preset does not mention get 0).
    pub fn preset_mix(&self, preset: &str) -> Option<Vec<(String, f64)>> {
        let levels = self.presets.get(preset)?;
        Some(
            self.sounds
                .keys()
                .map(|id| {
                    let percent = levels.get(id).copied().unwrap_or(0);
                    (id.clone(), f64::from(percent) / 100.0)
                })
                .collect(),
        )
    }
}

impl TryFrom<CatalogFile> for Catalog {
    type Error = CatalogError;

    fn try_from(file: CatalogFile) -> Result<Self, Self::Error> {
        for (id, recipe) in &file.sounds {
            validate_recipe(id, recipe)?;
        }
        let default_recipe = file
            .sounds
            .get(&file.default_sound)
            .cloned()
            .ok_or_else(|| CatalogError::MissingDefault(file.default_sound.clone()))?;
        for (preset, levels) in &file.presets {
            for sound in levels.keys() {
                if !file.sounds.contains_key(sound) {
                    return Err(CatalogError::UnknownPresetSound {
                        preset: preset.clone(),
                        sound: sound.clone(),
                    });
                }
            }
        }
        Ok(Catalog {
            default_sound: file.default_sound,
            default_recipe,
            sounds: file.sounds,
            presets: file.presets,
        })
    }
}

fn validate_recipe(id: &str, recipe: &SoundRecipe) -> Result<(), CatalogError> {
    if recipe.layers.is_empty() {
        return Err(CatalogError::EmptyRecipe { id: id.to_string() });
    }
    let invalid = |layer: usize, reason: &str| CatalogError::InvalidLayer {
        id: id.to_string(),
        layer,
        reason: reason.to_string(),
    };
    for (i, layer) in recipe.layers.iter().enumerate() {
        if !(layer.base_gain >= 0.0 && layer.base_gain.is_finite()) {
            return Err(invalid(i, "gain must be a finite value >= 0"));
        }
        for filter in &layer.filters {
            if !(filter.frequency > 0.0 && filter.frequency.is_finite()) {
                return Err(invalid(i, "filter frequency must be > 0"));
            }
            if let Some(q) = filter.q {
                if !(q > 0.0 && q.is_finite()) {
                    return Err(invalid(i, "filter Q must be > 0"));
                }
            }
        }
        if let Some(lfo) = &layer.modulation {
            if !(lfo.frequency > 0.0 && lfo.frequency.is_finite()) {
                return Err(invalid(i, "lfo frequency must be > 0"));
            }
            if !(0.0..=1.0).contains(&lfo.depth) {
                return Err(invalid(i, "lfo depth must be within [0, 1]"));
            }
        }
    }
    Ok(())
}
