//! User settings that are not playback state
//!
//! Only values live here. Whoever renders audio reads the gains and does
//! the filtering.

use serde::{Deserialize, Serialize};

/// ISO octave centre frequencies (Hz)
pub const EQ_BAND_FREQUENCIES: [f32; 10] = [
    31.0, 62.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

pub const EQ_BAND_COUNT: usize = EQ_BAND_FREQUENCIES.len();

pub const MAX_GAIN_DB: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EqualizerPreset {
    #[default]
    Flat,
    BassBoost,
    TrebleBoost,
    Vocal,
    Loudness,
    /// Anything the user dialled in by hand
    Custom,
}

impl EqualizerPreset {
    pub const ALL: [EqualizerPreset; 5] = [
        Self::Flat,
        Self::BassBoost,
        Self::TrebleBoost,
        Self::Vocal,
        Self::Loudness,
    ];

    /// Band gains in dB, lowest band first. `Custom` has none.
    pub fn gains(&self) -> Option<[f32; EQ_BAND_COUNT]> {
        match self {
            Self::Flat => Some([0.0; EQ_BAND_COUNT]),
            Self::BassBoost => Some([6.0, 5.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            Self::TrebleBoost => Some([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 4.0, 5.0, 6.0]),
            Self::Vocal => Some([-2.0, -1.0, 0.0, 2.0, 4.0, 4.0, 2.0, 0.0, -1.0, -2.0]),
            Self::Loudness => Some([5.0, 4.0, 2.0, 0.0, -1.0, 0.0, 0.0, 2.0, 4.0, 5.0]),
            Self::Custom => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "Flat",
            Self::BassBoost => "Bass Boost",
            Self::TrebleBoost => "Treble Boost",
            Self::Vocal => "Vocal",
            Self::Loudness => "Loudness",
            Self::Custom => "Custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EqualizerSettings {
    pub enabled: bool,
    pub preset: EqualizerPreset,
    gains: [f32; EQ_BAND_COUNT],
}

impl Default for EqualizerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: EqualizerPreset::Flat,
            gains: [0.0; EQ_BAND_COUNT],
        }
    }
}

impl EqualizerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gains(&self) -> &[f32; EQ_BAND_COUNT] {
        &self.gains
    }

    pub fn band_gain(&self, band: usize) -> Option<f32> {
        self.gains.get(band).copied()
    }

    /// Set one band; the gain is clamped to ±12 dB. Returns false for an unknown band.
    pub fn set_band_gain(&mut self, band: usize, gain_db: f32) -> bool {
        let Some(slot) = self.gains.get_mut(band) else {
            return false;
        };
        *slot = clamp_gain(gain_db);
        self.preset = EqualizerPreset::Custom;
        true
    }

    pub fn set_gains(&mut self, gains: [f32; EQ_BAND_COUNT]) {
        self.gains = gains.map(clamp_gain);
        self.preset = EqualizerPreset::Custom;
    }

    /// `Custom` keeps the current gains
    pub fn apply_preset(&mut self, preset: EqualizerPreset) {
        if let Some(gains) = preset.gains() {
            self.gains = gains;
        }
        self.preset = preset;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Back to flat; the enabled flag is left alone
    pub fn reset(&mut self) {
        self.apply_preset(EqualizerPreset::Flat);
    }

    /// Clamp anything out of range that came in through deserialization
    pub fn sanitize(&mut self) {
        self.gains = self.gains.map(clamp_gain);
    }
}

/// Everything stored under the settings key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub equalizer: EqualizerSettings,
}

fn clamp_gain(gain_db: f32) -> f32 {
    if gain_db.is_finite() {
        gain_db.clamp(-MAX_GAIN_DB, MAX_GAIN_DB)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_ascending() {
        for window in EQ_BAND_FREQUENCIES.windows(2) {
            assert!(window[0] < window[1]);
        }
    }

    #[test]
    fn test_gain_clamped() {
        let mut eq = EqualizerSettings::new();
        assert!(eq.set_band_gain(0, 20.0));
        assert!(eq.set_band_gain(9, -30.0));
        assert!(eq.set_band_gain(5, f32::NAN));
        assert!(!eq.set_band_gain(10, 1.0));

        assert_eq!(eq.band_gain(0), Some(12.0));
        assert_eq!(eq.band_gain(9), Some(-12.0));
        assert_eq!(eq.band_gain(5), Some(0.0));
        assert_eq!(eq.preset, EqualizerPreset::Custom);
    }

    #[test]
    fn test_presets_and_reset() {
        let mut eq = EqualizerSettings::new();
        eq.set_enabled(true);
        eq.apply_preset(EqualizerPreset::BassBoost);
        assert_eq!(eq.band_gain(0), Some(6.0));
        assert_eq!(eq.preset.name(), "Bass Boost");

        eq.apply_preset(EqualizerPreset::Custom);
        assert_eq!(eq.band_gain(0), Some(6.0));

        eq.reset();
        assert!(eq.gains().iter().all(|g| *g == 0.0));
        assert_eq!(eq.preset, EqualizerPreset::Flat);
        assert!(eq.enabled);
    }

    #[test]
    fn test_preset_gains_within_range() {
        for preset in EqualizerPreset::ALL {
            let gains = preset.gains().unwrap();
            assert!(gains.iter().all(|g| g.abs() <= MAX_GAIN_DB), "{}", preset.name());
        }
    }

    #[test]
    fn test_settings_from_partial_json() {
        let settings: Settings = serde_json::from_str(r#"{"equalizer":{"enabled":true}}"#).unwrap();
        assert!(settings.equalizer.enabled);
        assert_eq!(settings.equalizer.preset, EqualizerPreset::Flat);

        let mut loud: EqualizerSettings =
            serde_json::from_str(r#"{"gains":[40,0,0,0,0,0,0,0,0,0]}"#).unwrap();
        loud.sanitize();
        assert_eq!(loud.band_gain(0), Some(12.0));
    }
}
