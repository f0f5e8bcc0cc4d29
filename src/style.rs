//! Per-request style knobs for the rewrite backend.
//!
//! A [`StyleConfig`] travels with each job (it is persisted alongside the job
//! record) and is handed by reference to every rewrite call. The engine never
//! mutates it.

use serde::{Deserialize, Serialize};

/// Lowest accepted rewrite intensity.
pub const MIN_INTENSITY: u8 = 1;
/// Highest accepted rewrite intensity.
pub const MAX_INTENSITY: u8 = 5;

/// User-chosen style for a paraphrasing run.
///
/// Every field has a default so a partial JSON object (`{"tone":"formal"}`)
/// deserialises into a complete config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleConfig {
    pub tone: Tone,
    pub formality: Formality,
    pub creativity: Creativity,
    /// Keep paragraph breaks, lists and other structure. Default: true.
    pub preserve_formatting: bool,
    /// Rewrite aggressiveness, 1 (minimal) to 5 (complete rewrite). Default: 3.
    pub intensity: u8,
    /// Target model identifier. `None` uses the configured default.
    pub model: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            formality: Formality::default(),
            creativity: Creativity::default(),
            preserve_formatting: true,
            intensity: 3,
            model: None,
        }
    }
}

impl StyleConfig {
    /// Intensity clamped into `1..=5`; out-of-range values never reach a prompt.
    pub fn effective_intensity(&self) -> u8 {
        self.intensity.clamp(MIN_INTENSITY, MAX_INTENSITY)
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_formality(mut self, formality: Formality) -> Self {
        self.formality = formality;
        self
    }

    pub fn with_creativity(mut self, creativity: Creativity) -> Self {
        self.creativity = creativity;
        self
    }

    pub fn with_intensity(mut self, intensity: u8) -> Self {
        self.intensity = intensity.clamp(MIN_INTENSITY, MAX_INTENSITY);
        self
    }

    pub fn with_preserve_formatting(mut self, v: bool) -> Self {
        self.preserve_formatting = v;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Overall voice of the rewritten text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    #[default]
    Neutral,
    Casual,
}

/// Vocabulary and sentence-structure register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    High,
    #[default]
    Medium,
    Low,
}

/// How freely the model may sample. Maps onto the completion temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Creativity {
    Conservative,
    #[default]
    Moderate,
    Creative,
}

impl Creativity {
    /// Sampling temperature sent with every rewrite request.
    pub fn temperature(self) -> f32 {
        match self {
            Creativity::Conservative => 0.3,
            Creativity::Moderate => 0.6,
            Creativity::Creative => 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = StyleConfig::default();
        assert_eq!(s.tone, Tone::Neutral);
        assert_eq!(s.formality, Formality::Medium);
        assert_eq!(s.creativity, Creativity::Moderate);
        assert!(s.preserve_formatting);
        assert_eq!(s.intensity, 3);
        assert!(s.model.is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: StyleConfig =
            serde_json::from_str(r#"{"tone":"formal","preserveFormatting":false}"#).unwrap();
        assert_eq!(s.tone, Tone::Formal);
        assert!(!s.preserve_formatting);
        assert_eq!(s.intensity, 3);
        assert_eq!(s.creativity, Creativity::Moderate);
    }

    #[test]
    fn intensity_is_clamped() {
        assert_eq!(StyleConfig::default().with_intensity(9).intensity, 5);
        assert_eq!(StyleConfig::default().with_intensity(0).intensity, 1);

        let raw = StyleConfig {
            intensity: 42,
            ..Default::default()
        };
        assert_eq!(raw.effective_intensity(), 5);
    }

    #[test]
    fn creativity_temperatures() {
        assert_eq!(Creativity::Conservative.temperature(), 0.3);
        assert_eq!(Creativity::Moderate.temperature(), 0.6);
        assert_eq!(Creativity::Creative.temperature(), 0.9);
    }
}
