use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Panel group a parameter is shown under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamGroup {
    Noise,
    Rotation,
    Color,
}

impl ParamGroup {
    pub const ALL: [ParamGroup; 3] = [ParamGroup::Noise, ParamGroup::Rotation, ParamGroup::Color];

    pub fn label(self) -> &'static str {
        match self {
            ParamGroup::Noise => "Noise",
            ParamGroup::Rotation => "Rotation",
            ParamGroup::Color => "Color",
        }
    }
}

/// Declared range of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub group: ParamGroup,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl ParamSpec {
    /// Clamp into range and snap to the step grid anchored at `min`
    pub fn quantize(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        let clamped = value.clamp(self.min, self.max);
        let steps = ((clamped - self.min) / self.step).round();
        // Rounding to the last step can overshoot when the range is not a multiple
        (self.min + steps * self.step).clamp(self.min, self.max)
    }
}

pub const PARAMS: [ParamSpec; 6] = [
    ParamSpec {
        name: "speed",
        group: ParamGroup::Noise,
        min: 0.1,
        max: 1.0,
        step: 0.01,
        default: 0.7,
    },
    ParamSpec {
        name: "density",
        group: ParamGroup::Noise,
        min: 0.0,
        max: 10.0,
        step: 0.01,
        default: 0.6,
    },
    ParamSpec {
        name: "strength",
        group: ParamGroup::Noise,
        min: 0.0,
        max: 2.0,
        step: 0.01,
        default: 0.2,
    },
    ParamSpec {
        name: "frequency",
        group: ParamGroup::Rotation,
        min: 0.0,
        max: 10.0,
        step: 0.1,
        default: 0.6,
    },
    ParamSpec {
        name: "amplitude",
        group: ParamGroup::Rotation,
        min: 0.0,
        max: 10.0,
        step: 0.1,
        default: 8.5,
    },
    ParamSpec {
        name: "intensity",
        group: ParamGroup::Color,
        min: 0.0,
        max: 10.0,
        step: 0.1,
        default: 5.0,
    },
];

pub fn param_spec(name: &str) -> Option<&'static ParamSpec> {
    PARAMS.iter().find(|spec| spec.name == name)
}

/// Debug-panel parameters
///
/// Only `speed` has an effect, and only when live settings are enabled; the
/// rest are shown but not read by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub speed: f32,
    pub density: f32,
    pub strength: f32,
    pub frequency: f32,
    pub amplitude: f32,
    pub intensity: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed: PARAMS[0].default,
            density: PARAMS[1].default,
            strength: PARAMS[2].default,
            frequency: PARAMS[3].default,
            amplitude: PARAMS[4].default,
            intensity: PARAMS[5].default,
        }
    }
}

impl Settings {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid settings file: {:?}", path))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let mut settings: Settings = serde_json::from_str(text)?;
        settings.normalize();
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        match name {
            "speed" => Some(self.speed),
            "density" => Some(self.density),
            "strength" => Some(self.strength),
            "frequency" => Some(self.frequency),
            "amplitude" => Some(self.amplitude),
            "intensity" => Some(self.intensity),
            _ => None,
        }
    }

    /// Mutable slot of a named parameter, for widgets that edit in place
    pub fn slot_mut(&mut self, name: &str) -> Option<&mut f32> {
        match name {
            "speed" => Some(&mut self.speed),
            "density" => Some(&mut self.density),
            "strength" => Some(&mut self.strength),
            "frequency" => Some(&mut self.frequency),
            "amplitude" => Some(&mut self.amplitude),
            "intensity" => Some(&mut self.intensity),
            _ => None,
        }
    }

    /// Store a quantized value; returns the value actually stored
    pub fn set(&mut self, name: &str, value: f32) -> Result<f32> {
        let Some(spec) = param_spec(name) else {
            bail!("Unknown setting: {}", name);
        };
        let quantized = spec.quantize(value);
        if let Some(slot) = self.slot_mut(name) {
            *slot = quantized;
        }
        Ok(quantized)
    }

    /// Re-quantize every value into its declared range
    pub fn normalize(&mut self) {
        for spec in &PARAMS {
            if let Some(slot) = self.slot_mut(spec.name) {
                *slot = spec.quantize(*slot);
            }
        }
    }

    /// Multiplier on animation time, 1.0 at the default speed
    pub fn time_scale(&self) -> f32 {
        self.speed / PARAMS[0].default
    }
}
