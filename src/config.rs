use crate::error::GateError;
use crate::types::{Config, GateConfig};
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        GateConfig::new(self.gate.line_x, self.gate.gate_y_min, self.gate.gate_y_max)?;

        if self.sampling.frame_skip == 0 {
            bail!("sampling.frame_skip must be at least 1");
        }

        if self.tracking.max_idle_frames == Some(0) {
            bail!("tracking.max_idle_frames must be at least 1 (omit it to never evict)");
        }

        for (name, size) in [
            ("inference_size", self.source.inference_size),
            ("frame_size", self.source.frame_size),
        ] {
            if let Some((w, h)) = size {
                if w == 0 || h == 0 {
                    bail!("source.{} must be non-zero, got {}x{}", name, w, h);
                }
            }
        }

        if self.source.inference_size.is_some() && self.source.frame_size.is_none() {
            bail!("source.inference_size requires source.frame_size");
        }

        Ok(())
    }
}

impl GateConfig {
    pub fn new(line_x: f32, gate_y_min: f32, gate_y_max: f32) -> Result<Self, GateError> {
        // Negated so NaN bounds are rejected as well.
        if !(gate_y_min <= gate_y_max) {
            return Err(GateError::InvalidGate {
                y_min: gate_y_min,
                y_max: gate_y_max,
            });
        }

        Ok(Self {
            line_x,
            gate_y_min,
            gate_y_max,
        })
    }

    /// Inclusive on both ends.
    #[inline]
    pub fn contains_y(&self, center_y: f32) -> bool {
        self.gate_y_min <= center_y && center_y <= self.gate_y_max
    }
}
