use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use crate::params::{
    Angle, CanvasSize, InitialData, ModelParams, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH,
    DEFAULT_JUMP_RATE, DEFAULT_PARTICLE_SIZE,
};
use std::path::Path;

// Size of the drawing surface, in pixels
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_width")]
    pub width: f64,
    #[serde(default = "default_canvas_height")]
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        CanvasConfig {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

// Model parameters, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_jump_rate")]
    pub jump_rate: f64,
    #[serde(default = "default_particle_size")]
    pub particle_size: f64,
    #[serde(default)]
    pub initial_data: InitialData,
    #[serde(default)]
    pub angle: Angle,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            jump_rate: DEFAULT_JUMP_RATE,
            particle_size: DEFAULT_PARTICLE_SIZE,
            initial_data: InitialData::default(),
            angle: Angle::default(),
        }
    }
}

// Frame scheduling for the headless runner
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    /// Upper bound on rendered frames; one frame is one unit of model time.
    pub max_frames: u32,
    /// Delay between frames in milliseconds (speed control, 0 = as fast as possible).
    #[serde(default)]
    pub frame_delay_ms: u64,
    #[serde(default = "default_record_interval")]
    pub record_interval_frames: u32,
    /// Stop as soon as the interface has grown past the top of the canvas.
    #[serde(default = "default_stop_when_complete")]
    pub stop_when_complete: bool,
    /// RNG seed. When absent the run is seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_positions: bool,
    pub save_stats: bool,
    #[serde(default = "default_save_positions_in_snapshot")]
    pub save_positions_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub model: ModelConfig,
    pub timing: TimingConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file '{}'", path_ref.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid configuration in '{}'", path_ref.display()))
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig =
            toml::from_str(config_str).context("Failed to parse TOML")?;

        // --- Validation ---
        config.model_params()?;
        if config.timing.max_frames == 0 {
            anyhow::bail!("max_frames must be greater than 0.");
        }
        if config.timing.record_interval_frames == 0 {
            anyhow::bail!("record_interval_frames must be greater than 0.");
        }
        if config.output.base_filename.trim().is_empty() {
            anyhow::bail!("base_filename must not be empty.");
        }

        Ok(config)
    }

    /// Converts the configuration into the validated parameters used at runtime.
    pub fn model_params(&self) -> Result<ModelParams> {
        let params = ModelParams::new(
            CanvasSize::new(self.canvas.width, self.canvas.height),
            self.model.jump_rate,
            self.model.particle_size,
            self.model.initial_data,
            self.model.angle,
        )?;
        Ok(params)
    }
}

fn default_canvas_width() -> f64 {
    DEFAULT_CANVAS_WIDTH
}

fn default_canvas_height() -> f64 {
    DEFAULT_CANVAS_HEIGHT
}

fn default_jump_rate() -> f64 {
    DEFAULT_JUMP_RATE
}

fn default_particle_size() -> f64 {
    DEFAULT_PARTICLE_SIZE
}

fn default_record_interval() -> u32 {
    10
}

fn default_stop_when_complete() -> bool {
    true
}

fn default_save_positions_in_snapshot() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [timing]
        max_frames = 100

        [output]
        base_filename = "run"
        save_positions = false
        save_stats = true
    "#;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = SimulationConfig::from_toml_str(MINIMAL).unwrap();
        let params = config.model_params().unwrap();
        assert_eq!(params, ModelParams::default());
        assert_eq!(config.timing.record_interval_frames, 10);
        assert!(config.timing.stop_when_complete);
        assert_eq!(config.timing.seed, None);
        assert!(config.output.save_positions_in_snapshot);
    }

    #[test]
    fn parses_enum_variants() {
        let text = r#"
            [canvas]
            width = 200.0
            height = 100.0

            [model]
            jump_rate = 0.75
            particle_size = 1.0
            initial_data = "half_flat"
            angle = "forty_five"

            [timing]
            max_frames = 5
            seed = 7

            [output]
            base_filename = "run"
            save_positions = true
            save_stats = true
            format = "bincode"
        "#;
        let config = SimulationConfig::from_toml_str(text).unwrap();
        let params = config.model_params().unwrap();
        assert_eq!(params.initial_data(), InitialData::HalfFlat);
        assert_eq!(params.angle(), Angle::FortyFive);
        assert_eq!(params.jump_rate(), 0.75);
        assert_eq!(config.timing.seed, Some(7));
    }

    #[test]
    fn invalid_model_is_rejected() {
        let text = MINIMAL.replace("[timing]", "[model]\njump_rate = -1.0\n\n[timing]");
        let err = SimulationConfig::from_toml_str(&text).unwrap_err();
        assert!(format!("{:#}", err).contains("jump rate"));
    }

    #[test]
    fn zero_frames_is_rejected() {
        let text = MINIMAL.replace("max_frames = 100", "max_frames = 0");
        assert!(SimulationConfig::from_toml_str(&text).is_err());
    }
}
