use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_JUMP_RATE: f64 = 0.5;
pub const DEFAULT_PARTICLE_SIZE: f64 = 2.0;
pub const DEFAULT_CANVAS_WIDTH: f64 = 800.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 600.0;

/// Initial particle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialData {
    /// Every second site occupied, centred on the canvas midline.
    #[default]
    Flat,
    /// Every second site occupied to the left of the origin, empty to the right.
    HalfFlat,
    /// All sites left of the origin occupied.
    Step,
}

impl fmt::Display for InitialData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialData::Flat => write!(f, "Flat"),
            InitialData::HalfFlat => write!(f, "Half flat"),
            InitialData::Step => write!(f, "Step"),
        }
    }
}

/// How the interface is drawn. Purely a projection choice, the dynamics ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Angle {
    /// Slanted picture: each particle is a down-step, each hole an up-step.
    #[default]
    Zero,
    /// Rotated (site, height) picture.
    FortyFive,
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Angle::Zero => write!(f, "0°"),
            Angle::FortyFive => write!(f, "45°"),
        }
    }
}

/// Drawing surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        CanvasSize { width, height }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        CanvasSize::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

/// Rejected parameter values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("jump rate must be positive and finite, got {0}")]
    JumpRate(f64),
    #[error("particle size must be positive and finite, got {0}")]
    ParticleSize(f64),
    #[error("canvas size must be finite and non-negative, got {width}x{height}")]
    Canvas { width: f64, height: f64 },
}

/// Validated model parameters used by the engine and the projector.
///
/// Built once through [`ModelParams::new`]; every accessor afterwards can rely on
/// `jump_rate > 0`, `particle_size > 0` and a finite, non-negative canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelParams {
    canvas: CanvasSize,
    jump_rate: f64,
    particle_size: f64,
    initial_data: InitialData,
    angle: Angle,
}

impl ModelParams {
    pub fn new(
        canvas: CanvasSize,
        jump_rate: f64,
        particle_size: f64,
        initial_data: InitialData,
        angle: Angle,
    ) -> Result<Self, ParamsError> {
        if !(jump_rate.is_finite() && jump_rate > 0.0) {
            return Err(ParamsError::JumpRate(jump_rate));
        }
        if !(particle_size.is_finite() && particle_size > 0.0) {
            return Err(ParamsError::ParticleSize(particle_size));
        }
        let canvas_ok = canvas.width.is_finite()
            && canvas.height.is_finite()
            && canvas.width >= 0.0
            && canvas.height >= 0.0;
        if !canvas_ok {
            return Err(ParamsError::Canvas {
                width: canvas.width,
                height: canvas.height,
            });
        }
        Ok(ModelParams {
            canvas,
            jump_rate,
            particle_size,
            initial_data,
            angle,
        })
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn jump_rate(&self) -> f64 {
        self.jump_rate
    }

    pub fn particle_size(&self) -> f64 {
        self.particle_size
    }

    pub fn initial_data(&self) -> InitialData {
        self.initial_data
    }

    pub fn angle(&self) -> Angle {
        self.angle
    }

    /// Same physics, different projection. Switching the angle never needs a reset.
    pub fn with_angle(self, angle: Angle) -> Self {
        ModelParams { angle, ..self }
    }

    /// Canvas width measured in lattice sites.
    pub fn lattice_width(&self) -> u64 {
        (self.canvas.width / self.particle_size).floor() as u64
    }

    /// Canvas height measured in lattice sites.
    pub fn lattice_height(&self) -> u64 {
        (self.canvas.height / self.particle_size).floor() as u64
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            canvas: CanvasSize::default(),
            jump_rate: DEFAULT_JUMP_RATE,
            particle_size: DEFAULT_PARTICLE_SIZE,
            initial_data: InitialData::default(),
            angle: Angle::default(),
        }
    }
}
