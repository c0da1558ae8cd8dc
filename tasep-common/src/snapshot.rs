use serde::{Serialize, Deserialize};

/// A snapshot of the particle system at the end of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of frames advanced since the last reset.
    pub frame: u64,
    /// Accumulated model time.
    pub model_time: f64,
    pub particle_count: u32,
    /// Number of particles whose forward site is empty.
    pub free_count: u32,
    /// Position of the rightmost particle.
    pub leader_position: i64,
    /// Whether the interface has grown past the canvas.
    pub can_be_stopped: bool,
    /// Particle positions, leader first. Needed by the visualizer to redraw the frame.
    /// Always serialized (even as `None`) so the bincode stream stays decodable.
    pub positions: Option<Vec<i64>>,
}

impl Snapshot {
    /// Fraction of particles that are able to jump.
    pub fn mobile_fraction(&self) -> f64 {
        if self.particle_count == 0 {
            0.0
        } else {
            self.free_count as f64 / self.particle_count as f64
        }
    }
}
