//! Maps a particle configuration to drawable geometry.
//!
//! Nothing here touches the state: the same `(state, model_time, params)` triple always
//! produces the same geometry, so any recorded snapshot can be redrawn later.
//!
//! Canvas coordinates have their origin at the top-left corner with `y` growing
//! downward; "up" on screen therefore means subtracting from `y`. The lattice origin
//! is drawn at the horizontal centre of the canvas.

use crate::state::ParticleState;
use rayon::prelude::*;
use tasep_common::{Angle, ColorTag, Geometry, InitialData, Marker, ModelParams, Point, Segment};

/// Gap between the bottom of the canvas and the particle markers.
pub const BOTTOM_MARGIN_TASEP: f64 = 10.0;

/// Gap between the bottom of the canvas and the interface.
pub const BOTTOM_MARGIN_HEIGHTS: f64 = 2.0 * BOTTOM_MARGIN_TASEP;

/// Above this many particles the per-particle geometry is built on the rayon pool.
const PARALLEL_THRESHOLD: usize = 4096;

/// Builds the full picture for one frame.
pub fn project(state: &ParticleState, model_time: f64, params: &ModelParams) -> Geometry {
    let view = View::new(state.len(), model_time, params);

    let mut segments = vec![Segment::new(
        Point::new(0.0, view.axis_y()),
        Point::new(view.width, view.axis_y()),
        ColorTag::Axis,
    )];
    match params.angle() {
        Angle::Zero => {
            view.zero_angle_theory(&mut segments);
            segments.extend(view.zero_angle_interface(state.positions()));
        }
        Angle::FortyFive => {
            view.rotated_theory(&mut segments);
            segments.extend(view.rotated_interface(state.positions()));
        }
    }

    Geometry {
        markers: view.markers(state.positions()),
        segments,
        can_be_stopped: can_be_stopped(params, model_time),
    }
}

/// True once the growing interface has left the canvas.
///
/// Depends only on the initial data, the model time and the parameters, and is
/// monotone in `model_time`.
pub fn can_be_stopped(params: &ModelParams, model_time: f64) -> bool {
    let size = params.particle_size();
    let height = params.canvas().height;
    let climb = match params.initial_data() {
        InitialData::Flat => params.jump_rate() * model_time * size / 2.0,
        InitialData::HalfFlat => size * model_time / 2.0,
        InitialData::Step => size * model_time,
    };
    climb >= height
}

/// Per-frame constants shared by all the drawing rules.
struct View {
    width: f64,
    height: f64,
    /// Particle size in pixels.
    s: f64,
    rate: f64,
    /// Jump rate capped at 1; the parabola never starts left of the apex.
    capped_rate: f64,
    t: f64,
    cx: f64,
    count: usize,
    initial_data: InitialData,
}

impl View {
    fn new(count: usize, model_time: f64, params: &ModelParams) -> Self {
        let canvas = params.canvas();
        View {
            width: canvas.width,
            height: canvas.height,
            s: params.particle_size(),
            rate: params.jump_rate(),
            capped_rate: params.jump_rate().min(1.0),
            t: model_time,
            cx: canvas.width / 2.0,
            count,
            initial_data: params.initial_data(),
        }
    }

    fn axis_y(&self) -> f64 {
        self.height - self.s - BOTTOM_MARGIN_HEIGHTS
    }

    /// Baseline of the rotated picture.
    fn rotated_base(&self) -> f64 {
        self.height - 2.0 * self.s - BOTTOM_MARGIN_HEIGHTS
    }

    fn markers(&self, positions: &[i64]) -> Vec<Marker> {
        let y = self.height - BOTTOM_MARGIN_TASEP - self.s / 2.0;
        positions
            .iter()
            .map(|&p| Marker {
                x: self.cx + self.s * p as f64,
                y,
                diameter: self.s,
            })
            .collect()
    }

    /// First index of the parabolic arc, `1 + floor((1 - rate)^2 t)`.
    fn arc_start(&self) -> f64 {
        1.0 + ((1.0 - self.capped_rate).powi(2) * self.t).floor()
    }

    // --- Zero angle -------------------------------------------------------

    fn zero_angle_theory(&self, out: &mut Vec<Segment>) {
        let (cx, by, s, t, rate) = (self.cx, self.axis_y(), self.s, self.t, self.rate);
        match self.initial_data {
            InitialData::Flat => {
                let trend = rate * t * s / 2.0;
                out.push(Segment::new(
                    Point::new(0.0, by - trend),
                    Point::new(self.width, by - trend),
                    ColorTag::Hydrodynamic,
                ));
            }
            InitialData::Step => {
                let apex = Point::new(cx, by);
                out.push(Segment::new(apex, Point::new(cx - self.height, by - self.height), ColorTag::Guide));
                out.push(Segment::new(apex, Point::new(cx + self.height, by - self.height), ColorTag::Guide));
                self.zero_angle_arc(t, out);
                if rate < 1.0 {
                    out.push(self.zero_angle_shock());
                }
            }
            InitialData::HalfFlat => {
                out.push(Segment::new(
                    Point::new(cx, by),
                    Point::new(cx + self.height, by - self.height),
                    ColorTag::Guide,
                ));
                let flat_y = by - s * t / 2.0;
                if rate > 0.5 {
                    out.push(Segment::new(
                        Point::new(0.0, flat_y),
                        Point::new(cx, flat_y),
                        ColorTag::Hydrodynamic,
                    ));
                    self.zero_angle_arc(t / 4.0, out);
                    if rate < 1.0 {
                        out.push(self.zero_angle_shock());
                    }
                } else {
                    // Sub-critical bias: the flat region runs straight into the shock.
                    let knee = Point::new(cx + s * (rate - 0.5) * t, flat_y);
                    out.push(Segment::new(Point::new(0.0, flat_y), knee, ColorTag::Hydrodynamic));
                    out.push(Segment::new(
                        knee,
                        Point::new(cx + s * rate * t, by - s * rate * t),
                        ColorTag::Shock,
                    ));
                }
            }
        }
    }

    fn zero_angle_arc_point(&self, k: f64) -> Point {
        let (s, t) = (self.s, self.t);
        let root = 2.0 * (t * k).sqrt();
        Point::new(self.cx + s * (t - root), self.axis_y() - s * (2.0 * k + t - root))
    }

    fn zero_angle_arc(&self, k_end: f64, out: &mut Vec<Segment>) {
        let mut k = self.arc_start();
        while k < k_end {
            out.push(Segment::new(
                self.zero_angle_arc_point(k),
                self.zero_angle_arc_point(k - 1.0),
                ColorTag::Hydrodynamic,
            ));
            k += 1.0;
        }
    }

    fn zero_angle_shock(&self) -> Segment {
        let (cx, by, s, t, rate) = (self.cx, self.axis_y(), self.s, self.t, self.rate);
        Segment::new(
            Point::new(
                cx + s * (2.0 * rate - 1.0) * t,
                by - s * (1.0 - 2.0 * rate + 2.0 * rate * rate) * t,
            ),
            Point::new(cx + s * rate * t, by - s * rate * t),
            ColorTag::Shock,
        )
    }

    /// Top-right corner `(hx + s, vy)` of the down-step drawn for particle `i`.
    fn corner(&self, positions: &[i64], i: usize) -> Point {
        // Flat data is shifted so that the middle particle starts at height zero.
        let centering = match self.initial_data {
            InitialData::Flat => self.count as f64,
            _ => 0.0,
        };
        let p = positions[i] as f64;
        Point::new(
            self.cx + self.s * p,
            self.height - BOTTOM_MARGIN_HEIGHTS - self.s * (p + 2.0 * i as f64 - centering + 1.0),
        )
    }

    fn zero_angle_interface(&self, positions: &[i64]) -> Vec<Segment> {
        let s = self.s;
        let per_particle = |i: usize| {
            let low = self.corner(positions, i);
            let high = Point::new(low.x - s, low.y - s);
            let down_step = Segment::new(high, low, ColorTag::Interface);
            let climb = (i > 0).then(|| {
                let previous = self.corner(positions, i - 1);
                Segment::new(low, Point::new(previous.x - s, previous.y - s), ColorTag::Interface)
            });
            std::iter::once(down_step).chain(climb)
        };

        // Empty sites ahead of the leader rise at 45 degrees.
        let lead = self.corner(positions, 0);
        let mut out = vec![Segment::new(
            lead,
            Point::new(lead.x + self.height, lead.y - self.height),
            ColorTag::Interface,
        )];
        if positions.len() >= PARALLEL_THRESHOLD {
            out.par_extend((0..positions.len()).into_par_iter().flat_map_iter(&per_particle));
        } else {
            out.extend((0..positions.len()).flat_map(&per_particle));
        }
        out
    }

    // --- Forty-five degrees -----------------------------------------------

    fn rotated_theory(&self, out: &mut Vec<Segment>) {
        let (cx, b, s, t, rate) = (self.cx, self.rotated_base(), self.s, self.t, self.rate);
        match self.initial_data {
            InitialData::Flat => {
                // Bulk particles at density one half drift at speed one half,
                // independent of the leader's rate.
                let trend = s * t / 2.0;
                let shift = s * self.count as f64 / 2.0;
                out.push(Segment::new(
                    Point::new(cx - shift, b - trend - shift),
                    Point::new(cx + trend, b),
                    ColorTag::Hydrodynamic,
                ));
            }
            InitialData::Step => {
                self.rotated_arc(t, out);
                if rate < 1.0 {
                    out.push(self.rotated_shock());
                }
            }
            InitialData::HalfFlat => {
                let far = Point::new(cx - self.height, b - self.height - s * t / 2.0);
                if rate > 0.5 {
                    out.push(Segment::new(
                        Point::new(cx + s * t / 4.0, b - s * t / 4.0),
                        far,
                        ColorTag::Hydrodynamic,
                    ));
                    self.rotated_arc(t / 4.0, out);
                    if rate < 1.0 {
                        out.push(self.rotated_shock());
                    }
                } else {
                    let knee = Point::new(cx + s * rate * t / 2.0, b - s * (1.0 - rate) * t / 2.0);
                    out.push(Segment::new(knee, far, ColorTag::Hydrodynamic));
                    out.push(Segment::new(knee, Point::new(cx + s * rate * t, b), ColorTag::Shock));
                }
            }
        }
    }

    fn rotated_arc_point(&self, k: f64) -> Point {
        let (s, t) = (self.s, self.t);
        Point::new(
            self.cx + s * (t - 2.0 * (t * k).sqrt() + k),
            self.rotated_base() - s * k,
        )
    }

    fn rotated_arc(&self, k_end: f64, out: &mut Vec<Segment>) {
        let mut k = self.arc_start();
        while k < k_end {
            out.push(Segment::new(
                self.rotated_arc_point(k - 1.0),
                self.rotated_arc_point(k),
                ColorTag::Hydrodynamic,
            ));
            k += 1.0;
        }
    }

    fn rotated_shock(&self) -> Segment {
        let (cx, b, s, t, rate) = (self.cx, self.rotated_base(), self.s, self.t, self.rate);
        Segment::new(
            Point::new(cx + s * rate * rate * t, b - s * (1.0 - rate).powi(2) * t),
            Point::new(cx + s * rate * t, b),
            ColorTag::Shock,
        )
    }

    /// Staircase in the (site, height) picture, using `position[i] + i` as abscissa.
    fn rotated_interface(&self, positions: &[i64]) -> Vec<Segment> {
        let s = self.s;
        let b = self.rotated_base();
        // Flat data: the right half of the system sits below the baseline.
        let (shift, first) = match self.initial_data {
            InitialData::Flat => (s * self.count as f64 / 2.0, self.count / 2),
            _ => (0.0, 0),
        };
        let column = |i: usize| self.cx + s * ((positions[i] + i as i64) as f64 + 1.0) - shift;
        let level = |i: usize| b - s * i as f64 + shift;

        let per_particle = |i: usize| {
            let x = column(i);
            let y = level(i);
            let tread = (i > first)
                .then(|| Segment::new(Point::new(column(i - 1), y), Point::new(x, y), ColorTag::Interface));
            let riser = Segment::new(Point::new(x, y), Point::new(x, level(i + 1)), ColorTag::Interface);
            tread.into_iter().chain(std::iter::once(riser))
        };

        let range = first..positions.len();
        if range.len() >= PARALLEL_THRESHOLD {
            range.into_par_iter().flat_map_iter(&per_particle).collect()
        } else {
            range.flat_map(&per_particle).collect()
        }
    }
}
