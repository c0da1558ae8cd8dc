use serde::{Deserialize, Serialize};

/// A point on the canvas, in pixels. `y` grows downward.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// What a segment represents. The renderer picks colour and stroke from this.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorTag {
    /// Baseline of the drawing.
    Axis,
    /// Fixed reference rays of the limit shape.
    Guide,
    /// The simulated interface.
    Interface,
    /// Smooth part of the hydrodynamic limit.
    Hydrodynamic,
    /// Discontinuity of the hydrodynamic limit.
    Shock,
}

/// A filled disc drawn for one particle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Centre of the disc.
    pub x: f64,
    pub y: f64,
    pub diameter: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: ColorTag,
}

impl Segment {
    pub fn new(from: Point, to: Point, color: ColorTag) -> Self {
        Segment {
            x1: from.x,
            y1: from.y,
            x2: to.x,
            y2: to.y,
            color,
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }
}

/// Everything needed to paint one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub markers: Vec<Marker>,
    pub segments: Vec<Segment>,
    pub can_be_stopped: bool,
}

impl Geometry {
    /// Segments carrying the given tag, in drawing order.
    pub fn segments_with(&self, color: ColorTag) -> impl Iterator<Item = &Segment> + '_ {
        self.segments.iter().filter(move |s| s.color == color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_round_trips_endpoints() {
        let s = Segment::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0), ColorTag::Shock);
        assert_eq!(s.start(), Point::new(0.0, 0.0));
        assert_eq!(s.end(), Point::new(3.0, 4.0));
        assert_eq!((s.x2, s.y2, s.color), (3.0, 4.0, ColorTag::Shock));
    }

    #[test]
    fn filters_by_tag() {
        let p = Point::new(1.0, 1.0);
        let geometry = Geometry {
            markers: Vec::new(),
            segments: vec![
                Segment::new(p, p + p, ColorTag::Axis),
                Segment::new(p, p, ColorTag::Interface),
                Segment::new(p + p, p, ColorTag::Interface),
            ],
            can_be_stopped: false,
        };
        assert_eq!(geometry.segments_with(ColorTag::Interface).count(), 2);
        assert_eq!(geometry.segments_with(ColorTag::Shock).count(), 0);
    }
}
