use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use log::warn;
use palette::named;
use palette::Srgb;
use tasep_common::{ColorTag, Geometry};

/// Colours for each kind of segment, plus the particle markers.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub background: Rgba<u8>,
    pub particle: Rgba<u8>,
    pub axis: Rgba<u8>,
    pub guide: Rgba<u8>,
    pub interface: Rgba<u8>,
    pub hydrodynamic: Rgba<u8>,
    pub shock: Rgba<u8>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: rgba(named::WHITE),
            particle: rgba(named::STEELBLUE),
            axis: rgba(named::BLACK),
            guide: rgba(named::LIGHTGRAY),
            interface: rgba(named::BLACK),
            hydrodynamic: rgba(named::CRIMSON),
            shock: rgba(named::DARKORANGE),
        }
    }
}

impl Theme {
    pub fn with_background(mut self, name: &str) -> Self {
        self.background = parse_color(name);
        self
    }

    pub fn segment_color(&self, tag: ColorTag) -> Rgba<u8> {
        match tag {
            ColorTag::Axis => self.axis,
            ColorTag::Guide => self.guide,
            ColorTag::Interface => self.interface,
            ColorTag::Hydrodynamic => self.hydrodynamic,
            ColorTag::Shock => self.shock,
        }
    }
}

fn rgba(color: Srgb<u8>) -> Rgba<u8> {
    Rgba([color.red, color.green, color.blue, 255])
}

/// Resolves an SVG/CSS colour name. Unknown names fall back to white.
pub fn parse_color(name: &str) -> Rgba<u8> {
    match named::from_str(&name.to_ascii_lowercase()) {
        Some(color) => rgba(color),
        None => {
            warn!("Color '{}' not recognized, using white.", name);
            rgba(named::WHITE)
        }
    }
}

/// Smallest even pixel extent covering `length * scale`. H.264 needs even sizes.
pub fn even_extent(length: f64, scale: f64) -> u32 {
    let pixels = (length * scale).ceil().clamp(2.0, u32::MAX as f64 - 1.0) as u32;
    pixels + pixels % 2
}

/// Rasterizes one frame. Segments go first so the particles stay visible.
pub fn draw_frame(geometry: &Geometry, width: u32, height: u32, scale: f64, theme: &Theme) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, theme.background);

    for segment in &geometry.segments {
        draw_line_segment_mut(
            &mut image,
            ((segment.x1 * scale) as f32, (segment.y1 * scale) as f32),
            ((segment.x2 * scale) as f32, (segment.y2 * scale) as f32),
            theme.segment_color(segment.color),
        );
    }

    let (w, h) = (width as f64, height as f64);
    for marker in &geometry.markers {
        let (x, y) = (marker.x * scale, marker.y * scale);
        let radius = (marker.diameter * scale / 2.0).round().max(1.0);
        // Most particles of a long run sit far off-canvas.
        if x + radius < 0.0 || x - radius >= w || y + radius < 0.0 || y - radius >= h {
            continue;
        }
        draw_filled_circle_mut(
            &mut image,
            (x.round() as i32, y.round() as i32),
            radius as i32,
            theme.particle,
        );
    }
    image
}

/// Converts an even-sized RGBA image to planar YUV 4:2:0 (BT.601).
pub fn rgb_to_yuv420(image: &RgbaImage) -> Vec<u8> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let luma_len = width * height;
    let chroma_width = width / 2;
    let chroma_len = chroma_width * (height / 2);
    let mut yuv = vec![0u8; luma_len + 2 * chroma_len];

    let (luma, chroma) = yuv.split_at_mut(luma_len);
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b, _] = pixel.0.map(f32::from);
        luma[y as usize * width + x as usize] = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
    }

    let (u_plane, v_plane) = chroma.split_at_mut(chroma_len);
    for cy in 0..height / 2 {
        for cx in 0..chroma_width {
            let (mut sum_u, mut sum_v) = (0.0f32, 0.0f32);
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let [r, g, b, _] = image.get_pixel((2 * cx + dx) as u32, (2 * cy + dy) as u32).0.map(f32::from);
                sum_u += -0.169 * r - 0.331 * g + 0.5 * b + 128.0;
                sum_v += 0.5 * r - 0.419 * g - 0.081 * b + 128.0;
            }
            u_plane[cy * chroma_width + cx] = (sum_u / 4.0).round().clamp(0.0, 255.0) as u8;
            v_plane[cy * chroma_width + cx] = (sum_v / 4.0).round().clamp(0.0, 255.0) as u8;
        }
    }
    yuv
}
