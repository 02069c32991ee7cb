//! CPU raster surface shared by the base map and the track layer.
//!
//! Pixels are straight-alpha RGBA8, row-major, origin top-left, so the buffer
//! can be handed to a `bevy::image::Image` as is. Text is not rasterized here:
//! `fill_text` records a positioned label which the display systems turn into
//! `Text2d` entities.

/// Straight-alpha color with channels in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a,
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Text drawn on a canvas, anchored at its horizontal center and baseline.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Rgba,
}

pub struct PixelCanvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
    labels: Vec<TextLabel>,
    revision: u64,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
            labels: Vec::new(),
            revision: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn labels(&self) -> &[TextLabel] {
        &self.labels
    }

    /// Bumped on every mutation; display systems compare it to skip uploads.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let i = self.index(x as i64, y as i64);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Reset every pixel to transparent and drop all labels.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.labels.clear();
        self.revision += 1;
    }

    /// Fill the area enclosed by `rings` using the even-odd rule, so holes
    /// cut out of their exterior ring.
    pub fn fill_polygon(&mut self, rings: &[Vec<(f64, f64)>], color: Rgba) {
        let edges: Vec<((f64, f64), (f64, f64))> = rings
            .iter()
            .filter(|r| r.len() >= 3)
            .flat_map(|r| {
                let closing = (r[r.len() - 1], r[0]);
                r.windows(2).map(|w| (w[0], w[1])).chain(std::iter::once(closing))
            })
            .collect();
        if edges.is_empty() {
            return;
        }

        let (min_y, max_y) = edges.iter().fold((f64::MAX, f64::MIN), |(lo, hi), (a, b)| {
            (lo.min(a.1).min(b.1), hi.max(a.1).max(b.1))
        });
        let row_start = min_y.floor().max(0.0) as i64;
        let row_end = (max_y.ceil() as i64).min(self.height as i64 - 1);

        let mut crossings: Vec<f64> = Vec::new();
        for row in row_start..=row_end {
            let yc = row as f64 + 0.5;
            crossings.clear();
            for &(a, b) in &edges {
                if (a.1 <= yc && yc < b.1) || (b.1 <= yc && yc < a.1) {
                    let t = (yc - a.1) / (b.1 - a.1);
                    crossings.push(a.0 + t * (b.0 - a.0));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil().max(0.0) as i64;
                let end = ((span[1] - 0.5).ceil() as i64).min(self.width as i64);
                for col in start..end {
                    self.blend(col, row, color, 1.0);
                }
            }
        }
        self.revision += 1;
    }

    /// Stroke an open polyline. Sub-pixel widths reduce coverage instead of
    /// thinning the line; each pixel is touched once per call.
    pub fn stroke_polyline(&mut self, points: &[(f64, f64)], color: Rgba, width: f32) {
        if points.len() < 2 {
            return;
        }
        let coverage = width.clamp(0.0, 1.0);
        let radius = (width as f64 / 2.0).max(0.5);
        let mut touched: std::collections::HashSet<(i64, i64)> = std::collections::HashSet::new();

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let length = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
            let steps = (length * 2.0).ceil().max(1.0) as usize;
            for i in 0..=steps {
                let t = i as f64 / steps as f64;
                let x = a.0 + t * (b.0 - a.0);
                let y = a.1 + t * (b.1 - a.1);
                self.footprint(x, y, radius, |px| {
                    touched.insert(px);
                });
            }
        }
        for (x, y) in touched {
            self.blend(x, y, color, coverage);
        }
        self.revision += 1;
    }

    /// Solid disc centered on `(cx, cy)`.
    pub fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba) {
        let mut pixels = Vec::new();
        self.footprint(cx, cy, radius, |px| pixels.push(px));
        for (x, y) in pixels {
            self.blend(x, y, color, 1.0);
        }
        self.revision += 1;
    }

    pub fn fill_text(&mut self, label: TextLabel) {
        self.labels.push(label);
        self.revision += 1;
    }

    /// Pixels whose centers fall within `radius` of `(cx, cy)`.
    fn footprint(&self, cx: f64, cy: f64, radius: f64, mut visit: impl FnMut((i64, i64))) {
        let x0 = (cx - radius).floor() as i64;
        let x1 = (cx + radius).ceil() as i64;
        let y0 = (cy - radius).floor() as i64;
        let y1 = (cy + radius).ceil() as i64;
        for y in y0.max(0)..=y1.min(self.height as i64 - 1) {
            for x in x0.max(0)..=x1.min(self.width as i64 - 1) {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= radius * radius {
                    visit((x, y));
                }
            }
        }
    }

    fn index(&self, x: i64, y: i64) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }

    /// Source-over compositing in straight alpha.
    fn blend(&mut self, x: i64, y: i64, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let src_a = (color.a * coverage).clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }
        let i = self.index(x, y);
        let dst = &mut self.data[i..i + 4];
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            return;
        }
        for (channel, src) in [color.r, color.g, color.b].into_iter().enumerate() {
            let d = dst[channel] as f32 / 255.0;
            let value = (src * src_a + d * dst_a * (1.0 - src_a)) / out_a;
            dst[channel] = (value * 255.0).round() as u8;
        }
        dst[3] = (out_a * 255.0).round() as u8;
    }
}
