#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn halved(self) -> Self {
        Self::new(self.r / 2, self.g / 2, self.b / 2)
    }

    /// Normalized RGBA for vertex upload.
    pub fn to_rgba_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            1.0,
        ]
    }
}

/// HSV to RGB. `h` in degrees `[0, 360)`, `s` and `v` in `[0, 1]`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if (0.0..60.0).contains(&h) => (c, x, 0.0),
        h if (60.0..120.0).contains(&h) => (x, c, 0.0),
        h if (120.0..180.0).contains(&h) => (0.0, c, x),
        h if (180.0..240.0).contains(&h) => (0.0, x, c),
        h if (240.0..300.0).contains(&h) => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgb::new(
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

/// `(base, tip)` colors for bar `index`: a hue sweep over the bars, with the
/// foot at half brightness.
pub fn bar_colors(index: usize, num_bars: usize) -> (Rgb, Rgb) {
    let hue = index as f32 / num_bars as f32 * 360.0;
    let tip = hsv_to_rgb(hue, 1.0, 1.0);
    (tip.halved(), tip)
}
