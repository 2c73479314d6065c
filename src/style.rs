use palette::{named, Srgb};

// ---------------------------------------------------------------------------
// Plot-style presets
// ---------------------------------------------------------------------------

/// An immutable plot-style preset: figure resolution, annotation colors and
/// the color cycle assigned to successive series.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    /// Figure resolution in dots per inch.
    pub dpi: u32,
    /// Color of axes, ticks, labels and titles.
    pub foreground: Srgb<u8>,
    /// Figure and axes background; `None` means transparent.
    pub background: Option<Srgb<u8>>,
    /// Legend face color.
    pub legend_face: Srgb<u8>,
    /// Legend face opacity in `0.0..=1.0`.
    pub legend_alpha: f32,
    /// Colors assigned to successive series.
    pub color_cycle: Vec<Srgb<u8>>,
}

impl PlotStyle {
    /// Color for the `i`-th series, wrapping around the cycle.
    pub fn series_color(&self, i: usize) -> Srgb<u8> {
        self.color_cycle[i % self.color_cycle.len()]
    }
}

/// Preset for slides: white annotations on a transparent background.
pub fn presentation() -> PlotStyle {
    PlotStyle {
        dpi: 200,
        foreground: named::WHITE,
        background: None,
        legend_face: named::WHITE,
        legend_alpha: 0.2,
        color_cycle: vec![
            named::DEEPSKYBLUE,
            named::ORANGE,
            named::YELLOWGREEN,
            named::TOMATO,
            named::ORCHID,
            named::WHITE,
        ],
    }
}

/// Preset for print: high resolution, dark annotations on white.
pub fn publication() -> PlotStyle {
    PlotStyle {
        dpi: 300,
        foreground: named::BLACK,
        background: Some(named::WHITE),
        legend_face: named::WHITE,
        legend_alpha: 1.0,
        color_cycle: default_cycle(),
    }
}

/// Preset for interactive screen use.
pub fn screen() -> PlotStyle {
    PlotStyle {
        dpi: 100,
        foreground: named::BLACK,
        background: Some(named::WHITE),
        legend_face: named::WHITE,
        legend_alpha: 1.0,
        color_cycle: default_cycle(),
    }
}

/// The default six-color cycle: the matplotlib tab colors plus black.
fn default_cycle() -> Vec<Srgb<u8>> {
    vec![
        Srgb::new(0x1f, 0x77, 0xb4),
        Srgb::new(0xff, 0x7f, 0x0e),
        Srgb::new(0x2c, 0xa0, 0x2c),
        Srgb::new(0xd6, 0x27, 0x28),
        Srgb::new(0x94, 0x67, 0xbd),
        Srgb::new(0x00, 0x00, 0x00),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_have_six_color_cycles() {
        for style in [presentation(), publication(), screen()] {
            assert_eq!(style.color_cycle.len(), 6);
        }
    }

    #[test]
    fn presentation_is_transparent_white_on_dark() {
        let style = presentation();
        assert_eq!(style.dpi, 200);
        assert_eq!(style.foreground, named::WHITE);
        assert!(style.background.is_none());
        assert!((style.legend_alpha - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn series_color_wraps_around_the_cycle() {
        let style = screen();
        assert_eq!(style.series_color(0), style.series_color(6));
        assert_eq!(style.series_color(1), Srgb::new(0xff, 0x7f, 0x0e));
    }
}
