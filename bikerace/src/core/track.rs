use helpers::general::InputValueError;

/// (px) Space kept free at the right end of the viewport.
pub const FINISH_MARGIN: f64 = 200.0;
/// (px) Viewport width assumed when none is given.
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;

/// Track is the straight the competitors drag along. Displacements and the track length are in
/// on-screen pixels.
/// * `viewport_width` - (px) Width of the area the race is rendered in
/// * `length` - (px) Finish boundary, `viewport_width - FINISH_MARGIN`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub viewport_width: f64,
    pub length: f64,
}

impl Track {
    pub fn from_viewport(viewport_width: f64) -> Result<Track, InputValueError> {
        if !viewport_width.is_finite() || viewport_width <= FINISH_MARGIN {
            return Err(InputValueError::new(format!(
                "viewport width must exceed {}px, got {}",
                FINISH_MARGIN, viewport_width
            )));
        }
        Ok(Track {
            viewport_width,
            length: viewport_width - FINISH_MARGIN,
        })
    }

    /// Fraction of the track covered at the given displacement, capped at 1.
    pub fn lap_frac(&self, displacement: f64) -> f64 {
        (displacement / self.length).clamp(0.0, 1.0)
    }
}

impl Default for Track {
    fn default() -> Self {
        Track {
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            length: DEFAULT_VIEWPORT_WIDTH - FINISH_MARGIN,
        }
    }
}
