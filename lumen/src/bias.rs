//! Fabrication bias.
//!
//! Etch and lithography processes widen or narrow drawn features by a
//! process-dependent amount. Biased component variants pre-compensate by
//! applying a [`Bias`] to widths and gaps before layout generation. Applying
//! a bias changes dimensions only; the port topology of the biased variant
//! is identical to the unbiased one.

use serde::{Deserialize, Serialize};

/// A fabrication bias, in micrometers.
///
/// `width` is added to drawn widths; `gap` is added to drawn gaps. For a
/// uniform over-etch the two are usually equal and opposite, since widening
/// each of two adjacent features narrows the gap between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bias {
    pub width: f64,
    pub gap: f64,
}

impl Default for Bias {
    fn default() -> Self {
        Self {
            width: 0.02,
            gap: -0.02,
        }
    }
}

impl Bias {
    /// A zero bias, leaving dimensions unchanged.
    pub fn none() -> Self {
        Self {
            width: 0.0,
            gap: 0.0,
        }
    }

    /// Applies the width bias to a drawn width, in micrometers.
    pub fn width(&self, width_um: f64) -> f64 {
        width_um + self.width
    }

    /// Applies the gap bias to a drawn gap, in micrometers.
    pub fn gap(&self, gap_um: f64) -> f64 {
        gap_um + self.gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bias_conserves_pitch() {
        let bias = Bias::default();
        let width = 0.5;
        let gap = 0.2;
        let pitch = width + gap;
        assert!((bias.width(width) + bias.gap(gap) - pitch).abs() < 1e-12);
    }

    #[test]
    fn none_is_identity() {
        let bias = Bias::none();
        assert_eq!(bias.width(0.45), 0.45);
        assert_eq!(bias.gap(0.3), 0.3);
    }
}
