//! The standard component factories.
//!
//! Primitives ([`straight`], [`bend_circular`], [`taper`], [`rectangle`])
//! draw their own geometry; composites ([`coupler90`], [`mmi2x2`]) place and
//! connect primitive instances by port. All parameters are physical lengths
//! in micrometers; every derived dimension is snapped to the technology grid
//! before anything is drawn.

use lumgeom::Span;

pub mod bend_circular;
pub mod coupler90;
pub mod mmi2x2;
pub mod rectangle;
pub mod straight;
pub mod taper;

/// A span of `width` database units centered on zero.
///
/// Odd widths cannot be centered exactly; the extra unit goes to the
/// positive side.
pub(crate) fn centered_span(width: i64) -> Span {
    Span::new(-(width / 2), width - width / 2)
}
