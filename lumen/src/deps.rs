//! Re-exports of dependencies used in public APIs.

pub use arcstr;
pub use gds21;
pub use lumgeom;
