//! Instance orientations: rotation angles plus optional vertical reflection.

use serde::{Deserialize, Serialize};

/// Wraps an angle in degrees into the interval `[0, 360)`.
pub fn wrap_angle(angle: f64) -> f64 {
    let mut angle = angle % 360.0;
    if angle < 0.0 {
        angle += 360.0;
    }
    angle
}

/// The orientation of a placed instance: an optional reflection about the
/// x-axis, followed by a counterclockwise rotation.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Orientation {
    /// Whether the instance is reflected about the x-axis before rotating.
    pub reflect_vert: bool,
    /// Counterclockwise rotation angle, in degrees.
    pub angle: f64,
}

impl Orientation {
    /// The identity orientation: no reflection, no rotation.
    #[inline]
    pub fn identity() -> Self {
        Self::default()
    }

    /// An unreflected rotation by `angle` degrees.
    pub fn from_angle(angle: f64) -> Self {
        Self {
            reflect_vert: false,
            angle: wrap_angle(angle),
        }
    }

    /// Returns `true` if this orientation leaves geometry unchanged.
    pub fn is_identity(&self) -> bool {
        !self.reflect_vert && self.angle == 0.0
    }

    /// Composes an additional rotation by `angle` degrees onto this
    /// orientation.
    pub fn rotated(self, angle: f64) -> Self {
        Self {
            reflect_vert: self.reflect_vert,
            angle: wrap_angle(self.angle + angle),
        }
    }

    /// Toggles the reflection of this orientation.
    pub fn reflected_vert(self) -> Self {
        Self {
            reflect_vert: !self.reflect_vert,
            angle: self.angle,
        }
    }

    /// The angle at which a feature locally at angle `local` ends up after
    /// this orientation is applied.
    pub fn apply_to_angle(&self, local: f64) -> f64 {
        if self.reflect_vert {
            wrap_angle(self.angle - local)
        } else {
            wrap_angle(self.angle + local)
        }
    }
}

/// The commonly used rectangular orientations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Named {
    /// No rotation.
    R0,
    /// A 90 degree counterclockwise rotation.
    R90,
    /// A 180 degree rotation.
    R180,
    /// A 270 degree counterclockwise rotation.
    R270,
    /// A reflection about the x-axis.
    ReflectVert,
    /// A reflection about the y-axis.
    ReflectHoriz,
}

impl Named {
    /// All rectangular (90-degree multiple) orientations.
    pub fn all_rectangular() -> [Self; 6] {
        [
            Self::R0,
            Self::R90,
            Self::R180,
            Self::R270,
            Self::ReflectVert,
            Self::ReflectHoriz,
        ]
    }
}

impl From<Named> for Orientation {
    fn from(value: Named) -> Self {
        match value {
            Named::R0 => Orientation {
                reflect_vert: false,
                angle: 0.0,
            },
            Named::R90 => Orientation {
                reflect_vert: false,
                angle: 90.0,
            },
            Named::R180 => Orientation {
                reflect_vert: false,
                angle: 180.0,
            },
            Named::R270 => Orientation {
                reflect_vert: false,
                angle: 270.0,
            },
            Named::ReflectVert => Orientation {
                reflect_vert: true,
                angle: 0.0,
            },
            Named::ReflectHoriz => Orientation {
                reflect_vert: true,
                angle: 180.0,
            },
        }
    }
}

impl From<Orientation> for Option<gds21::GdsStrans> {
    fn from(value: Orientation) -> Self {
        if value.is_identity() {
            return None;
        }
        Some(gds21::GdsStrans {
            reflected: value.reflect_vert,
            angle: if value.angle == 0.0 {
                None
            } else {
                Some(value.angle)
            },
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_angle_range() {
        assert_eq!(wrap_angle(0.0), 0.0);
        assert_eq!(wrap_angle(360.0), 0.0);
        assert_eq!(wrap_angle(-90.0), 270.0);
        assert_eq!(wrap_angle(450.0), 90.0);
    }

    #[test]
    fn apply_to_angle_reflects() {
        let o = Orientation {
            reflect_vert: true,
            angle: 0.0,
        };
        assert_eq!(o.apply_to_angle(90.0), 270.0);

        let o = Orientation::from_angle(90.0);
        assert_eq!(o.apply_to_angle(90.0), 180.0);
    }

    #[test]
    fn composition() {
        let o = Orientation::from_angle(270.0).rotated(180.0);
        assert_eq!(o.angle, 90.0);
        assert!(!o.reflect_vert);
        let o = o.reflected_vert();
        assert!(o.reflect_vert);
        assert!(Orientation::identity().is_identity());
    }

    #[test]
    fn identity_has_no_strans() {
        let strans: Option<gds21::GdsStrans> = Orientation::identity().into();
        assert!(strans.is_none());

        let strans: Option<gds21::GdsStrans> = Orientation::from(Named::R90).into();
        let strans = strans.unwrap();
        assert_eq!(strans.angle, Some(90.0));
        assert!(!strans.reflected);
    }
}
