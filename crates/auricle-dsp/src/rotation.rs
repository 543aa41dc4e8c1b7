//! Direction math: spherical/Cartesian conversion and listener rotation.
//!
//! Azimuth is measured counter-clockwise from the front (+x axis), elevation
//! upwards from the horizontal plane, both in degrees. Rotation is a lens on
//! the stored source directions: the raw directions are never mutated,
//! rotated copies are derived per block as needed.

/// Convert an azimuth/elevation pair in degrees to a unit Cartesian vector.
#[inline]
pub fn unit_vector(azimuth_deg: f32, elevation_deg: f32) -> [f32; 3] {
    let az = azimuth_deg.to_radians();
    let el = elevation_deg.to_radians();
    [el.cos() * az.cos(), el.cos() * az.sin(), el.sin()]
}

/// Convert a Cartesian vector back to azimuth/elevation degrees.
///
/// The vector need not be unit length; a zero vector maps to (0, 0).
#[inline]
pub fn to_azimuth_elevation(v: [f32; 3]) -> (f32, f32) {
    let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if norm < 1e-9 {
        return (0.0, 0.0);
    }
    let az = v[1].atan2(v[0]).to_degrees();
    let el = (v[2] / norm).clamp(-1.0, 1.0).asin().to_degrees();
    (az, el)
}

/// Listener orientation: yaw/pitch/roll in degrees with per-angle sign flips.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub roll_deg: f32,
    pub flip_yaw: bool,
    pub flip_pitch: bool,
    pub flip_roll: bool,
}

impl Orientation {
    /// Composed rotation matrix, applied yaw first, then pitch, then roll
    /// (Rz · Ry · Rx on column vectors).
    pub fn matrix(&self) -> [[f32; 3]; 3] {
        let yaw = if self.flip_yaw { -self.yaw_deg } else { self.yaw_deg }.to_radians();
        let pitch = if self.flip_pitch { -self.pitch_deg } else { self.pitch_deg }.to_radians();
        let roll = if self.flip_roll { -self.roll_deg } else { self.roll_deg }.to_radians();

        let (sy, cy) = yaw.sin_cos();
        let (sp, cp) = pitch.sin_cos();
        let (sr, cr) = roll.sin_cos();

        // Rz(yaw) * Ry(pitch) * Rx(roll)
        [
            [cy * cp, cy * sp * sr - sy * cr, cy * sp * cr + sy * sr],
            [sy * cp, sy * sp * sr + cy * cr, sy * sp * cr - cy * sr],
            [-sp, cp * sr, cp * cr],
        ]
    }
}

/// Apply a 3x3 rotation matrix to a vector.
#[inline]
pub fn rotate(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Identity rotation.
pub const IDENTITY: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_vector_front() {
        let v = unit_vector(0.0, 0.0);
        assert_relative_eq!(v[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(v[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(v[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_spherical_roundtrip() {
        for &(az, el) in &[(0.0f32, 0.0f32), (90.0, 0.0), (-45.0, 30.0), (170.0, -60.0)] {
            let (az2, el2) = to_azimuth_elevation(unit_vector(az, el));
            assert_relative_eq!(az, az2, epsilon = 1e-3);
            assert_relative_eq!(el, el2, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_yaw_rotates_azimuth() {
        let orient = Orientation {
            yaw_deg: 90.0,
            ..Default::default()
        };
        let m = orient.matrix();
        let (az, el) = to_azimuth_elevation(rotate(&m, unit_vector(0.0, 0.0)));
        assert_relative_eq!(az, 90.0, epsilon = 1e-3);
        assert_relative_eq!(el, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_full_yaw_turn_is_identity() {
        let orient = Orientation {
            yaw_deg: 360.0,
            ..Default::default()
        };
        let m = orient.matrix();
        for &(az, el) in &[(10.0f32, 5.0f32), (-120.0, 45.0), (90.0, -30.0)] {
            let (az2, el2) = to_azimuth_elevation(rotate(&m, unit_vector(az, el)));
            assert_relative_eq!(az, az2, epsilon = 1e-3);
            assert_relative_eq!(el, el2, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_flip_yaw_negates_angle() {
        let plain = Orientation {
            yaw_deg: -30.0,
            ..Default::default()
        };
        let flipped = Orientation {
            yaw_deg: 30.0,
            flip_yaw: true,
            ..Default::default()
        };
        let a = plain.matrix();
        let b = flipped.matrix();
        for (ra, rb) in a.iter().zip(b.iter()) {
            for (x, y) in ra.iter().zip(rb.iter()) {
                assert_relative_eq!(x, y, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_pole_elevation() {
        let (_, el) = to_azimuth_elevation(unit_vector(123.0, 90.0));
        assert_relative_eq!(el, 90.0, epsilon = 1e-3);
    }
}
