//! Canonical source and loudspeaker layout presets.
//!
//! Pure lookup tables: each preset resolves to a list of (azimuth,
//! elevation) pairs in degrees plus a dimensionality hint. Azimuth is
//! counter-clockwise from the front, so positive azimuths sit on the left.

use crate::vbap::Dimensionality;

/// Named loudspeaker (or source) layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutPreset {
    Mono,
    Stereo,
    Quad,
    Surround5_0,
    Surround7_0,
    Octagon,
    Cube,
    /// 7.0 bed plus four height speakers.
    Surround7_0_4,
}

/// A resolved preset: directions, channel count, dimensionality hint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutDescription {
    pub directions: Vec<(f32, f32)>,
    pub dimensionality: Dimensionality,
}

impl LayoutDescription {
    pub fn channel_count(&self) -> usize {
        self.directions.len()
    }
}

impl LayoutPreset {
    /// Direction table for this preset.
    pub fn directions(&self) -> &'static [(f32, f32)] {
        match self {
            LayoutPreset::Mono => &[(0.0, 0.0)],
            LayoutPreset::Stereo => &[(30.0, 0.0), (-30.0, 0.0)],
            LayoutPreset::Quad => &[(45.0, 0.0), (-45.0, 0.0), (135.0, 0.0), (-135.0, 0.0)],
            LayoutPreset::Surround5_0 => &[
                (30.0, 0.0),
                (-30.0, 0.0),
                (0.0, 0.0),
                (110.0, 0.0),
                (-110.0, 0.0),
            ],
            LayoutPreset::Surround7_0 => &[
                (30.0, 0.0),
                (-30.0, 0.0),
                (0.0, 0.0),
                (90.0, 0.0),
                (-90.0, 0.0),
                (145.0, 0.0),
                (-145.0, 0.0),
            ],
            LayoutPreset::Octagon => &[
                (0.0, 0.0),
                (45.0, 0.0),
                (90.0, 0.0),
                (135.0, 0.0),
                (180.0, 0.0),
                (-135.0, 0.0),
                (-90.0, 0.0),
                (-45.0, 0.0),
            ],
            LayoutPreset::Cube => &[
                (45.0, 35.26),
                (-45.0, 35.26),
                (135.0, 35.26),
                (-135.0, 35.26),
                (45.0, -35.26),
                (-45.0, -35.26),
                (135.0, -35.26),
                (-135.0, -35.26),
            ],
            LayoutPreset::Surround7_0_4 => &[
                (30.0, 0.0),
                (-30.0, 0.0),
                (0.0, 0.0),
                (90.0, 0.0),
                (-90.0, 0.0),
                (145.0, 0.0),
                (-145.0, 0.0),
                (45.0, 45.0),
                (-45.0, 45.0),
                (135.0, 45.0),
                (-135.0, 45.0),
            ],
        }
    }

    /// Resolve to a full description with dimensionality estimate.
    pub fn describe(&self) -> LayoutDescription {
        let directions: Vec<(f32, f32)> = self.directions().to_vec();
        let dimensionality = if directions.iter().any(|&(_, el)| el != 0.0) {
            Dimensionality::ThreeD
        } else {
            Dimensionality::TwoD
        };
        LayoutDescription {
            directions,
            dimensionality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_counts() {
        assert_eq!(LayoutPreset::Stereo.describe().channel_count(), 2);
        assert_eq!(LayoutPreset::Surround5_0.describe().channel_count(), 5);
        assert_eq!(LayoutPreset::Surround7_0_4.describe().channel_count(), 11);
    }

    #[test]
    fn test_dimensionality_hints() {
        assert_eq!(
            LayoutPreset::Octagon.describe().dimensionality,
            Dimensionality::TwoD
        );
        assert_eq!(
            LayoutPreset::Cube.describe().dimensionality,
            Dimensionality::ThreeD
        );
        assert_eq!(
            LayoutPreset::Surround7_0_4.describe().dimensionality,
            Dimensionality::ThreeD
        );
    }

    #[test]
    fn test_directions_within_range() {
        for preset in [
            LayoutPreset::Mono,
            LayoutPreset::Stereo,
            LayoutPreset::Quad,
            LayoutPreset::Surround5_0,
            LayoutPreset::Surround7_0,
            LayoutPreset::Octagon,
            LayoutPreset::Cube,
            LayoutPreset::Surround7_0_4,
        ] {
            for &(az, el) in preset.directions() {
                assert!((-180.0..=180.0).contains(&az));
                assert!((-90.0..=90.0).contains(&el));
            }
        }
    }
}
