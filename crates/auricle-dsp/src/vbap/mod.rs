//! VBAP gain tables: triangulation, dense direction grid, spread (MDAP).
//!
//! A [`GainTable`] maps a quantized azimuth/elevation grid to per-speaker
//! gain vectors. Rows are energy-normalized; the per-band amplitude/energy
//! blend is applied at lookup time by the engine (see
//! [`crate::normalization`]). Tables are immutable once built and shared
//! read-only; rebuilding happens only during a reconfiguration pass.

mod hull;

pub use hull::{enclosing_gains, triangulate, Triangle};

use crate::error::{Error, Result};
use crate::rotation::unit_vector;

/// Elevation magnitude below which a layout counts as two-dimensional.
const ELEVATION_2D_THRESHOLD_DEG: f32 = 1e-4;

/// Negative raw gains smaller than this are clipped to zero (direction on a
/// triangle edge or vertex).
const GAIN_CLIP: f32 = 0.0;

/// Layout dimensionality as detected (or forced) at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Dimensionality {
    /// Horizontal-only layout, lifted to 3-D with two virtual pole speakers.
    TwoD,
    ThreeD,
}

/// Build options for a gain table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableOptions {
    /// Azimuth/elevation grid step in degrees, in (0, 90].
    pub resolution_deg: f32,
    /// MDAP spread angle in degrees; 0 disables spreading.
    pub spread_deg: f32,
    /// Treat the layout as 3-D even when all elevations are zero.
    pub force_3d: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            resolution_deg: 2.0,
            spread_deg: 0.0,
            force_3d: false,
        }
    }
}

/// Dense mapping from quantized directions to energy-normalized per-speaker
/// gain vectors.
#[derive(Debug, Clone)]
pub struct GainTable {
    resolution_deg: f32,
    n_az: usize,
    n_el: usize,
    num_speakers: usize,
    num_triangles: usize,
    dims: Dimensionality,
    /// Row-major: `n_az * n_el` rows of `num_speakers` gains.
    gains: Vec<f32>,
}

impl GainTable {
    /// Build a table for a loudspeaker layout given as (azimuth, elevation)
    /// degree pairs. `progress` receives (value in [0,1], phase label)
    /// callbacks during the build.
    pub fn build(
        speaker_dirs_deg: &[(f32, f32)],
        opts: &TableOptions,
        mut progress: impl FnMut(f32, &str),
    ) -> Result<Self> {
        let num_speakers = speaker_dirs_deg.len();
        if !(opts.resolution_deg > 0.0 && opts.resolution_deg <= 90.0) {
            return Err(Error::GridResolution(opts.resolution_deg));
        }
        if num_speakers < 2 {
            return Err(Error::DegenerateLayout(format!(
                "{num_speakers} loudspeaker(s), need at least 2"
            )));
        }

        progress(0.05, "Preparing loudspeaker layout");
        let is_3d = opts.force_3d
            || speaker_dirs_deg
                .iter()
                .any(|&(_, el)| el.abs() > ELEVATION_2D_THRESHOLD_DEG);
        let dims = if is_3d {
            Dimensionality::ThreeD
        } else {
            Dimensionality::TwoD
        };
        if is_3d && num_speakers < 3 {
            return Err(Error::DegenerateLayout(format!(
                "3-D layout with {num_speakers} loudspeakers, need at least 3"
            )));
        }

        // 2-D layouts are lifted to 3-D with two virtual pole speakers so a
        // single solver covers both cases; the virtual columns are stripped
        // from each row after the solve.
        let mut dirs: Vec<[f32; 3]> = match dims {
            Dimensionality::ThreeD => speaker_dirs_deg
                .iter()
                .map(|&(az, el)| unit_vector(az, el))
                .collect(),
            Dimensionality::TwoD => {
                let mut d: Vec<[f32; 3]> = speaker_dirs_deg
                    .iter()
                    .map(|&(az, _)| unit_vector(az, 0.0))
                    .collect();
                d.push([0.0, 0.0, 1.0]);
                d.push([0.0, 0.0, -1.0]);
                d
            }
        };
        // Guard against denormal-length inputs.
        for v in &mut dirs {
            let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            if n > 0.0 {
                v.iter_mut().for_each(|c| *c /= n);
            }
        }
        let solve_speakers = dirs.len();

        progress(0.1, "Computing triangulation");
        let triangles = triangulate(&dirs)?;

        let resolution_deg = opts.resolution_deg;
        let n_az = (360.0 / resolution_deg).round().max(1.0) as usize;
        let n_el = (180.0 / resolution_deg).round() as usize + 1;

        let mut gains = vec![0.0f32; n_az * n_el * num_speakers];
        let mut row = vec![0.0f32; solve_speakers];
        for el_idx in 0..n_el {
            let el = -90.0 + el_idx as f32 * resolution_deg;
            if el_idx % 8 == 0 {
                progress(
                    0.15 + 0.8 * el_idx as f32 / n_el as f32,
                    "Building VBAP gain table",
                );
            }
            for az_idx in 0..n_az {
                let az = -180.0 + az_idx as f32 * resolution_deg;
                solve_gain_vector(&triangles, az, el, opts.spread_deg, &mut row);
                let out =
                    &mut gains[(el_idx * n_az + az_idx) * num_speakers..][..num_speakers];
                // Strip virtual pole columns (2-D) and energy-normalize what
                // remains; pole energy is deliberately discarded.
                out.copy_from_slice(&row[..num_speakers]);
                let energy: f32 = out.iter().map(|g| g * g).sum();
                if energy > 1e-12 {
                    let inv = 1.0 / energy.sqrt();
                    out.iter_mut().for_each(|g| *g *= inv);
                }
            }
        }
        progress(0.95, "Gain table built");

        Ok(Self {
            resolution_deg,
            n_az,
            n_el,
            num_speakers,
            num_triangles: triangles.len(),
            dims,
            gains,
        })
    }

    #[inline]
    pub fn num_speakers(&self) -> usize {
        self.num_speakers
    }

    #[inline]
    pub fn num_directions(&self) -> usize {
        self.n_az * self.n_el
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.num_triangles
    }

    #[inline]
    pub fn dimensionality(&self) -> Dimensionality {
        self.dims
    }

    #[inline]
    pub fn resolution_deg(&self) -> f32 {
        self.resolution_deg
    }

    /// Nearest-grid-point gain row for a direction in degrees.
    pub fn lookup(&self, azimuth_deg: f32, elevation_deg: f32) -> &[f32] {
        let mut az = azimuth_deg.rem_euclid(360.0);
        if az >= 180.0 {
            az -= 360.0;
        }
        let el = elevation_deg.clamp(-90.0, 90.0);

        let az_idx = (((az + 180.0) / self.resolution_deg).round() as usize) % self.n_az;
        let el_idx = (((el + 90.0) / self.resolution_deg).round() as usize).min(self.n_el - 1);
        &self.gains[(el_idx * self.n_az + az_idx) * self.num_speakers..][..self.num_speakers]
    }

    /// Iterate over all grid rows (test and introspection helper).
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.gains.chunks(self.num_speakers)
    }
}

/// Raw gain vector for one grid direction, spread included, clipped to
/// non-negative, energy-normalized over `row.len()` speakers (virtual poles
/// included at this stage).
fn solve_gain_vector(
    triangles: &[Triangle],
    azimuth_deg: f32,
    elevation_deg: f32,
    spread_deg: f32,
    row: &mut [f32],
) {
    row.iter_mut().for_each(|g| *g = 0.0);
    let primary = unit_vector(azimuth_deg, elevation_deg);

    let mut accumulate = |u: [f32; 3]| {
        let (tri, g) = enclosing_gains(triangles, u);
        for (slot, &speaker) in tri.vertices.iter().enumerate() {
            row[speaker] += g[slot].max(GAIN_CLIP);
        }
    };

    accumulate(primary);
    if spread_deg > 0.0 {
        for dir in spread_directions(primary, spread_deg) {
            accumulate(dir);
        }
    }

    let energy: f32 = row.iter().map(|g| g * g).sum();
    if energy > 1e-12 {
        let inv = 1.0 / energy.sqrt();
        row.iter_mut().for_each(|g| *g *= inv);
    }
}

/// Directions approximating a spherical cap of half-angle `spread/2` around
/// the primary direction: an inner ring of 4 and an outer ring of 8 offsets.
fn spread_directions(primary: [f32; 3], spread_deg: f32) -> Vec<[f32; 3]> {
    // Tangent basis at the primary direction.
    let up = if primary[2].abs() > 0.99 {
        [1.0, 0.0, 0.0]
    } else {
        [0.0, 0.0, 1.0]
    };
    let mut t1 = [
        primary[1] * up[2] - primary[2] * up[1],
        primary[2] * up[0] - primary[0] * up[2],
        primary[0] * up[1] - primary[1] * up[0],
    ];
    let n = (t1[0] * t1[0] + t1[1] * t1[1] + t1[2] * t1[2]).sqrt();
    t1.iter_mut().for_each(|c| *c /= n);
    let t2 = [
        primary[1] * t1[2] - primary[2] * t1[1],
        primary[2] * t1[0] - primary[0] * t1[2],
        primary[0] * t1[1] - primary[1] * t1[0],
    ];

    let mut dirs = Vec::with_capacity(12);
    for &(radius_deg, count) in &[(spread_deg * 0.25, 4usize), (spread_deg * 0.5, 8usize)] {
        let r = radius_deg.to_radians();
        let (sr, cr) = (r.sin(), r.cos());
        for step in 0..count {
            let phi = 2.0 * std::f32::consts::PI * step as f32 / count as f32;
            let (sp, cp) = phi.sin_cos();
            dirs.push([
                primary[0] * cr + (t1[0] * cp + t2[0] * sp) * sr,
                primary[1] * cr + (t1[1] * cp + t2[1] * sp) * sr,
                primary[2] * cr + (t1[2] * cp + t2[2] * sp) * sr,
            ]);
        }
    }
    dirs
}
