//! Convex-hull triangulation of loudspeaker unit vectors.
//!
//! Hull faces are enumerated brute-force: a triple of points is a face when
//! every other point lies on or behind its (outward-oriented) plane. This is
//! O(n^4) but runs only during a gain-table rebuild, where n is the speaker
//! count (<= 64). Triangles whose plane passes through the origin cannot be
//! inverted for panning and are rejected.

use crate::error::{Error, Result};

#[inline]
fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn norm(a: [f32; 3]) -> f32 {
    dot(a, a).sqrt()
}

/// One hull face: three speaker indices plus the inverse of the matrix whose
/// rows are their unit direction vectors.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [usize; 3],
    inv: [[f32; 3]; 3],
}

impl Triangle {
    /// Raw VBAP gains for a unit direction: the solution of `g * L = u`
    /// where the rows of `L` are the triangle's speaker vectors. Negative
    /// components mean the direction lies outside this triangle.
    #[inline]
    pub fn gains(&self, u: [f32; 3]) -> [f32; 3] {
        [
            u[0] * self.inv[0][0] + u[1] * self.inv[1][0] + u[2] * self.inv[2][0],
            u[0] * self.inv[0][1] + u[1] * self.inv[1][1] + u[2] * self.inv[2][1],
            u[0] * self.inv[0][2] + u[1] * self.inv[1][2] + u[2] * self.inv[2][2],
        ]
    }
}

/// Invert the 3x3 matrix with rows `a`, `b`, `c`. `None` when the rows are
/// (near) coplanar with the origin.
fn invert_rows(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Option<[[f32; 3]; 3]> {
    let bc = cross(b, c);
    let det = dot(a, bc);
    if det.abs() < 1e-5 {
        return None;
    }
    let ca = cross(c, a);
    let ab = cross(a, b);
    // Columns of the inverse are the scaled cross products.
    let mut inv = [[0.0f32; 3]; 3];
    for k in 0..3 {
        inv[k][0] = bc[k] / det;
        inv[k][1] = ca[k] / det;
        inv[k][2] = ab[k] / det;
    }
    Some(inv)
}

/// Triangulate a loudspeaker layout given as unit vectors.
///
/// Fails with [`Error::DegenerateLayout`] when no invertible hull face
/// exists (fewer than 3 directions, colinear directions, or a layout that is
/// coplanar with the origin).
pub fn triangulate(dirs: &[[f32; 3]]) -> Result<Vec<Triangle>> {
    let n = dirs.len();
    if n < 3 {
        return Err(Error::DegenerateLayout(format!(
            "{n} direction(s), need at least 3"
        )));
    }

    let mut triangles = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                let (a, b, c) = (dirs[i], dirs[j], dirs[k]);
                let mut normal = cross(sub(b, a), sub(c, a));
                if norm(normal) < 1e-6 {
                    // Colinear triple.
                    continue;
                }
                let mut d = dot(normal, a);
                if d < 0.0 {
                    normal = [-normal[0], -normal[1], -normal[2]];
                    d = -d;
                }

                let mut is_face = true;
                for (m, p) in dirs.iter().enumerate() {
                    if m == i || m == j || m == k {
                        continue;
                    }
                    if dot(normal, *p) - d > 1e-5 {
                        is_face = false;
                        break;
                    }
                }
                if !is_face {
                    continue;
                }

                if let Some(inv) = invert_rows(a, b, c) {
                    triangles.push(Triangle {
                        vertices: [i, j, k],
                        inv,
                    });
                }
            }
        }
    }

    if triangles.is_empty() {
        return Err(Error::DegenerateLayout(
            "no invertible hull triangle (colinear or origin-coplanar directions)".to_owned(),
        ));
    }
    Ok(triangles)
}

/// Find the triangle best enclosing `u` (the one maximising the smallest
/// gain component) and return it with its raw gains.
pub fn enclosing_gains<'a>(triangles: &'a [Triangle], u: [f32; 3]) -> (&'a Triangle, [f32; 3]) {
    let mut best = &triangles[0];
    let mut best_gains = best.gains(u);
    let mut best_min = best_gains[0].min(best_gains[1]).min(best_gains[2]);
    for tri in &triangles[1..] {
        let g = tri.gains(u);
        let min = g[0].min(g[1]).min(g[2]);
        if min > best_min {
            best = tri;
            best_gains = g;
            best_min = min;
        }
    }
    (best, best_gains)
}
