//! Small fixed-dimension vector/matrix helpers and a bounded root search.
//!
//! Vectors are plain `[f64; DIM]`; everything here is a free inline
//! function so the collision algebra reads close to the equations.

use crate::core::particle::DIM;

/// A real vector in the simulation's fixed spatial dimension.
pub type Vec3 = [f64; DIM];

/// The zero vector.
pub const ZERO: Vec3 = [0.0; DIM];

#[inline]
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm_sq(a: &Vec3) -> f64 {
    dot(a, a)
}

#[inline]
pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    let mut out = ZERO;
    for (k, o) in out.iter_mut().enumerate() {
        *o = a[k] - b[k];
    }
    out
}

#[inline]
pub fn scale(a: &Vec3, s: f64) -> Vec3 {
    let mut out = *a;
    out.iter_mut().for_each(|x| *x *= s);
    out
}

/// `a += s * b`, in place.
#[inline]
pub fn add_scaled(a: &mut Vec3, b: &Vec3, s: f64) {
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x += s * y;
    }
}

/// Index of the component with the largest magnitude.
#[inline]
pub fn largest_axis(a: &Vec3) -> usize {
    let mut best = 0usize;
    for k in 1..DIM {
        if a[k].abs() > a[best].abs() {
            best = k;
        }
    }
    best
}

/// A 3x3 rotation matrix for rotated-cube geometry.
///
/// Stored row-major; `apply` maps lab-frame vectors into the body frame,
/// `apply_inverse` maps back (the transpose, since rotations are orthogonal).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation(pub [[f64; DIM]; DIM]);

impl Rotation {
    /// The identity rotation.
    pub const IDENTITY: Rotation = Rotation([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    /// Rotate `v` into the body frame.
    #[inline]
    pub fn apply(&self, v: &Vec3) -> Vec3 {
        let mut out = ZERO;
        for (i, row) in self.0.iter().enumerate() {
            out[i] = dot(row, v);
        }
        out
    }

    /// Rotate `v` back into the lab frame (transpose application).
    #[inline]
    pub fn apply_inverse(&self, v: &Vec3) -> Vec3 {
        let mut out = ZERO;
        for (i, o) in out.iter_mut().enumerate() {
            for (j, row) in self.0.iter().enumerate() {
                *o += row[i] * v[j];
            }
        }
        out
    }
}

/// Bounded bracketed root search: scan `[lo, hi]` in `windows` equal
/// subintervals for a sign change of `f`, then bisect to `tol`.
///
/// Returns `None` if no sign change is found in the bracket. Always
/// terminates: the scan is finite and the bisection runs a fixed number of
/// halvings.
pub fn bracketed_root<F: Fn(f64) -> f64>(f: F, lo: f64, hi: f64, windows: usize, tol: f64) -> Option<f64> {
    if !(lo < hi) || windows == 0 {
        return None;
    }
    let step = (hi - lo) / windows as f64;
    let mut a = lo;
    let mut fa = f(a);
    for w in 1..=windows {
        let b = lo + step * w as f64;
        let fb = f(b);
        if fa == 0.0 {
            return Some(a);
        }
        if fa * fb < 0.0 {
            // Bisect [a, b]
            let (mut x0, mut x1, mut f0) = (a, b, fa);
            for _ in 0..200 {
                let mid = 0.5 * (x0 + x1);
                if x1 - x0 < tol {
                    return Some(mid);
                }
                let fm = f(mid);
                if fm == 0.0 {
                    return Some(mid);
                }
                if f0 * fm < 0.0 {
                    x1 = mid;
                } else {
                    x0 = mid;
                    f0 = fm;
                }
            }
            return Some(0.5 * (x0 + x1));
        }
        a = b;
        fa = fb;
    }
    None
}
