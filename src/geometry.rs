//! Rotation and image-fit math.
//!
//! The watermark surface is rotated by the watermark angle before anything is
//! drawn. A point given in page coordinates must therefore be mapped through the
//! inverse rotation, which for an orthonormal matrix is its transpose.

use std::hash::{Hash, Hasher};

/// Width and height of a page media box, in points.
///
/// Equality and hashing are bitwise so sizes can key a render cache.
#[derive(Debug, Clone, Copy)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn bits(&self) -> (u64, u64) {
        // +0.0 and -0.0 are the same page size
        ((self.width + 0.0).to_bits(), (self.height + 0.0).to_bits())
    }
}

impl PartialEq for PageSize {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for PageSize {}

impl Hash for PageSize {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// 2x2 rotation matrix, row major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix {
    m: [[f64; 2]; 2],
}

impl RotationMatrix {
    pub fn new(angle_degrees: f64) -> Self {
        let theta = angle_degrees.to_radians();
        let (s, c) = theta.sin_cos();
        Self {
            m: [[c, -s], [s, c]],
        }
    }

    pub fn cos(&self) -> f64 {
        self.m[0][0]
    }

    pub fn sin(&self) -> f64 {
        self.m[1][0]
    }

    /// R * [x, y]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m[0][0] * x + self.m[0][1] * y,
            self.m[1][0] * x + self.m[1][1] * y,
        )
    }

    /// R^T * [x, y]
    pub fn apply_transposed(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m[0][0] * x + self.m[1][0] * y,
            self.m[0][1] * x + self.m[1][1] * y,
        )
    }
}

/// Coordinates to draw at on a surface rotated by `rotation`, so that the
/// result lands on `(x, y)` of the unrotated page.
pub fn change_base(x: f64, y: f64, rotation: &RotationMatrix) -> (f64, f64) {
    rotation.apply_transposed(x, y)
}

/// Shrink `(width, height)` into `(max_width, max_height)` keeping the aspect
/// ratio, then multiply by `scale`.
///
/// Width is capped first, then height. The fit never enlarges; `scale` may.
/// Source dimensions must be positive.
pub fn fit_image(
    width: f64,
    height: f64,
    max_width: f64,
    max_height: f64,
    scale: f64,
) -> (f64, f64) {
    let (mut w, mut h) = (width, height);

    if w > max_width {
        let ratio = max_width / w;
        w = max_width;
        h *= ratio;
    }
    if h > max_height {
        let ratio = max_height / h;
        h = max_height;
        w *= ratio;
    }

    (w * scale, h * scale)
}
