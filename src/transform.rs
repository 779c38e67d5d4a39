/// A 2D affine transform `(a, b, c, d, e, f)` mapping pixel `(col, row)` to world `(x, y)`:
///
/// ```text
/// x = a*col + b*row + c
/// y = d*col + e*row + f
/// ```
///
/// This is the row-major layout used throughout the spec (§4.C `transform`, §4.D `Translation`,
/// `Scale`). Composition follows the usual "apply the right-hand side first" convention: `t1 *
/// t2` applied to a point is `t1.apply(t2.apply(point))`.
use std::ops::Mul;

use crate::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Affine {
        Affine { a, b, c, d, e, f }
    }

    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    pub fn translation(tx: f64, ty: f64) -> Affine {
        Affine::new(1.0, 0.0, tx, 0.0, 1.0, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Affine {
        Affine::new(sx, 0.0, 0.0, 0.0, sy, 0.0)
    }

    /// Apply this transform to a pixel-space point, yielding a world-space point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }

    fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    pub fn inverse(&self) -> Result<Affine, Error> {
        let det = self.determinant();
        if det.abs() < 1e-18 {
            return Err(Error::OtherError(
                "affine transform is not invertible".to_string(),
            ));
        }
        let inv_det = 1.0 / det;
        let a = self.e * inv_det;
        let b = -self.b * inv_det;
        let d = -self.d * inv_det;
        let e = self.a * inv_det;
        let c = -(a * self.c + b * self.f);
        let f = -(d * self.c + e * self.f);
        Ok(Affine::new(a, b, c, d, e, f))
    }

    /// `(sqrt(a^2 + d^2), sqrt(b^2 + e^2))` - ground resolution along each pixel axis, valid for
    /// rotated transforms too (spec 4.C `res`).
    pub fn res(&self) -> (f64, f64) {
        (
            (self.a * self.a + self.d * self.d).sqrt(),
            (self.b * self.b + self.e * self.e).sqrt(),
        )
    }

    pub fn approx_eq(&self, other: &Affine, epsilon: f64) -> bool {
        (self.a - other.a).abs() < epsilon
            && (self.b - other.b).abs() < epsilon
            && (self.c - other.c).abs() < epsilon
            && (self.d - other.d).abs() < epsilon
            && (self.e - other.e).abs() < epsilon
            && (self.f - other.f).abs() < epsilon
    }
}

impl Mul for Affine {
    type Output = Affine;

    /// `self * rhs`: treat both as 3x3 homogeneous matrices `[[a,b,c],[d,e,f],[0,0,1]]` and
    /// multiply. Applying the result to a point is equivalent to applying `rhs` first, then
    /// `self`.
    fn mul(self, rhs: Affine) -> Affine {
        Affine::new(
            self.a * rhs.a + self.b * rhs.d,
            self.a * rhs.b + self.b * rhs.e,
            self.a * rhs.c + self.b * rhs.f + self.c,
            self.d * rhs.a + self.e * rhs.d,
            self.d * rhs.b + self.e * rhs.e,
            self.d * rhs.c + self.e * rhs.f + self.f,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_then_scale_round_trip() {
        let t = Affine::scale(2.0, -2.0) * Affine::translation(10.0, 20.0);
        let (x, y) = t.apply(1.0, 1.0);
        // translation first: (11, 21), then scale: (22, -42)
        assert_eq!((x, y), (22.0, -42.0));
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = Affine::new(2.0, 0.0, 5.0, 0.0, -3.0, 7.0);
        let inv = t.inverse().unwrap();
        let (x, y) = t.apply(4.0, 6.0);
        let (col, row) = inv.apply(x, y);
        assert!((col - 4.0).abs() < 1e-9);
        assert!((row - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_res_for_axis_aligned() {
        let t = Affine::new(0.5, 0.0, 0.0, 0.0, -0.5, 0.0);
        assert_eq!(t.res(), (0.5, 0.5));
    }
}
