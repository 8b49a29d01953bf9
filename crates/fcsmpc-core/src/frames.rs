//! Reference-frame helpers (abc, alpha-beta, dq).
//!
//! All transforms use the amplitude-invariant reduced Clarke transformation; the
//! common-mode component is dropped.

use nalgebra::{Matrix2, Matrix2x3, Vector2};

const SQRT3_2: f64 = 0.866_025_403_784_438_6;

/// Reduced Clarke transformation matrix `K` (2 x 3).
pub fn clarke_matrix() -> Matrix2x3<f64> {
    Matrix2x3::new(1.0, -0.5, -0.5, 0.0, SQRT3_2, -SQRT3_2) * (2.0 / 3.0)
}

/// abc quantity to alpha-beta.
pub fn abc_to_alpha_beta(abc: [f64; 3]) -> Vector2<f64> {
    Vector2::new(
        (2.0 / 3.0) * (abc[0] - 0.5 * abc[1] - 0.5 * abc[2]),
        (2.0 / 3.0) * SQRT3_2 * (abc[1] - abc[2]),
    )
}

/// alpha-beta quantity to abc.
pub fn alpha_beta_to_abc(ab: &Vector2<f64>) -> [f64; 3] {
    [
        ab.x,
        -0.5 * ab.x + SQRT3_2 * ab.y,
        -0.5 * ab.x - SQRT3_2 * ab.y,
    ]
}

/// Counter-clockwise rotation by `theta` radians.
pub fn rotation(theta: f64) -> Matrix2<f64> {
    let (sin, cos) = theta.sin_cos();
    Matrix2::new(cos, -sin, sin, cos)
}

/// dq quantity to alpha-beta for a frame at angle `theta`.
pub fn dq_to_alpha_beta(dq: &Vector2<f64>, theta: f64) -> Vector2<f64> {
    rotation(theta) * dq
}

/// alpha-beta quantity to dq for a frame at angle `theta`.
pub fn alpha_beta_to_dq(ab: &Vector2<f64>, theta: f64) -> Vector2<f64> {
    rotation(-theta) * ab
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn clarke_matches_matrix() {
        let abc = [1.0, -0.25, 0.4];
        let direct = abc_to_alpha_beta(abc);
        let via_matrix = clarke_matrix() * nalgebra::Vector3::new(abc[0], abc[1], abc[2]);
        assert!((direct - via_matrix).norm() < 1e-12);
    }

    #[test]
    fn balanced_abc_roundtrip() {
        let abc = [1.0, -0.5, -0.5];
        let ab = abc_to_alpha_beta(abc);
        assert!((ab.x - 1.0).abs() < 1e-12);
        assert!(ab.y.abs() < 1e-12);

        let back = alpha_beta_to_abc(&ab);
        for (x, y) in back.iter().zip(abc.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn dq_rotation() {
        let dq = Vector2::new(1.0, 0.0);
        let ab = dq_to_alpha_beta(&dq, FRAC_PI_2);
        assert!(ab.x.abs() < 1e-12);
        assert!((ab.y - 1.0).abs() < 1e-12);
        assert!((alpha_beta_to_dq(&ab, FRAC_PI_2) - dq).norm() < 1e-12);
    }
}
