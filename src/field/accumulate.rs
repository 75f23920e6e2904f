use bytemuck::Pod;
use nalgebra::SMatrix;

/// Payloads a stencil combine can sum into.
pub trait Accumulate: Pod + Send + Sync {
    /// `self += weight * value`
    fn scaled_add(&mut self, weight: f64, value: &Self);
}

impl Accumulate for f64 {
    #[inline]
    fn scaled_add(&mut self, weight: f64, value: &Self) {
        *self += weight * value;
    }
}

impl Accumulate for f32 {
    #[inline]
    fn scaled_add(&mut self, weight: f64, value: &Self) {
        *self += weight as f32 * value;
    }
}

impl<const R: usize, const C: usize> Accumulate for SMatrix<f64, R, C> {
    #[inline]
    fn scaled_add(&mut self, weight: f64, value: &Self) {
        *self += *value * weight;
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use nalgebra::{matrix, vector};

    #[test]
    fn scalar_test() {
        let mut a = 1.0f64;
        a.scaled_add(-2.0, &3.0);
        assert_approx_eq!(f64, a, -5.0);

        let mut b = 1.0f32;
        b.scaled_add(0.5, &4.0);
        assert_approx_eq!(f32, b, 3.0);
    }

    #[test]
    fn matrix_test() {
        let mut m = matrix![1.0, 2.0; 3.0, 4.0];
        m.scaled_add(2.0, &matrix![1.0, 0.0; 0.0, 1.0]);
        assert_eq!(m, matrix![3.0, 2.0; 3.0, 6.0]);

        let mut v = vector![1.0, 1.0, 1.0];
        v.scaled_add(-1.0, &vector![1.0, 2.0, 3.0]);
        assert_eq!(v, vector![0.0, -1.0, -2.0]);
    }
}
