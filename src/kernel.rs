// kernel.rs — Normalised 2D Gaussian convolution kernel.
//
// One parameter drives everything: the radius r. The kernel is a square
// (2r+1)×(2r+1) matrix whose entries are the separable product of two 1D
// bell curves centred on (r, r), normalised so the matrix sums to 1. A
// normalised kernel preserves overall brightness under convolution.
//
// SIGMA
// ─────
// sigma = r / 2, so the kernel edge sits two standard deviations from the
// centre. r = 0 would give sigma = 0 and a division by zero inside the
// exponent; that case short-circuits to the 1×1 identity kernel [1.0].
//
// Accumulation happens in f64 and the result is stored as f32, which is the
// type the GPU weights buffer holds.

use std::fmt;

/// Unnormalised Gaussian with peak amplitude 1 at `x == mu`.
#[inline]
fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    let a = (x - mu) / sigma;
    (-0.5 * a * a).exp()
}

/// A square, normalised 2D Gaussian weight matrix stored row-major.
#[derive(Clone, PartialEq)]
pub struct Kernel {
    radius: u32,
    side: usize,
    weights: Vec<f32>,
}

impl Kernel {
    /// Build the kernel for `radius`.
    ///
    /// The result has side `2 * radius + 1`, non-negative entries and sums
    /// to 1 (up to f32 rounding). `radius == 0` yields exactly `[1.0]`.
    ///
    /// # Examples
    /// ```
    /// let k = gaussblur::kernel::Kernel::build(2);
    /// assert_eq!(k.side(), 5);
    /// assert!((k.as_slice().iter().sum::<f32>() - 1.0).abs() < 1e-5);
    /// ```
    pub fn build(radius: u32) -> Self {
        if radius == 0 {
            return Kernel { radius: 0, side: 1, weights: vec![1.0] };
        }

        let side = 2 * radius as usize + 1;
        let mu = radius as f64;
        let sigma = radius as f64 / 2.0;

        // The 2D kernel is separable, so evaluate the 1D curve once per index.
        let bell: Vec<f64> = (0..side).map(|i| gaussian(i as f64, mu, sigma)).collect();

        let mut cells = Vec::with_capacity(side * side);
        let mut sum = 0.0f64;
        for &row in &bell {
            for &col in &bell {
                let v = row * col;
                cells.push(v);
                sum += v;
            }
        }

        let weights = cells.into_iter().map(|v| (v / sum) as f32).collect();
        Kernel { radius, side, weights }
    }

    #[inline]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Side length of the square matrix, `2 * radius + 1`.
    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Weight at (`row`, `col`).
    ///
    /// # Panics
    /// Panics if either index is `>= side()`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(
            row < self.side && col < self.side,
            "kernel index ({row},{col}) out of bounds for side {}",
            self.side,
        );
        self.weights[row * self.side + col]
    }

    /// Borrow one row of the matrix.
    pub fn row(&self, row: usize) -> &[f32] {
        assert!(row < self.side, "kernel row {row} out of bounds for side {}", self.side);
        let start = row * self.side;
        &self.weights[start..start + self.side]
    }

    /// The flattened row-major matrix, exactly `side * side` values.
    /// This is the layout uploaded to the GPU weights buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Kernel {{ radius={}, side={} }}", self.radius, self.side)?;
        for r in 0..self.side.min(9) {
            write!(f, "  [")?;
            for (i, v) in self.row(r).iter().take(9).enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v:.6}")?;
            }
            if self.side > 9 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.side > 9 {
            writeln!(f, "  ...")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_zero_is_identity() {
        let k = Kernel::build(0);
        assert_eq!(k.side(), 1);
        assert_eq!(k.as_slice(), &[1.0]);
    }

    #[test]
    fn test_radius_one_values() {
        // sigma = 0.5: 1D curve [e^-2, 1, e^-2], normalised by (1 + 2e^-2)².
        let k = Kernel::build(1);
        let s = 1.0 + 2.0 * (-2.0f64).exp();
        let corner = ((-2.0f64).exp() / s).powi(2) as f32;
        let edge = ((-2.0f64).exp() / (s * s)) as f32;
        let centre = (1.0 / (s * s)) as f32;
        assert!((k.get(0, 0) - corner).abs() < 1e-7);
        assert!((k.get(0, 1) - edge).abs() < 1e-7);
        assert!((k.get(1, 1) - centre).abs() < 1e-7);
    }

    #[test]
    fn test_centre_is_maximum() {
        let k = Kernel::build(4);
        let c = k.get(4, 4);
        assert!(k.as_slice().iter().all(|&v| v <= c));
    }

    #[test]
    fn test_row_matches_get() {
        let k = Kernel::build(2);
        for r in 0..k.side() {
            for c in 0..k.side() {
                assert_eq!(k.row(r)[c], k.get(r, c));
            }
        }
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds_panics() {
        Kernel::build(1).get(3, 0);
    }
}
