//! Window function implementations

use std::f64::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowType {
    /// Symmetric Hann, `0.5 * (1 - cos(2πn / (N-1)))`
    Hann,
    Kaiser(f64), // Beta parameter
}

/// Create window function
pub fn create_window(size: usize, window_type: WindowType) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f64;
    (0..size)
        .map(|i| {
            let x = i as f64;
            match window_type {
                WindowType::Hann => 0.5 * (1.0 - (2.0 * PI * x / denom).cos()),
                WindowType::Kaiser(beta) => {
                    let ratio = 2.0 * x / denom - 1.0;
                    let arg = beta * (1.0 - ratio * ratio).max(0.0).sqrt();
                    bessel_i0(arg) / bessel_i0(beta)
                }
            }
        })
        .collect()
}

/// Modified Bessel function I0 (for Kaiser window)
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let x_half = x / 2.0;

    for k in 1..50 {
        term *= (x_half / k as f64).powi(2);
        sum += term;
        if term < 1e-15 * sum {
            break;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = create_window(1025, WindowType::Hann);
        assert!(window[0].abs() < 1e-12);
        assert!((window[512] - 1.0).abs() < 1e-12);
        assert!(window[1024].abs() < 1e-12);
    }

    #[test]
    fn test_kaiser_symmetric() {
        let window = create_window(48, WindowType::Kaiser(5.0));
        for i in 0..24 {
            assert!((window[i] - window[47 - i]).abs() < 1e-12);
        }
        assert!(window[0] < window[23]);
    }
}
