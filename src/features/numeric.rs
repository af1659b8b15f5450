//! Small numeric kernels shared by the feature computations.

use std::borrow::Borrow;

/// Mean of the non-NaN values; NaN when there are none.
pub fn nan_mean<I>(values: I) -> f64
where
    I: IntoIterator,
    I::Item: Borrow<f64>,
{
    let (sum, count) = values
        .into_iter()
        .map(|v| *v.borrow())
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Sum of the non-NaN values.
pub fn nan_sum<I>(values: I) -> f64
where
    I: IntoIterator,
    I::Item: Borrow<f64>,
{
    values
        .into_iter()
        .map(|v| *v.borrow())
        .filter(|v| !v.is_nan())
        .sum()
}

/// Trapezoidal integral of `y` over the sample points `x`.
///
/// NaN samples propagate into the result. Fewer than two points integrate
/// to zero.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yy, xx)| (xx[1] - xx[0]) * (yy[0] + yy[1]) / 2.0)
        .sum()
}

/// Ordinary least-squares straight line through `(x, y)`.
///
/// Returns `(slope, intercept)`, or `None` with fewer than two points or
/// when every `x` is identical.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let x = &x[..n];
    let y = &y[..n];

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        sxx += dx * dx;
        sxy += dx * (yi - mean_y);
    }
    if sxx == 0.0 || !sxx.is_finite() {
        return None;
    }

    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}
