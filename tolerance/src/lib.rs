/// Scales a local error estimate `x_err` by `abs_tol + rel_tol * max(|x|, |x_prev|)`.
pub fn compute_error(x: f64, x_prev: f64, x_err: f64, rel_tol: f64, abs_tol: f64) -> f64 {
    let scale = abs_tol + rel_tol * x.abs().max(x_prev.abs());
    x_err.abs() / scale
}

/// Hairer-style weighted RMS norm over a state of equal-length slices.
pub fn rms_error(x: &[f64], x_prev: &[f64], x_err: &[f64], rel_tol: f64, abs_tol: f64) -> f64 {
    let n = x.len().min(x_prev.len()).min(x_err.len());
    if n == 0 {
        return 0.0;
    }
    let sum_squared_errors: f64 = (0..n)
        .map(|i| {
            let e = compute_error(x[i], x_prev[i], x_err[i], rel_tol, abs_tol);
            e * e
        })
        .sum();
    (sum_squared_errors / n as f64).sqrt()
}
