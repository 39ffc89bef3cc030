use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Relative-frequency estimate `count / total`, in log space.
///
/// Both arguments must be positive; callers validate before getting here.
///
/// ```
/// let lp = treecyk::utils::log_ratio(1, 4);
/// assert!((lp - 0.25f64.ln()).abs() < 1e-12);
/// assert_eq!(treecyk::utils::log_ratio(7, 7), 0.0);
/// ```
pub fn log_ratio(count: i64, total: i64) -> f64 {
  (count as f64).ln() - (total as f64).ln()
}

/// Whether a log-probability denotes an impossible derivation.
/// NaN never shows up in a chart, but is treated as impossible all the same.
pub fn is_impossible(log_prob: f64) -> bool {
  log_prob == f64::NEG_INFINITY || log_prob.is_nan()
}

#[test]
fn test_neg_infinity_absorbs() {
  let ninf = f64::NEG_INFINITY;
  assert!(is_impossible(ninf + -3.5));
  assert!(is_impossible(ninf + ninf));
  assert!(!is_impossible(-1e300 + -1e300));
  assert!(is_impossible(f64::NAN));
}
