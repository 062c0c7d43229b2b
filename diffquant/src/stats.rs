//! Summary statistics and Welch's unequal-variance t-test

use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;

/// Calculate the arithmetic mean of a slice
#[inline]
pub fn mean(slice: &[f64]) -> f64 {
    let (sum, len) = slice.iter().fold((0.0, 0), |acc, x| (acc.0 + x, acc.1 + 1));
    sum / len as f64
}

/// Calculate the unbiased (n - 1) sample variance of a slice
#[inline]
pub fn variance(slice: &[f64]) -> f64 {
    let m = mean(slice);
    let n = slice.len() as f64;
    slice.iter().fold(0.0f64, |acc, x| acc + (x - m).powi(2)) / (n - 1.0)
}

/// Reasons a t-test cannot produce a p-value
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Degenerate {
    /// Fewer than two values in one of the samples
    TooFewValues,
    /// Both samples have zero variance
    ZeroVariance,
    /// Non-finite input, statistic or degrees of freedom
    NonFinite,
}

impl fmt::Display for Degenerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degenerate::TooFewValues => f.write_str("fewer than two values in a sample"),
            Degenerate::ZeroVariance => f.write_str("samples have zero variance"),
            Degenerate::NonFinite => f.write_str("non-finite test statistic"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Welch {
    /// t statistic for mean(a) - mean(b)
    pub t: f64,
    /// Welch-Satterthwaite degrees of freedom
    pub df: f64,
    /// Two-sided p-value, in (0, 1]
    pub p_value: f64,
}

/// Two-sample t-test for a difference in means that does not assume equal
/// variances
pub fn welch(a: &[f64], b: &[f64]) -> Result<Welch, Degenerate> {
    if a.len() < 2 || b.len() < 2 {
        return Err(Degenerate::TooFewValues);
    }

    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (ma, mb) = (mean(a), mean(b));
    // Squared standard error of each mean
    let sa = variance(a) / na;
    let sb = variance(b) / nb;

    if !(ma.is_finite() && mb.is_finite() && sa.is_finite() && sb.is_finite()) {
        return Err(Degenerate::NonFinite);
    }
    let se = (sa + sb).sqrt();
    if se <= 0.0 {
        return Err(Degenerate::ZeroVariance);
    }

    let t = (ma - mb) / se;
    let df = (sa + sb).powi(2) / (sa.powi(2) / (na - 1.0) + sb.powi(2) / (nb - 1.0));
    if !(t.is_finite() && df.is_finite()) {
        return Err(Degenerate::NonFinite);
    }

    let dist = StudentsT::new(0.0, 1.0, df).map_err(|_| Degenerate::NonFinite)?;
    // cdf of the lower tail keeps precision for large |t|
    let p_value = (2.0 * dist.cdf(-t.abs())).max(f64::MIN_POSITIVE).min(1.0);

    Ok(Welch { t, df, p_value })
}
