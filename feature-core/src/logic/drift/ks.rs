//! Two-sample Kolmogorov-Smirnov test
//!
//! Statistic over the merged sorted samples (ties stepped together). The
//! p-value is exact (lattice path count) while `n1 * n2` stays under
//! `EXACT_MAX_CELLS`, otherwise asymptotic Kolmogorov with Stephens'
//! small-sample correction. A single serving request always falls in the
//! exact range: one value above the whole reference of n rows gets
//! p = 2 / (n + 1).

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
}

const SERIES_TERMS: u32 = 100;
const EPS_RELATIVE_TERM: f64 = 1e-3;
const EPS_RELATIVE_SUM: f64 = 1e-8;

/// Largest `n1 * n2` lattice for the exact distribution
pub const EXACT_MAX_CELLS: usize = 4_000_000;

/// Sup distance between the two empirical CDFs; inputs must be sorted
pub fn ks_statistic(sorted_a: &[f64], sorted_b: &[f64]) -> f64 {
    let n1 = sorted_a.len() as f64;
    let n2 = sorted_b.len() as f64;
    let (mut i, mut j) = (0usize, 0usize);
    let mut d_max = 0.0f64;

    while i < sorted_a.len() && j < sorted_b.len() {
        let x = sorted_a[i].min(sorted_b[j]);
        while i < sorted_a.len() && sorted_a[i] <= x {
            i += 1;
        }
        while j < sorted_b.len() && sorted_b[j] <= x {
            j += 1;
        }
        d_max = d_max.max((i as f64 / n1 - j as f64 / n2).abs());
    }

    d_max
}

/// Kolmogorov survival function Q(λ) = 2 Σ (-1)^(k-1) exp(-2 k² λ²)
///
/// Returns 1.0 when the series does not settle (λ close to 0).
pub fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }

    let a2 = -2.0 * lambda * lambda;
    let mut sign = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0f64;

    for k in 1..=SERIES_TERMS {
        let k = f64::from(k);
        let term = sign * (a2 * k * k).exp();
        sum += term;
        if term.abs() <= EPS_RELATIVE_TERM * previous || term.abs() <= EPS_RELATIVE_SUM * sum {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        previous = term.abs();
    }

    1.0
}

/// Asymptotic two-sided p-value for statistic `d` on samples of size n1, n2
pub fn ks_asymptotic_p_value(d: f64, n1: usize, n2: usize) -> f64 {
    if n1 == 0 || n2 == 0 {
        return 1.0;
    }
    let en = (n1 as f64 * n2 as f64) / (n1 + n2) as f64;
    let sqrt_en = en.sqrt();
    kolmogorov_sf((sqrt_en + 0.12 + 0.11 / sqrt_en) * d)
}

/// Exact two-sided p-value P(D >= d) under the null, assuming no ties
///
/// Walks the (n1 + 1) x (n2 + 1) lattice keeping, per cell, the share of
/// monotone paths from the origin that never touched a cell where
/// `|i / n1 - j / n2| >= d`. Shares instead of counts keep it in range.
pub fn ks_exact_p_value(d: f64, n1: usize, n2: usize) -> f64 {
    if n1 == 0 || n2 == 0 {
        return 1.0;
    }

    // d is a lattice distance |i*n2 - j*n1| / (n1*n2), so this is integral
    let h = (d * (n1 as f64) * (n2 as f64)).round() as i128;
    if h <= 0 {
        return 1.0;
    }
    let (a, b) = (n1 as i128, n2 as i128);
    let outside = |i: usize, j: usize| (i as i128 * b - j as i128 * a).abs() >= h;

    let mut inside = vec![0.0f64; n2 + 1];
    for i in 0..=n1 {
        for j in 0..=n2 {
            if outside(i, j) {
                inside[j] = 0.0;
                continue;
            }
            if i == 0 && j == 0 {
                inside[0] = 1.0;
                continue;
            }
            let steps = (i + j) as f64;
            let from_a = if i > 0 { inside[j] * i as f64 / steps } else { 0.0 };
            let from_b = if j > 0 { inside[j - 1] * j as f64 / steps } else { 0.0 };
            inside[j] = from_a + from_b;
        }
    }

    (1.0 - inside[n2]).clamp(0.0, 1.0)
}

/// Exact for small lattices, asymptotic otherwise
pub fn ks_p_value(d: f64, n1: usize, n2: usize) -> f64 {
    match n1.checked_mul(n2) {
        Some(cells) if cells <= EXACT_MAX_CELLS => ks_exact_p_value(d, n1, n2),
        _ => ks_asymptotic_p_value(d, n1, n2),
    }
}

/// Statistic and p-value; `None` if either sample is empty
pub fn ks_two_sample_sorted(sorted_a: &[f64], sorted_b: &[f64]) -> Option<KsResult> {
    if sorted_a.is_empty() || sorted_b.is_empty() {
        return None;
    }
    let statistic = ks_statistic(sorted_a, sorted_b);
    Some(KsResult {
        statistic,
        p_value: ks_p_value(statistic, sorted_a.len(), sorted_b.len()),
    })
}

/// Same as `ks_two_sample_sorted` for unsorted input
pub fn ks_two_sample(a: &[f64], b: &[f64]) -> Option<KsResult> {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);
    ks_two_sample_sorted(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistic_disjoint_and_identical() {
        assert_eq!(ks_statistic(&[1.0, 2.0], &[3.0, 4.0]), 1.0);
        assert_eq!(ks_statistic(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_statistic_partial_overlap() {
        let d = ks_statistic(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0, 5.0, 6.0]);
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_statistic_steps_ties_together() {
        let d = ks_statistic(&[1.0, 1.0, 2.0], &[1.0, 2.0, 2.0]);
        assert!((d - 1.0 / 3.0).abs() < 1e-12);

        // One-point sample sitting on a reference value
        assert!((ks_statistic(&[-1.0, 1.0], &[-1.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_kolmogorov_sf_critical_value() {
        assert_eq!(kolmogorov_sf(0.0), 1.0);
        assert!((kolmogorov_sf(1.358) - 0.05).abs() < 1e-3);
        assert!(kolmogorov_sf(3.0) < 1e-6);
    }

    #[test]
    fn test_kolmogorov_sf_monotone() {
        let mut last = 1.0;
        for step in 1..40 {
            let p = kolmogorov_sf(step as f64 * 0.1);
            assert!(p <= last + 1e-6);
            assert!((0.0..=1.0).contains(&p));
            last = p;
        }
    }

    #[test]
    fn test_single_sample_against_two_point_reference() {
        let result = ks_two_sample(&[1.0, -1.0], &[-1.0]).unwrap();
        assert!((result.statistic - 0.5).abs() < 1e-12);
        assert!(result.p_value > 0.9);
    }

    #[test]
    fn test_exact_single_value_above_reference() {
        let reference: Vec<f64> = (0..891).map(f64::from).collect();
        let result = ks_two_sample(&reference, &[10_000.0]).unwrap();
        assert_eq!(result.statistic, 1.0);
        assert!((result.p_value - 2.0 / 892.0).abs() < 1e-9);

        // Asymptotic form cannot go that low for one sample
        assert!(ks_asymptotic_p_value(1.0, 891, 1) > 0.09);
    }

    #[test]
    fn test_exact_single_value_inside_reference() {
        let reference: Vec<f64> = (0..100).map(f64::from).collect();
        let result = ks_two_sample(&reference, &[49.5]).unwrap();
        assert!((result.statistic - 0.5).abs() < 1e-12);
        assert!(result.p_value > 0.9);
    }

    #[test]
    fn test_exact_equal_sizes_disjoint() {
        // All C(6, 3) = 20 orderings, only the two fully separated ones reach D = 1
        let p = ks_exact_p_value(1.0, 3, 3);
        assert!((p - 2.0 / 20.0).abs() < 1e-12);
        assert_eq!(ks_exact_p_value(0.0, 3, 3), 1.0);
    }

    #[test]
    fn test_exact_and_asymptotic_agree_on_large_samples() {
        let exact = ks_exact_p_value(0.1, 400, 400);
        let asymptotic = ks_asymptotic_p_value(0.1, 400, 400);
        assert!((exact - asymptotic).abs() < 0.015, "{exact} vs {asymptotic}");
    }

    #[test]
    fn test_large_lattice_uses_asymptotic() {
        assert_eq!(ks_p_value(0.05, 5_000, 5_000), ks_asymptotic_p_value(0.05, 5_000, 5_000));
    }

    #[test]
    fn test_empty_sample() {
        assert_eq!(ks_two_sample(&[], &[1.0]), None);
        assert_eq!(ks_p_value(0.5, 0, 10), 1.0);
    }
}
