//! Contact classification by order statistic.
//!
//! The threshold separating contact from non-contact points is the k-th
//! smallest aperture with `k = round(fraction * N)`. It is diagnostic only:
//! clipping works from the fixed bounds in `ApertureConfig`.

/// Result of the contact classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSummary {
    pub total_points: usize,
    /// Number of points considered in contact, `round(fraction * N)`.
    pub contact_points: usize,
    /// Largest aperture among the points in contact.
    pub threshold: f64,
}

/// Number of points in contact for a given fraction.
///
/// Halves round to even, so 2.5 points in contact become 2.
pub fn contact_count(fraction: f64, total: usize) -> usize {
    let k = (fraction * total as f64).round_ties_even();
    if k <= 0.0 {
        0
    } else {
        k as usize
    }
}

/// Value of the k-th smallest element (0-based), clamped to the last index.
pub fn kth_smallest(values: &[f64], k: usize) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let k = k.min(values.len() - 1);
    let mut scratch = values.to_vec();
    let (_, kth, _) = scratch.select_nth_unstable_by(k, |a, b| a.total_cmp(b));
    Some(*kth)
}

/// Classify `apertures` into contact and non-contact points.
///
/// Returns `None` for an empty input.
pub fn classify_contact(apertures: &[f64], fraction: f64) -> Option<ContactSummary> {
    let contact_points = contact_count(fraction, apertures.len());
    let threshold = kth_smallest(apertures, contact_points)?;

    log::debug!(
        "contact threshold {:e} at order statistic {} of {}",
        threshold,
        contact_points,
        apertures.len()
    );

    Some(ContactSummary {
        total_points: apertures.len(),
        contact_points,
        threshold,
    })
}
