//! Mixed-radix CPT helpers.
//!
//! CPT rows are ordered with the first-listed parent as the least
//! significant digit: row `r` decodes to parent states
//! `(r % c1, (r / c1) % c2, ...)` for parent cardinalities `c1, c2, ...`.

use smallvec::SmallVec;

/// Number of parent state combinations, i.e. CPT row count.
pub fn combination_count(cardinalities: &[usize]) -> usize {
    cardinalities.iter().product()
}

/// Decodes row index `row` into one state index per parent.
pub fn decode_row(row: usize, cardinalities: &[usize]) -> SmallVec<[usize; 8]> {
    let mut states = SmallVec::with_capacity(cardinalities.len());
    let mut rest = row;
    for &card in cardinalities {
        states.push(rest % card);
        rest /= card;
    }
    states
}

/// Maps a parent state index onto 0..=1.
///
/// Binary parents map to 0 or 1 directly; wider parents scale linearly
/// across their state range.
pub fn normalized_activation(state: usize, cardinality: usize) -> f64 {
    if cardinality <= 1 {
        return 0.0;
    }
    state as f64 / (cardinality - 1) as f64
}

/// Mean normalized activation across one decoded parent combination.
pub fn average_influence(states: &[usize], cardinalities: &[usize]) -> f64 {
    if states.is_empty() {
        return 0.0;
    }
    let total: f64 = states
        .iter()
        .zip(cardinalities)
        .map(|(&s, &c)| normalized_activation(s, c))
        .sum();
    total / states.len() as f64
}

/// Clamps every entry of `row` to at least `floor`, then renormalizes
/// the row to unit mass.
pub fn floor_and_normalize(row: &mut [f64], floor: f64) {
    for p in row.iter_mut() {
        if *p < floor {
            *p = floor;
        }
    }
    let total: f64 = row.iter().sum();
    if total > 0.0 {
        for p in row.iter_mut() {
            *p /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_parent_is_least_significant() {
        // Parents with cardinalities [2, 5]: row index cycles the binary
        // parent fastest.
        let cards = [2, 5];
        assert_eq!(decode_row(0, &cards).as_slice(), &[0, 0]);
        assert_eq!(decode_row(1, &cards).as_slice(), &[1, 0]);
        assert_eq!(decode_row(2, &cards).as_slice(), &[0, 1]);
        assert_eq!(decode_row(9, &cards).as_slice(), &[1, 4]);
        assert_eq!(combination_count(&cards), 10);
    }

    #[test]
    fn activation_scales_with_cardinality() {
        assert_eq!(normalized_activation(0, 2), 0.0);
        assert_eq!(normalized_activation(1, 2), 1.0);
        assert_eq!(normalized_activation(2, 5), 0.5);
        assert_eq!(normalized_activation(4, 5), 1.0);
    }

    #[test]
    fn average_influence_mixes_cardinalities() {
        let avg = average_influence(&[1, 4], &[2, 5]);
        assert!((avg - 1.0).abs() < 1e-12);
        let mixed = average_influence(&[1, 2], &[2, 5]);
        assert!((mixed - 0.75).abs() < 1e-12);
    }

    #[test]
    fn floor_and_normalize_keeps_unit_mass() {
        let mut row = [0.0, 0.005, 0.995, 0.0, 0.0];
        floor_and_normalize(&mut row, 0.01);
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(row.iter().all(|&p| p > 0.0));
    }
}
