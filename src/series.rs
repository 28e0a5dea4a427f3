//! Pure series transforms between the observation table and the emitted
//! chart traces.

use crate::data::Row;

/// Raw counts of one topic over the given rows, in row order.
pub fn topic_values(rows: &[&Row], topic_index: usize) -> Vec<Option<u64>> {
    rows.iter()
        .map(|r| r.counts.get(topic_index).copied().flatten())
        .collect()
}

/// Map raw counts to emitted y-values: zero and missing both become the
/// null marker. This conflation is intentionally preserved from the
/// dashboard's original rendering, which treated every falsy cell as "no
/// data"; callers that need to distinguish the two must use the raw values.
pub fn mask_counts(values: &[Option<u64>]) -> Vec<Option<i64>> {
    values
        .iter()
        .map(|v| match v {
            Some(n) if *n != 0 => Some(*n as i64),
            _ => None,
        })
        .collect()
}

/// Same falsy-to-null mapping for already-differenced values.
pub fn mask_falsy(values: &[i64]) -> Vec<Option<i64>> {
    values
        .iter()
        .map(|v| if *v != 0 { Some(*v) } else { None })
        .collect()
}

/// Successive differences of a count series. The output has the same
/// length as the input; element 0 is always 0, and a difference with a
/// missing operand on either side is 0.
pub fn first_difference(values: &[Option<u64>]) -> Vec<i64> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let diff = if i == 0 {
            0
        } else {
            match (values[i], values[i - 1]) {
                (Some(cur), Some(prev)) => cur as i64 - prev as i64,
                _ => 0,
            }
        };
        out.push(diff);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_conflates_zero_and_missing() {
        let masked = mask_counts(&[Some(5), Some(0), None, Some(2)]);
        assert_eq!(masked, vec![Some(5), None, None, Some(2)]);
    }

    #[test]
    fn first_difference_starts_at_zero() {
        assert_eq!(first_difference(&[Some(5), Some(8)]), vec![0, 3]);
    }

    #[test]
    fn first_difference_can_go_negative() {
        assert_eq!(
            first_difference(&[Some(5), Some(8), Some(2)]),
            vec![0, 3, -6]
        );
    }

    #[test]
    fn first_difference_zeroes_around_missing() {
        assert_eq!(
            first_difference(&[Some(5), None, Some(7), Some(9)]),
            vec![0, 0, 0, 2]
        );
    }

    #[test]
    fn first_difference_preserves_length() {
        assert!(first_difference(&[]).is_empty());
        assert_eq!(first_difference(&[None]).len(), 1);
    }

    #[test]
    fn negative_differences_survive_masking() {
        let masked = mask_falsy(&first_difference(&[Some(5), Some(8), Some(2)]));
        assert_eq!(masked, vec![None, Some(3), Some(-6)]);
    }
}
