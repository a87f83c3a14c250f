//! Section ordering rules
//!
//! Positions are explicit, 0-based and contiguous within a proposal. Every
//! structural change (append, delete, reorder, draft replacement) goes through
//! these helpers so both repositories agree on the resulting order.

use crate::error::{validation_error, AppError};
use std::collections::HashSet;
use uuid::Uuid;

/// Position for a section appended to a proposal holding `count` sections
pub fn append_position(count: usize) -> Result<i32, AppError> {
    i32::try_from(count)
        .map_err(|_| validation_error("Proposal has too many sections"))
}

/// Check that `requested` is a permutation of `current`.
///
/// Reports duplicated, unknown and missing ids, in that order of precedence.
pub fn validate_permutation(current: &[Uuid], requested: &[Uuid]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(requested.len());
    let duplicates: Vec<String> = requested
        .iter()
        .filter(|id| !seen.insert(**id))
        .map(Uuid::to_string)
        .collect();
    if !duplicates.is_empty() {
        return Err(validation_error(format!(
            "Section order contains duplicate ids: {}",
            duplicates.join(", ")
        )));
    }

    let known: HashSet<&Uuid> = current.iter().collect();
    let unknown: Vec<String> = requested
        .iter()
        .filter(|id| !known.contains(id))
        .map(Uuid::to_string)
        .collect();
    if !unknown.is_empty() {
        return Err(validation_error(format!(
            "Section order references sections outside this proposal: {}",
            unknown.join(", ")
        )));
    }

    let missing: Vec<String> = current
        .iter()
        .filter(|id| !seen.contains(*id))
        .map(Uuid::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(validation_error(format!(
            "Section order is missing sections: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// New positions for the sections in `order`, in that order
pub fn positions_from_order(order: &[Uuid]) -> Vec<(Uuid, i32)> {
    order
        .iter()
        .zip(0..)
        .map(|(id, position)| (*id, position))
        .collect()
}

/// Close gaps left by a removal: keep the relative order, renumber to `0..n`
pub fn renumber(mut current: Vec<(Uuid, i32)>) -> Vec<(Uuid, i32)> {
    current.sort_by_key(|(id, position)| (*position, *id));
    let order: Vec<Uuid> = current.into_iter().map(|(id, _)| id).collect();
    positions_from_order(&order)
}

/// True when positions are exactly `0..n` in iteration order
pub fn is_contiguous(positions: impl IntoIterator<Item = i32>) -> bool {
    positions
        .into_iter()
        .enumerate()
        .all(|(index, position)| usize::try_from(position).map_or(false, |p| p == index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_permutation_accepted() {
        let current = ids(3);
        let requested = vec![current[2], current[0], current[1]];
        assert!(validate_permutation(&current, &requested).is_ok());
        assert!(validate_permutation(&[], &[]).is_ok());
    }

    #[test]
    fn test_permutation_rejects_duplicates() {
        let current = ids(3);
        let requested = vec![current[0], current[0], current[1]];
        let err = validate_permutation(&current, &requested).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_permutation_rejects_unknown_ids() {
        let current = ids(2);
        let requested = vec![current[0], current[1], Uuid::new_v4()];
        let err = validate_permutation(&current, &requested).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("outside")));
    }

    #[test]
    fn test_permutation_rejects_missing_ids() {
        let current = ids(3);
        let requested = vec![current[1], current[0]];
        let err = validate_permutation(&current, &requested).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains(&current[2].to_string())));
    }

    #[test]
    fn test_positions_follow_requested_order() {
        let [a, b, c] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        assert_eq!(positions_from_order(&[c, a, b]), vec![(c, 0), (a, 1), (b, 2)]);
    }

    #[test]
    fn test_renumber_closes_gap() {
        let [a, c, d] = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        // b at position 1 was removed
        let renumbered = renumber(vec![(d, 3), (a, 0), (c, 2)]);
        assert_eq!(renumbered, vec![(a, 0), (c, 1), (d, 2)]);
        assert!(is_contiguous(renumbered.iter().map(|(_, p)| *p)));
    }

    #[test]
    fn test_is_contiguous() {
        assert!(is_contiguous(vec![0, 1, 2]));
        assert!(is_contiguous(Vec::new()));
        assert!(!is_contiguous(vec![0, 2]));
        assert!(!is_contiguous(vec![1, 2]));
        assert!(!is_contiguous(vec![0, 0]));
    }

    #[test]
    fn test_append_position() {
        assert_eq!(append_position(0).unwrap(), 0);
        assert_eq!(append_position(4).unwrap(), 4);
    }
}
