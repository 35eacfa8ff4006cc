//! Incremental `Project` maintenance (§4.5).
//!
//! Projection never changes whether a row is present, only its shape,
//! so it is the simplest operator: every delta kind maps straight
//! through. Arbitrary projected expressions (not just column refs) are
//! evaluated by the caller's `project` closure — this function only
//! owns the delta-kind bookkeeping.

use crate::delta::Delta;
use alloc::vec::Vec;

/// Applies `project` to the payload of every delta, preserving its kind.
pub fn project_incremental<T, U, F>(input: &[Delta<T>], project: F) -> Vec<Delta<U>>
where
    F: Fn(&T) -> U,
{
    input.iter().map(|d| d.map_ref(&project)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_project_insert_and_delete() {
        let deltas = vec![Delta::insert((1, "a")), Delta::delete((2, "b"))];
        let out = project_incremental(&deltas, |(id, _)| *id);
        assert_eq!(out, vec![Delta::insert(1), Delta::delete(2)]);
    }

    #[test]
    fn test_project_update_maps_both_sides() {
        let out = project_incremental(&[Delta::update((1, "a"), (1, "b"))], |(_, name)| *name);
        assert_eq!(out, vec![Delta::update("a", "b")]);
    }

    #[test]
    fn test_project_passes_through_reset() {
        let out: Vec<Delta<i32>> = project_incremental(&[Delta::<(i32, &str)>::reset()], |(id, _)| *id);
        assert_eq!(out, vec![Delta::reset()]);
    }
}
