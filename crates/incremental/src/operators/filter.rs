//! Incremental `Filter` maintenance (§4.4).
//!
//! A predicate that isn't expressible against the row alone (a free-form
//! SQL fragment) is evaluated upstream, in the gateway, via a one-row
//! membership query; this function handles the row-local case and the
//! translation rules that apply regardless of how the predicate itself
//! is evaluated.

use crate::delta::Delta;
use alloc::vec::Vec;

/// Maintains a `Filter` view given deltas from its input and a predicate.
///
/// - `Insert`: emitted only if the row passes.
/// - `Delete`: emitted only if the row passed (i.e. was part of the
///   output before removal).
/// - `Update`: if both old and new pass, re-emit as `Update`; if only
///   the old passed, emit `Delete`; if only the new passes, emit
///   `Insert`; if neither passes, drop it.
pub fn filter_incremental<T, F>(input: &[Delta<T>], predicate: F) -> Vec<Delta<T>>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let mut out = Vec::new();
    for delta in input {
        match delta {
            Delta::Insert(row) => {
                if predicate(row) {
                    out.push(Delta::Insert(row.clone()));
                }
            }
            Delta::Delete(row) => {
                if predicate(row) {
                    out.push(Delta::Delete(row.clone()));
                }
            }
            Delta::Update { old, new } => {
                let old_pass = predicate(old);
                let new_pass = predicate(new);
                match (old_pass, new_pass) {
                    (true, true) => out.push(Delta::Update { old: old.clone(), new: new.clone() }),
                    (true, false) => out.push(Delta::Delete(old.clone())),
                    (false, true) => out.push(Delta::Insert(new.clone())),
                    (false, false) => {}
                }
            }
            Delta::Reset => out.push(Delta::Reset),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_filter_insert_pass_and_fail() {
        let deltas = vec![Delta::insert(10), Delta::insert(3)];
        let out = filter_incremental(&deltas, |&x| x > 5);
        assert_eq!(out, vec![Delta::insert(10)]);
    }

    #[test]
    fn test_filter_delete_only_if_previously_passing() {
        let deltas = vec![Delta::delete(10), Delta::delete(3)];
        let out = filter_incremental(&deltas, |&x| x > 5);
        assert_eq!(out, vec![Delta::delete(10)]);
    }

    #[test]
    fn test_filter_update_transitions() {
        let predicate = |&x: &i32| x > 5;

        assert_eq!(
            filter_incremental(&[Delta::update(10, 20)], predicate),
            vec![Delta::update(10, 20)]
        );
        assert_eq!(
            filter_incremental(&[Delta::update(10, 2)], predicate),
            vec![Delta::delete(10)]
        );
        assert_eq!(
            filter_incremental(&[Delta::update(2, 10)], predicate),
            vec![Delta::insert(10)]
        );
        assert_eq!(filter_incremental(&[Delta::update(1, 2)], predicate), vec![]);
    }

    #[test]
    fn test_filter_passes_through_reset() {
        let out = filter_incremental(&[Delta::<i32>::reset()], |&x| x > 5);
        assert_eq!(out, vec![Delta::reset()]);
    }
}
