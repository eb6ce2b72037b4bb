//! Keeps the selected routine consistent with the live routine list.

use shared::domain::Routine;

/// Next selection after the routine list changed.
///
/// Nothing selected stays nothing selected; there is no default selection.
/// A present selection is replaced by the list's own record with the same id,
/// or cleared when that id is gone upstream.
pub fn reconcile_selection(previous: Option<&Routine>, routines: &[Routine]) -> Option<Routine> {
    let previous = previous?;
    routines
        .iter()
        .find(|routine| routine.id == previous.id)
        .cloned()
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
