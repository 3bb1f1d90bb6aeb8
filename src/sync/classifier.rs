//! Change classification.
//!
//! Decides what a single incoming change record means for the store. The
//! decision depends only on the record's `deleted` flag and whether the id
//! already exists under the same owner; it never inspects field contents.

/// The store mutation a change record calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

/// Classify one change record.
///
/// `deleted` wins unconditionally: deletion is delete-if-present, so it
/// needs no existence lookup and an absent id is not an error. Otherwise an
/// unknown id is a creation and a known id is an unconditional overwrite
/// (last writer wins; there is no timestamp or field-level conflict
/// detection).
pub fn classify(deleted: bool, exists: bool) -> ChangeAction {
    if deleted {
        ChangeAction::Delete
    } else if exists {
        ChangeAction::Update
    } else {
        ChangeAction::Create
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_truth_table() {
        assert_eq!(classify(true, true), ChangeAction::Delete);
        assert_eq!(classify(true, false), ChangeAction::Delete);
        assert_eq!(classify(false, true), ChangeAction::Update);
        assert_eq!(classify(false, false), ChangeAction::Create);
    }
}
