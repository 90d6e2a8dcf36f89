use crate::cancel::CancelToken;
use crate::error::Error;
use crate::storage::UuidSource;
use std::collections::HashSet;
use std::ops::ControlFlow;
use tracing::{debug, info};

/// Identifiers present in the files table, soft-deleted records included.
///
/// Values are stored verbatim; lookups are case sensitive.
#[derive(Debug, Clone, Default)]
pub struct UuidSet {
    inner: HashSet<String>,
}

impl UuidSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: HashSet::with_capacity(capacity),
        }
    }

    /// Returns `false` when the value was already present.
    pub fn add(&mut self, uuid: impl Into<String>) -> bool {
        self.inner.insert(uuid.into())
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.inner.contains(uuid)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for UuidSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = UuidSet::new();
        for uuid in iter {
            set.add(uuid);
        }
        set
    }
}

/// Read every uuid from `source` into a fresh [`UuidSet`].
///
/// Returns the table row count alongside the set. Any database error aborts
/// the build, there is no partial index.
pub fn build_uuid_index(
    source: &dyn UuidSource,
    cancel: &CancelToken,
) -> Result<(i64, UuidSet), Error> {
    cancel.check()?;
    let total = source.count_files()?;
    debug!("files table reports {} rows", total);

    let mut uuids = UuidSet::with_capacity(usize::try_from(total).unwrap_or(0));
    let mut cancelled = false;
    source.for_each_uuid(&mut |uuid| {
        if cancel.is_cancelled() {
            cancelled = true;
            return ControlFlow::Break(());
        }
        uuids.add(uuid);
        ControlFlow::Continue(())
    })?;
    if cancelled {
        return Err(Error::Cancelled);
    }

    info!("Indexed {} unique identifiers from {} records", uuids.len(), total);
    Ok((total, uuids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_build_index_from_database() {
        let db = Database::open_in_memory().unwrap();
        db.insert_file("11111111-1111-1111-1111-111111111111", "a.zip", false)
            .unwrap();
        db.insert_file("22222222-2222-2222-2222-222222222222", "b.zip", true)
            .unwrap();

        let (total, uuids) = build_uuid_index(&db, &CancelToken::new()).unwrap();
        assert_eq!(total, 2);
        assert_eq!(uuids.len(), 2);
        assert!(uuids.contains("11111111-1111-1111-1111-111111111111"));
        // soft-deleted records still protect their files
        assert!(uuids.contains("22222222-2222-2222-2222-222222222222"));
    }

    #[test]
    fn test_uuids_are_case_sensitive() {
        let db = Database::open_in_memory().unwrap();
        db.insert_file("ABCDEF00-0000-0000-0000-000000000001", "a.zip", false)
            .unwrap();

        let (_, uuids) = build_uuid_index(&db, &CancelToken::new()).unwrap();
        assert!(uuids.contains("ABCDEF00-0000-0000-0000-000000000001"));
        assert!(!uuids.contains("abcdef00-0000-0000-0000-000000000001"));
    }

    #[test]
    fn test_duplicate_uuids_collapse() {
        let db = Database::open_in_memory().unwrap();
        for _ in 0..3 {
            db.insert_file("11111111-1111-1111-1111-111111111111", "a.zip", false)
                .unwrap();
        }
        let (total, uuids) = build_uuid_index(&db, &CancelToken::new()).unwrap();
        assert_eq!(total, 3);
        assert_eq!(uuids.len(), 1);
    }

    #[test]
    fn test_cancelled_build_fails() {
        let db = Database::open_in_memory().unwrap();
        db.insert_file("11111111-1111-1111-1111-111111111111", "a.zip", false)
            .unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(build_uuid_index(&db, &cancel), Err(Error::Cancelled)));
    }

    #[test]
    fn test_database_error_aborts_build() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::open(file.path().to_str().unwrap()).unwrap();
        assert!(matches!(
            build_uuid_index(&db, &CancelToken::new()),
            Err(Error::Database(_))
        ));
    }

    #[test]
    fn test_set_from_iterator() {
        let set: UuidSet = ["a", "b", "a"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("b"));
        assert!(!set.is_empty());
    }
}
