pub mod sqlite;

use std::ops::ControlFlow;

pub use sqlite::Database;

/// Read-only view of the identifiers known to the archive database.
///
/// The clean pipeline never writes through this trait.
pub trait UuidSource {
    /// Number of rows in the files table, live and soft-deleted alike.
    fn count_files(&self) -> rusqlite::Result<i64>;

    /// Call `f` with every uuid in the files table. Stops at the first error,
    /// or early when `f` returns [`ControlFlow::Break`].
    fn for_each_uuid(&self, f: &mut dyn FnMut(&str) -> ControlFlow<()>) -> rusqlite::Result<()>;
}
