use std::path::Path;

use msync_domain::IndexTree;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::SyncError;

/// Reads the `names`, `pathparts` and `manifest` tables of an index snapshot.
pub fn load_index(path: &Path) -> Result<IndexTree, SyncError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let mut tree = IndexTree::new();

    let mut stmt = conn.prepare("SELECT rowid, name FROM names")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        tree.insert_name(row.get::<_, i64>(0)?, row.get::<_, String>(1)?);
    }

    let mut stmt = conn.prepare("SELECT rowid, parent, pathpart FROM pathparts")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let parent: Option<i64> = row.get(1)?;
        let fragment: Option<String> = row.get(2)?;
        tree.insert_path_part(row.get::<_, i64>(0)?, parent, fragment.unwrap_or_default());
    }

    let mut stmt = conn.prepare("SELECT name, pathpart FROM manifest")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        tree.push_manifest(row.get::<_, i64>(0)?, row.get::<_, i64>(1)?);
    }

    debug!(
        manifests = tree.manifests().len(),
        path = %path.display(),
        "loaded index snapshot"
    );
    Ok(tree)
}
