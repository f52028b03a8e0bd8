//! SQLite implementation of the AclStore trait.
//!
//! This is the persistent storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use page_acl_core::{
    AclEntry, AclEntryId, NewAclEntry, PageId, PageNode, Permissions, SubjectId, SubjectType,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AclChange, AclQuery, AclStore};

const ENTRY_COLUMNS: &str = "id, page_id, subject_type, subject_id, permissions, recursive";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Raw columns of one `page_acl` row, before range checks.
struct EntryRow {
    id: i64,
    page_id: i64,
    subject_type: i64,
    subject_id: i64,
    permissions: i64,
    recursive: bool,
}

impl EntryRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            page_id: row.get("page_id")?,
            subject_type: row.get("subject_type")?,
            subject_id: row.get("subject_id")?,
            permissions: row.get("permissions")?,
            recursive: row.get("recursive")?,
        })
    }
}

impl TryFrom<EntryRow> for AclEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self> {
        let permissions = u32::try_from(row.permissions).map_err(|_| {
            StoreError::InvalidData(format!(
                "ACL entry {} has out-of-range permissions {}",
                row.id, row.permissions
            ))
        })?;

        Ok(AclEntry {
            id: AclEntryId(from_sql_int(row.id, "ACL entry id")?),
            page_id: PageId(from_sql_int(row.page_id, "page id")?),
            subject_type: SubjectType::from_code(row.subject_type)?,
            subject_id: SubjectId(from_sql_int(row.subject_id, "subject id")?),
            permissions: Permissions(permissions),
            recursive: row.recursive,
        })
    }
}

/// SQLite integers are signed; ids above `i64::MAX` cannot be stored.
fn to_sql_int(raw: u64, what: &str) -> Result<i64> {
    i64::try_from(raw)
        .map_err(|_| StoreError::InvalidData(format!("{what} {raw} does not fit in SQLite")))
}

fn from_sql_int(raw: i64, what: &str) -> Result<u64> {
    u64::try_from(raw).map_err(|_| StoreError::InvalidData(format!("negative {what} {raw}")))
}

fn page_exists(conn: &Connection, id: PageId) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pages WHERE id = ?1)",
        params![to_sql_int(id.get(), "page id")?],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn parent_of(conn: &Connection, id: PageId) -> Result<Option<Option<PageId>>> {
    let parent: Option<Option<i64>> = conn
        .query_row(
            "SELECT parent_id FROM pages WHERE id = ?1",
            params![to_sql_int(id.get(), "page id")?],
            |row| row.get(0),
        )
        .optional()?;

    match parent {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(raw)) => Ok(Some(Some(PageId(from_sql_int(raw, "parent page id")?)))),
    }
}

#[async_trait]
impl AclStore for SqliteStore {
    async fn list_acl_entries(&self, query: &AclQuery) -> Result<Vec<AclEntry>> {
        let query = *query;
        let page_id = query.page_id.map(|p| to_sql_int(p.get(), "page id")).transpose()?;

        self.blocking(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {ENTRY_COLUMNS} FROM page_acl
                 WHERE (?1 IS NULL OR page_id = ?1)
                   AND (?2 IS NULL OR subject_type = ?2)
                   AND (?3 IS NULL OR recursive = ?3)
                 ORDER BY id"
            ))?;

            let rows = stmt
                .query_map(
                    params![page_id, query.subject_type.map(SubjectType::code), query.recursive],
                    EntryRow::read,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(AclEntry::try_from).collect()
        })
        .await
    }

    async fn get_acl_entry(&self, id: AclEntryId) -> Result<Option<AclEntry>> {
        let raw_id = to_sql_int(id.get(), "ACL entry id")?;

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM page_acl WHERE id = ?1"),
                params![raw_id],
                EntryRow::read,
            )
            .optional()?
            .map(AclEntry::try_from)
            .transpose()
        })
        .await
    }

    async fn insert_acl_entry(&self, entry: &NewAclEntry) -> Result<AclEntryId> {
        let entry = entry.clone();

        self.blocking(move |conn| {
            if !page_exists(conn, entry.page_id)? {
                return Err(StoreError::NotFound(format!("page {}", entry.page_id)));
            }

            conn.execute(
                "INSERT INTO page_acl (page_id, subject_type, subject_id, permissions, recursive)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    to_sql_int(entry.page_id.get(), "page id")?,
                    entry.subject_type.code(),
                    to_sql_int(entry.subject_id.get(), "subject id")?,
                    i64::from(entry.permissions.bits()),
                    entry.recursive,
                ],
            )?;

            Ok(AclEntryId(from_sql_int(conn.last_insert_rowid(), "ACL entry id")?))
        })
        .await
    }

    async fn apply_changes(&self, changes: &[AclChange]) -> Result<()> {
        let changes = changes.to_vec();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            for change in &changes {
                let affected = match change {
                    AclChange::Delete(id) => tx.execute(
                        "DELETE FROM page_acl WHERE id = ?1",
                        params![to_sql_int(id.get(), "ACL entry id")?],
                    )?,
                    AclChange::Update(id, data) => {
                        if !page_exists(&tx, data.page_id)? {
                            return Err(StoreError::NotFound(format!("page {}", data.page_id)));
                        }
                        tx.execute(
                            "UPDATE page_acl
                             SET page_id = ?2, subject_type = ?3, subject_id = ?4,
                                 permissions = ?5, recursive = ?6
                             WHERE id = ?1",
                            params![
                                to_sql_int(id.get(), "ACL entry id")?,
                                to_sql_int(data.page_id.get(), "page id")?,
                                data.subject_type.code(),
                                to_sql_int(data.subject_id.get(), "subject id")?,
                                i64::from(data.permissions.bits()),
                                data.recursive,
                            ],
                        )?
                    }
                };

                // Dropping the transaction rolls back earlier changes.
                if affected == 0 {
                    return Err(StoreError::NotFound(format!(
                        "ACL entry {}",
                        change.entry_id()
                    )));
                }
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn insert_page(&self, page: PageNode, sorting: i64) -> Result<()> {
        self.blocking(move |conn| {
            if page_exists(conn, page.id)? {
                return Err(StoreError::AlreadyExists(format!("page {}", page.id)));
            }
            if let Some(parent) = page.parent_id {
                if !page_exists(conn, parent)? {
                    return Err(StoreError::NotFound(format!("parent page {}", parent)));
                }
            }

            conn.execute(
                "INSERT INTO pages (id, parent_id, sorting) VALUES (?1, ?2, ?3)",
                params![
                    to_sql_int(page.id.get(), "page id")?,
                    page.parent_id
                        .map(|p| to_sql_int(p.get(), "parent page id"))
                        .transpose()?,
                    sorting,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_page(&self, id: PageId) -> Result<Option<PageNode>> {
        self.blocking(move |conn| {
            Ok(parent_of(conn, id)?.map(|parent_id| PageNode { id, parent_id }))
        })
        .await
    }

    async fn list_child_pages(&self, parent: PageId) -> Result<Vec<PageId>> {
        let raw_parent = to_sql_int(parent.get(), "page id")?;

        self.blocking(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id FROM pages WHERE parent_id = ?1 ORDER BY sorting, id",
            )?;

            let children = stmt
                .query_map(params![raw_parent], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            children
                .into_iter()
                .map(|raw| from_sql_int(raw, "page id").map(PageId))
                .collect()
        })
        .await
    }

    async fn get_root_path(&self, page: PageId) -> Result<Vec<PageNode>> {
        self.blocking(move |conn| {
            let mut next = parent_of(conn, page)?
                .ok_or_else(|| StoreError::NotFound(format!("page {}", page)))?;

            let mut path = Vec::new();
            let mut seen = BTreeSet::from([page]);

            while let Some(id) = next {
                if !seen.insert(id) {
                    return Err(StoreError::InvalidData(format!(
                        "parent chain of page {} loops at page {}",
                        page, id
                    )));
                }
                let parent_id = parent_of(conn, id)?.ok_or_else(|| {
                    StoreError::InvalidData(format!("dangling parent page {}", id))
                })?;
                path.push(PageNode { id, parent_id });
                next = parent_id;
            }

            path.reverse();
            Ok(path)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AclStoreExt;
    use page_acl_core::Subject;

    async fn make_tree(store: &SqliteStore) {
        store.insert_page(PageNode::root(1), 0).await.unwrap();
        store.insert_page(PageNode::child(2, 1), 20).await.unwrap();
        store.insert_page(PageNode::child(3, 1), 10).await.unwrap();
        store.insert_page(PageNode::child(4, 2), 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_tree_queries() {
        let store = SqliteStore::open_memory().unwrap();
        make_tree(&store).await;

        let children = store.list_child_pages(PageId(1)).await.unwrap();
        assert_eq!(children, vec![PageId(3), PageId(2)]);

        let path = store.get_root_path(PageId(4)).await.unwrap();
        assert_eq!(path, vec![PageNode::root(1), PageNode::child(2, 1)]);

        assert_eq!(
            store.get_page(PageId(4)).await.unwrap(),
            Some(PageNode::child(4, 2))
        );
        assert!(store.get_page(PageId(9)).await.unwrap().is_none());
        assert!(matches!(
            store.get_root_path(PageId(9)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_entry_filters() {
        let store = SqliteStore::open_memory().unwrap();
        make_tree(&store).await;

        let a = store
            .insert_acl_entry(&NewAclEntry::new(PageId(2), Subject::user(7), Permissions(16), true))
            .await
            .unwrap();
        let b = store
            .insert_acl_entry(&NewAclEntry::new(PageId(2), Subject::user(7), Permissions(2), false))
            .await
            .unwrap();
        let c = store
            .insert_acl_entry(&NewAclEntry::new(
                PageId(3),
                Subject::group(5),
                Permissions(31),
                true,
            ))
            .await
            .unwrap();

        let on_two: Vec<AclEntryId> = store
            .entries_on_page(PageId(2))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(on_two, vec![a, b]);

        let recursive = store.recursive_entries_on_page(PageId(2)).await.unwrap();
        assert_eq!(recursive.len(), 1);
        assert_eq!(recursive[0].permissions, Permissions(16));

        let groups = store
            .list_acl_entries(&AclQuery::of_type(SubjectType::Group))
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, c);
        assert_eq!(groups[0].subject(), Subject::group(5));
    }

    #[tokio::test]
    async fn test_batch_rolls_back_on_missing_entry() {
        let store = SqliteStore::open_memory().unwrap();
        make_tree(&store).await;
        let id = store
            .insert_acl_entry(&NewAclEntry::new(PageId(1), Subject::group(5), Permissions(31), true))
            .await
            .unwrap();

        let result = store
            .apply_changes(&[AclChange::Delete(id), AclChange::Delete(AclEntryId(999))])
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.get_acl_entry(id).await.unwrap().is_some());

        store.delete_acl_entry(id).await.unwrap();
        assert!(store.get_acl_entry(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_beyond_sqlite_range_are_invalid() {
        let store = SqliteStore::open_memory().unwrap();
        make_tree(&store).await;
        let huge = u64::MAX;

        let result = store.insert_page(PageNode::child(huge, 1), 0).await;
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert!(matches!(store.get_page(PageId(huge)).await, Err(StoreError::InvalidData(_))));

        let entry = NewAclEntry::new(PageId(1), Subject::user(huge), Permissions(1), true);
        let result = store.insert_acl_entry(&entry).await;
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert!(store.entries_on_page(PageId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_rows_are_invalid() {
        let store = SqliteStore::open_memory().unwrap();
        make_tree(&store).await;
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO page_acl (id, page_id, subject_type, subject_id, permissions, recursive)
                 VALUES (7, 1, 1, 5, ?1, 1)",
                params![1_i64 << 40],
            )
            .unwrap();
            conn.execute("INSERT INTO pages (id, parent_id, sorting) VALUES (-5, 3, 0)", [])
                .unwrap();
        }

        let result = store.get_acl_entry(AclEntryId(7)).await;
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        let result = store.entries_on_page(PageId(1)).await;
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        let result = store.list_child_pages(PageId(3)).await;
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acl.db");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            make_tree(&store).await;
            store
                .insert_acl_entry(&NewAclEntry::new(PageId(4), Subject::user(1), Permissions(1), false))
                .await
                .unwrap()
        };

        let store = SqliteStore::open(&path).unwrap();
        let entry = store.get_acl_entry(id).await.unwrap().unwrap();
        assert_eq!(entry.page_id, PageId(4));
        assert!(!entry.recursive);
        assert_eq!(store.list_child_pages(PageId(2)).await.unwrap(), vec![PageId(4)]);
    }
}
