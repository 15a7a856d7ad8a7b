use std::collections::HashMap;
use std::sync::Mutex;

use time::OffsetDateTime;

use shared::error::{Error, Result};
use shared::object_id::ObjectId;
use shared::validation::{DEFAULT_SCAN_LIMIT, DEFAULT_SCAN_OFFSET, MAX_SCAN_LIMIT};

/// A record that knows its own document id.
pub trait Document {
    fn id(&self) -> &ObjectId;
}

/// Storage envelope around a record. Id, timestamps and the deleted flag are
/// storage-only concerns; the public record is mapped out at the adapter
/// boundary and callers never set these fields.
#[derive(Debug, Clone)]
struct Stored<T> {
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    seq: u64,
    deleted: bool,
    record: T,
}

/// Scan paging. Limits outside `[0, 1000]` clamp to the ceiling; negative
/// or past-the-end offsets reset to 0.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SCAN_LIMIT,
            offset: DEFAULT_SCAN_OFFSET,
        }
    }
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_SCAN_LIMIT),
            offset: offset.unwrap_or(DEFAULT_SCAN_OFFSET),
        }
    }

    fn clamp(self, available: usize) -> (usize, usize) {
        let limit = if (0..=MAX_SCAN_LIMIT).contains(&self.limit) {
            self.limit as usize
        } else {
            MAX_SCAN_LIMIT as usize
        };

        let offset = if self.offset < 0 || self.offset as usize >= available {
            0
        } else {
            self.offset as usize
        };

        (limit, offset)
    }
}

/// In-memory document collection keyed by object id. The durable store is an
/// opaque collaborator to the rest of the system, so everything above this
/// module sees only the §4.3-style contract.
#[derive(Debug)]
pub struct Collection<T> {
    rows: Mutex<HashMap<ObjectId, Stored<T>>>,
    inserts: Mutex<u64>,
}

fn lock_failed() -> Error {
    Error::store("Record store lock failed")
}

impl<T: Document + Clone> Collection<T> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            inserts: Mutex::new(0),
        }
    }

    pub fn insert(&self, record: T) -> Result<T> {
        let seq = {
            let mut inserts = self.inserts.lock().map_err(|_| lock_failed())?;
            *inserts += 1;
            *inserts
        };

        let now = OffsetDateTime::now_utc();
        let mut rows = self.rows.lock().map_err(|_| lock_failed())?;
        rows.insert(
            record.id().clone(),
            Stored {
                created_at: now,
                updated_at: now,
                seq,
                deleted: false,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    pub fn get(&self, id: &ObjectId) -> Result<Option<T>> {
        let rows = self.rows.lock().map_err(|_| lock_failed())?;
        Ok(rows
            .get(id)
            .filter(|row| !row.deleted)
            .map(|row| row.record.clone()))
    }

    pub fn exists(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Matching records, newest first, soft-deleted rows excluded.
    pub fn scan(&self, page: Page, pred: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        let rows = self.rows.lock().map_err(|_| lock_failed())?;

        let mut matches: Vec<&Stored<T>> = rows
            .values()
            .filter(|row| !row.deleted && pred(&row.record))
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        let (limit, offset) = page.clamp(matches.len());
        Ok(matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| row.record.clone())
            .collect())
    }

    pub fn count(&self, pred: impl Fn(&T) -> bool) -> Result<usize> {
        let rows = self.rows.lock().map_err(|_| lock_failed())?;
        Ok(rows
            .values()
            .filter(|row| !row.deleted && pred(&row.record))
            .count())
    }

    /// Replace a live record wholesale, keyed by its own id. Returns `false`
    /// when the id is absent or soft-deleted.
    pub fn replace(&self, record: T) -> Result<bool> {
        let mut rows = self.rows.lock().map_err(|_| lock_failed())?;
        match rows.get_mut(record.id()) {
            Some(row) if !row.deleted => {
                row.record = record;
                row.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Storage-envelope timestamps for a live record: (created, updated).
    pub fn timestamps(&self, id: &ObjectId) -> Result<Option<(OffsetDateTime, OffsetDateTime)>> {
        let rows = self.rows.lock().map_err(|_| lock_failed())?;
        Ok(rows
            .get(id)
            .filter(|row| !row.deleted)
            .map(|row| (row.created_at, row.updated_at)))
    }

    pub fn soft_delete(&self, id: &ObjectId) -> Result<bool> {
        let mut rows = self.rows.lock().map_err(|_| lock_failed())?;
        match rows.get_mut(id) {
            Some(row) if !row.deleted => {
                row.deleted = true;
                row.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl<T: Document + Clone> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}
