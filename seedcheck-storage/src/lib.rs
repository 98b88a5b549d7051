//! seedcheck Storage - Store Trait and In-Memory Implementation
//!
//! Defines the store collaborator the seeder and verifier talk to, plus an
//! in-memory store for tests. Real backends implement [`EntityStore`] on top
//! of their own transaction handling.

use seedcheck_core::{Entity, Predicate, Record, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Queryable, mutable collection of entities.
///
/// `add` stages an entity; nothing is visible to `find_one` until `commit`
/// succeeds. Seeders call `commit` at most once per table.
pub trait EntityStore: Send + Sync {
    /// Stage an entity for the next commit.
    fn add<T: Entity>(&self, entity: &T) -> StoreResult<()>;

    /// Make all staged entities durable.
    fn commit(&self) -> StoreResult<()>;

    /// Discard everything staged since the last commit.
    fn rollback(&self) -> StoreResult<()>;

    /// The single committed entity matching `predicate`, if any.
    ///
    /// Returns `StoreError::AmbiguousMatch` when more than one entity
    /// matches; implementations must not pick one.
    fn find_one<T: Entity>(&self, predicate: &Predicate<T>) -> StoreResult<Option<T>>;
}

impl<S: EntityStore> EntityStore for Arc<S> {
    fn add<T: Entity>(&self, entity: &T) -> StoreResult<()> {
        (**self).add(entity)
    }

    fn commit(&self) -> StoreResult<()> {
        (**self).commit()
    }

    fn rollback(&self) -> StoreResult<()> {
        (**self).rollback()
    }

    fn find_one<T: Entity>(&self, predicate: &Predicate<T>) -> StoreResult<Option<T>> {
        (**self).find_one(predicate)
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

type Partitions = HashMap<&'static str, Vec<Record>>;

/// In-memory store for testing.
///
/// Entities are kept as field records partitioned by entity name. Clones
/// share the same underlying state.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    committed: Arc<RwLock<Partitions>>,
    pending: Arc<RwLock<Partitions>>,
    commit_failure: Arc<RwLock<Option<String>>>,
    add_failure: Arc<RwLock<Option<(usize, String)>>>,
    commits: Arc<AtomicUsize>,
}

fn read(lock: &RwLock<Partitions>) -> StoreResult<RwLockReadGuard<'_, Partitions>> {
    lock.read().map_err(|_| StoreError::LockPoisoned)
}

fn write(lock: &RwLock<Partitions>) -> StoreResult<RwLockWriteGuard<'_, Partitions>> {
    lock.write().map_err(|_| StoreError::LockPoisoned)
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an entity straight into committed state, bypassing staging.
    pub fn insert_committed<T: Entity>(&self, entity: &T) -> StoreResult<()> {
        write(&self.committed)?
            .entry(T::ENTITY_NAME)
            .or_default()
            .push(entity.to_record());
        Ok(())
    }

    /// Make the next `commit` fail with `reason`. The staged entities are discarded.
    pub fn fail_next_commit(&self, reason: impl Into<String>) -> StoreResult<()> {
        let mut failure = self
            .commit_failure
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        *failure = Some(reason.into());
        Ok(())
    }

    /// Let `successes` more adds through, then fail the next one with `reason`.
    pub fn fail_add_after(&self, successes: usize, reason: impl Into<String>) -> StoreResult<()> {
        let mut failure = self
            .add_failure
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        *failure = Some((successes, reason.into()));
        Ok(())
    }

    /// Clear all stored and staged data.
    pub fn clear(&self) -> StoreResult<()> {
        write(&self.committed)?.clear();
        write(&self.pending)?.clear();
        self.commits.store(0, Ordering::SeqCst);
        Ok(())
    }

    /// Number of committed entities of type `T`.
    pub fn count<T: Entity>(&self) -> StoreResult<usize> {
        Ok(read(&self.committed)?
            .get(T::ENTITY_NAME)
            .map_or(0, Vec::len))
    }

    /// Number of staged, uncommitted entities across all types.
    pub fn pending_count(&self) -> StoreResult<usize> {
        Ok(read(&self.pending)?.values().map(Vec::len).sum())
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// All committed entities of type `T`, in insertion order.
    pub fn all<T: Entity>(&self) -> StoreResult<Vec<T>> {
        read(&self.committed)?
            .get(T::ENTITY_NAME)
            .map(|records| records.iter().map(decode::<T>).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Committed state as JSON, keyed by entity name. Handy in failure output.
    pub fn snapshot_json(&self) -> StoreResult<serde_json::Value> {
        let committed = read(&self.committed)?;
        let ordered: BTreeMap<&str, &Vec<Record>> =
            committed.iter().map(|(name, records)| (*name, records)).collect();
        serde_json::to_value(ordered).map_err(|e| StoreError::Serialization {
            reason: e.to_string(),
        })
    }
}

fn decode<T: Entity>(record: &Record) -> StoreResult<T> {
    T::from_record(record).map_err(|source| StoreError::CorruptRecord {
        entity: T::ENTITY_NAME,
        source,
    })
}

impl EntityStore for InMemoryStore {
    fn add<T: Entity>(&self, entity: &T) -> StoreResult<()> {
        let mut failure = self
            .add_failure
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        match failure.take() {
            Some((0, reason)) => {
                return Err(StoreError::AddFailed {
                    entity: T::ENTITY_NAME,
                    reason,
                })
            }
            Some((remaining, reason)) => *failure = Some((remaining - 1, reason)),
            None => {}
        }
        drop(failure);

        write(&self.pending)?
            .entry(T::ENTITY_NAME)
            .or_default()
            .push(entity.to_record());
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let failure = self
            .commit_failure
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .take();
        let mut pending = write(&self.pending)?;

        if let Some(reason) = failure {
            let discarded: usize = pending.values().map(Vec::len).sum();
            pending.clear();
            tracing::warn!(discarded, reason = %reason, "In-memory commit failed");
            return Err(StoreError::CommitFailed { reason });
        }

        let mut committed = write(&self.committed)?;
        let mut published = 0usize;
        for (entity, records) in pending.drain() {
            published += records.len();
            committed.entry(entity).or_default().extend(records);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(published, "In-memory commit");
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        let mut pending = write(&self.pending)?;
        let discarded: usize = pending.values().map(Vec::len).sum();
        pending.clear();
        tracing::debug!(discarded, "In-memory rollback");
        Ok(())
    }

    fn find_one<T: Entity>(&self, predicate: &Predicate<T>) -> StoreResult<Option<T>> {
        let committed = read(&self.committed)?;
        let Some(records) = committed.get(T::ENTITY_NAME) else {
            return Ok(None);
        };

        let mut found: Option<T> = None;
        let mut matches = 0usize;
        for record in records {
            let candidate = decode::<T>(record)?;
            if predicate.matches(&candidate) {
                matches += 1;
                if found.is_none() {
                    found = Some(candidate);
                }
            }
        }

        if matches > 1 {
            return Err(StoreError::AmbiguousMatch {
                entity: T::ENTITY_NAME,
                matches,
            });
        }
        Ok(found)
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
