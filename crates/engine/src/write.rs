//! Write path: route each mutation to exactly one shard
//!
//! Every write is validated against the collection configuration before any
//! shard is touched, then routed with [`ShardRouter`](shardvec_storage::ShardRouter)
//! (through [`CollectionHandle::route`]) and applied by that shard alone.
//!
//! # Upsert
//!
//! Upsert is [`ShardStore::replace`](shardvec_storage::ShardStore::replace):
//! a logical delete of the current row followed by an append of the new one,
//! both under the shard's writer lock. Concurrent upserts of one id therefore
//! leave exactly one live row. It is still not atomic: a crash in between
//! leaves the id absent, and a concurrent reader may briefly see no live row.
//!
//! # Batches
//!
//! Batch items are applied one by one and independently. A failing item is
//! reported in the [`BatchReport`] and does not stop the rest.

use crate::registry::CollectionHandle;
use shardvec_core::{
    validate_vector_id, BatchItem, BatchReport, Error, Result, VectorRecord, WriteReceipt,
};
use tracing::debug;

/// Single entry point for mutating a collection
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteCoordinator;

impl WriteCoordinator {
    /// Create a coordinator
    pub fn new() -> Self {
        WriteCoordinator
    }

    fn validate(collection: &CollectionHandle, record: &VectorRecord) -> Result<()> {
        collection.config().check_dimension(&record.vector)?;
        record.validate()
    }

    /// Append a record to its owning shard.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if the vector length differs from the collection dimension
    /// - `InvalidName` / `InvalidArgument` for an empty id or non-finite values
    /// - `Store` if the shard cannot be opened or written
    pub fn add(&self, collection: &CollectionHandle, record: VectorRecord) -> Result<WriteReceipt> {
        Self::validate(collection, &record)?;
        let (shard, store) = collection.shard_for_id(&record.id)?;
        let id = record.id.clone();
        store.append(record)?;

        debug!(
            target: "shardvec::write",
            collection = %collection.name(),
            id = %id,
            shard,
            "add"
        );
        Ok(WriteReceipt {
            id,
            shard,
            outcome: None,
        })
    }

    /// Logically delete the newest live row for `id`.
    ///
    /// Returns `false` when there was nothing to delete.
    pub fn delete(&self, collection: &CollectionHandle, id: &str) -> Result<bool> {
        validate_vector_id(id)?;
        let (shard, store) = collection.shard_for_id(id)?;
        let found = store.logical_delete(id)?;

        debug!(
            target: "shardvec::write",
            collection = %collection.name(),
            id,
            shard,
            found,
            "delete"
        );
        Ok(found)
    }

    /// Newest live record for `id`
    pub fn get(&self, collection: &CollectionHandle, id: &str) -> Result<Option<VectorRecord>> {
        validate_vector_id(id)?;
        let (_, store) = collection.shard_for_id(id)?;
        Ok(store.get(id)?)
    }

    /// Insert or replace the record for `record.id`.
    ///
    /// A replacement keeps the original `created_at`.
    pub fn upsert(&self, collection: &CollectionHandle, record: VectorRecord) -> Result<WriteReceipt> {
        Self::validate(collection, &record)?;
        let (shard, store) = collection.shard_for_id(&record.id)?;
        let id = record.id.clone();
        let outcome = store.replace(record)?;

        debug!(
            target: "shardvec::write",
            collection = %collection.name(),
            id = %id,
            shard,
            outcome = ?outcome,
            "upsert"
        );
        Ok(WriteReceipt {
            id,
            shard,
            outcome: Some(outcome),
        })
    }

    /// Add each record independently
    pub fn add_batch(&self, collection: &CollectionHandle, records: Vec<VectorRecord>) -> BatchReport {
        let mut report = BatchReport::default();
        for record in records {
            let id = record.id.clone();
            report.push(match self.add(collection, record) {
                Ok(receipt) => applied(receipt),
                Err(e) => {
                    let shard = routed_shard(collection, &e, &id);
                    rejected(id, shard, e.to_string())
                }
            });
        }
        report
    }

    /// Upsert each record independently
    pub fn upsert_batch(
        &self,
        collection: &CollectionHandle,
        records: Vec<VectorRecord>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for record in records {
            let id = record.id.clone();
            report.push(match self.upsert(collection, record) {
                Ok(receipt) => applied(receipt),
                Err(e) => {
                    let shard = routed_shard(collection, &e, &id);
                    rejected(id, shard, e.to_string())
                }
            });
        }
        report
    }

    /// Delete each id independently.
    ///
    /// An id with no live record is reported as unsuccessful without an error.
    pub fn delete_batch<S: AsRef<str>>(&self, collection: &CollectionHandle, ids: &[S]) -> BatchReport {
        let mut report = BatchReport::default();
        for id in ids {
            let id = id.as_ref();
            report.push(match self.delete(collection, id) {
                Ok(found) => BatchItem {
                    id: id.to_string(),
                    success: found,
                    shard: Some(collection.route(id)),
                    outcome: None,
                    error: if found {
                        None
                    } else {
                        Some(
                            Error::VectorNotFound {
                                id: id.to_string(),
                            }
                            .to_string(),
                        )
                    },
                },
                Err(e) => rejected(id.to_string(), routed_shard(collection, &e, id), e.to_string()),
            });
        }
        report
    }
}

fn applied(receipt: WriteReceipt) -> BatchItem {
    BatchItem {
        id: receipt.id,
        success: true,
        shard: Some(receipt.shard),
        outcome: receipt.outcome,
        error: None,
    }
}

fn rejected(id: String, shard: Option<u32>, error: String) -> BatchItem {
    BatchItem {
        id,
        success: false,
        shard,
        outcome: None,
        error: Some(error),
    }
}

/// Shard an item was routed to, unless it failed validation before routing
fn routed_shard(collection: &CollectionHandle, error: &Error, id: &str) -> Option<u32> {
    if error.is_validation() {
        None
    } else {
        Some(collection.route(id))
    }
}
