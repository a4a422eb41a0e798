//! Transfer Request Manager
//!
//! Creates transfer requests and reserves source stock at request time.
//! All validation happens after the source stock row lock is acquired, on
//! re-read values: the lock is what turns check-then-act into a serialized
//! sequence. Duplicate suppression for a (from, to, medication) triple
//! rides on that same lock, since every creator for the triple must lock
//! the same source row, with the partial unique index as backstop.

use sqlx::postgres::PgPool;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::db::TransferDb;
use super::error::TransferError;
use super::types::{NewTransfer, TransferRecord};
use crate::core_types::{BranchId, UserId};
use crate::ledger::LedgerDb;
use crate::notify::NotificationHook;

const TRANSFER_ALL_REASON: &str = "Transfer of all available stock";

pub struct TransferManager {
    pool: PgPool,
    hook: Arc<dyn NotificationHook>,
}

impl TransferManager {
    pub fn new(pool: PgPool, hook: Arc<dyn NotificationHook>) -> Self {
        Self { pool, hook }
    }

    /// Create a transfer request and reserve the quantity on the source.
    ///
    /// One transaction: lock source row, re-validate availability, check for
    /// a duplicate pending request, insert the `pending` record, increment
    /// the reservation. Any failure rolls the whole sequence back.
    pub async fn create(&self, new: NewTransfer) -> Result<TransferRecord, TransferError> {
        if new.from_branch_id == new.to_branch_id {
            return Err(TransferError::SameBranch);
        }
        if new.quantity <= 0 {
            return Err(TransferError::InvalidQuantity);
        }

        let mut tx = self.pool.begin().await.map_err(TransferError::from)?;

        let source = LedgerDb::lock(&mut tx, new.from_branch_id, new.medication_id)
            .await?
            .ok_or(TransferError::SourceStockNotFound)?;

        // Recompute from the locked row; pre-lock reads may be stale
        let available = source.available_quantity();
        if available < new.quantity {
            return Err(TransferError::InsufficientStock {
                requested: new.quantity,
                available,
                total: source.quantity,
                reserved: source.reserved_quantity,
            });
        }

        // Redundant with the availability check, kept as a second guard on
        // the reserved <= quantity invariant
        if source.reserved_quantity + new.quantity > source.quantity {
            return Err(TransferError::ExcessReservation {
                requested: new.quantity,
                reserved: source.reserved_quantity,
                total: source.quantity,
            });
        }

        if TransferDb::pending_exists(
            &mut tx,
            new.from_branch_id,
            new.to_branch_id,
            new.medication_id,
        )
        .await?
        {
            return Err(TransferError::DuplicatePendingTransfer);
        }

        let record = TransferDb::insert(&mut tx, &new).await?;

        LedgerDb::adjust_reserved(&mut tx, new.from_branch_id, new.medication_id, new.quantity)
            .await?;

        tx.commit().await.map_err(TransferError::from)?;

        info!(
            transfer_id = record.transfer_id,
            from_branch = record.from_branch_id,
            to_branch = record.to_branch_id,
            medication_id = record.medication_id,
            quantity = record.quantity,
            "Transfer request created, stock reserved"
        );

        self.notify_created(&record).await;

        Ok(record)
    }

    /// Create transfer requests for every medication with available stock
    /// at the source branch.
    ///
    /// Iterates in ascending medication order, one row lock and one
    /// transaction per entry — never the whole branch at once. Entries with
    /// zero availability or an existing pending request to the same
    /// destination are skipped. `NoTransferableStock` when nothing was
    /// created.
    pub async fn create_all(
        &self,
        from_branch_id: BranchId,
        to_branch_id: BranchId,
        reason: &str,
        requested_by: UserId,
    ) -> Result<Vec<TransferRecord>, TransferError> {
        if from_branch_id == to_branch_id {
            return Err(TransferError::SameBranch);
        }

        let reason = if reason.trim().is_empty() {
            TRANSFER_ALL_REASON
        } else {
            reason
        };

        let medication_ids = LedgerDb::medication_ids(&self.pool, from_branch_id).await?;

        let mut created = Vec::new();
        for medication_id in medication_ids {
            let mut tx = self.pool.begin().await.map_err(TransferError::from)?;

            let Some(source) = LedgerDb::lock(&mut tx, from_branch_id, medication_id).await? else {
                continue;
            };

            let available = source.available_quantity();
            if available <= 0 {
                continue;
            }

            if TransferDb::pending_exists(&mut tx, from_branch_id, to_branch_id, medication_id)
                .await?
            {
                debug!(
                    from_branch = from_branch_id,
                    to_branch = to_branch_id,
                    medication_id,
                    "Skipping medication with pending transfer"
                );
                continue;
            }

            let new = NewTransfer::new(
                from_branch_id,
                to_branch_id,
                medication_id,
                available,
                reason,
                requested_by,
            );

            let record = match TransferDb::insert(&mut tx, &new).await {
                Ok(record) => record,
                // Lost the insert race to a concurrent creator; treat as skipped
                Err(TransferError::DuplicatePendingTransfer) => continue,
                Err(e) => return Err(e),
            };

            LedgerDb::adjust_reserved(&mut tx, from_branch_id, medication_id, available).await?;

            tx.commit().await.map_err(TransferError::from)?;

            self.notify_created(&record).await;
            created.push(record);
        }

        if created.is_empty() {
            return Err(TransferError::NoTransferableStock);
        }

        info!(
            from_branch = from_branch_id,
            to_branch = to_branch_id,
            count = created.len(),
            "Bulk transfer request created"
        );

        Ok(created)
    }

    /// Best-effort: a failed notification never unwinds a committed transfer
    async fn notify_created(&self, record: &TransferRecord) {
        if let Err(e) = self.hook.transfer_created(record).await {
            warn!(
                transfer_id = record.transfer_id,
                error = %e,
                "Transfer-created notification failed"
            );
        }
    }
}
