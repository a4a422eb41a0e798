//! Transfer Approval Engine
//!
//! Executes or cancels pending transfers. Everything runs in one
//! transaction: re-validate under lock, move both counters, flip the
//! status. A failure at any step rolls all of it back, so partial stock
//! movement is never visible.

use sqlx::postgres::PgPool;
use tracing::info;

use super::db::TransferDb;
use super::error::TransferError;
use super::status::TransferStatus;
use super::types::TransferRecord;
use crate::core_types::{TransferId, UserId};
use crate::ledger::LedgerDb;

pub struct ApprovalEngine {
    pool: PgPool,
}

impl ApprovalEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Approve a pending transfer: debit source, credit destination,
    /// release the reservation, mark completed.
    ///
    /// The transfer row lock serializes concurrent approvers; the status is
    /// re-checked on the locked row, so the loser of a race gets
    /// `AlreadyProcessed` instead of double-moving stock. Both stock rows
    /// are then locked in ascending branch order, the same order regardless
    /// of transfer direction.
    pub async fn approve(
        &self,
        transfer_id: TransferId,
        approved_by: UserId,
    ) -> Result<TransferRecord, TransferError> {
        let mut tx = self.pool.begin().await.map_err(TransferError::from)?;

        let transfer = TransferDb::lock(&mut tx, transfer_id)
            .await?
            .ok_or(TransferError::TransferNotFound(transfer_id))?;

        if transfer.status != TransferStatus::Pending {
            return Err(TransferError::AlreadyProcessed {
                status: transfer.status,
            });
        }

        // Destination entry is created on demand; doing it before taking the
        // pair lock keeps the lock acquisition in one canonically-ordered
        // statement.
        LedgerDb::ensure_exists(&mut tx, transfer.to_branch_id, transfer.medication_id).await?;

        let entries = LedgerDb::lock_pair(
            &mut tx,
            transfer.from_branch_id,
            transfer.to_branch_id,
            transfer.medication_id,
        )
        .await?;

        let source = entries
            .iter()
            .find(|e| e.branch_id == transfer.from_branch_id)
            .ok_or(TransferError::SourceStockNotFound)?;

        if source.quantity < transfer.quantity {
            return Err(TransferError::InsufficientStock {
                requested: transfer.quantity,
                available: source.available_quantity(),
                total: source.quantity,
                reserved: source.reserved_quantity,
            });
        }

        // The reservation made at request time must still cover this
        // transfer; guards against external reservation tampering
        if source.reserved_quantity < transfer.quantity {
            return Err(TransferError::InsufficientReservation {
                reserved: source.reserved_quantity,
                requested: transfer.quantity,
            });
        }

        LedgerDb::adjust_quantity_and_reserved(
            &mut tx,
            transfer.from_branch_id,
            transfer.medication_id,
            -transfer.quantity,
            -transfer.quantity,
        )
        .await?;

        LedgerDb::adjust_quantity_and_reserved(
            &mut tx,
            transfer.to_branch_id,
            transfer.medication_id,
            transfer.quantity,
            0,
        )
        .await?;

        if !TransferDb::complete(&mut tx, transfer_id, approved_by).await? {
            // Unreachable while we hold the row lock
            return Err(TransferError::Internal(format!(
                "Transfer {} status changed under lock",
                transfer_id
            )));
        }

        tx.commit().await.map_err(TransferError::from)?;

        info!(
            transfer_id,
            from_branch = transfer.from_branch_id,
            to_branch = transfer.to_branch_id,
            medication_id = transfer.medication_id,
            quantity = transfer.quantity,
            approved_by,
            "Transfer approved and executed"
        );

        TransferDb::get(&self.pool, transfer_id)
            .await?
            .ok_or_else(|| {
                TransferError::Internal(format!("Transfer {} vanished after completion", transfer_id))
            })
    }

    /// Cancel a pending transfer and release its reservation.
    ///
    /// Terminal states reject this with `AlreadyProcessed`. If the source
    /// reservation was externally driven below the transfer quantity,
    /// cancellation fails with `InsufficientReservation` rather than
    /// silently under-releasing.
    pub async fn cancel(
        &self,
        transfer_id: TransferId,
        cancelled_by: UserId,
        notes: Option<&str>,
    ) -> Result<TransferRecord, TransferError> {
        let mut tx = self.pool.begin().await.map_err(TransferError::from)?;

        let transfer = TransferDb::lock(&mut tx, transfer_id)
            .await?
            .ok_or(TransferError::TransferNotFound(transfer_id))?;

        if transfer.status != TransferStatus::Pending {
            return Err(TransferError::AlreadyProcessed {
                status: transfer.status,
            });
        }

        LedgerDb::lock(&mut tx, transfer.from_branch_id, transfer.medication_id)
            .await?
            .ok_or(TransferError::SourceStockNotFound)?;

        LedgerDb::adjust_reserved(
            &mut tx,
            transfer.from_branch_id,
            transfer.medication_id,
            -transfer.quantity,
        )
        .await?;

        if !TransferDb::cancel(&mut tx, transfer_id, cancelled_by, notes).await? {
            return Err(TransferError::Internal(format!(
                "Transfer {} status changed under lock",
                transfer_id
            )));
        }

        tx.commit().await.map_err(TransferError::from)?;

        info!(transfer_id, cancelled_by, "Transfer cancelled, reservation released");

        TransferDb::get(&self.pool, transfer_id)
            .await?
            .ok_or_else(|| {
                TransferError::Internal(format!(
                    "Transfer {} vanished after cancellation",
                    transfer_id
                ))
            })
    }
}
