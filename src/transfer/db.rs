//! Transfer persistence layer
//!
//! Inserts run inside the transaction that holds the source stock row lock,
//! so the duplicate-pending existence check and the reservation commit or
//! roll back together. Status flips are guarded with a `WHERE status = ...`
//! CAS even though callers hold the row lock.

use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::Row;

use super::error::TransferError;
use super::status::TransferStatus;
use super::types::{NewTransfer, TransferRecord};
use crate::core_types::{BranchId, MedicationId, TransferId, UserId};

/// Transfer database operations
pub struct TransferDb;

const TRANSFER_COLUMNS: &str = "transfer_id, from_branch_id, to_branch_id, medication_id, \
     quantity, status, reason, requested_by, approved_by, requested_at, completed_at, notes";

impl TransferDb {
    /// Insert a new transfer in `pending` state.
    ///
    /// The partial unique index on pending triples backstops the
    /// application-level duplicate check; a violation surfaces as
    /// `DuplicatePendingTransfer`, same as the check itself.
    pub async fn insert(
        conn: &mut PgConnection,
        new: &NewTransfer,
    ) -> Result<TransferRecord, TransferError> {
        let result = sqlx::query(&format!(
            "INSERT INTO stock_transfers_tb \
                 (from_branch_id, to_branch_id, medication_id, quantity, status, \
                  reason, requested_by, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {TRANSFER_COLUMNS}"
        ))
        .bind(new.from_branch_id)
        .bind(new.to_branch_id)
        .bind(new.medication_id)
        .bind(new.quantity)
        .bind(TransferStatus::Pending.id())
        .bind(&new.reason)
        .bind(new.requested_by)
        .bind(&new.notes)
        .fetch_one(conn)
        .await;

        match result {
            Ok(row) => row_to_record(&row),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(TransferError::DuplicatePendingTransfer)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a transfer by id, no lock
    pub async fn get(
        pool: &PgPool,
        transfer_id: TransferId,
    ) -> Result<Option<TransferRecord>, TransferError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers_tb WHERE transfer_id = $1"
        ))
        .bind(transfer_id)
        .fetch_optional(pool)
        .await?;

        row.map(|r| row_to_record(&r)).transpose()
    }

    /// Load a transfer under an exclusive row lock.
    ///
    /// Serializes concurrent approvers/cancellers; the caller must re-check
    /// `status` on the returned record, not on any earlier read.
    pub async fn lock(
        conn: &mut PgConnection,
        transfer_id: TransferId,
    ) -> Result<Option<TransferRecord>, TransferError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers_tb \
             WHERE transfer_id = $1 FOR UPDATE"
        ))
        .bind(transfer_id)
        .fetch_optional(conn)
        .await?;

        row.map(|r| row_to_record(&r)).transpose()
    }

    /// Is there a pending transfer for this (from, to, medication) triple?
    pub async fn pending_exists(
        conn: &mut PgConnection,
        from_branch_id: BranchId,
        to_branch_id: BranchId,
        medication_id: MedicationId,
    ) -> Result<bool, TransferError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM stock_transfers_tb \
                 WHERE from_branch_id = $1 AND to_branch_id = $2 \
                   AND medication_id = $3 AND status = $4)",
        )
        .bind(from_branch_id)
        .bind(to_branch_id)
        .bind(medication_id)
        .bind(TransferStatus::Pending.id())
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }

    /// Flip `pending -> completed`, stamping approver and completion time.
    ///
    /// Returns false if the transfer was not pending anymore (another
    /// worker got there first).
    pub async fn complete(
        conn: &mut PgConnection,
        transfer_id: TransferId,
        approved_by: UserId,
    ) -> Result<bool, TransferError> {
        let result = sqlx::query(
            "UPDATE stock_transfers_tb \
             SET status = $1, approved_by = $2, completed_at = NOW() \
             WHERE transfer_id = $3 AND status = $4",
        )
        .bind(TransferStatus::Completed.id())
        .bind(approved_by)
        .bind(transfer_id)
        .bind(TransferStatus::Pending.id())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip `pending -> cancelled`, recording who cancelled and why.
    pub async fn cancel(
        conn: &mut PgConnection,
        transfer_id: TransferId,
        cancelled_by: UserId,
        notes: Option<&str>,
    ) -> Result<bool, TransferError> {
        let result = sqlx::query(
            "UPDATE stock_transfers_tb \
             SET status = $1, approved_by = $2, completed_at = NOW(), \
                 notes = COALESCE($3, notes) \
             WHERE transfer_id = $4 AND status = $5",
        )
        .bind(TransferStatus::Cancelled.id())
        .bind(cancelled_by)
        .bind(notes)
        .bind(transfer_id)
        .bind(TransferStatus::Pending.id())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Latest transfers touching a branch, in either direction
    pub async fn recent_for_branch(
        pool: &PgPool,
        branch_id: BranchId,
        limit: i64,
    ) -> Result<Vec<TransferRecord>, TransferError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers_tb \
             WHERE from_branch_id = $1 OR to_branch_id = $1 \
             ORDER BY requested_at DESC LIMIT $2"
        ))
        .bind(branch_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// Count of pending transfers system-wide (dashboard counter)
    pub async fn count_pending(pool: &PgPool) -> Result<i64, TransferError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_transfers_tb WHERE status = $1")
                .bind(TransferStatus::Pending.id())
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

fn row_to_record(row: &PgRow) -> Result<TransferRecord, TransferError> {
    let status_id: i16 = row.get("status");
    let status = TransferStatus::from_id(status_id)
        .ok_or_else(|| TransferError::Internal(format!("Invalid status ID: {}", status_id)))?;

    Ok(TransferRecord {
        transfer_id: row.get("transfer_id"),
        from_branch_id: row.get("from_branch_id"),
        to_branch_id: row.get("to_branch_id"),
        medication_id: row.get("medication_id"),
        quantity: row.get("quantity"),
        status,
        reason: row.get("reason"),
        requested_by: row.get("requested_by"),
        approved_by: row.get("approved_by"),
        requested_at: row.get("requested_at"),
        completed_at: row.get("completed_at"),
        notes: row.get("notes"),
    })
}
