//! Stock Ledger row operations
//!
//! Every mutating function here takes `&mut PgConnection` and is meant to run
//! inside the caller's transaction, after the row has been locked with
//! `SELECT ... FOR UPDATE`. The ledger never mutates a row outside a lock.

use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::Row;
use thiserror::Error;

use super::entry::BranchStockEntry;
use crate::core_types::{BranchId, MedicationId, Quantity};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Stock entry not found for branch {branch_id}, medication {medication_id}")]
    EntryNotFound {
        branch_id: BranchId,
        medication_id: MedicationId,
    },

    #[error("Insufficient reservation: reserved {reserved}, delta {delta}")]
    InsufficientReservation { reserved: Quantity, delta: Quantity },

    #[error(
        "Stock adjustment would go negative: quantity {quantity}{quantity_delta:+}, reserved {reserved}{reserved_delta:+}"
    )]
    Underflow {
        quantity: Quantity,
        reserved: Quantity,
        quantity_delta: Quantity,
        reserved_delta: Quantity,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row-level ledger operations on `branch_stock_tb`
pub struct LedgerDb;

const ENTRY_COLUMNS: &str = "branch_id, medication_id, quantity, reserved_quantity, last_updated";

impl LedgerDb {
    /// Load one entry under an exclusive row lock.
    ///
    /// Blocks until any concurrent holder commits; callers must re-derive
    /// availability from the returned row, never from a pre-lock read.
    pub async fn lock(
        conn: &mut PgConnection,
        branch_id: BranchId,
        medication_id: MedicationId,
    ) -> Result<Option<BranchStockEntry>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM branch_stock_tb \
             WHERE branch_id = $1 AND medication_id = $2 FOR UPDATE"
        ))
        .bind(branch_id)
        .bind(medication_id)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(|r| row_to_entry(&r)))
    }

    /// Lock both rows of a transfer in canonical order.
    ///
    /// Postgres acquires row locks in result order, so `ORDER BY branch_id`
    /// gives every caller the same acquisition order regardless of transfer
    /// direction. Returns the locked entries, ascending by branch id.
    pub async fn lock_pair(
        conn: &mut PgConnection,
        branch_a: BranchId,
        branch_b: BranchId,
        medication_id: MedicationId,
    ) -> Result<Vec<BranchStockEntry>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM branch_stock_tb \
             WHERE medication_id = $1 AND branch_id IN ($2, $3) \
             ORDER BY branch_id FOR UPDATE"
        ))
        .bind(medication_id)
        .bind(branch_a)
        .bind(branch_b)
        .fetch_all(conn)
        .await?;

        Ok(rows.iter().map(row_to_entry).collect())
    }

    /// Create the entry with zero counters if it does not exist yet.
    ///
    /// Does not lock; follow up with [`LedgerDb::lock`] or
    /// [`LedgerDb::lock_pair`] before mutating.
    pub async fn ensure_exists(
        conn: &mut PgConnection,
        branch_id: BranchId,
        medication_id: MedicationId,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO branch_stock_tb (branch_id, medication_id, quantity, reserved_quantity) \
             VALUES ($1, $2, 0, 0) \
             ON CONFLICT (branch_id, medication_id) DO NOTHING",
        )
        .bind(branch_id)
        .bind(medication_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Get-or-create followed by a row lock, in one call.
    pub async fn get_or_create_locked(
        conn: &mut PgConnection,
        branch_id: BranchId,
        medication_id: MedicationId,
    ) -> Result<BranchStockEntry, LedgerError> {
        Self::ensure_exists(conn, branch_id, medication_id).await?;
        Self::lock(conn, branch_id, medication_id)
            .await?
            .ok_or(LedgerError::EntryNotFound {
                branch_id,
                medication_id,
            })
    }

    /// Absolute overwrite of the quantity counter (manual stock edits).
    ///
    /// Deliberately does NOT guard `reserved <= quantity`: operators are
    /// trusted to correct physical counts even while reservations are in
    /// flight. When the edit strands reserved above quantity we log it so
    /// operational tooling can flag the row, but the edit still applies.
    pub async fn set_quantity(
        conn: &mut PgConnection,
        branch_id: BranchId,
        medication_id: MedicationId,
        new_quantity: Quantity,
    ) -> Result<BranchStockEntry, LedgerError> {
        let row = sqlx::query(&format!(
            "UPDATE branch_stock_tb \
             SET quantity = $3, last_updated = NOW() \
             WHERE branch_id = $1 AND medication_id = $2 \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(branch_id)
        .bind(medication_id)
        .bind(new_quantity)
        .fetch_optional(conn)
        .await?
        .ok_or(LedgerError::EntryNotFound {
            branch_id,
            medication_id,
        })?;

        let entry = row_to_entry(&row);
        if entry.reserved_quantity > entry.quantity {
            tracing::warn!(
                branch_id,
                medication_id,
                quantity = entry.quantity,
                reserved = entry.reserved_quantity,
                "Manual edit left reserved above quantity"
            );
        }

        Ok(entry)
    }

    /// Atomic increment/decrement of the reserved counter.
    ///
    /// Single-statement update with the non-negativity guard in SQL, so a
    /// stale in-process value can never drive the counter below zero.
    pub async fn adjust_reserved(
        conn: &mut PgConnection,
        branch_id: BranchId,
        medication_id: MedicationId,
        delta: Quantity,
    ) -> Result<BranchStockEntry, LedgerError> {
        let row = sqlx::query(&format!(
            "UPDATE branch_stock_tb \
             SET reserved_quantity = reserved_quantity + $3, last_updated = NOW() \
             WHERE branch_id = $1 AND medication_id = $2 \
               AND reserved_quantity + $3 >= 0 \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(branch_id)
        .bind(medication_id)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(r) => Ok(row_to_entry(&r)),
            None => match Self::lock(conn, branch_id, medication_id).await? {
                Some(entry) => Err(LedgerError::InsufficientReservation {
                    reserved: entry.reserved_quantity,
                    delta,
                }),
                None => Err(LedgerError::EntryNotFound {
                    branch_id,
                    medication_id,
                }),
            },
        }
    }

    /// Single atomic update of both counters.
    ///
    /// Used by the approval engine to debit source quantity+reserved (and
    /// credit destinations) without a window where only one field moved.
    pub async fn adjust_quantity_and_reserved(
        conn: &mut PgConnection,
        branch_id: BranchId,
        medication_id: MedicationId,
        quantity_delta: Quantity,
        reserved_delta: Quantity,
    ) -> Result<BranchStockEntry, LedgerError> {
        let row = sqlx::query(&format!(
            "UPDATE branch_stock_tb \
             SET quantity = quantity + $3, \
                 reserved_quantity = reserved_quantity + $4, \
                 last_updated = NOW() \
             WHERE branch_id = $1 AND medication_id = $2 \
               AND quantity + $3 >= 0 AND reserved_quantity + $4 >= 0 \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(branch_id)
        .bind(medication_id)
        .bind(quantity_delta)
        .bind(reserved_delta)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(r) => Ok(row_to_entry(&r)),
            None => match Self::lock(conn, branch_id, medication_id).await? {
                Some(entry) => Err(LedgerError::Underflow {
                    quantity: entry.quantity,
                    reserved: entry.reserved_quantity,
                    quantity_delta,
                    reserved_delta,
                }),
                None => Err(LedgerError::EntryNotFound {
                    branch_id,
                    medication_id,
                }),
            },
        }
    }

    /// Plain read, no lock (availability queries, dashboards)
    pub async fn get(
        pool: &PgPool,
        branch_id: BranchId,
        medication_id: MedicationId,
    ) -> Result<Option<BranchStockEntry>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM branch_stock_tb \
             WHERE branch_id = $1 AND medication_id = $2"
        ))
        .bind(branch_id)
        .bind(medication_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| row_to_entry(&r)))
    }

    /// Medication ids stocked at a branch, ascending.
    ///
    /// Canonical iteration order for the bulk transfer path.
    pub async fn medication_ids(
        pool: &PgPool,
        branch_id: BranchId,
    ) -> Result<Vec<MedicationId>, LedgerError> {
        let rows = sqlx::query(
            "SELECT medication_id FROM branch_stock_tb \
             WHERE branch_id = $1 ORDER BY medication_id",
        )
        .bind(branch_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("medication_id")).collect())
    }
}

fn row_to_entry(row: &PgRow) -> BranchStockEntry {
    BranchStockEntry {
        branch_id: row.get("branch_id"),
        medication_id: row.get("medication_id"),
        quantity: row.get("quantity"),
        reserved_quantity: row.get("reserved_quantity"),
        last_updated: row.get("last_updated"),
    }
}
