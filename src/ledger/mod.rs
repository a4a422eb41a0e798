//! Stock Ledger
//!
//! Owns the per-(branch, medication) quantity and reservation counters.
//! Row-level primitives live in [`db`] and run inside the calling
//! operation's transaction; [`StockLedger`] is the public surface for
//! manual edits and availability queries.

pub mod db;
pub mod entry;

pub use db::{LedgerDb, LedgerError};
pub use entry::BranchStockEntry;

use sqlx::postgres::PgPool;
use sqlx::Row;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::MedicationCatalog;
use crate::core_types::{BranchId, MedicationId, Quantity};
use crate::notify::NotificationHook;

/// Aggregate stock figures for one branch (dashboards)
#[derive(Debug, Clone, serde::Serialize)]
pub struct BranchSummary {
    pub medication_count: i64,
    pub total_quantity: Quantity,
}

/// A stock entry at or below its medication's configured minimum
#[derive(Debug, Clone, serde::Serialize)]
pub struct LowStockEntry {
    pub entry: BranchStockEntry,
    pub medication_name: String,
    pub minimum_stock: Quantity,
}

pub struct StockLedger {
    pool: PgPool,
    hook: Arc<dyn NotificationHook>,
}

impl StockLedger {
    pub fn new(pool: PgPool, hook: Arc<dyn NotificationHook>) -> Self {
        Self { pool, hook }
    }

    /// Current entry, if the branch has ever stocked the medication
    pub async fn get(
        &self,
        branch_id: BranchId,
        medication_id: MedicationId,
    ) -> Result<Option<BranchStockEntry>, LedgerError> {
        LedgerDb::get(&self.pool, branch_id, medication_id).await
    }

    /// Units that can be newly reserved or sold; zero for unknown entries
    pub async fn available_quantity(
        &self,
        branch_id: BranchId,
        medication_id: MedicationId,
    ) -> Result<Quantity, LedgerError> {
        Ok(self
            .get(branch_id, medication_id)
            .await?
            .map(|e| e.available_quantity())
            .unwrap_or(0))
    }

    /// Manual stock correction: absolute overwrite of the quantity counter.
    ///
    /// Creates the entry on first use. Runs in its own transaction under the
    /// row lock. The reserved counter is untouched and NOT validated against
    /// the new quantity (trust-the-operator escape hatch; a warning is
    /// logged when the edit strands reserved above quantity). Fires a
    /// best-effort low-stock notification after commit when the result sits
    /// at or below the medication's minimum.
    pub async fn set_quantity(
        &self,
        branch_id: BranchId,
        medication_id: MedicationId,
        new_quantity: Quantity,
    ) -> Result<BranchStockEntry, LedgerError> {
        let mut tx = self.pool.begin().await?;

        LedgerDb::get_or_create_locked(&mut tx, branch_id, medication_id).await?;
        let entry = LedgerDb::set_quantity(&mut tx, branch_id, medication_id, new_quantity).await?;

        tx.commit().await?;

        info!(
            branch_id,
            medication_id,
            quantity = entry.quantity,
            reserved = entry.reserved_quantity,
            "Stock quantity set"
        );

        self.check_low_stock(&entry).await?;

        Ok(entry)
    }

    /// Distinct medication count and total units at a branch
    pub async fn branch_summary(&self, branch_id: BranchId) -> Result<BranchSummary, LedgerError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS medication_count, \
                    COALESCE(SUM(quantity), 0)::BIGINT AS total_quantity \
             FROM branch_stock_tb WHERE branch_id = $1",
        )
        .bind(branch_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(BranchSummary {
            medication_count: row.get("medication_count"),
            total_quantity: row.get("total_quantity"),
        })
    }

    /// Entries whose availability sits at or below the catalog minimum
    pub async fn low_stock_entries(
        &self,
        branch_id: BranchId,
    ) -> Result<Vec<LowStockEntry>, LedgerError> {
        let rows = sqlx::query(
            "SELECT b.branch_id, b.medication_id, b.quantity, b.reserved_quantity, \
                    b.last_updated, m.name, m.minimum_stock \
             FROM branch_stock_tb b \
             JOIN medications_tb m ON m.medication_id = b.medication_id \
             WHERE b.branch_id = $1 \
               AND GREATEST(b.quantity - b.reserved_quantity, 0) <= m.minimum_stock \
             ORDER BY b.medication_id",
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| LowStockEntry {
                entry: BranchStockEntry {
                    branch_id: r.get("branch_id"),
                    medication_id: r.get("medication_id"),
                    quantity: r.get("quantity"),
                    reserved_quantity: r.get("reserved_quantity"),
                    last_updated: r.get("last_updated"),
                },
                medication_name: r.get("name"),
                minimum_stock: r.get("minimum_stock"),
            })
            .collect())
    }

    /// Low-stock evaluation against the external catalog; best-effort hook
    async fn check_low_stock(&self, entry: &BranchStockEntry) -> Result<(), LedgerError> {
        let Some(medication) = MedicationCatalog::get(&self.pool, entry.medication_id).await?
        else {
            // Unknown to the catalog; nothing to evaluate against
            return Ok(());
        };

        if entry.is_low_stock(medication.minimum_stock) {
            if let Err(e) = self
                .hook
                .low_stock(
                    entry.branch_id,
                    entry.medication_id,
                    entry.available_quantity(),
                )
                .await
            {
                warn!(
                    branch_id = entry.branch_id,
                    medication_id = entry.medication_id,
                    error = %e,
                    "Low-stock notification failed"
                );
            }
        }

        Ok(())
    }
}
