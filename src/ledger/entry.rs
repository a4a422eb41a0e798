//! Per-branch stock record

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core_types::{BranchId, MedicationId, Quantity};

/// Stock record for one medication at one branch.
///
/// Keyed by `(branch_id, medication_id)`, unique. Created lazily on the
/// first adjustment or transfer reservation; never deleted, only zeroed.
///
/// Post-commit invariant: `reserved_quantity <= quantity` — upheld by every
/// engine operation except direct manual quantity edits, which are allowed
/// to break it (and are logged when they do).
#[derive(Debug, Clone, Serialize)]
pub struct BranchStockEntry {
    pub branch_id: BranchId,
    pub medication_id: MedicationId,
    /// Total physical units at the branch
    pub quantity: Quantity,
    /// Units earmarked for in-flight transfers
    pub reserved_quantity: Quantity,
    pub last_updated: DateTime<Utc>,
}

impl BranchStockEntry {
    /// Units that can be newly reserved or sold.
    ///
    /// Clamped at zero so a manually corrupted row (reserved > quantity)
    /// never reports negative availability.
    pub fn available_quantity(&self) -> Quantity {
        (self.quantity - self.reserved_quantity).max(0)
    }

    /// Low-stock check against the medication's configured minimum.
    ///
    /// Evaluated on availability, not raw quantity: units reserved for a
    /// transfer cannot cover local demand.
    pub fn is_low_stock(&self, minimum_stock: Quantity) -> bool {
        self.available_quantity() <= minimum_stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(quantity: Quantity, reserved: Quantity) -> BranchStockEntry {
        BranchStockEntry {
            branch_id: 1,
            medication_id: 100,
            quantity,
            reserved_quantity: reserved,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_available_quantity() {
        assert_eq!(entry(100, 0).available_quantity(), 100);
        assert_eq!(entry(100, 30).available_quantity(), 70);
        assert_eq!(entry(10, 10).available_quantity(), 0);
    }

    #[test]
    fn test_available_quantity_clamps_at_zero() {
        // Manual edits may strand reserved above quantity
        assert_eq!(entry(5, 12).available_quantity(), 0);
    }

    #[test]
    fn test_low_stock_uses_availability() {
        // 100 on hand but 95 reserved: effectively 5 available
        let e = entry(100, 95);
        assert!(e.is_low_stock(10));
        assert!(e.is_low_stock(5));
        assert!(!e.is_low_stock(4));
    }
}
