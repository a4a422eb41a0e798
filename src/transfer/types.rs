//! Transfer record and request types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::status::TransferStatus;
use crate::core_types::{BranchId, MedicationId, Quantity, TransferId, UserId};

/// A request to move stock of one medication between two branches.
///
/// Persisted in `stock_transfers_tb`. While `status` is `Pending` the
/// quantity is reserved on the source branch's stock entry.
#[derive(Debug, Clone, Serialize)]
pub struct TransferRecord {
    pub transfer_id: TransferId,
    pub from_branch_id: BranchId,
    pub to_branch_id: BranchId,
    pub medication_id: MedicationId,
    pub quantity: Quantity,
    pub status: TransferStatus,
    pub reason: String,
    pub requested_by: UserId,
    pub approved_by: Option<UserId>,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl fmt::Display for TransferRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] branch {} -> {} medication={} quantity={} status={}",
            self.transfer_id,
            self.from_branch_id,
            self.to_branch_id,
            self.medication_id,
            self.quantity,
            self.status
        )
    }
}

/// Parameters for a single-medication transfer request
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub from_branch_id: BranchId,
    pub to_branch_id: BranchId,
    pub medication_id: MedicationId,
    pub quantity: Quantity,
    pub reason: String,
    pub requested_by: UserId,
    pub notes: Option<String>,
}

impl NewTransfer {
    pub fn new(
        from_branch_id: BranchId,
        to_branch_id: BranchId,
        medication_id: MedicationId,
        quantity: Quantity,
        reason: impl Into<String>,
        requested_by: UserId,
    ) -> Self {
        Self {
            from_branch_id,
            to_branch_id,
            medication_id,
            quantity,
            reason: reason.into(),
            requested_by,
            notes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_for_web_layer() {
        let record = TransferRecord {
            transfer_id: 7,
            from_branch_id: 1,
            to_branch_id: 2,
            medication_id: 100,
            quantity: 30,
            status: TransferStatus::Pending,
            reason: "restock".to_string(),
            requested_by: 42,
            approved_by: None,
            requested_at: Utc::now(),
            completed_at: None,
            notes: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["transfer_id"], 7);
        assert_eq!(json["status"], "pending");
        assert!(json["approved_by"].is_null());
    }

    #[test]
    fn test_display() {
        let record = TransferRecord {
            transfer_id: 1,
            from_branch_id: 3,
            to_branch_id: 4,
            medication_id: 9,
            quantity: 5,
            status: TransferStatus::Completed,
            reason: String::new(),
            requested_by: 1,
            approved_by: Some(2),
            requested_at: Utc::now(),
            completed_at: Some(Utc::now()),
            notes: None,
        };
        let s = record.to_string();
        assert!(s.contains("branch 3 -> 4"));
        assert!(s.contains("COMPLETED"));
    }
}
