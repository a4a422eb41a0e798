//! Transfer error taxonomy
//!
//! Three kinds, surfaced distinctly so callers can render actionable
//! messages: plain validation failures (never valid), concurrency
//! conflicts (became invalid under a race), and storage faults. Every
//! variant aborts the enclosing transaction; nothing is partially applied.

use serde_json::{Value, json};
use thiserror::Error;

use super::status::TransferStatus;
use crate::core_types::Quantity;
use crate::ledger::LedgerError;

#[derive(Error, Debug)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("Source and destination branch cannot be the same")]
    SameBranch,

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Medication has no stock entry at the source branch")]
    SourceStockNotFound,

    #[error(
        "Insufficient stock: requested {requested}, available {available} (total {total}, reserved {reserved})"
    )]
    InsufficientStock {
        requested: Quantity,
        available: Quantity,
        total: Quantity,
        reserved: Quantity,
    },

    #[error(
        "Requested quantity {requested} would push reservations ({reserved}) past total stock ({total})"
    )]
    ExcessReservation {
        requested: Quantity,
        reserved: Quantity,
        total: Quantity,
    },

    #[error("Insufficient reservation: reserved {reserved}, transfer requires {requested}")]
    InsufficientReservation {
        reserved: Quantity,
        requested: Quantity,
    },

    #[error("A pending transfer already exists for this medication between these branches")]
    DuplicatePendingTransfer,

    #[error("No medication with available stock to transfer at the source branch")]
    NoTransferableStock,

    #[error("Transfer not found: {0}")]
    TransferNotFound(crate::core_types::TransferId),

    // === Concurrency Conflicts ===
    #[error("Transfer already processed (status {status})")]
    AlreadyProcessed { status: TransferStatus },

    // === System Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::SameBranch => "SAME_BRANCH",
            TransferError::InvalidQuantity => "INVALID_QUANTITY",
            TransferError::SourceStockNotFound => "SOURCE_STOCK_NOT_FOUND",
            TransferError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            TransferError::ExcessReservation { .. } => "EXCESS_RESERVATION",
            TransferError::InsufficientReservation { .. } => "INSUFFICIENT_RESERVATION",
            TransferError::DuplicatePendingTransfer => "DUPLICATE_PENDING_TRANSFER",
            TransferError::NoTransferableStock => "NO_TRANSFERABLE_STOCK",
            TransferError::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            TransferError::AlreadyProcessed { .. } => "ALREADY_PROCESSED",
            TransferError::Database(_) => "DATABASE_ERROR",
            TransferError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code suggestion for the web layer
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::SameBranch | TransferError::InvalidQuantity => 400,
            TransferError::SourceStockNotFound
            | TransferError::InsufficientStock { .. }
            | TransferError::ExcessReservation { .. }
            | TransferError::InsufficientReservation { .. }
            | TransferError::NoTransferableStock => 422,
            TransferError::DuplicatePendingTransfer | TransferError::AlreadyProcessed { .. } => 409,
            TransferError::TransferNotFound(_) => 404,
            TransferError::Database(_) | TransferError::Internal(_) => 500,
        }
    }

    /// True when the request was valid but lost a race: a concurrent caller
    /// created the pending transfer or processed this one first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            TransferError::DuplicatePendingTransfer | TransferError::AlreadyProcessed { .. }
        )
    }

    /// Structured payload for the web layer, carrying the quantities the
    /// caller needs to render an actionable message.
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "code": self.code(),
            "message": self.to_string(),
        });

        let details = match self {
            TransferError::InsufficientStock {
                requested,
                available,
                total,
                reserved,
            } => Some(json!({
                "requested": requested,
                "available": available,
                "total": total,
                "reserved": reserved,
            })),
            TransferError::ExcessReservation {
                requested,
                reserved,
                total,
            } => Some(json!({
                "requested": requested,
                "reserved": reserved,
                "total": total,
            })),
            TransferError::InsufficientReservation {
                reserved,
                requested,
            } => Some(json!({
                "reserved": reserved,
                "requested": requested,
            })),
            TransferError::AlreadyProcessed { status } => Some(json!({
                "status": status.as_str(),
            })),
            TransferError::TransferNotFound(id) => Some(json!({ "transfer_id": id })),
            _ => None,
        };

        if let Some(details) = details {
            payload["details"] = details;
        }
        payload
    }
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        TransferError::Database(e.to_string())
    }
}

impl From<LedgerError> for TransferError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::EntryNotFound { .. } => TransferError::SourceStockNotFound,
            LedgerError::InsufficientReservation { reserved, delta } => {
                TransferError::InsufficientReservation {
                    reserved,
                    requested: delta.abs(),
                }
            }
            LedgerError::Underflow { .. } => TransferError::Internal(e.to_string()),
            LedgerError::Database(e) => TransferError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::SameBranch.code(), "SAME_BRANCH");
        assert_eq!(
            TransferError::DuplicatePendingTransfer.code(),
            "DUPLICATE_PENDING_TRANSFER"
        );
        assert_eq!(
            TransferError::AlreadyProcessed {
                status: TransferStatus::Completed
            }
            .code(),
            "ALREADY_PROCESSED"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidQuantity.http_status(), 400);
        assert_eq!(
            TransferError::InsufficientStock {
                requested: 15,
                available: 10,
                total: 10,
                reserved: 0
            }
            .http_status(),
            422
        );
        assert_eq!(TransferError::DuplicatePendingTransfer.http_status(), 409);
        assert_eq!(TransferError::TransferNotFound(1).http_status(), 404);
        assert_eq!(TransferError::Database("boom".into()).http_status(), 500);
    }

    #[test]
    fn test_conflicts_are_distinguished_from_validation() {
        assert!(TransferError::DuplicatePendingTransfer.is_conflict());
        assert!(
            TransferError::AlreadyProcessed {
                status: TransferStatus::Cancelled
            }
            .is_conflict()
        );
        assert!(!TransferError::SameBranch.is_conflict());
        assert!(
            !TransferError::InsufficientStock {
                requested: 1,
                available: 0,
                total: 0,
                reserved: 0
            }
            .is_conflict()
        );
    }

    #[test]
    fn test_payload_carries_quantities() {
        let err = TransferError::InsufficientStock {
            requested: 15,
            available: 10,
            total: 12,
            reserved: 2,
        };
        let payload = err.to_payload();
        assert_eq!(payload["code"], "INSUFFICIENT_STOCK");
        assert_eq!(payload["details"]["available"], 10);
        assert_eq!(payload["details"]["reserved"], 2);
    }

    #[test]
    fn test_ledger_error_mapping() {
        let err: TransferError = LedgerError::InsufficientReservation {
            reserved: 3,
            delta: -5,
        }
        .into();
        match err {
            TransferError::InsufficientReservation {
                reserved,
                requested,
            } => {
                assert_eq!(reserved, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
