//! Transfer status state machine
//!
//! Status IDs are designed for PostgreSQL storage as SMALLINT.
//! Terminal states: COMPLETED (20), CANCELLED (-10).

use serde::Serialize;
use std::fmt;

/// Transfer request lifecycle
///
/// ```text
/// PENDING → IN_TRANSIT → COMPLETED
///     ↓
/// CANCELLED
/// ```
///
/// `InTransit` is reserved for multi-leg logistics; the approval path moves
/// `Pending` straight to `Completed`. Terminal states are final: no
/// operation mutates a transfer once it is completed or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Reservation held on the source branch, awaiting approval
    Pending = 0,

    /// Stock left the source branch but has not arrived (unused by the
    /// approval path)
    InTransit = 10,

    /// Terminal: stock moved, reservation released
    Completed = 20,

    /// Terminal: request withdrawn, reservation released
    Cancelled = -10,
}

impl TransferStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Cancelled)
    }

    /// Get the numeric status ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL status ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransferStatus::Pending),
            10 => Some(TransferStatus::InTransit),
            20 => Some(TransferStatus::Completed),
            -10 => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    /// Get human-readable status name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::InTransit => "IN_TRANSIT",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TransferStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TransferStatus::from_id(value).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Cancelled.is_terminal());

        assert!(!TransferStatus::Pending.is_terminal());
        assert!(!TransferStatus::InTransit.is_terminal());
    }

    #[test]
    fn test_status_id_roundtrip() {
        let statuses = [
            TransferStatus::Pending,
            TransferStatus::InTransit,
            TransferStatus::Completed,
            TransferStatus::Cancelled,
        ];

        for status in statuses {
            let id = status.id();
            let recovered = TransferStatus::from_id(id).unwrap();
            assert_eq!(status, recovered);
        }
    }

    #[test]
    fn test_invalid_status_id() {
        assert!(TransferStatus::from_id(999).is_none());
        assert!(TransferStatus::from_id(-999).is_none());
    }

    #[test]
    fn test_pending_is_id_zero() {
        // The partial unique index in the schema is declared WHERE status = 0
        assert_eq!(TransferStatus::Pending.id(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferStatus::Pending.to_string(), "PENDING");
        assert_eq!(TransferStatus::Cancelled.to_string(), "CANCELLED");
    }
}
