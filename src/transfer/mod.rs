//! Inter-branch stock transfers
//!
//! Two components share this module: the request manager, which creates
//! transfer requests and places the reservation hold, and the approval
//! engine, which executes or cancels them.
//!
//! # State Machine
//!
//! ```text
//! PENDING → IN_TRANSIT → COMPLETED
//!     ↓
//! CANCELLED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Lock-then-validate**: availability and status are always re-read
//!    after the row lock is acquired, never trusted from earlier reads
//! 2. **At-most-one-pending**: one pending request per
//!    (from, to, medication) triple — source-row lock serialization plus a
//!    partial unique index
//! 3. **All-or-nothing**: request creation and approval each run in a
//!    single transaction; no partial stock movement is ever visible
//! 4. **Terminal is final**: completed and cancelled transfers reject all
//!    further mutation

pub mod approval;
pub mod db;
pub mod error;
pub mod manager;
pub mod status;
pub mod types;

#[cfg(test)]
mod integration_tests;

// Re-exports for convenience
pub use approval::ApprovalEngine;
pub use db::TransferDb;
pub use error::TransferError;
pub use manager::TransferManager;
pub use status::TransferStatus;
pub use types::{NewTransfer, TransferRecord};
