//! branchstock - Multi-branch pharmacy stock engine
//!
//! Per-branch stock ledgers with reservation holds, and a state-machine
//! governed transfer flow that moves inventory between branches under
//! concurrent access. Embedded by a web-request layer; this crate owns the
//! invariants, not the routing.
//!
//! # Modules
//!
//! - [`core_types`] - Core type aliases (BranchId, MedicationId, etc.)
//! - [`ledger`] - Per-(branch, medication) stock counters and row locks
//! - [`transfer`] - Transfer requests, duplicate suppression, approval
//! - [`notify`] - Notification dispatch hook (external delivery)
//! - [`catalog`] - Read-only medication/branch reference lookups
//! - [`db`] - Connection pool and schema bootstrap
//!
//! # Concurrency model
//!
//! Every mutation of a stock row happens under a PostgreSQL row lock
//! (`SELECT ... FOR UPDATE`) inside the transaction of the calling
//! operation. Operations on the same row serialize; disjoint rows run in
//! parallel. When a transfer touches two rows they are locked in ascending
//! branch order, so opposite-direction transfers cannot deadlock.

// Core types - must be first!
pub mod core_types;

pub mod catalog;
pub mod config;
pub mod db;
pub mod ledger;
pub mod logging;
pub mod notify;
pub mod transfer;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use core_types::{BranchId, MedicationId, Quantity, TransferId, UserId};
pub use db::Database;
pub use ledger::{BranchStockEntry, LedgerError, StockLedger};
pub use notify::{NotificationHook, NullNotifier};
pub use transfer::{
    ApprovalEngine, NewTransfer, TransferError, TransferManager, TransferRecord, TransferStatus,
};
