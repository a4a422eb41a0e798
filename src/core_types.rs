//! Core types used throughout the engine
//!
//! These are fundamental type aliases used by all modules.
//! They provide semantic meaning and enable future type evolution.

/// Branch ID - identifies one physical pharmacy location.
///
/// Assigned by the branch directory (external); the engine treats it as
/// an opaque surrogate key.
pub type BranchId = i64;

/// Medication ID - surrogate key into the medication catalog (external).
pub type MedicationId = i64;

/// Transfer ID - BIGSERIAL surrogate key of a transfer request.
pub type TransferId = i64;

/// User ID - the requesting/approving operator.
pub type UserId = i64;

/// Quantity of physical units.
///
/// Stock counters are constrained non-negative at the schema level;
/// deltas may be negative.
pub type Quantity = i64;
