//! Read-only lookups against externally-owned reference data
//!
//! The medication catalog and branch directory belong to other subsystems;
//! the engine only reads the handful of fields it needs (minimum stock for
//! low-stock evaluation, active flags for callers that pre-check them).

use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::core_types::{BranchId, MedicationId, Quantity};

#[derive(Debug, Clone)]
pub struct MedicationInfo {
    pub medication_id: MedicationId,
    pub name: String,
    pub minimum_stock: Quantity,
    pub is_active: bool,
}

pub struct MedicationCatalog;

impl MedicationCatalog {
    pub async fn get(
        pool: &PgPool,
        medication_id: MedicationId,
    ) -> Result<Option<MedicationInfo>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT medication_id, name, minimum_stock, is_active \
             FROM medications_tb WHERE medication_id = $1",
        )
        .bind(medication_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| MedicationInfo {
            medication_id: r.get("medication_id"),
            name: r.get("name"),
            minimum_stock: r.get("minimum_stock"),
            is_active: r.get("is_active"),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct BranchInfo {
    pub branch_id: BranchId,
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

pub struct BranchDirectory;

impl BranchDirectory {
    pub async fn get(
        pool: &PgPool,
        branch_id: BranchId,
    ) -> Result<Option<BranchInfo>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT branch_id, code, name, is_active \
             FROM branches_tb WHERE branch_id = $1",
        )
        .bind(branch_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| BranchInfo {
            branch_id: r.get("branch_id"),
            code: r.get("code"),
            name: r.get("name"),
            is_active: r.get("is_active"),
        }))
    }

    /// True only for a known, active branch
    pub async fn is_active(pool: &PgPool, branch_id: BranchId) -> Result<bool, sqlx::Error> {
        Ok(Self::get(pool, branch_id)
            .await?
            .map(|b| b.is_active)
            .unwrap_or(false))
    }
}
