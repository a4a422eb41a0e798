//! Notification Dispatch Hook
//!
//! Collaborator interface invoked on state transitions (transfer created,
//! low stock). Delivery lives in an external subsystem; the engine only
//! calls the hook after its own transaction has committed, best-effort:
//! a failed notification is logged and never affects the stock mutation.

use async_trait::async_trait;

use crate::core_types::{BranchId, MedicationId, Quantity};
use crate::transfer::TransferRecord;

#[async_trait]
pub trait NotificationHook: Send + Sync {
    /// A transfer request entered `pending` and reserved source stock.
    async fn transfer_created(&self, transfer: &TransferRecord) -> anyhow::Result<()>;

    /// A branch dropped to or below a medication's minimum stock.
    async fn low_stock(
        &self,
        branch_id: BranchId,
        medication_id: MedicationId,
        current_available: Quantity,
    ) -> anyhow::Result<()>;
}

/// Hook that drops every event (standalone/test deployments)
pub struct NullNotifier;

#[async_trait]
impl NotificationHook for NullNotifier {
    async fn transfer_created(&self, transfer: &TransferRecord) -> anyhow::Result<()> {
        tracing::debug!(transfer_id = transfer.transfer_id, "Notification dropped (null hook)");
        Ok(())
    }

    async fn low_stock(
        &self,
        branch_id: BranchId,
        medication_id: MedicationId,
        current_available: Quantity,
    ) -> anyhow::Result<()> {
        tracing::debug!(
            branch_id,
            medication_id,
            current_available,
            "Notification dropped (null hook)"
        );
        Ok(())
    }
}

/// Recording hook for tests
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedEvent {
        TransferCreated {
            transfer_id: crate::core_types::TransferId,
            quantity: Quantity,
        },
        LowStock {
            branch_id: BranchId,
            medication_id: MedicationId,
            current_available: Quantity,
        },
    }

    #[derive(Default)]
    pub struct RecordingHook {
        events: Mutex<Vec<RecordedEvent>>,
        fail: Mutex<bool>,
    }

    impl RecordingHook {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent call return an error
        pub fn set_fail(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        pub fn events(&self) -> Vec<RecordedEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationHook for RecordingHook {
        async fn transfer_created(&self, transfer: &TransferRecord) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(RecordedEvent::TransferCreated {
                    transfer_id: transfer.transfer_id,
                    quantity: transfer.quantity,
                });
            if *self.fail.lock().unwrap() {
                anyhow::bail!("mock notification failure");
            }
            Ok(())
        }

        async fn low_stock(
            &self,
            branch_id: BranchId,
            medication_id: MedicationId,
            current_available: Quantity,
        ) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(RecordedEvent::LowStock {
                branch_id,
                medication_id,
                current_available,
            });
            if *self.fail.lock().unwrap() {
                anyhow::bail!("mock notification failure");
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_recording_hook_captures_events() {
            let hook = RecordingHook::new();
            hook.low_stock(1, 100, 3).await.unwrap();

            assert_eq!(
                hook.events(),
                vec![RecordedEvent::LowStock {
                    branch_id: 1,
                    medication_id: 100,
                    current_available: 3,
                }]
            );
        }

        #[tokio::test]
        async fn test_recording_hook_failure_mode() {
            let hook = RecordingHook::new();
            hook.set_fail(true);
            assert!(hook.low_stock(1, 100, 3).await.is_err());
            // Event is still recorded before the injected failure
            assert_eq!(hook.events().len(), 1);
        }
    }
}

#[cfg(test)]
pub use mock::{RecordedEvent, RecordingHook};
