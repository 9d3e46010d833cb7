//! Item state machine.
//!
//! ```text
//! pending ──► processing ──► completed
//!    │                  └──► errored
//!    └──────────────────────► completed | errored
//! ```
//!
//! Terminal states never transition again. Re-applying the status an item
//! already holds is a no-op, so duplicate outcome deliveries are harmless.

use batchgrid_bus::OutcomeStatus;
use batchgrid_state::{Item, ItemStatus, OutcomeError};

/// Why an item cannot be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ItemInvalid {
    #[error("Instance name is empty")]
    EmptyName,
    #[error("Network name for instances is empty")]
    EmptyNetworkName,
}

/// Result of applying an outcome to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied { from: ItemStatus, to: ItemStatus },
    /// The item already held this status.
    Unchanged,
    /// The item is terminal with a different status; nothing changed.
    Rejected { from: ItemStatus, to: ItemStatus },
}

pub trait ItemLifecycle {
    /// Only pending items are eligible for dispatch by the aggregator.
    fn to_be_processed(&self) -> bool;

    /// Mark the item as handed to a worker.
    fn mark_processing(&mut self);

    /// Apply a worker's reported status, copying error details on failure.
    fn apply_outcome(&mut self, status: OutcomeStatus, error: Option<&OutcomeError>) -> Transition;

    fn validate(&self) -> Result<(), ItemInvalid>;
}

impl ItemLifecycle for Item {
    fn to_be_processed(&self) -> bool {
        self.status == ItemStatus::Pending
    }

    fn mark_processing(&mut self) {
        debug_assert!(self.status != ItemStatus::Completed);
        self.status = ItemStatus::Processing;
    }

    fn apply_outcome(&mut self, status: OutcomeStatus, error: Option<&OutcomeError>) -> Transition {
        let from = self.status;
        let to = status.item_status();

        if from == to {
            return Transition::Unchanged;
        }
        if from.is_terminal() {
            return Transition::Rejected { from, to };
        }

        self.status = to;
        if to == ItemStatus::Errored {
            let error = error.cloned().unwrap_or_default();
            self.error_code = error.code;
            self.error_message = error.message;
        }
        Transition::Applied { from, to }
    }

    fn validate(&self) -> Result<(), ItemInvalid> {
        if self.name.is_empty() {
            return Err(ItemInvalid::EmptyName);
        }
        if self.network_name.is_empty() {
            return Err(ItemInvalid::EmptyNetworkName);
        }
        Ok(())
    }
}

/// First validation failure across `items`, in order.
pub fn first_invalid(items: &[Item]) -> Option<ItemInvalid> {
    items.iter().find_map(|item| item.validate().err())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(status: ItemStatus) -> Item {
        Item {
            name: "a".to_string(),
            network_name: "net".to_string(),
            status,
            ..Default::default()
        }
    }

    fn failure(code: &str, message: &str) -> OutcomeError {
        OutcomeError {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn only_pending_is_to_be_processed() {
        assert!(item(ItemStatus::Pending).to_be_processed());
        assert!(!item(ItemStatus::Processing).to_be_processed());
        assert!(!item(ItemStatus::Completed).to_be_processed());
        assert!(!item(ItemStatus::Errored).to_be_processed());
    }

    #[test]
    fn processing_completes() {
        let mut i = item(ItemStatus::Processing);
        let t = i.apply_outcome(OutcomeStatus::Completed, None);
        assert_eq!(
            t,
            Transition::Applied {
                from: ItemStatus::Processing,
                to: ItemStatus::Completed
            }
        );
        assert_eq!(i.status, ItemStatus::Completed);
        assert!(i.error_code.is_empty());
    }

    #[test]
    fn errored_copies_error_details() {
        let mut i = item(ItemStatus::Processing);
        i.apply_outcome(OutcomeStatus::Errored, Some(&failure("500", "quota exceeded")));
        assert_eq!(i.status, ItemStatus::Errored);
        assert_eq!(i.error_code, "500");
        assert_eq!(i.error_message, "quota exceeded");
    }

    #[test]
    fn pending_may_jump_to_terminal() {
        let mut i = item(ItemStatus::Pending);
        assert!(matches!(
            i.apply_outcome(OutcomeStatus::Completed, None),
            Transition::Applied { .. }
        ));
        assert_eq!(i.status, ItemStatus::Completed);
    }

    #[test]
    fn same_terminal_status_is_idempotent() {
        let mut i = item(ItemStatus::Errored);
        i.error_code = "1".to_string();
        let t = i.apply_outcome(OutcomeStatus::Errored, Some(&failure("2", "other")));
        assert_eq!(t, Transition::Unchanged);
        assert_eq!(i.error_code, "1");
    }

    #[test]
    fn terminal_items_never_flip() {
        let mut i = item(ItemStatus::Completed);
        let t = i.apply_outcome(OutcomeStatus::Errored, Some(&failure("9", "late")));
        assert_eq!(
            t,
            Transition::Rejected {
                from: ItemStatus::Completed,
                to: ItemStatus::Errored
            }
        );
        assert_eq!(i.status, ItemStatus::Completed);
        assert!(i.error_message.is_empty());
    }

    #[test]
    fn validation_messages() {
        let mut i = item(ItemStatus::Pending);
        assert_eq!(i.validate(), Ok(()));

        i.network_name.clear();
        assert_eq!(i.validate(), Err(ItemInvalid::EmptyNetworkName));
        assert_eq!(
            ItemInvalid::EmptyNetworkName.to_string(),
            "Network name for instances is empty"
        );

        i.name.clear();
        assert_eq!(i.validate(), Err(ItemInvalid::EmptyName));
        assert_eq!(ItemInvalid::EmptyName.to_string(), "Instance name is empty");
    }

    #[test]
    fn first_invalid_reports_in_order() {
        let mut bad_net = item(ItemStatus::Pending);
        bad_net.network_name.clear();
        let mut bad_name = item(ItemStatus::Pending);
        bad_name.name.clear();

        let items = vec![item(ItemStatus::Pending), bad_net, bad_name];
        assert_eq!(first_invalid(&items), Some(ItemInvalid::EmptyNetworkName));
        assert_eq!(first_invalid(&items[..1]), None);
    }
}
