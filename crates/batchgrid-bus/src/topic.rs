//! Topic layout.
//!
//! ```text
//! instances.<action>          in   batch request
//! instance.<action>           out  per-item work order
//! instance.<action>.done      in   item outcome (completed)
//! instance.<action>.error     in   item outcome (errored)
//! instances.<action>.done     out  batch terminal (success)
//! instances.<action>.error    out  batch terminal (failure)
//! ```

use batchgrid_state::{Action, ItemStatus};

const BATCH_PREFIX: &str = "instances";
const ITEM_PREFIX: &str = "instance";
const DONE: &str = "done";
const ERROR: &str = "error";

/// Status an outcome topic assigns to the item it reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    Completed,
    Errored,
}

impl OutcomeStatus {
    pub fn item_status(self) -> ItemStatus {
        match self {
            OutcomeStatus::Completed => ItemStatus::Completed,
            OutcomeStatus::Errored => ItemStatus::Errored,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            OutcomeStatus::Completed => DONE,
            OutcomeStatus::Errored => ERROR,
        }
    }
}

/// An inbound topic the coordinator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `instances.<action>`
    Intake(Action),
    /// `instance.<action>.done` / `instance.<action>.error`
    Outcome { action: Action, status: OutcomeStatus },
}

impl Route {
    /// Classify an inbound subject. Outbound and unknown subjects yield `None`.
    pub fn parse(subject: &str) -> Option<Self> {
        let parts: Vec<&str> = subject.split('.').collect();
        match parts.as_slice() {
            [BATCH_PREFIX, action] => Some(Route::Intake(action.parse().ok()?)),
            [ITEM_PREFIX, action, suffix] => {
                let status = match *suffix {
                    DONE => OutcomeStatus::Completed,
                    ERROR => OutcomeStatus::Errored,
                    _ => return None,
                };
                Some(Route::Outcome {
                    action: action.parse().ok()?,
                    status,
                })
            }
            _ => None,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Route::Intake(action) => *action,
            Route::Outcome { action, .. } => *action,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Route::Intake(action) => intake_subject(*action),
            Route::Outcome { action, status } => outcome_subject(*action, *status),
        }
    }

    /// Every inbound route, for all actions.
    pub fn all() -> Vec<Route> {
        let mut routes = Vec::new();
        for action in Action::ALL {
            routes.push(Route::Intake(action));
            for status in [OutcomeStatus::Completed, OutcomeStatus::Errored] {
                routes.push(Route::Outcome { action, status });
            }
        }
        routes
    }
}

pub fn intake_subject(action: Action) -> String {
    format!("{BATCH_PREFIX}.{action}")
}

pub fn work_order_subject(action: Action) -> String {
    format!("{ITEM_PREFIX}.{action}")
}

pub fn outcome_subject(action: Action, status: OutcomeStatus) -> String {
    format!("{ITEM_PREFIX}.{action}.{}", status.suffix())
}

pub fn batch_done_subject(action: Action) -> String {
    format!("{BATCH_PREFIX}.{action}.{DONE}")
}

pub fn batch_error_subject(action: Action) -> String {
    format!("{BATCH_PREFIX}.{action}.{ERROR}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_intake() {
        assert_eq!(
            Route::parse("instances.create"),
            Some(Route::Intake(Action::Create))
        );
    }

    #[test]
    fn parses_outcomes() {
        assert_eq!(
            Route::parse("instance.update.done"),
            Some(Route::Outcome {
                action: Action::Update,
                status: OutcomeStatus::Completed
            })
        );
        assert_eq!(
            Route::parse("instance.delete.error"),
            Some(Route::Outcome {
                action: Action::Delete,
                status: OutcomeStatus::Errored
            })
        );
    }

    #[test]
    fn rejects_outbound_and_unknown_subjects() {
        assert_eq!(Route::parse("instance.create"), None);
        assert_eq!(Route::parse("instances.create.done"), None);
        assert_eq!(Route::parse("instances.create.error"), None);
        assert_eq!(Route::parse("non-instances-create"), None);
        assert_eq!(Route::parse("instances.reboot"), None);
        assert_eq!(Route::parse("instance.create.started"), None);
    }

    #[test]
    fn subject_roundtrips_through_parse() {
        for route in Route::all() {
            assert_eq!(Route::parse(&route.subject()), Some(route));
        }
        assert_eq!(Route::all().len(), 9);
    }

    #[test]
    fn outbound_subjects() {
        assert_eq!(work_order_subject(Action::Create), "instance.create");
        assert_eq!(batch_done_subject(Action::Update), "instances.update.done");
        assert_eq!(batch_error_subject(Action::Delete), "instances.delete.error");
    }

    #[test]
    fn outcome_status_maps_to_item_status() {
        assert_eq!(OutcomeStatus::Completed.item_status(), ItemStatus::Completed);
        assert_eq!(OutcomeStatus::Errored.item_status(), ItemStatus::Errored);
    }
}
