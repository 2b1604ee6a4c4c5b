//! Edge-triggered failure/recovery decisions.
//!
//! Notifications fire only when a probe outcome disagrees with the persisted
//! health state; a sustained outage produces exactly one FAILED message.

use crate::db::models::Monitor;
use crate::probes::ProbeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    None,
    MarkFailed,
    MarkRecovered,
}

/// A notification to deliver to the monitor's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub channel: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: StateAction,
    pub notice: Option<Notice>,
}

/// Compares a fresh probe outcome against the monitor's persisted state and
/// decides what to write back and whether to notify. Pure.
pub fn decide(monitor: &Monitor, outcome: &ProbeOutcome) -> Transition {
    if !outcome.healthy && !monitor.last_state_failed {
        Transition {
            action: StateAction::MarkFailed,
            notice: Some(notice(monitor, "FAILED", outcome)),
        }
    } else if outcome.healthy && monitor.last_state_failed {
        Transition {
            action: StateAction::MarkRecovered,
            notice: Some(notice(monitor, "RECOVERY", outcome)),
        }
    } else {
        Transition {
            action: StateAction::None,
            notice: None,
        }
    }
}

fn notice(monitor: &Monitor, event: &str, outcome: &ProbeOutcome) -> Notice {
    let mut text = format!("{event}: {}", monitor.describe());
    if let Some(detail) = &outcome.detail {
        text.push_str(": ");
        text.push_str(detail);
    }
    Notice {
        channel: monitor.channel.clone(),
        text,
    }
}
