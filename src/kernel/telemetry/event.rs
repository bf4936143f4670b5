use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kernel::phase::RunPhase;
use crate::kernel::segment::SegmentKind;

// Allowed: ids, counts, enums. Forbidden: message text, choice labels, audio.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    RunLifecycle {
        run_id: Uuid,
        event: RunEventKind,
    },

    TurnReceived {
        run_id: Uuid,
        turn_number: u32,
        intervention: bool,
        complete: bool,
    },

    Intervention {
        run_id: Uuid,
        event: InterventionEventKind,
    },

    SegmentFailed {
        index: usize,
        kind: SegmentKind,
    },

    PhaseTransition {
        from: RunPhase,
        to: RunPhase,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEventKind {
    Started,
    Completed,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterventionEventKind {
    Opened { choices: usize },
    Resolved,
    Cancelled,
}
