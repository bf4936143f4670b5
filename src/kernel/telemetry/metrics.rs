use std::collections::VecDeque;

use super::event::{InterventionEventKind, RunEventKind, TelemetryEvent};
use crate::kernel::segment::SegmentKind;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub run_stats: RunStats,
    pub intervention_stats: InterventionStats,
    pub segment_stats: SegmentFailureStats,
    pub phase_transitions: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub started: u64,
    pub completed: u64,
    pub stopped: u64,
    pub failed: u64,
    pub turns: u64,
    pub max_turn_number: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterventionStats {
    pub opened: u64,
    pub resolved: u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentFailureStats {
    pub text: u64,
    pub sound: u64,
    pub pause: u64,
}

impl SegmentFailureStats {
    pub fn total(&self) -> u64 {
        self.text + self.sound + self.pause
    }
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::RunLifecycle { event, .. } => match event {
                RunEventKind::Started => snap.run_stats.started += 1,
                RunEventKind::Completed => snap.run_stats.completed += 1,
                RunEventKind::Stopped => snap.run_stats.stopped += 1,
                RunEventKind::Failed => snap.run_stats.failed += 1,
            },
            TelemetryEvent::TurnReceived { turn_number, .. } => {
                snap.run_stats.turns += 1;
                snap.run_stats.max_turn_number = snap.run_stats.max_turn_number.max(*turn_number);
            }
            TelemetryEvent::Intervention { event, .. } => match event {
                InterventionEventKind::Opened { .. } => snap.intervention_stats.opened += 1,
                InterventionEventKind::Resolved => snap.intervention_stats.resolved += 1,
                InterventionEventKind::Cancelled => snap.intervention_stats.cancelled += 1,
            },
            TelemetryEvent::SegmentFailed { kind, .. } => match kind {
                SegmentKind::Text => snap.segment_stats.text += 1,
                SegmentKind::Sound => snap.segment_stats.sound += 1,
                SegmentKind::Pause => snap.segment_stats.pause += 1,
            },
            TelemetryEvent::PhaseTransition { .. } => snap.phase_transitions += 1,
        }
    }

    snap
}
