use serde::{Deserialize, Serialize};

/// Where the autonomous run currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// No run. Start is allowed.
    #[default]
    Idle,
    /// Fetching and playing the scammer's opening line.
    Starting,
    /// A next-turn request is in flight.
    AwaitingTurn,
    PlayingVictimAudio,
    /// Suspended on the intervention gate until a human picks a choice.
    AwaitingIntervention,
    PlayingScammerAudio,
    /// The backend reported the conversation complete.
    Complete,
    /// Stop requested; the loop has not reached a checkpoint yet.
    Stopping,
}

impl RunPhase {
    pub fn is_active(self) -> bool {
        !matches!(self, RunPhase::Idle | RunPhase::Complete | RunPhase::Stopping)
    }
}

/// Requests for a phase transition. The graph decides whether they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseRequest {
    Start,
    AwaitTurn,
    TurnReceived,
    InterventionRequired,
    ScammerReply,
    Stop,
    RunCompleted,
    RunEnded,
}

pub struct PhaseGraph;

impl PhaseGraph {
    /// Pure function: (current, request) -> next.
    /// Returns None when the request does not apply in `current`.
    pub fn transition(current: RunPhase, request: PhaseRequest) -> Option<RunPhase> {
        use PhaseRequest::*;
        use RunPhase::*;

        match (current, request) {
            // A stopped run may still be draining when the next one starts.
            (Idle | Complete | Stopping, Start) => Some(Starting),

            (Starting | PlayingVictimAudio | AwaitingIntervention | PlayingScammerAudio, AwaitTurn) => {
                Some(AwaitingTurn)
            }
            (AwaitingTurn, TurnReceived) => Some(PlayingVictimAudio),
            (PlayingVictimAudio, InterventionRequired) => Some(AwaitingIntervention),
            (PlayingVictimAudio, ScammerReply) => Some(PlayingScammerAudio),

            (phase, Stop) if phase.is_active() => Some(Stopping),

            (Stopping, RunCompleted | RunEnded) => Some(Idle),
            (phase, RunCompleted) if phase.is_active() => Some(Complete),
            (phase, RunEnded) if phase.is_active() => Some(Idle),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_round_with_intervention() {
        let mut phase = RunPhase::Idle;
        for request in [
            PhaseRequest::Start,
            PhaseRequest::AwaitTurn,
            PhaseRequest::TurnReceived,
            PhaseRequest::InterventionRequired,
            PhaseRequest::AwaitTurn,
            PhaseRequest::TurnReceived,
            PhaseRequest::ScammerReply,
            PhaseRequest::RunCompleted,
        ] {
            phase = PhaseGraph::transition(phase, request).unwrap_or_else(|| panic!("{request:?} rejected in {phase:?}"));
        }
        assert_eq!(phase, RunPhase::Complete);
    }

    #[test]
    fn stopping_only_leaves_through_end_or_start() {
        let stopping = PhaseGraph::transition(RunPhase::AwaitingTurn, PhaseRequest::Stop).unwrap();
        assert_eq!(stopping, RunPhase::Stopping);

        assert_eq!(PhaseGraph::transition(stopping, PhaseRequest::TurnReceived), None);
        assert_eq!(PhaseGraph::transition(stopping, PhaseRequest::ScammerReply), None);
        assert_eq!(PhaseGraph::transition(stopping, PhaseRequest::Stop), None);
        assert_eq!(PhaseGraph::transition(stopping, PhaseRequest::RunCompleted), Some(RunPhase::Idle));
        assert_eq!(PhaseGraph::transition(stopping, PhaseRequest::Start), Some(RunPhase::Starting));
    }

    #[test]
    fn fresh_driver_state_is_idle() {
        assert_eq!(RunPhase::default(), RunPhase::Idle);
        assert!(!RunPhase::default().is_active());
    }

    #[test]
    fn idle_ignores_stop() {
        assert_eq!(PhaseGraph::transition(RunPhase::Idle, PhaseRequest::Stop), None);
        assert_eq!(PhaseGraph::transition(RunPhase::Complete, PhaseRequest::Stop), None);
    }
}
