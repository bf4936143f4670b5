use serde::{Deserialize, Serialize};

use crate::kernel::gate::InterventionRequest;
use crate::kernel::segment::{null_as_default, Segment};

#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub turn_count: u32,
    pub active: bool,
    #[serde(default)]
    pub scam_type: Option<String>,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub current_objective: Option<String>,
}

/// Diagnostics from the backend's scenario director. Display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorInfo {
    pub scam_type: String,
    pub stage: String,
    #[serde(default)]
    pub stage_description: String,
    #[serde(default)]
    pub objective_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub user_input: String,
    pub constraint: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub segments: Vec<Segment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_text: String,
    #[serde(default)]
    pub director_info: Option<DirectorInfo>,
}

/// Body of start and stop.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest<'a> {
    pub session_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextTurnRequest<'a> {
    pub session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartResponse {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scammer_segments: Vec<Segment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scammer_text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TurnResponse {
    #[serde(default)]
    pub session_id: String,
    pub turn_number: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub victim_segments: Vec<Segment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub victim_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scammer_segments: Vec<Segment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scammer_text: String,
    #[serde(default)]
    pub director_info: Option<DirectorInfo>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub intervention_required: Option<InterventionRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn turn_response_tolerates_nulls_and_missing_fields() {
        let turn: TurnResponse = serde_json::from_value(json!({
            "session_id": "abc",
            "turn_number": 3,
            "victim_segments": [{"type": "text", "content": "Allô?", "tts_audio": null}],
            "victim_text": "Allô?",
            "scammer_segments": null,
            "scammer_text": null,
            "director_info": null,
            "is_complete": false
        }))
        .unwrap();

        assert_eq!(turn.turn_number, 3);
        assert_eq!(turn.victim_segments, vec![Segment::text("Allô?")]);
        assert!(turn.scammer_segments.is_empty());
        assert_eq!(turn.scammer_text, "");
        assert_eq!(turn.intervention_required, None);
    }

    #[test]
    fn next_turn_request_omits_absent_choice() {
        let without = serde_json::to_value(NextTurnRequest { session_id: "abc", choice: None }).unwrap();
        assert_eq!(without, json!({"session_id": "abc"}));

        let with = serde_json::to_value(NextTurnRequest { session_id: "abc", choice: Some("2") }).unwrap();
        assert_eq!(with, json!({"session_id": "abc", "choice": "2"}));
    }
}
