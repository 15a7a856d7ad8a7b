use serde::{Serialize, Deserialize};

use crate::object_id::ObjectId;

/// Everything fanned out on an election topic, from client traffic
/// (join/leave/vote) to the coordinator's state transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ElectionEvent {
    #[serde(rename_all = "camelCase")]
    Joined {
        election_id: ObjectId,
        group_id: ObjectId,
        client_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Left {
        election_id: ObjectId,
        group_id: ObjectId,
        client_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Vote {
        election_id: ObjectId,
        group_id: ObjectId,
        voter_id: ObjectId,
        candidate_id: ObjectId,
    },
    #[serde(rename_all = "camelCase")]
    ElectionStarted { election_id: ObjectId },
    #[serde(rename_all = "camelCase")]
    RoundAdvanced {
        election_id: ObjectId,
        round: i32,
        winner: Option<ObjectId>,
        completed: bool,
    },
    #[serde(rename_all = "camelCase")]
    ElectionStopped { election_id: ObjectId },
}

/// Events on the group presence channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GroupEvent {
    #[serde(rename_all = "camelCase")]
    GroupCount { count: usize },
}
