use serde::{Serialize, Deserialize};

use crate::object_id::ObjectId;

/// One meal-decision vote process scoped to a group. Lifecycle fields
/// (`is_active`, `stopped_halfway`, `current_round`) are owned by the
/// coordinator and never taken from callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    pub id: ObjectId,
    pub group_id: ObjectId,
    pub rounds: i32,
    pub current_round: Option<i32>,
    pub is_active: bool,
    pub stopped_halfway: bool,
}

/// A committed tally result for one round of one election. `rounds` is the
/// zero-based round number the record belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElectionRound {
    pub id: ObjectId,
    pub election_id: ObjectId,
    pub group_id: ObjectId,
    pub winner: Option<ObjectId>,
    pub rounds: i32,
}

/// A single ballot observed on the broadcast channel. Not persisted; folded
/// into the coordinator's round ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub election_id: ObjectId,
    pub group_id: ObjectId,
    pub voter_id: ObjectId,
    pub candidate_id: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    pub creator_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealChoice {
    pub id: ObjectId,
    pub group_id: ObjectId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub menu_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: ObjectId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub group_id: Option<ObjectId>,
}

/// Body of `POST /api/election`. Lifecycle fields a caller may include are
/// ignored; only the group and the round count are taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateElectionRequest {
    pub group_id: ObjectId,
    pub rounds: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateElectionRequest {
    pub id: ObjectId,
    pub group_id: ObjectId,
    pub rounds: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRoundRequest {
    pub winner: Option<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoundRequest {
    pub election_id: ObjectId,
    pub group_id: ObjectId,
    pub winner: Option<ObjectId>,
    pub rounds: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoundRequest {
    pub id: ObjectId,
    pub election_id: ObjectId,
    pub group_id: ObjectId,
    pub winner: Option<ObjectId>,
    pub rounds: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: String,
    pub creator_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMealChoiceRequest {
    pub group_id: ObjectId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub menu_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub group_id: Option<ObjectId>,
}

/// Body of `POST /api/election/<id>/vote`; the election id comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub group_id: ObjectId,
    pub voter_id: ObjectId,
    pub candidate_id: ObjectId,
}

/// Election list filter. A scan runs only when at least one field is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "backend", derive(rocket::FromForm))]
pub struct ElectionScan {
    pub rounds: Option<i32>,
    #[cfg_attr(feature = "backend", field(name = "currentRound"))]
    pub current_round: Option<i32>,
    #[cfg_attr(feature = "backend", field(name = "isActive"))]
    pub is_active: Option<bool>,
    #[cfg_attr(feature = "backend", field(name = "stoppedHalfway"))]
    pub stopped_halfway: Option<bool>,
    #[cfg_attr(feature = "backend", field(name = "groupId"))]
    pub group_id: Option<String>,
}

impl ElectionScan {
    pub fn any_filter(&self) -> bool {
        self.rounds.is_some()
            || self.current_round.is_some()
            || self.is_active.is_some()
            || self.stopped_halfway.is_some()
            || self.group_id.as_deref().map_or(false, |g| !g.trim().is_empty())
    }
}

/// List-endpoint envelope: the record page plus its length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAllResponse<T> {
    pub dataset: Vec<T>,
    pub total: usize,
}

impl<T> GetAllResponse<T> {
    pub fn new(dataset: Vec<T>) -> Self {
        let total = dataset.len();
        Self { dataset, total }
    }
}

/// Where the current round stands after a vote is recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundProgress {
    pub round: i32,
    pub votes_cast: usize,
    pub expected_voters: Option<usize>,
}
