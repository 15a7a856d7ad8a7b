use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info};

use shared::error::{Error, ErrorCode, Result};
use shared::events::ElectionEvent;
use shared::lifecycle::{self, ElectionPhase};
use shared::models::*;
use shared::object_id::ObjectId;
use shared::tally::RoundTally;
use shared::validation::{validate_rounds, ValidationError};

use crate::hub::Hub;
use crate::store::Page;
use crate::stores::{AccountStore, ElectionStore, GroupStore, MealChoiceStore, RoundStore};

/// Votes collected for the round an election is currently in.
#[derive(Debug)]
struct RoundLedger {
    round: i32,
    tally: RoundTally<ObjectId, ObjectId>,
}

/// What recording a vote did: where the round stands, and the committed
/// round record when the vote was the one that closed it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub progress: RoundProgress,
    pub closed: Option<ElectionRound>,
}

/// Single source of truth for election lifecycles. Every mutating operation
/// takes the election's transition lock first, so read-validate-write runs
/// as one unit per election id, then publishes the matching event on the
/// election's topic.
pub struct ElectionCoordinator {
    elections: ElectionStore,
    rounds: Arc<RoundStore>,
    groups: Arc<GroupStore>,
    meal_choices: Arc<MealChoiceStore>,
    accounts: Arc<AccountStore>,
    hub: Arc<Hub<ElectionEvent>>,
    locks: Mutex<HashMap<ObjectId, Arc<Mutex<()>>>>,
    ledgers: Mutex<HashMap<ObjectId, RoundLedger>>,
}

fn lock_failed() -> Error {
    Error::store("Election transition lock failed")
}

impl ElectionCoordinator {
    pub fn new(
        rounds: Arc<RoundStore>,
        groups: Arc<GroupStore>,
        meal_choices: Arc<MealChoiceStore>,
        accounts: Arc<AccountStore>,
        hub: Arc<Hub<ElectionEvent>>,
    ) -> Self {
        Self {
            elections: ElectionStore::new(),
            rounds,
            groups,
            meal_choices,
            accounts,
            hub,
            locks: Mutex::new(HashMap::new()),
            ledgers: Mutex::new(HashMap::new()),
        }
    }

    pub fn hub(&self) -> &Arc<Hub<ElectionEvent>> {
        &self.hub
    }

    fn transition_lock(&self, id: &ObjectId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| lock_failed())?;
        Ok(locks.entry(id.clone()).or_default().clone())
    }

    pub fn create(&self, request: CreateElectionRequest) -> Result<Election> {
        validate_rounds(request.rounds)?;
        if !self.groups.exists(&request.group_id)? {
            return Err(ValidationError::UnknownGroup.into());
        }

        let election = self.elections.create(request.group_id, request.rounds)?;
        info!("Election {} created for group {}", election.id, election.group_id);
        Ok(election)
    }

    pub fn get(&self, id: &ObjectId) -> Result<Election> {
        self.elections.get(id)?.ok_or_else(|| Error::not_found("Election"))
    }

    pub fn list(&self, page: Page) -> Result<Vec<Election>> {
        self.elections.list(page)
    }

    pub fn scan(&self, query: &ElectionScan, page: Page) -> Result<Vec<Election>> {
        self.elections.scan(query, page)
    }

    /// Caller-mutable fields only; lifecycle flags move through transitions.
    pub fn update(&self, request: UpdateElectionRequest) -> Result<Election> {
        let lock = self.transition_lock(&request.id)?;
        let _guard = lock.lock().map_err(|_| lock_failed())?;

        let mut election = self.get(&request.id)?;
        if election.is_active {
            return Err(Error::new(
                ErrorCode::Conflict,
                "Election is active; lifecycle changes go through transitions",
            ));
        }
        validate_rounds(request.rounds)?;
        if election.current_round.map_or(false, |current| request.rounds < current) {
            return Err(Error::new(
                ErrorCode::Validation,
                "Rounds cannot drop below the rounds already run",
            ));
        }
        if !self.groups.exists(&request.group_id)? {
            return Err(ValidationError::UnknownGroup.into());
        }

        election.group_id = request.group_id;
        election.rounds = request.rounds;
        if !self.elections.replace(election.clone())? {
            return Err(Error::not_found("Election"));
        }
        Ok(election)
    }

    pub fn delete(&self, id: &ObjectId) -> Result<Election> {
        let lock = self.transition_lock(id)?;
        let _guard = lock.lock().map_err(|_| lock_failed())?;

        let election = self.get(id)?;
        self.elections.soft_delete(id)?;
        self.ledgers.lock().map_err(|_| lock_failed())?.remove(id);
        Ok(election)
    }

    pub fn start(&self, id: &ObjectId) -> Result<Election> {
        let lock = self.transition_lock(id)?;
        let _guard = lock.lock().map_err(|_| lock_failed())?;

        let mut election = self.get(id)?;
        if let Some(active) = self.elections.active_for_group(&election.group_id)? {
            if active.id != election.id {
                return Err(Error::new(
                    ErrorCode::Conflict,
                    "Group already has an active election",
                ));
            }
        }
        lifecycle::begin(&mut election)?;
        if !self.elections.replace(election.clone())? {
            return Err(Error::store("Election record vanished during start"));
        }

        info!("Election {} started with {} rounds", election.id, election.rounds);
        self.hub.publish(
            &election.id,
            ElectionEvent::ElectionStarted { election_id: election.id.clone() },
        )?;
        Ok(election)
    }

    pub fn advance_round(&self, id: &ObjectId, winner: Option<ObjectId>) -> Result<ElectionRound> {
        let lock = self.transition_lock(id)?;
        let _guard = lock.lock().map_err(|_| lock_failed())?;
        self.advance_locked(id, winner)
    }

    /// Close the current round with the ledger's plurality winner.
    pub fn close_round(&self, id: &ObjectId) -> Result<ElectionRound> {
        let lock = self.transition_lock(id)?;
        let _guard = lock.lock().map_err(|_| lock_failed())?;

        let election = self.get(id)?;
        let current = match lifecycle::phase(&election) {
            ElectionPhase::Active(round) => round,
            _ => return Err(Error::new(ErrorCode::Conflict, "Election is not active")),
        };

        let winner = {
            let mut ledgers = self.ledgers.lock().map_err(|_| lock_failed())?;
            ledgers
                .remove(id)
                .filter(|ledger| ledger.round == current)
                .map(|ledger| ledger.tally.outcome().winner)
                .unwrap_or(None)
        };
        self.advance_locked(id, winner)
    }

    /// Fold a channel vote into the current round's ledger; closes the round
    /// when every expected voter has now voted.
    pub fn record_vote(&self, vote: &Vote) -> Result<VoteOutcome> {
        let lock = self.transition_lock(&vote.election_id)?;
        let _guard = lock.lock().map_err(|_| lock_failed())?;

        let election = self.get(&vote.election_id)?;
        let current = match lifecycle::phase(&election) {
            ElectionPhase::Active(round) => round,
            _ => return Err(Error::new(ErrorCode::Conflict, "Election is not active")),
        };

        let votes_cast = {
            let mut ledgers = self.ledgers.lock().map_err(|_| lock_failed())?;
            let stale = ledgers
                .get(&vote.election_id)
                .map_or(true, |ledger| ledger.round != current);
            if stale {
                let mut tally = RoundTally::new();
                for candidate in self.meal_choices.candidates_for_group(&election.group_id)? {
                    let _ = tally.add_candidate(candidate);
                }
                ledgers.insert(
                    vote.election_id.clone(),
                    RoundLedger { round: current, tally },
                );
            }

            let ledger = ledgers
                .get_mut(&vote.election_id)
                .ok_or_else(|| Error::store("Round ledger vanished"))?;
            ledger
                .tally
                .record(vote.voter_id.clone(), vote.candidate_id.clone())
                .map_err(|_| Error::from(ValidationError::UnknownCandidate))?;
            ledger.tally.ballots()
        };

        let members = self.accounts.member_count(&election.group_id)?;
        let expected_voters = (members > 0).then_some(members);
        debug!(
            "Vote recorded for election {} round {current}: {votes_cast} cast, {expected_voters:?} expected",
            vote.election_id
        );

        let closed = if expected_voters.map_or(false, |expected| votes_cast >= expected) {
            let winner = {
                let mut ledgers = self.ledgers.lock().map_err(|_| lock_failed())?;
                ledgers
                    .remove(&vote.election_id)
                    .map(|ledger| ledger.tally.outcome().winner)
                    .unwrap_or(None)
            };
            Some(self.advance_locked(&vote.election_id, winner)?)
        } else {
            None
        };

        Ok(VoteOutcome {
            progress: RoundProgress { round: current, votes_cast, expected_voters },
            closed,
        })
    }

    /// Commit the current round and move the election forward. Callers hold
    /// the election's transition lock.
    fn advance_locked(&self, id: &ObjectId, winner: Option<ObjectId>) -> Result<ElectionRound> {
        let mut election = self.get(id)?;
        let closed = lifecycle::advance(&mut election)?;

        let round = self.rounds.create(CreateRoundRequest {
            election_id: election.id.clone(),
            group_id: election.group_id.clone(),
            winner: winner.clone(),
            rounds: closed.number,
        })?;
        if !self.elections.replace(election.clone())? {
            return Err(Error::store("Election record vanished during advance"));
        }
        self.ledgers.lock().map_err(|_| lock_failed())?.remove(id);

        info!(
            "Election {} closed round {} (winner: {:?}, completed: {})",
            election.id, closed.number, winner, closed.completed
        );
        self.hub.publish(
            &election.id,
            ElectionEvent::RoundAdvanced {
                election_id: election.id.clone(),
                round: closed.number,
                winner,
                completed: closed.completed,
            },
        )?;
        Ok(round)
    }

    /// Terminate an active election early. Repeating the call is a no-op
    /// success.
    pub fn stop_halfway(&self, id: &ObjectId) -> Result<Election> {
        let lock = self.transition_lock(id)?;
        let _guard = lock.lock().map_err(|_| lock_failed())?;

        let mut election = self.get(id)?;
        if !lifecycle::stop(&mut election)? {
            return Ok(election);
        }
        if !self.elections.replace(election.clone())? {
            return Err(Error::store("Election record vanished during stop"));
        }
        self.ledgers.lock().map_err(|_| lock_failed())?.remove(id);

        info!("Election {} stopped halfway", election.id);
        self.hub.publish(
            &election.id,
            ElectionEvent::ElectionStopped { election_id: election.id.clone() },
        )?;
        Ok(election)
    }
}
