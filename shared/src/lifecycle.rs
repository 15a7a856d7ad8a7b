use thiserror::Error;

use crate::models::Election;

/// Where an election sits in its lifecycle. `Active` carries the round
/// currently being voted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionPhase {
    Pending,
    Active(i32),
    Completed,
    StoppedHalfway,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Election has already been started")]
    AlreadyStarted,
    #[error("Election has already finished")]
    AlreadyFinished,
    #[error("Election is not active")]
    NotActive,
}

/// The round a successful advance committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedRound {
    pub number: i32,
    pub completed: bool,
}

pub fn phase(election: &Election) -> ElectionPhase {
    if election.stopped_halfway {
        ElectionPhase::StoppedHalfway
    } else if election.is_active {
        ElectionPhase::Active(election.current_round.unwrap_or(0))
    } else if election.current_round.is_some() {
        ElectionPhase::Completed
    } else {
        ElectionPhase::Pending
    }
}

/// Start a pending election. A zero-round election has nothing to vote on
/// and completes on the spot.
pub fn begin(election: &mut Election) -> Result<(), TransitionError> {
    match phase(election) {
        ElectionPhase::Pending => {}
        ElectionPhase::Active(_) => return Err(TransitionError::AlreadyStarted),
        ElectionPhase::Completed | ElectionPhase::StoppedHalfway => {
            return Err(TransitionError::AlreadyFinished)
        }
    }

    election.current_round = Some(0);
    election.is_active = election.rounds > 0;
    Ok(())
}

/// Close the current round: the committed round keeps the pre-advance
/// number; the election completes once every round has been closed.
pub fn advance(election: &mut Election) -> Result<ClosedRound, TransitionError> {
    let current = match phase(election) {
        ElectionPhase::Active(round) => round,
        _ => return Err(TransitionError::NotActive),
    };

    let next = current + 1;
    let completed = next == election.rounds;
    election.current_round = Some(next);
    election.is_active = !completed;

    Ok(ClosedRound { number: current, completed })
}

/// Terminate an active election before its rounds run out. Idempotent: a
/// second stop reports `false` and leaves the record untouched.
pub fn stop(election: &mut Election) -> Result<bool, TransitionError> {
    if election.stopped_halfway {
        return Ok(false);
    }
    if !election.is_active {
        return Err(TransitionError::NotActive);
    }

    election.is_active = false;
    election.stopped_halfway = true;
    Ok(true)
}

/// `is_active` and `stopped_halfway` are mutually exclusive and the current
/// round never passes the round count.
pub fn invariants_hold(election: &Election) -> bool {
    if election.is_active && election.stopped_halfway {
        return false;
    }
    election
        .current_round
        .map_or(true, |round| (0..=election.rounds).contains(&round))
}
