use std::collections::HashMap;
use std::hash::Hash;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TallyError<C> {
    #[error("Duplicate candidate: {0:?}")]
    DuplicateCandidate(C),
    #[error("Unknown candidate: {0:?}")]
    UnknownCandidate(C),
}

#[derive(Debug, Clone, Default)]
struct Standing {
    votes: u32,
    first_vote: Option<u64>,
}

/// Plurality tally for one election round. Candidates are registered up
/// front; each voter holds exactly one ballot and a later vote replaces the
/// earlier one. Ties break toward the candidate whose first vote arrived
/// earliest, which keeps the outcome independent of map iteration order.
#[derive(Debug)]
pub struct RoundTally<C: Clone + Eq + Hash, V: Eq + Hash> {
    standings: HashMap<C, Standing>,
    ballots: HashMap<V, C>,
    arrivals: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TallyOutcome<C> {
    pub winner: Option<C>,
    pub votes: u32,
    pub total_ballots: usize,
}

impl<C: Clone + Eq + Hash, V: Eq + Hash> RoundTally<C, V> {
    pub fn new() -> Self {
        Self {
            standings: HashMap::new(),
            ballots: HashMap::new(),
            arrivals: 0,
        }
    }

    pub fn add_candidate(&mut self, candidate: C) -> Result<(), TallyError<C>> {
        if self.standings.contains_key(&candidate) {
            return Err(TallyError::DuplicateCandidate(candidate));
        }
        self.standings.insert(candidate, Standing::default());
        Ok(())
    }

    pub fn candidate_count(&self) -> usize {
        self.standings.len()
    }

    pub fn ballots(&self) -> usize {
        self.ballots.len()
    }

    pub fn record(&mut self, voter: V, candidate: C) -> Result<(), TallyError<C>> {
        if !self.standings.contains_key(&candidate) {
            return Err(TallyError::UnknownCandidate(candidate));
        }

        if let Some(previous) = self.ballots.insert(voter, candidate.clone()) {
            if let Some(standing) = self.standings.get_mut(&previous) {
                standing.votes = standing.votes.saturating_sub(1);
            }
        }

        let standing = self
            .standings
            .get_mut(&candidate)
            .ok_or(TallyError::UnknownCandidate(candidate))?;
        standing.votes += 1;
        if standing.first_vote.is_none() {
            standing.first_vote = Some(self.arrivals);
        }
        self.arrivals += 1;
        Ok(())
    }

    pub fn outcome(&self) -> TallyOutcome<C> {
        let mut best: Option<(&C, &Standing)> = None;
        for (candidate, standing) in &self.standings {
            if standing.votes == 0 {
                continue;
            }
            best = match best {
                None => Some((candidate, standing)),
                Some((_, leader)) if standing.votes > leader.votes => Some((candidate, standing)),
                Some((_, leader))
                    if standing.votes == leader.votes
                        && standing.first_vote < leader.first_vote =>
                {
                    Some((candidate, standing))
                }
                keep => keep,
            };
        }

        TallyOutcome {
            winner: best.map(|(candidate, _)| candidate.clone()),
            votes: best.map_or(0, |(_, standing)| standing.votes),
            total_ballots: self.ballots.len(),
        }
    }
}

impl<C: Clone + Eq + Hash, V: Eq + Hash> Default for RoundTally<C, V> {
    fn default() -> Self {
        Self::new()
    }
}
