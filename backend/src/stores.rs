use shared::error::Result;
use shared::models::*;
use shared::object_id::ObjectId;

use crate::store::{Collection, Document, Page};

impl Document for Group {
    fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl Document for MealChoice {
    fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl Document for Account {
    fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl Document for Election {
    fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl Document for ElectionRound {
    fn id(&self) -> &ObjectId {
        &self.id
    }
}

#[derive(Debug, Default)]
pub struct GroupStore {
    rows: Collection<Group>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, request: CreateGroupRequest) -> Result<Group> {
        self.rows.insert(Group {
            id: ObjectId::generate(),
            name: request.name,
            description: request.description,
            creator_id: request.creator_id,
        })
    }

    pub fn get(&self, id: &ObjectId) -> Result<Option<Group>> {
        self.rows.get(id)
    }

    pub fn exists(&self, id: &ObjectId) -> Result<bool> {
        self.rows.exists(id)
    }

    pub fn list(&self, page: Page) -> Result<Vec<Group>> {
        self.rows.scan(page, |_| true)
    }

    pub fn count(&self) -> Result<usize> {
        self.rows.count(|_| true)
    }

    pub fn soft_delete(&self, id: &ObjectId) -> Result<bool> {
        self.rows.soft_delete(id)
    }
}

#[derive(Debug, Default)]
pub struct MealChoiceStore {
    rows: Collection<MealChoice>,
}

impl MealChoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, request: CreateMealChoiceRequest) -> Result<MealChoice> {
        self.rows.insert(MealChoice {
            id: ObjectId::generate(),
            group_id: request.group_id,
            name: request.name,
            description: request.description,
            image_url: request.image_url,
            menu_url: request.menu_url,
        })
    }

    pub fn list(&self, page: Page, group_id: Option<&ObjectId>) -> Result<Vec<MealChoice>> {
        self.rows
            .scan(page, |choice| group_id.map_or(true, |g| choice.group_id == *g))
    }

    /// Candidate ids a group can elect between.
    pub fn candidates_for_group(&self, group_id: &ObjectId) -> Result<Vec<ObjectId>> {
        Ok(self
            .rows
            .scan(Page::default(), |choice| choice.group_id == *group_id)?
            .into_iter()
            .map(|choice| choice.id)
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct AccountStore {
    rows: Collection<Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, request: CreateAccountRequest) -> Result<Account> {
        self.rows.insert(Account {
            id: ObjectId::generate(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone_number: request.phone_number,
            group_id: request.group_id,
        })
    }

    pub fn list(&self, page: Page, group_id: Option<&ObjectId>) -> Result<Vec<Account>> {
        self.rows
            .scan(page, |account| group_id.map_or(true, |g| account.group_id.as_ref() == Some(g)))
    }

    /// How many accounts belong to a group; the expected-voter ceiling for
    /// a round.
    pub fn member_count(&self, group_id: &ObjectId) -> Result<usize> {
        self.rows
            .count(|account| account.group_id.as_ref() == Some(group_id))
    }
}

#[derive(Debug, Default)]
pub struct ElectionStore {
    rows: Collection<Election>,
}

impl ElectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// New elections are pending: lifecycle fields start at rest no matter
    /// what the caller sent.
    pub fn create(&self, group_id: ObjectId, rounds: i32) -> Result<Election> {
        self.rows.insert(Election {
            id: ObjectId::generate(),
            group_id,
            rounds,
            current_round: None,
            is_active: false,
            stopped_halfway: false,
        })
    }

    pub fn get(&self, id: &ObjectId) -> Result<Option<Election>> {
        self.rows.get(id)
    }

    pub fn list(&self, page: Page) -> Result<Vec<Election>> {
        self.rows.scan(page, |_| true)
    }

    pub fn scan(&self, query: &ElectionScan, page: Page) -> Result<Vec<Election>> {
        self.rows.scan(page, |e| {
            query.rounds.map_or(true, |v| e.rounds == v)
                && query.current_round.map_or(true, |v| e.current_round == Some(v))
                && query.is_active.map_or(true, |v| e.is_active == v)
                && query.stopped_halfway.map_or(true, |v| e.stopped_halfway == v)
                && query
                    .group_id
                    .as_deref()
                    .filter(|g| !g.trim().is_empty())
                    .map_or(true, |g| e.group_id.as_str() == g)
        })
    }

    pub fn active_for_group(&self, group_id: &ObjectId) -> Result<Option<Election>> {
        Ok(self
            .rows
            .scan(Page::default(), |e| e.is_active && e.group_id == *group_id)?
            .into_iter()
            .next())
    }

    pub fn replace(&self, election: Election) -> Result<bool> {
        self.rows.replace(election)
    }

    pub fn soft_delete(&self, id: &ObjectId) -> Result<bool> {
        self.rows.soft_delete(id)
    }
}

#[derive(Debug, Default)]
pub struct RoundStore {
    rows: Collection<ElectionRound>,
}

impl RoundStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, request: CreateRoundRequest) -> Result<ElectionRound> {
        self.rows.insert(ElectionRound {
            id: ObjectId::generate(),
            election_id: request.election_id,
            group_id: request.group_id,
            winner: request.winner,
            rounds: request.rounds,
        })
    }

    pub fn get(&self, id: &ObjectId) -> Result<Option<ElectionRound>> {
        self.rows.get(id)
    }

    pub fn list(&self, page: Page) -> Result<Vec<ElectionRound>> {
        self.rows.scan(page, |_| true)
    }

    pub fn list_for_election(&self, election_id: &ObjectId) -> Result<Vec<ElectionRound>> {
        let mut rounds = self
            .rows
            .scan(Page::default(), |r| r.election_id == *election_id)?;
        rounds.sort_by_key(|r| r.rounds);
        Ok(rounds)
    }

    pub fn replace(&self, round: ElectionRound) -> Result<bool> {
        self.rows.replace(round)
    }

    pub fn soft_delete(&self, id: &ObjectId) -> Result<bool> {
        self.rows.soft_delete(id)
    }
}
