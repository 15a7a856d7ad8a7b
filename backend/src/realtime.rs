use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use shared::error::{Error, ErrorCode, Result};
use shared::events::{ElectionEvent, GroupEvent};
use shared::models::Vote;
use shared::object_id::ObjectId;

use crate::coordinator::{ElectionCoordinator, VoteOutcome};
use crate::hub::{ClientId, Hub};
use crate::stores::GroupStore;

/// The election-scoped realtime protocol: join, leave and vote. The hub
/// carries the traffic; the coordinator vets joins and absorbs votes.
pub struct ElectionChannel {
    hub: Arc<Hub<ElectionEvent>>,
    coordinator: Arc<ElectionCoordinator>,
}

impl ElectionChannel {
    pub fn new(hub: Arc<Hub<ElectionEvent>>, coordinator: Arc<ElectionCoordinator>) -> Self {
        Self { hub, coordinator }
    }

    pub fn connect(&self) -> Result<(ClientId, UnboundedReceiver<ElectionEvent>)> {
        self.hub.connect()
    }

    pub fn disconnect(&self, client: &str) -> Result<()> {
        self.hub.disconnect(client)
    }

    /// Membership requires a running election. The `joined` event goes to
    /// the whole topic, the joiner included, and fires again on a duplicate
    /// join even though membership does not change.
    pub fn join_election(
        &self,
        client: &str,
        election_id: &ObjectId,
        group_id: &ObjectId,
    ) -> Result<()> {
        let election = self.coordinator.get(election_id)?;
        if !election.is_active {
            return Err(Error::new(ErrorCode::Conflict, "Election is not active"));
        }

        self.hub.join(election_id, client)?;
        self.hub.publish(
            election_id,
            ElectionEvent::Joined {
                election_id: election_id.clone(),
                group_id: group_id.clone(),
                client_id: client.to_string(),
            },
        )?;
        Ok(())
    }

    pub fn leave_election(
        &self,
        client: &str,
        election_id: &ObjectId,
        group_id: &ObjectId,
    ) -> Result<()> {
        self.hub.leave(election_id, client)?;
        self.hub.publish(
            election_id,
            ElectionEvent::Left {
                election_id: election_id.clone(),
                group_id: group_id.clone(),
                client_id: client.to_string(),
            },
        )?;
        Ok(())
    }

    /// Votes fan out verbatim to the topic before the ledger sees them, so
    /// subscribers observe the ballot ahead of any round it closes.
    pub fn vote(&self, vote: Vote) -> Result<VoteOutcome> {
        self.hub.publish(
            &vote.election_id,
            ElectionEvent::Vote {
                election_id: vote.election_id.clone(),
                group_id: vote.group_id.clone(),
                voter_id: vote.voter_id.clone(),
                candidate_id: vote.candidate_id.clone(),
            },
        )?;
        self.coordinator.record_vote(&vote)
    }

    /// Connect-and-join in one step, wrapped so dropping the subscription
    /// leaves the topic and closes the connection.
    pub fn subscribe(
        self: &Arc<Self>,
        election_id: &ObjectId,
        group_id: &ObjectId,
    ) -> Result<Subscription> {
        let (client_id, rx) = self.connect()?;
        if let Err(err) = self.join_election(&client_id, election_id, group_id) {
            let _ = self.disconnect(&client_id);
            return Err(err);
        }
        Ok(Subscription {
            channel: self.clone(),
            client_id,
            election_id: election_id.clone(),
            group_id: group_id.clone(),
            rx,
        })
    }
}

/// Live membership in one election topic.
pub struct Subscription {
    channel: Arc<ElectionChannel>,
    client_id: ClientId,
    election_id: ObjectId,
    group_id: ObjectId,
    rx: UnboundedReceiver<ElectionEvent>,
}

impl Subscription {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub async fn next(&mut self) -> Option<ElectionEvent> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<ElectionEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self
            .channel
            .leave_election(&self.client_id, &self.election_id, &self.group_id);
        let _ = self.channel.disconnect(&self.client_id);
    }
}

/// Group presence: rooms keyed by group id plus the hub-wide member count
/// broadcast. Room joins do not echo an event; only the count request does.
pub struct GroupChannel {
    hub: Arc<Hub<GroupEvent>>,
    groups: Arc<GroupStore>,
}

impl GroupChannel {
    pub fn new(hub: Arc<Hub<GroupEvent>>, groups: Arc<GroupStore>) -> Self {
        Self { hub, groups }
    }

    pub fn connect(&self) -> Result<(ClientId, UnboundedReceiver<GroupEvent>)> {
        self.hub.connect()
    }

    pub fn disconnect(&self, client: &str) -> Result<()> {
        self.hub.disconnect(client)
    }

    pub fn join_room(&self, room_id: &ObjectId, client: &str) -> Result<()> {
        self.hub.join(room_id, client)
    }

    pub fn leave_room(&self, room_id: &ObjectId, client: &str) -> Result<()> {
        self.hub.leave(room_id, client)
    }

    /// Count the non-deleted groups and tell every connected client.
    pub fn request_group_count(&self) -> Result<usize> {
        let count = self.groups.count()?;
        self.hub.publish_all(GroupEvent::GroupCount { count })?;
        Ok(count)
    }
}
