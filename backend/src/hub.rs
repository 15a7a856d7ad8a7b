use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use shared::error::{Error, Result};
use shared::object_id::ObjectId;

/// Opaque transport-session identity. Reconnecting mints a new one; nothing
/// ties it to an account.
pub type ClientId = String;

#[derive(Debug, Default)]
struct Topic {
    members: Mutex<Vec<ClientId>>,
}

fn lock_failed() -> Error {
    Error::store("Topic registry lock failed")
}

/// Per-topic publish/subscribe registry. A connection is a session id plus
/// an unbounded sender; topics hold member lists behind their own locks so
/// traffic on one election does not contend with another. Fan-out happens
/// under the topic lock, which is what keeps per-topic delivery order
/// identical for every member.
pub struct Hub<E: Clone> {
    connections: RwLock<HashMap<ClientId, UnboundedSender<E>>>,
    topics: RwLock<HashMap<ObjectId, Arc<Topic>>>,
    rng: SystemRandom,
}

impl<E: Clone> Hub<E> {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            topics: RwLock::new(HashMap::new()),
            rng: SystemRandom::new(),
        }
    }

    /// Open a connection: mints a session id and hands back the event
    /// receiver for it.
    pub fn connect(&self) -> Result<(ClientId, UnboundedReceiver<E>)> {
        let mut bytes = [0u8; 16];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| Error::store("Session token generation failed"))?;
        let client = URL_SAFE_NO_PAD.encode(bytes);

        let (tx, rx) = mpsc::unbounded_channel();
        let mut connections = self.connections.write().map_err(|_| lock_failed())?;
        connections.insert(client.clone(), tx);
        Ok((client, rx))
    }

    pub fn disconnect(&self, client: &str) -> Result<()> {
        let mut connections = self.connections.write().map_err(|_| lock_failed())?;
        connections.remove(client);
        Ok(())
    }

    /// Add a client to a topic. Idempotent: a second join leaves membership
    /// unchanged.
    pub fn join(&self, topic: &ObjectId, client: &str) -> Result<()> {
        let topic = {
            let mut topics = self.topics.write().map_err(|_| lock_failed())?;
            topics.entry(topic.clone()).or_default().clone()
        };

        let mut members = topic.members.lock().map_err(|_| lock_failed())?;
        if !members.iter().any(|member| member == client) {
            members.push(client.to_string());
        }
        Ok(())
    }

    pub fn leave(&self, topic: &ObjectId, client: &str) -> Result<()> {
        let topics = self.topics.read().map_err(|_| lock_failed())?;
        if let Some(topic) = topics.get(topic) {
            let mut members = topic.members.lock().map_err(|_| lock_failed())?;
            members.retain(|member| member != client);
        }
        Ok(())
    }

    /// Fan an event out to every current member of the topic, sender
    /// included. Sends to vanished connections are dropped, not retried.
    /// Returns the number of deliveries.
    pub fn publish(&self, topic: &ObjectId, event: E) -> Result<usize> {
        let topic = {
            let topics = self.topics.read().map_err(|_| lock_failed())?;
            match topics.get(topic) {
                Some(topic) => topic.clone(),
                None => return Ok(0),
            }
        };

        let members = topic.members.lock().map_err(|_| lock_failed())?;
        let connections = self.connections.read().map_err(|_| lock_failed())?;

        let mut delivered = 0;
        for member in members.iter() {
            if let Some(tx) = connections.get(member) {
                if tx.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        Ok(delivered)
    }

    /// Fan an event out to every connected client, regardless of topic.
    pub fn publish_all(&self, event: E) -> Result<usize> {
        let connections = self.connections.read().map_err(|_| lock_failed())?;

        let mut delivered = 0;
        for tx in connections.values() {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    pub fn member_count(&self, topic: &ObjectId) -> Result<usize> {
        let topics = self.topics.read().map_err(|_| lock_failed())?;
        match topics.get(topic) {
            Some(topic) => Ok(topic.members.lock().map_err(|_| lock_failed())?.len()),
            None => Ok(0),
        }
    }

    pub fn is_member(&self, topic: &ObjectId, client: &str) -> Result<bool> {
        let topics = self.topics.read().map_err(|_| lock_failed())?;
        match topics.get(topic) {
            Some(topic) => Ok(topic
                .members
                .lock()
                .map_err(|_| lock_failed())?
                .iter()
                .any(|member| member == client)),
            None => Ok(false),
        }
    }

    pub fn connected_count(&self) -> Result<usize> {
        Ok(self.connections.read().map_err(|_| lock_failed())?.len())
    }
}

impl<E: Clone> Default for Hub<E> {
    fn default() -> Self {
        Self::new()
    }
}
