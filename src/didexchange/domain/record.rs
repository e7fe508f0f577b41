//! Persisted connection record.

use super::{ConnectionId, ConnectionState, DidExchangeDomainError, Invitation, Role};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an agent knows about its peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Peer label, once known.
    pub label: Option<String>,
    /// Peer DID, once exchanged.
    pub did: Option<String>,
    /// Endpoint messages to the peer are sent to.
    pub endpoint: String,
    /// Base64url public key the peer signs with, if known up front.
    pub key: Option<String>,
}

/// One side of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    connection_id: ConnectionId,
    role: Role,
    state: ConnectionState,
    thread_id: String,
    invitation_id: String,
    my_did: Option<String>,
    my_kid: Option<String>,
    peer: PeerInfo,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConnectionRecord {
    /// Creates the invitee's record after receiving `invitation`.
    #[must_use]
    pub fn for_invitee(
        invitation: &Invitation,
        peer: PeerInfo,
        clock: &(impl Clock + ?Sized),
    ) -> Self {
        Self::new(
            Role::Invitee,
            ConnectionState::Invited,
            Uuid::new_v4().to_string(),
            invitation.id().to_owned(),
            peer,
            clock,
        )
    }

    /// Creates the inviter's record after receiving a request on `thread_id`.
    #[must_use]
    pub fn for_inviter(
        thread_id: &str,
        invitation_id: &str,
        peer: PeerInfo,
        clock: &(impl Clock + ?Sized),
    ) -> Self {
        Self::new(
            Role::Inviter,
            ConnectionState::Requested,
            thread_id.to_owned(),
            invitation_id.to_owned(),
            peer,
            clock,
        )
    }

    fn new(
        role: Role,
        state: ConnectionState,
        thread_id: String,
        invitation_id: String,
        peer: PeerInfo,
        clock: &(impl Clock + ?Sized),
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            connection_id: ConnectionId::new(),
            role,
            state,
            thread_id,
            invitation_id,
            my_did: None,
            my_kid: None,
            peer,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the connection identifier.
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Returns this agent's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the message thread identifier.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Returns the invitation the connection started from.
    #[must_use]
    pub fn invitation_id(&self) -> &str {
        &self.invitation_id
    }

    /// Returns this agent's DID, once created.
    #[must_use]
    pub fn my_did(&self) -> Option<&str> {
        self.my_did.as_deref()
    }

    /// Returns the key identifier behind this agent's DID.
    #[must_use]
    pub fn my_kid(&self) -> Option<&str> {
        self.my_kid.as_deref()
    }

    /// Returns what is known about the peer.
    #[must_use]
    pub const fn peer(&self) -> &PeerInfo {
        &self.peer
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records the DID this agent uses on the connection.
    pub fn set_my_did(&mut self, did: String, kid: String) {
        self.my_did = Some(did);
        self.my_kid = Some(kid);
    }

    /// Records the peer DID and, when given, its updated endpoint.
    pub fn set_peer_did(&mut self, did: String, endpoint: Option<String>) {
        self.peer.did = Some(did);
        if let Some(url) = endpoint {
            self.peer.endpoint = url;
        }
    }

    /// Moves the connection to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeDomainError::InvalidTransition`] when the move is
    /// not allowed from the current state.
    pub fn transition(
        &mut self,
        next: ConnectionState,
        clock: &(impl Clock + ?Sized),
    ) -> Result<(), DidExchangeDomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DidExchangeDomainError::InvalidTransition {
                connection_id: self.connection_id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = clock.utc();
        Ok(())
    }
}
