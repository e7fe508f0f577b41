//! Per-agent DID exchange service and the client verbs it exposes.

use super::domain::{
    COMPLETE_TYPE, CompleteBody, ConnectionId, ConnectionRecord, ConnectionState,
    DidExchangeDomainError, Invitation, PROBLEM_REPORT_TYPE, PeerInfo, ProblemReportBody,
    REQUEST_TYPE, RESPONSE_TYPE, RequestBody, ResponseBody, Role, SignedAttachment,
};
use crate::provisioning::domain::{AgentId, KeyType};
use crate::runtime::did::{DidDocument, DidDocumentError, did_method};
use crate::runtime::ports::{KmsError, StorageError, Store, VdrError, get_json, put_json};
use crate::runtime::{ActionEvent, ActionKind, AgentContext, Envelope, MessengerError, StateEvent};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

const NAMESPACE: &str = "didexchange";
const PROTOCOL: &str = "didexchange";

/// Errors returned by DID exchange operations.
#[derive(Debug, Clone, Error)]
pub enum DidExchangeError {
    /// A domain rule was violated.
    #[error(transparent)]
    Domain(#[from] DidExchangeDomainError),

    /// Connection storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Key creation or signing failed.
    #[error(transparent)]
    Kms(#[from] KmsError),

    /// A message could not be sent.
    #[error(transparent)]
    Messenger(#[from] MessengerError),

    /// A public DID could not be resolved.
    #[error(transparent)]
    Resolution(#[from] VdrError),

    /// A DID document lacked usable keys.
    #[error(transparent)]
    DidDocument(#[from] DidDocumentError),

    /// The agent has no inbound transport to advertise.
    #[error("agent {0} has no inbound endpoint and cannot take part in DID exchange")]
    NoInboundEndpoint(AgentId),

    /// The peer advertised no endpoint to reply to.
    #[error("peer {0} advertises no DIDComm endpoint")]
    PeerHasNoEndpoint(String),

    /// No configured resolver handles the DID.
    #[error("no DID resolver accepts {0}")]
    NoResolver(String),

    /// No connection record has this identifier.
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// No connection belongs to the message thread.
    #[error("no connection for thread {0}")]
    UnknownThread(String),

    /// The request names an invitation this agent did not create.
    #[error("unknown invitation: {0}")]
    UnknownInvitation(String),

    /// Approval or rejection was requested when nothing awaits a decision.
    #[error("connection {connection_id} in state {state} has no pending action")]
    NoPendingAction {
        /// Connection addressed.
        connection_id: ConnectionId,
        /// Its current state.
        state: ConnectionState,
    },

    /// A message arrived that the connection cannot accept in its state.
    #[error("unexpected {message_type} for connection in state {state}")]
    UnexpectedMessage {
        /// Message type received.
        message_type: String,
        /// Current connection state.
        state: ConnectionState,
    },

    /// The message type is not part of DID exchange.
    #[error("unsupported DID exchange message type: {0}")]
    UnsupportedMessageType(String),

    /// A message body could not be encoded or decoded.
    #[error("malformed DID exchange message: {0}")]
    Encoding(Arc<serde_json::Error>),
}

impl From<serde_json::Error> for DidExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(Arc::new(err))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredInvitation {
    invitation: Invitation,
    kid: String,
}

fn connection_key(connection_id: ConnectionId) -> String {
    format!("conn_{connection_id}")
}

fn thread_key(thread_id: &str) -> String {
    format!("thread_{thread_id}")
}

fn invitation_key(invitation_id: &str) -> String {
    format!("invitation_{invitation_id}")
}

/// DID exchange verbs for one agent.
///
/// Invitations, requests and responses are answered through [`approve`] or
/// [`reject`] after the corresponding action event; responses and completions
/// are processed automatically.
///
/// [`approve`]: DidExchangeClient::approve
/// [`reject`]: DidExchangeClient::reject
#[derive(Clone)]
pub struct DidExchangeClient {
    context: AgentContext,
    store: Arc<dyn Store>,
}

impl DidExchangeClient {
    /// Opens the connection store of the agent behind `context`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the store cannot be opened.
    pub fn new(context: AgentContext) -> Result<Self, StorageError> {
        let store = context.storage().open_store(NAMESPACE)?;
        Ok(Self { context, store })
    }

    /// Creates an invitation carrying a fresh key and this agent's endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeError::NoInboundEndpoint`] for edge agents and
    /// key-management or storage failures.
    pub async fn create_invitation(
        &self,
        label: Option<&str>,
    ) -> Result<Invitation, DidExchangeError> {
        let endpoint = self.endpoint()?;
        let key = self.context.keys().manager().create(KeyType::Ed25519).await?;
        let invitation = Invitation::inline(
            label.unwrap_or_else(|| self.context.agent_id().as_str()),
            key.public_key(),
            &endpoint,
            self.context.accepted_profiles(),
        );
        put_json(
            self.store.as_ref(),
            &invitation_key(invitation.id()),
            &StoredInvitation {
                invitation: invitation.clone(),
                kid: key.kid().to_owned(),
            },
        )?;

        tracing::info!(
            agent_id = %self.context.agent_id(),
            invitation_id = invitation.id(),
            "invitation created"
        );
        Ok(invitation)
    }

    /// Records an invitation from a peer and raises an
    /// [`ActionKind::InvitationReceived`] action.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeError`] when the invitation is incomplete, its
    /// public DID cannot be resolved or the record cannot be stored.
    pub async fn receive_invitation(
        &self,
        invitation: &Invitation,
    ) -> Result<ConnectionId, DidExchangeError> {
        invitation.validate()?;
        self.endpoint()?;
        let peer = self.peer_from_invitation(invitation).await?;
        let record = ConnectionRecord::for_invitee(invitation, peer, self.context.clock());
        self.insert(&record)?;

        self.publish_state(&record);
        self.publish_action(ActionKind::InvitationReceived, &record);
        Ok(record.connection_id())
    }

    /// Accepts the pending action on `connection_id`.
    ///
    /// For an invitee this sends the exchange request; for an inviter it
    /// sends the signed response.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeError::NoPendingAction`] when the connection does
    /// not await a decision, or the failure of sending the reply. A failed
    /// send abandons the connection.
    pub async fn approve(&self, connection_id: ConnectionId) -> Result<(), DidExchangeError> {
        let mut record = self.load(connection_id)?;
        match (record.role(), record.state()) {
            (Role::Invitee, ConnectionState::Invited) => self.send_request(&mut record).await,
            (Role::Inviter, ConnectionState::Requested) => self.send_response(&mut record).await,
            (_, state) => Err(DidExchangeError::NoPendingAction {
                connection_id,
                state,
            }),
        }
    }

    /// Abandons `connection_id`, notifying a requesting peer.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeDomainError::InvalidTransition`] when the
    /// connection already finished.
    pub async fn reject(
        &self,
        connection_id: ConnectionId,
        reason: &str,
    ) -> Result<(), DidExchangeError> {
        let mut record = self.load(connection_id)?;
        let notify_peer =
            record.role() == Role::Inviter && record.state() == ConnectionState::Requested;
        self.advance(&mut record, ConnectionState::Abandoned)?;

        if notify_peer {
            let report = Envelope::reply(
                PROBLEM_REPORT_TYPE,
                record.thread_id(),
                &ProblemReportBody {
                    code: "request_rejected".to_owned(),
                    explain: reason.to_owned(),
                },
            )?;
            if let Err(err) = self
                .context
                .messenger()
                .send(&report, &record.peer().endpoint)
                .await
            {
                tracing::warn!(
                    agent_id = %self.context.agent_id(),
                    connection_id = %connection_id,
                    error = %err,
                    "failed to deliver rejection"
                );
            }
        }
        Ok(())
    }

    /// Returns the record of `connection_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeError::ConnectionNotFound`] for unknown ids.
    pub fn connection(
        &self,
        connection_id: ConnectionId,
    ) -> Result<ConnectionRecord, DidExchangeError> {
        self.load(connection_id)
    }

    /// Returns all connection records of this agent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when listing fails.
    pub fn connections(&self) -> Result<Vec<ConnectionRecord>, DidExchangeError> {
        let mut records = Vec::new();
        for key in self.store.keys("conn_")? {
            if let Some(record) = get_json(self.store.as_ref(), &key)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Processes an inbound DID exchange message.
    pub(crate) async fn handle_inbound(&self, envelope: Envelope) -> Result<(), DidExchangeError> {
        match envelope.message_type.as_str() {
            REQUEST_TYPE => self.handle_request(&envelope),
            RESPONSE_TYPE => self.handle_response(&envelope).await,
            COMPLETE_TYPE => self.handle_complete(&envelope),
            PROBLEM_REPORT_TYPE => self.handle_problem_report(&envelope),
            other => Err(DidExchangeError::UnsupportedMessageType(other.to_owned())),
        }
    }

    fn endpoint(&self) -> Result<String, DidExchangeError> {
        self.context
            .service_endpoint()
            .ok_or_else(|| DidExchangeError::NoInboundEndpoint(self.context.agent_id().clone()))
    }

    async fn peer_from_invitation(
        &self,
        invitation: &Invitation,
    ) -> Result<PeerInfo, DidExchangeError> {
        let label = Some(invitation.label().to_owned());
        if let (Some(key), Some(endpoint)) =
            (invitation.recipient_key()?, invitation.service_endpoint())
        {
            return Ok(PeerInfo {
                label,
                did: None,
                endpoint: endpoint.to_owned(),
                key: Some(URL_SAFE_NO_PAD.encode(key)),
            });
        }

        let did = invitation.did().ok_or_else(|| {
            DidExchangeDomainError::IncompleteInvitation(invitation.id().to_owned())
        })?;
        let method = did_method(did).ok_or_else(|| VdrError::MalformedDid(did.to_owned()))?;
        let resolver = self
            .context
            .did_resolver()
            .filter(|resolver| resolver.accepts(method))
            .ok_or_else(|| DidExchangeError::NoResolver(did.to_owned()))?;
        let document = resolver.resolve(did).await?;
        let endpoint = document
            .service_endpoint()
            .ok_or_else(|| DidExchangeError::PeerHasNoEndpoint(did.to_owned()))?
            .to_owned();
        let key = document.signing_key()?;

        Ok(PeerInfo {
            label,
            did: Some(did.to_owned()),
            endpoint,
            key: Some(URL_SAFE_NO_PAD.encode(key)),
        })
    }

    async fn create_did(
        &self,
        record: &mut ConnectionRecord,
    ) -> Result<DidDocument, DidExchangeError> {
        let endpoint = self.endpoint()?;
        let key = self.context.keys().manager().create(KeyType::Ed25519).await?;
        let document = DidDocument::peer(
            key.public_key(),
            Some(&endpoint),
            &self.context.accepted_profiles(),
        );
        record.set_my_did(document.id.clone(), key.kid().to_owned());
        Ok(document)
    }

    async fn send_request(&self, record: &mut ConnectionRecord) -> Result<(), DidExchangeError> {
        let document = self.create_did(record).await?;
        let body = RequestBody {
            label: self.context.agent_id().to_string(),
            did: document.id.clone(),
            did_doc: document,
        };
        let request = Envelope::reply(REQUEST_TYPE, record.thread_id(), &body)?
            .with_parent_thread(record.invitation_id());

        self.advance(record, ConnectionState::Requested)?;
        self.deliver(record, &request).await
    }

    async fn send_response(&self, record: &mut ConnectionRecord) -> Result<(), DidExchangeError> {
        let stored: StoredInvitation =
            get_json(self.store.as_ref(), &invitation_key(record.invitation_id()))?
                .ok_or_else(|| {
                    DidExchangeError::UnknownInvitation(record.invitation_id().to_owned())
                })?;
        let document = self.create_did(record).await?;
        let data = SignedAttachment::encode_document(&document)?;
        let signature = self
            .context
            .keys()
            .crypto()
            .sign(data.as_bytes(), &stored.kid)
            .await?;
        let body = ResponseBody {
            did: document.id,
            did_doc_attach: SignedAttachment::new(data, &signature),
        };
        let response = Envelope::reply(RESPONSE_TYPE, record.thread_id(), &body)?;

        self.advance(record, ConnectionState::Responded)?;
        self.deliver(record, &response).await
    }

    fn handle_request(&self, envelope: &Envelope) -> Result<(), DidExchangeError> {
        let invitation_id = envelope.pthid.clone().unwrap_or_default();
        if get_json::<StoredInvitation>(self.store.as_ref(), &invitation_key(&invitation_id))?
            .is_none()
        {
            return Err(DidExchangeError::UnknownInvitation(invitation_id));
        }
        if let Ok(existing) = self.load_by_thread(&envelope.thid) {
            return Err(DidExchangeError::UnexpectedMessage {
                message_type: envelope.message_type.clone(),
                state: existing.state(),
            });
        }

        let body: RequestBody = envelope.body_as()?;
        let endpoint = body
            .did_doc
            .service_endpoint()
            .ok_or_else(|| DidExchangeError::PeerHasNoEndpoint(body.did.clone()))?
            .to_owned();
        let peer = PeerInfo {
            label: Some(body.label),
            did: Some(body.did),
            endpoint,
            key: None,
        };
        let record = ConnectionRecord::for_inviter(
            &envelope.thid,
            &invitation_id,
            peer,
            self.context.clock(),
        );
        self.insert(&record)?;

        self.publish_state(&record);
        self.publish_action(ActionKind::RequestReceived, &record);
        Ok(())
    }

    async fn handle_response(&self, envelope: &Envelope) -> Result<(), DidExchangeError> {
        let mut record = self.load_by_thread(&envelope.thid)?;
        Self::expect_state(&record, Role::Invitee, ConnectionState::Requested, envelope)?;

        let body: ResponseBody = envelope.body_as()?;
        let verified = record
            .peer()
            .key
            .as_deref()
            .and_then(|key| URL_SAFE_NO_PAD.decode(key).ok())
            .ok_or(DidExchangeDomainError::MalformedEncoding("peer key"))
            .and_then(|signer| body.did_doc_attach.verify(&signer, &body.did));
        let document = match verified {
            Ok(document) => document,
            Err(err) => {
                self.advance(&mut record, ConnectionState::Abandoned)?;
                return Err(err.into());
            }
        };

        record.set_peer_did(
            document.id.clone(),
            document.service_endpoint().map(str::to_owned),
        );
        self.advance(&mut record, ConnectionState::Responded)?;

        let complete = Envelope::reply(COMPLETE_TYPE, record.thread_id(), &CompleteBody::default())?
            .with_parent_thread(record.invitation_id());
        self.deliver(&mut record, &complete).await?;
        self.advance(&mut record, ConnectionState::Completed)
    }

    fn handle_complete(&self, envelope: &Envelope) -> Result<(), DidExchangeError> {
        let mut record = self.load_by_thread(&envelope.thid)?;
        Self::expect_state(&record, Role::Inviter, ConnectionState::Responded, envelope)?;
        self.advance(&mut record, ConnectionState::Completed)
    }

    fn handle_problem_report(&self, envelope: &Envelope) -> Result<(), DidExchangeError> {
        let mut record = self.load_by_thread(&envelope.thid)?;
        if record.state().is_terminal() {
            return Ok(());
        }
        let report: ProblemReportBody = envelope.body_as()?;
        tracing::info!(
            agent_id = %self.context.agent_id(),
            connection_id = %record.connection_id(),
            code = %report.code,
            explain = %report.explain,
            "peer abandoned connection"
        );
        self.advance(&mut record, ConnectionState::Abandoned)
    }

    fn expect_state(
        record: &ConnectionRecord,
        role: Role,
        state: ConnectionState,
        envelope: &Envelope,
    ) -> Result<(), DidExchangeError> {
        if record.role() == role && record.state() == state {
            Ok(())
        } else {
            Err(DidExchangeError::UnexpectedMessage {
                message_type: envelope.message_type.clone(),
                state: record.state(),
            })
        }
    }

    async fn deliver(
        &self,
        record: &mut ConnectionRecord,
        envelope: &Envelope,
    ) -> Result<(), DidExchangeError> {
        let sent = self
            .context
            .messenger()
            .send(envelope, &record.peer().endpoint)
            .await;
        if let Err(err) = sent {
            tracing::warn!(
                agent_id = %self.context.agent_id(),
                connection_id = %record.connection_id(),
                error = %err,
                "delivery failed, abandoning connection"
            );
            self.advance(record, ConnectionState::Abandoned)?;
            return Err(err.into());
        }
        Ok(())
    }

    fn advance(
        &self,
        record: &mut ConnectionRecord,
        next: ConnectionState,
    ) -> Result<(), DidExchangeError> {
        record.transition(next, self.context.clock())?;
        put_json(
            self.store.as_ref(),
            &connection_key(record.connection_id()),
            record,
        )?;
        self.publish_state(record);
        Ok(())
    }

    fn insert(&self, record: &ConnectionRecord) -> Result<(), DidExchangeError> {
        put_json(
            self.store.as_ref(),
            &connection_key(record.connection_id()),
            record,
        )?;
        put_json(
            self.store.as_ref(),
            &thread_key(record.thread_id()),
            &record.connection_id(),
        )?;
        Ok(())
    }

    fn load(&self, connection_id: ConnectionId) -> Result<ConnectionRecord, DidExchangeError> {
        get_json(self.store.as_ref(), &connection_key(connection_id))?
            .ok_or(DidExchangeError::ConnectionNotFound(connection_id))
    }

    fn load_by_thread(&self, thread_id: &str) -> Result<ConnectionRecord, DidExchangeError> {
        let connection_id: ConnectionId = get_json(self.store.as_ref(), &thread_key(thread_id))?
            .ok_or_else(|| DidExchangeError::UnknownThread(thread_id.to_owned()))?;
        self.load(connection_id)
    }

    fn publish_state(&self, record: &ConnectionRecord) {
        self.context.events().publish_state(StateEvent {
            agent_id: self.context.agent_id().clone(),
            protocol: PROTOCOL.to_owned(),
            state: record.state().as_str().to_owned(),
            connection_id: record.connection_id().to_string(),
            thread_id: record.thread_id().to_owned(),
        });
    }

    fn publish_action(&self, kind: ActionKind, record: &ConnectionRecord) {
        self.context.events().publish_action(ActionEvent {
            agent_id: self.context.agent_id().clone(),
            kind,
            connection_id: record.connection_id().to_string(),
        });
    }
}

impl std::fmt::Debug for DidExchangeClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DidExchangeClient")
            .field("agent_id", self.context.agent_id())
            .finish_non_exhaustive()
    }
}
