//! A running agent: listeners, inbound dispatcher and protocol services.

use super::configuration::AgentConfiguration;
use super::context::AgentContext;
use super::dispatcher::Dispatcher;
use super::error::AgentRuntimeError;
use super::events::{ActionSubscription, EventBus, StateSubscription};
use super::messenger::Messenger;
use crate::didexchange::DidExchangeClient;
use crate::provisioning::domain::{AgentId, TransportBinding};
use crate::runtime::ports::ListenerHandle;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

/// A started agent.
///
/// Dropping the agent stops its listeners and dispatcher as well; call
/// [`Agent::shutdown`] to wait for them to exit.
pub struct Agent {
    context: AgentContext,
    didexchange: DidExchangeClient,
    tasks: Mutex<Vec<ListenerHandle>>,
    running: AtomicBool,
}

impl Agent {
    /// Starts the agent described by `config`.
    ///
    /// Every inbound listener binds the exact address resolved in its
    /// binding. If one fails, the listeners already started are stopped.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRuntimeError::ListenerBindFailed`] when a listener
    /// cannot bind and [`AgentRuntimeError::Storage`] when protocol storage
    /// cannot be opened.
    pub async fn start(config: AgentConfiguration) -> Result<Self, AgentRuntimeError> {
        let parts = config.into_parts();
        let bindings: Arc<[TransportBinding]> = parts
            .inbound
            .iter()
            .map(|transport| transport.binding().clone())
            .collect();
        let context = AgentContext {
            agent_id: parts.label,
            storage: parts.storage,
            keys: parts.keys,
            document_loader: parts.document_loader,
            messenger: Messenger::new(parts.outbound, parts.options.protocol_version()),
            events: EventBus::new(parts.event_buffer),
            bindings,
            options: parts.options,
            return_route: parts.return_route,
            did_resolver: parts.did_resolver,
            registrar: parts.registrar,
            clock: parts.clock,
        };
        let didexchange = DidExchangeClient::new(context.clone())?;

        let (sink, inbox) = mpsc::channel(parts.event_buffer.max(1));
        let mut tasks = Vec::with_capacity(parts.inbound.len() + 1);
        for transport in &parts.inbound {
            match transport.start(sink.clone()).await {
                Ok(handle) => tasks.push(handle),
                Err(source) => {
                    stop_all(tasks).await;
                    return Err(AgentRuntimeError::ListenerBindFailed {
                        address: transport.binding().address(),
                        source,
                    });
                }
            }
        }
        drop(sink);

        let dispatcher = Dispatcher {
            agent_id: context.agent_id.clone(),
            didexchange: didexchange.clone(),
            registrar: context.registrar.clone(),
        };
        tasks.push(dispatcher.spawn(inbox));

        tracing::info!(
            agent_id = %context.agent_id,
            listeners = context.bindings.len(),
            outbound = ?context.messenger.outbound_names(),
            "agent started"
        );
        Ok(Self {
            context,
            didexchange,
            tasks: Mutex::new(tasks),
            running: AtomicBool::new(true),
        })
    }

    /// Returns the agent identity.
    #[must_use]
    pub const fn agent_id(&self) -> &AgentId {
        &self.context.agent_id
    }

    /// Returns the execution context.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRuntimeError::ShutDown`] after [`Agent::shutdown`].
    pub fn context(&self) -> Result<AgentContext, AgentRuntimeError> {
        if self.running.load(Ordering::Acquire) {
            Ok(self.context.clone())
        } else {
            Err(AgentRuntimeError::ShutDown(self.context.agent_id.clone()))
        }
    }

    /// Returns the outbound messenger.
    #[must_use]
    pub const fn messenger(&self) -> &Messenger {
        &self.context.messenger
    }

    /// Returns the DID exchange client.
    #[must_use]
    pub fn didexchange(&self) -> DidExchangeClient {
        self.didexchange.clone()
    }

    /// Subscribes to post-state events entering `state`.
    ///
    /// Only transitions published after this call are observed.
    #[must_use]
    pub fn register_post_state_event(&self, state: &str) -> StateSubscription {
        self.context.events.subscribe_states(Some(state))
    }

    /// Subscribes to all post-state events.
    #[must_use]
    pub fn subscribe_states(&self) -> StateSubscription {
        self.context.events.subscribe_states(None)
    }

    /// Subscribes to action events.
    #[must_use]
    pub fn subscribe_actions(&self) -> ActionSubscription {
        self.context.events.subscribe_actions()
    }

    /// Returns the inbound bindings.
    #[must_use]
    pub fn bindings(&self) -> &[TransportBinding] {
        &self.context.bindings
    }

    /// Returns whether [`Agent::shutdown`] has not been called yet.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops all listeners and the dispatcher. Repeated calls are no-ops.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        stop_all(tasks).await;
        tracing::info!(agent_id = %self.context.agent_id, "agent shut down");
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Agent")
            .field("context", &self.context)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn stop_all(tasks: Vec<ListenerHandle>) {
    for task in tasks {
        task.stop().await;
    }
}
