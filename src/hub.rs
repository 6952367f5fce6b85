//! Hub — the single coordinator task that owns all room state.
//!
//! DESIGN
//! ======
//! Presence, room elements, broadcast groups and session states live in one
//! `Engine` owned by one task. Websocket tasks and HTTP handlers reach it by
//! sending a `Command` through a bounded channel; queries carry a `oneshot`
//! reply sender, protocol events do not. Because every mutation runs on
//! this task, handlers are atomic with respect to each other and to sweeps,
//! and no lock guards the state.
//!
//! LIFECYCLE
//! =========
//! 1. `spawn` creates the engine and starts the loop
//! 2. Commands are applied in arrival order; the sweeper ticks in between
//! 3. When every `HubHandle` is dropped the loop exits and the state is gone

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::frame::Frame;
use crate::services::broadcast::BroadcastRouter;
use crate::services::presence::PresenceRegistry;
use crate::services::room::RoomStore;
use crate::services::session::{self, SessionState};
use crate::services::sweeper;
use crate::state::{Element, User};

// =============================================================================
// ENGINE
// =============================================================================

/// Everything the coordinator owns.
#[derive(Debug, Default)]
pub struct Engine {
    pub presence: PresenceRegistry,
    pub rooms: RoomStore,
    pub router: BroadcastRouter,
    pub sessions: HashMap<Uuid, SessionState>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Protocol state of a connection. Unknown connections count as closed.
    #[must_use]
    pub fn session_state(&self, connection_id: Uuid) -> SessionState {
        self.sessions
            .get(&connection_id)
            .cloned()
            .unwrap_or(SessionState::Closed)
    }

    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            connections: self.router.connection_count(),
            rooms: self.rooms.len(),
            users: self.presence.len(),
        }
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub rooms: usize,
    pub users: usize,
}

/// Room contents as seen by a read-only query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: String,
    /// False when nothing was ever written to the room (or it was swept).
    pub exists: bool,
    pub elements: Vec<Element>,
}

// =============================================================================
// COMMANDS
// =============================================================================

#[derive(Debug)]
pub enum Command {
    Connect { connection_id: Uuid, tx: mpsc::Sender<Frame> },
    Inbound { connection_id: Uuid, frame: Frame },
    Disconnect { connection_id: Uuid },
    Snapshot { room_id: String, reply: oneshot::Sender<RoomSnapshot> },
    Users { room_id: String, reply: oneshot::Sender<Vec<User>> },
    Stats { reply: oneshot::Sender<HubStats> },
}

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub is not running")]
    Closed,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable sender side of the coordinator.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<Command>,
}

impl HubHandle {
    async fn send(&self, command: Command) -> Result<(), HubError> {
        self.tx.send(command).await.map_err(|_| HubError::Closed)
    }

    async fn query<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(build(reply)).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// # Errors
    ///
    /// Returns `HubError::Closed` if the coordinator has stopped.
    pub async fn connect(&self, connection_id: Uuid, tx: mpsc::Sender<Frame>) -> Result<(), HubError> {
        self.send(Command::Connect { connection_id, tx }).await
    }

    /// # Errors
    ///
    /// Returns `HubError::Closed` if the coordinator has stopped.
    pub async fn inbound(&self, connection_id: Uuid, frame: Frame) -> Result<(), HubError> {
        self.send(Command::Inbound { connection_id, frame }).await
    }

    /// # Errors
    ///
    /// Returns `HubError::Closed` if the coordinator has stopped.
    pub async fn disconnect(&self, connection_id: Uuid) -> Result<(), HubError> {
        self.send(Command::Disconnect { connection_id }).await
    }

    /// # Errors
    ///
    /// Returns `HubError::Closed` if the coordinator has stopped.
    pub async fn snapshot(&self, room_id: impl Into<String>) -> Result<RoomSnapshot, HubError> {
        let room_id = room_id.into();
        self.query(|reply| Command::Snapshot { room_id, reply }).await
    }

    /// # Errors
    ///
    /// Returns `HubError::Closed` if the coordinator has stopped.
    pub async fn users(&self, room_id: impl Into<String>) -> Result<Vec<User>, HubError> {
        let room_id = room_id.into();
        self.query(|reply| Command::Users { room_id, reply }).await
    }

    /// # Errors
    ///
    /// Returns `HubError::Closed` if the coordinator has stopped.
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        self.query(|reply| Command::Stats { reply }).await
    }
}

// =============================================================================
// TASK
// =============================================================================

/// Start the coordinator. Returns the handle and the task for shutdown.
#[must_use]
pub fn spawn(buffer: usize, sweep_every: Duration) -> (HubHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(buffer);
    let task = tokio::spawn(run(rx, sweep_every));
    (HubHandle { tx }, task)
}

async fn run(mut rx: mpsc::Receiver<Command>, sweep_every: Duration) {
    let mut engine = Engine::new();
    let mut sweep = sweeper::sweep_interval(sweep_every);
    info!(sweep_secs = sweep_every.as_secs(), "hub: started");

    loop {
        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else { break };
                apply(&mut engine, command);
            }
            _ = sweep.tick() => {
                let reclaimed = sweeper::sweep(&mut engine.rooms, &engine.presence);
                if !reclaimed.is_empty() {
                    info!(count = reclaimed.len(), remaining = engine.rooms.len(), "hub: sweep finished");
                }
            }
        }
    }

    info!("hub: stopped");
}

fn apply(engine: &mut Engine, command: Command) {
    match command {
        Command::Connect { connection_id, tx } => session::connect(engine, connection_id, tx),
        Command::Inbound { connection_id, frame } => session::handle_frame(engine, connection_id, frame),
        Command::Disconnect { connection_id } => session::disconnect(engine, connection_id),
        Command::Snapshot { room_id, reply } => {
            let snapshot = RoomSnapshot {
                exists: engine.rooms.contains(&room_id),
                elements: engine.rooms.get_elements(&room_id),
                room_id,
            };
            let _ = reply.send(snapshot);
        }
        Command::Users { room_id, reply } => {
            let _ = reply.send(engine.presence.list_by_room(&room_id));
        }
        Command::Stats { reply } => {
            let _ = reply.send(engine.stats());
        }
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
