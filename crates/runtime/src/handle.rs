//! Engine worker and client-facing handle.
//!
//! The worker owns the [`Engine`] and processes commands from the handle
//! plus relayed intents from the table, one at a time. The handle is the
//! only surface a presentation layer needs: request/reply over a command
//! channel, events over a broadcast channel.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use rules_core::{AbilityKind, Actor, ActorId, CombatStatKind, EquipError, ItemId, LearnError, RollId};

use crate::activation::ActivationOutcome;
use crate::combat::TurnChange;
use crate::engine::Engine;
use crate::error::{Result, RuntimeError};
use crate::events::EngineEvent;
use crate::oracle::Roll;

/// Requests the worker processes.
pub enum EngineCommand {
    ActivateAction {
        actor: ActorId,
        item: ItemId,
        index: usize,
        shift: bool,
        reply: oneshot::Sender<Result<ActivationOutcome>>,
    },
    RollSkill {
        actor: ActorId,
        ability: AbilityKind,
        reply: oneshot::Sender<Result<Option<Roll>>>,
    },
    RollAttack {
        actor: ActorId,
        stat: CombatStatKind,
        reply: oneshot::Sender<Result<Option<Roll>>>,
    },
    ToggleCapacity {
        actor: ActorId,
        item: ItemId,
        reply: oneshot::Sender<Result<std::result::Result<bool, LearnError>>>,
    },
    ToggleEquipment {
        actor: ActorId,
        item: ItemId,
        reply: oneshot::Sender<Result<std::result::Result<bool, EquipError>>>,
    },
    SpendRecoveryDie {
        actor: ActorId,
        reply: oneshot::Sender<Result<bool>>,
    },
    FullRest {
        actor: ActorId,
        reply: oneshot::Sender<Result<()>>,
    },
    SpendFortune {
        actor: ActorId,
        roll: RollId,
        reply: oneshot::Sender<Result<bool>>,
    },
    SetTargets {
        targets: Vec<ActorId>,
    },
    StartCombat {
        participants: Vec<ActorId>,
    },
    NextTurn {
        reply: oneshot::Sender<Option<TurnChange>>,
    },
    EndCombat {
        reply: oneshot::Sender<()>,
    },
    QueryActor {
        actor: ActorId,
        reply: oneshot::Sender<Option<Actor>>,
    },
}

/// Background task owning one participant's engine.
struct EngineWorker {
    engine: Engine,
    command_rx: mpsc::Receiver<EngineCommand>,
    relay_rx: broadcast::Receiver<rules_core::Command>,
    relay_open: bool,
}

impl EngineWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.handle(command).await,
                        None => break,
                    }
                }
                relayed = self.relay_rx.recv(), if self.relay_open => {
                    match relayed {
                        Ok(command) => self.engine.apply_command(command).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "relay receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => self.relay_open = false,
                    }
                }
            }
        }
    }

    async fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::ActivateAction {
                actor,
                item,
                index,
                shift,
                reply,
            } => {
                let result = self.engine.activate_action(actor, item, index, shift).await;
                let _ = reply.send(result);
            }
            EngineCommand::RollSkill { actor, ability, reply } => {
                let _ = reply.send(self.engine.roll_skill(actor, ability).await);
            }
            EngineCommand::RollAttack { actor, stat, reply } => {
                let _ = reply.send(self.engine.roll_attack(actor, stat).await);
            }
            EngineCommand::ToggleCapacity { actor, item, reply } => {
                let _ = reply.send(self.engine.toggle_capacity_learned(actor, item).await);
            }
            EngineCommand::ToggleEquipment { actor, item, reply } => {
                let _ = reply.send(self.engine.toggle_equipment_equipped(actor, item).await);
            }
            EngineCommand::SpendRecoveryDie { actor, reply } => {
                let _ = reply.send(self.engine.spend_recovery_die(actor).await);
            }
            EngineCommand::FullRest { actor, reply } => {
                let _ = reply.send(self.engine.full_rest(actor).await);
            }
            EngineCommand::SpendFortune { actor, roll, reply } => {
                let _ = reply.send(self.engine.spend_fortune(actor, roll).await);
            }
            EngineCommand::SetTargets { targets } => self.engine.set_targets(targets),
            EngineCommand::StartCombat { participants } => {
                self.engine.start_combat(&participants);
            }
            EngineCommand::NextTurn { reply } => {
                let _ = reply.send(self.engine.next_turn().await);
            }
            EngineCommand::EndCombat { reply } => {
                self.engine.end_combat().await;
                let _ = reply.send(());
            }
            EngineCommand::QueryActor { actor, reply } => {
                let _ = reply.send(self.engine.actor(actor).cloned());
            }
        }
    }
}

/// Client-facing handle to one participant's engine.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineHandle {
    /// Move the engine onto a background task and return its handle.
    pub fn spawn(engine: Engine) -> Self {
        let (command_tx, command_rx) = mpsc::channel(32);
        let events = engine.events.clone();
        let relay_rx = engine.relay().subscribe();
        let worker = EngineWorker {
            engine,
            command_rx,
            relay_rx,
            relay_open: true,
        };
        tokio::spawn(worker.run());
        Self { command_tx, events }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        command: EngineCommand,
        reply_rx: oneshot::Receiver<T>,
    ) -> Result<T> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RuntimeError::WorkerUnavailable)?;
        reply_rx.await.map_err(|_| RuntimeError::WorkerUnavailable)
    }

    pub async fn activate_action(
        &self,
        actor: ActorId,
        item: ItemId,
        index: usize,
        shift: bool,
    ) -> Result<ActivationOutcome> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(
            EngineCommand::ActivateAction {
                actor,
                item,
                index,
                shift,
                reply,
            },
            reply_rx,
        )
        .await?
    }

    pub async fn roll_skill(&self, actor: ActorId, ability: AbilityKind) -> Result<Option<Roll>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::RollSkill { actor, ability, reply }, reply_rx)
            .await?
    }

    pub async fn roll_attack(&self, actor: ActorId, stat: CombatStatKind) -> Result<Option<Roll>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::RollAttack { actor, stat, reply }, reply_rx)
            .await?
    }

    pub async fn toggle_capacity_learned(
        &self,
        actor: ActorId,
        item: ItemId,
    ) -> Result<std::result::Result<bool, LearnError>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::ToggleCapacity { actor, item, reply }, reply_rx)
            .await?
    }

    pub async fn toggle_equipment_equipped(
        &self,
        actor: ActorId,
        item: ItemId,
    ) -> Result<std::result::Result<bool, EquipError>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::ToggleEquipment { actor, item, reply }, reply_rx)
            .await?
    }

    pub async fn spend_recovery_die(&self, actor: ActorId) -> Result<bool> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::SpendRecoveryDie { actor, reply }, reply_rx)
            .await?
    }

    pub async fn full_rest(&self, actor: ActorId) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::FullRest { actor, reply }, reply_rx)
            .await?
    }

    pub async fn spend_fortune(&self, actor: ActorId, roll: RollId) -> Result<bool> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::SpendFortune { actor, roll, reply }, reply_rx)
            .await?
    }

    pub async fn set_targets(&self, targets: Vec<ActorId>) -> Result<()> {
        self.command_tx
            .send(EngineCommand::SetTargets { targets })
            .await
            .map_err(|_| RuntimeError::WorkerUnavailable)
    }

    pub async fn start_combat(&self, participants: Vec<ActorId>) -> Result<()> {
        self.command_tx
            .send(EngineCommand::StartCombat { participants })
            .await
            .map_err(|_| RuntimeError::WorkerUnavailable)
    }

    pub async fn next_turn(&self) -> Result<Option<TurnChange>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::NextTurn { reply }, reply_rx).await
    }

    pub async fn end_combat(&self) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::EndCombat { reply }, reply_rx).await
    }

    pub async fn query_actor(&self, actor: ActorId) -> Result<Option<Actor>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(EngineCommand::QueryActor { actor, reply }, reply_rx)
            .await
    }
}
