//! Cancellation-scoped timers that post back into the owning room's channel.
//!
//! Each kind holds at most one armed timer. Arming a kind cancels whatever
//! was armed before, and every firing carries the generation it was armed
//! with so a late delivery from a cancelled timer is recognised and dropped.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::WeakSender;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::commands::RoomCommand;
use crate::domain::engine::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Whatever the game is waiting on: a turn, a betting window, a dealer
    /// step or the next round.
    Game,
    AfkGrace(UserId),
    Disconnect(UserId),
}

pub struct Timers {
    tx: WeakSender<RoomCommand>,
    root: CancellationToken,
    armed: HashMap<TimerKind, (u64, CancellationToken)>,
    next_generation: u64,
}

impl Timers {
    /// The sender is weak so an armed timer never keeps a closed room alive.
    pub fn new(tx: WeakSender<RoomCommand>) -> Self {
        Self {
            tx,
            root: CancellationToken::new(),
            armed: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn start(&mut self, kind: TimerKind, after: Duration) -> u64 {
        self.cancel(kind);
        self.next_generation += 1;
        let generation = self.next_generation;
        let token = self.root.child_token();
        self.armed.insert(kind, (generation, token.clone()));

        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    if let Some(tx) = tx.upgrade() {
                        let _ = tx.send(RoomCommand::TimerFired { kind, generation }).await;
                    }
                }
            }
        });
        trace!(?kind, generation, after_ms = after.as_millis() as u64, "timer armed");
        generation
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some((_, token)) = self.armed.remove(&kind) {
            token.cancel();
        }
    }

    /// Cancel every timer that belongs to `user_id`.
    pub fn cancel_user(&mut self, user_id: UserId) {
        self.cancel(TimerKind::AfkGrace(user_id));
        self.cancel(TimerKind::Disconnect(user_id));
    }

    pub fn cancel_all(&mut self) {
        for (_, (_, token)) in self.armed.drain() {
            token.cancel();
        }
    }

    /// Consume a firing. False for a generation that has since been
    /// cancelled or replaced.
    pub fn accept(&mut self, kind: TimerKind, generation: u64) -> bool {
        match self.armed.get(&kind) {
            Some((armed, _)) if *armed == generation => {
                self.armed.remove(&kind);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
