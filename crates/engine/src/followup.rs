//! At-most-once delayed follow-ups.
//!
//! Each scheduled follow-up arms two timers: a primary at the requested
//! delay and a backup a few seconds later, in case the primary never runs.
//! Whichever fires first takes the recipient out of the pending set in a
//! single critical section and delivers; the other finds nothing to do.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    courier_common::{FollowupPayload, RecipientId},
    futures::FutureExt,
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::{deliver::DeliveryExecutor, timer::Timer};

/// A follow-up waiting to be armed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowupTask {
    pub recipient: RecipientId,
    pub fire_after: Duration,
    pub payload: FollowupPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerRole {
    Primary,
    Backup,
}

impl fmt::Display for TimerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
        })
    }
}

struct Pending {
    generation: u64,
    armed_at: Instant,
}

#[derive(Default)]
struct PendingInner {
    entries: HashMap<RecipientId, Pending>,
    next_generation: u64,
}

/// Recipients with an armed, not-yet-fired follow-up.
///
/// Every arming gets a fresh generation number and timers only act on the
/// generation that armed them, so timers left over from a cancelled arming
/// cannot fire a later one.
#[derive(Default)]
struct PendingSet {
    inner: Mutex<PendingInner>,
}

impl PendingSet {
    fn lock(&self) -> MutexGuard<'_, PendingInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Idle → Pending. Returns the new generation, or `None` when the
    /// recipient is already pending.
    fn arm(&self, recipient: RecipientId) -> Option<u64> {
        let mut inner = self.lock();
        if inner.entries.contains_key(&recipient) {
            return None;
        }
        inner.next_generation += 1;
        let generation = inner.next_generation;
        inner.entries.insert(recipient, Pending {
            generation,
            armed_at: Instant::now(),
        });
        Some(generation)
    }

    /// Pending → Fired, checked and cleared under one lock. Returns how long
    /// the entry was pending when this caller wins.
    fn take(&self, recipient: RecipientId, generation: u64) -> Option<Duration> {
        let mut inner = self.lock();
        if inner
            .entries
            .get(&recipient)
            .is_none_or(|p| p.generation != generation)
        {
            return None;
        }
        inner
            .entries
            .remove(&recipient)
            .map(|p| p.armed_at.elapsed())
    }

    fn remove(&self, recipient: RecipientId) -> bool {
        self.lock().entries.remove(&recipient).is_some()
    }

    fn contains(&self, recipient: RecipientId) -> bool {
        self.lock().entries.contains_key(&recipient)
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

pub struct FollowupScheduler {
    pending: Arc<PendingSet>,
    executor: Arc<DeliveryExecutor>,
    timer: Arc<dyn Timer>,
    backup_margin: Duration,
}

impl FollowupScheduler {
    pub fn new(
        executor: Arc<DeliveryExecutor>,
        timer: Arc<dyn Timer>,
        backup_margin: Duration,
    ) -> Self {
        Self {
            pending: Arc::new(PendingSet::default()),
            executor,
            timer,
            backup_margin,
        }
    }

    /// Arm a follow-up. Returns `false` (and does nothing) when one is
    /// already pending for the recipient.
    pub fn schedule(&self, task: FollowupTask) -> bool {
        let recipient = task.recipient;
        let Some(generation) = self.pending.arm(recipient) else {
            debug!(%recipient, "follow-up already pending");
            return false;
        };

        let payload = Arc::new(task.payload);
        let timers = [
            (TimerRole::Primary, task.fire_after),
            (TimerRole::Backup, task.fire_after + self.backup_margin),
        ];
        for (role, delay) in timers {
            let callback = fire(
                Arc::clone(&self.pending),
                Arc::clone(&self.executor),
                recipient,
                generation,
                Arc::clone(&payload),
                role,
            );
            self.timer.run_once(delay, callback.boxed());
        }

        info!(
            %recipient,
            delay_ms = task.fire_after.as_millis() as u64,
            backup_margin_ms = self.backup_margin.as_millis() as u64,
            "follow-up armed"
        );
        true
    }

    /// Pending → Idle. Only prevents future firings; a delivery already in
    /// flight is not interrupted.
    pub fn cancel(&self, recipient: RecipientId) -> bool {
        let removed = self.pending.remove(recipient);
        if removed {
            info!(%recipient, "follow-up cancelled");
        }
        removed
    }

    pub fn is_pending(&self, recipient: RecipientId) -> bool {
        self.pending.contains(recipient)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

async fn fire(
    pending: Arc<PendingSet>,
    executor: Arc<DeliveryExecutor>,
    recipient: RecipientId,
    generation: u64,
    payload: Arc<FollowupPayload>,
    role: TimerRole,
) {
    let Some(waited) = pending.take(recipient, generation) else {
        debug!(%recipient, %role, "follow-up already fired or cancelled");
        return;
    };
    if role == TimerRole::Backup {
        warn!(%recipient, "primary timer did not fire, backup timer taking over");
    }

    match executor
        .deliver_text(recipient, &payload.text, payload.markup.as_ref())
        .await
    {
        Ok(()) => info!(
            %recipient,
            %role,
            waited_ms = waited.as_millis() as u64,
            "follow-up delivered"
        ),
        Err(e) => warn!(%recipient, %role, error = %e, "follow-up delivery failed"),
    }
}
