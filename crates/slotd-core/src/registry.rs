use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use slotd_exec::ProcessHandle;
use slotd_model::{Pid, Role, SlotId, SlotPhase, SlotStatus};

use crate::error::CoreError;

/// Last state published by whoever holds the slot lock.
///
/// Readable without the lock, so status queries can answer while a start or
/// stop is still in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub phase: SlotPhase,
    pub worker_pid: Option<Pid>,
    pub companion_pid: Option<Pid>,
}

impl SlotSnapshot {
    /// Status built from the snapshot; the published phase wins over liveness.
    pub fn to_status(&self, slot: SlotId) -> SlotStatus {
        let mut status = SlotStatus::new(slot, self.worker_pid, self.companion_pid);
        status.phase = self.phase;
        status
    }
}

#[derive(Debug, Clone, Default)]
struct Published(Arc<StdMutex<SlotSnapshot>>);

impl Published {
    fn read(&self) -> SlotSnapshot {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut SlotSnapshot)) {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Process handles owned by one slot.
///
/// A stored handle may point at a process that has already exited; callers
/// check [`SlotEntry::live_pid`] before trusting it.
#[derive(Debug, Default)]
pub struct SlotEntry {
    worker: Option<ProcessHandle>,
    companion: Option<ProcessHandle>,
    phase: SlotPhase,
    published: Published,
}

impl SlotEntry {
    pub fn get(&self, role: Role) -> Option<&ProcessHandle> {
        match role {
            Role::Worker => self.worker.as_ref(),
            Role::Companion => self.companion.as_ref(),
        }
    }

    pub fn get_mut(&mut self, role: Role) -> Option<&mut ProcessHandle> {
        match role {
            Role::Worker => self.worker.as_mut(),
            Role::Companion => self.companion.as_mut(),
        }
    }

    /// Replace the handle for `role`, returning the previous one.
    pub fn set(&mut self, role: Role, handle: Option<ProcessHandle>) -> Option<ProcessHandle> {
        let slot = match role {
            Role::Worker => &mut self.worker,
            Role::Companion => &mut self.companion,
        };
        std::mem::replace(slot, handle)
    }

    pub fn take(&mut self, role: Role) -> Option<ProcessHandle> {
        self.set(role, None)
    }

    /// Pid of the process for `role` if it is still running.
    ///
    /// An exited process keeps its handle; clearing is left to start/stop.
    pub fn live_pid(&mut self, role: Role) -> Option<Pid> {
        let handle = self.get_mut(role)?;
        handle.is_alive().then(|| handle.pid())
    }

    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: SlotPhase) {
        trace!(from = ?self.phase, to = ?phase, "slot phase transition");
        self.phase = phase;
        self.published.update(|s| s.phase = phase);
    }

    /// Re-derive the phase from process liveness and publish it with the live pids.
    pub fn settle_phase(&mut self) -> SlotPhase {
        let worker_pid = self.live_pid(Role::Worker);
        let companion_pid = self.live_pid(Role::Companion);
        self.set_phase(SlotPhase::from_liveness(
            worker_pid.is_some(),
            companion_pid.is_some(),
        ));
        self.published.update(|s| {
            s.worker_pid = worker_pid;
            s.companion_pid = companion_pid;
        });
        self.phase
    }

    pub fn snapshot(&self) -> SlotSnapshot {
        self.published.read()
    }
}

#[derive(Debug)]
struct SlotCell {
    entry: Arc<Mutex<SlotEntry>>,
    published: Published,
}

/// Fixed-size table of slots, each behind its own async lock.
///
/// Holding a slot guard serializes lifecycle operations on that slot only;
/// other slots remain free.
#[derive(Debug, Clone)]
pub struct SlotRegistry {
    slots: Arc<[SlotCell]>,
}

impl SlotRegistry {
    pub fn new(size: u32) -> Self {
        let slots = (0..size)
            .map(|_| {
                let published = Published::default();
                let entry = SlotEntry {
                    published: published.clone(),
                    ..SlotEntry::default()
                };
                SlotCell {
                    entry: Arc::new(Mutex::new(entry)),
                    published,
                }
            })
            .collect::<Vec<_>>();
        Self {
            slots: slots.into(),
        }
    }

    pub fn size(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn slot_ids(&self) -> impl Iterator<Item = SlotId> + use<> {
        (1..=self.size()).map(SlotId::new)
    }

    fn cell(&self, slot: SlotId) -> Result<&SlotCell, CoreError> {
        slot.index()
            .and_then(|i| self.slots.get(i))
            .ok_or(CoreError::InvalidSlot {
                slot,
                max: self.size(),
            })
    }

    /// Shared cell for `slot`, or `InvalidSlot` when out of range.
    pub fn get(&self, slot: SlotId) -> Result<Arc<Mutex<SlotEntry>>, CoreError> {
        self.cell(slot).map(|c| Arc::clone(&c.entry))
    }

    /// Last published state of `slot`. Never waits for the slot lock.
    pub fn snapshot(&self, slot: SlotId) -> Result<SlotSnapshot, CoreError> {
        self.cell(slot).map(|c| c.published.read())
    }

    /// Acquire exclusive access to `slot` for the duration of an operation.
    pub async fn lock(&self, slot: SlotId) -> Result<OwnedMutexGuard<SlotEntry>, CoreError> {
        let cell = self.get(slot)?;
        Ok(cell.lock_owned().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_cover_configured_range() {
        let registry = SlotRegistry::new(3);
        let ids: Vec<u32> = registry.slot_ids().map(SlotId::get).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn out_of_range_is_invalid_slot() {
        let registry = SlotRegistry::new(2);
        assert!(registry.get(SlotId::new(1)).is_ok());
        assert!(registry.get(SlotId::new(2)).is_ok());
        assert!(matches!(
            registry.get(SlotId::new(0)),
            Err(CoreError::InvalidSlot { max: 2, .. })
        ));
        assert!(matches!(
            registry.get(SlotId::new(3)),
            Err(CoreError::InvalidSlot { max: 2, .. })
        ));
    }

    #[tokio::test]
    async fn empty_slot_has_no_live_pids() {
        let registry = SlotRegistry::new(1);
        let mut entry = registry.lock(SlotId::new(1)).await.unwrap();
        assert_eq!(entry.live_pid(Role::Worker), None);
        assert_eq!(entry.live_pid(Role::Companion), None);
        assert_eq!(entry.settle_phase(), SlotPhase::Idle);
    }

    #[tokio::test]
    async fn snapshot_readable_while_slot_is_locked() {
        let registry = SlotRegistry::new(2);
        let mut entry = registry.lock(SlotId::new(1)).await.unwrap();
        entry.set_phase(SlotPhase::Starting);

        let snapshot = registry.snapshot(SlotId::new(1)).unwrap();
        assert_eq!(snapshot.phase, SlotPhase::Starting);
        assert_eq!(snapshot.to_status(SlotId::new(1)).phase, SlotPhase::Starting);
        assert_eq!(
            registry.snapshot(SlotId::new(2)).unwrap(),
            SlotSnapshot::default()
        );

        entry.settle_phase();
        assert_eq!(
            registry.snapshot(SlotId::new(1)).unwrap().phase,
            SlotPhase::Idle
        );
        assert!(matches!(
            registry.snapshot(SlotId::new(3)),
            Err(CoreError::InvalidSlot { .. })
        ));
    }

    #[tokio::test]
    async fn slots_lock_independently() {
        let registry = SlotRegistry::new(2);
        let _first = registry.lock(SlotId::new(1)).await.unwrap();

        let second = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            registry.lock(SlotId::new(2)),
        )
        .await;
        assert!(second.is_ok(), "slot 2 must not wait for slot 1");

        let same = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            registry.lock(SlotId::new(1)),
        )
        .await;
        assert!(same.is_err(), "slot 1 is held");
    }
}
