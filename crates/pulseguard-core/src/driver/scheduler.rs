//! Virtual-time timer queue.
//!
//! Timers are plain data: the scheduler hands back the job value when it
//! is due and the owner decides what to do with it. Nothing runs inside
//! the scheduler, so a tick can never re-enter itself.

use std::collections::{BTreeMap, HashMap};

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// (due time, insertion sequence)
type Slot = (u64, u64);

#[derive(Debug)]
struct Timer<J> {
    id: TimerId,
    repeat_ms: Option<u64>,
    job: J,
}

/// Ordered timer queue. Due timers come out in due-time order, ties in
/// scheduling order.
#[derive(Debug)]
pub struct Scheduler<J> {
    queue: BTreeMap<Slot, Timer<J>>,
    slots: HashMap<TimerId, Slot>,
    next_id: u64,
    next_seq: u64,
}

impl<J: Clone> Scheduler<J> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            slots: HashMap::new(),
            next_id: 1,
            next_seq: 0,
        }
    }

    /// Fire `job` every `interval_ms`, first at `now_ms + interval_ms`.
    pub fn every(&mut self, now_ms: u64, interval_ms: u64, job: J) -> TimerId {
        let interval_ms = interval_ms.max(1);
        self.schedule(now_ms.saturating_add(interval_ms), Some(interval_ms), job)
    }

    /// Fire `job` once at `now_ms + delay_ms`.
    pub fn after(&mut self, now_ms: u64, delay_ms: u64, job: J) -> TimerId {
        self.schedule(now_ms.saturating_add(delay_ms), None, job)
    }

    fn schedule(&mut self, due_ms: u64, repeat_ms: Option<u64>, job: J) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.insert(due_ms, Timer { id, repeat_ms, job });
        id
    }

    fn insert(&mut self, due_ms: u64, timer: Timer<J>) {
        let slot = (due_ms, self.next_seq);
        self.next_seq += 1;
        self.slots.insert(timer.id, slot);
        self.queue.insert(slot, timer);
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.slots.remove(&id) {
            Some(slot) => self.queue.remove(&slot).is_some(),
            None => false,
        }
    }

    /// Take the earliest timer due at or before `now_ms`.
    ///
    /// Repeating timers are re-armed from their scheduled time, so a late
    /// caller receives every missed tick in turn.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerId, J)> {
        let (&slot, _) = self.queue.iter().next()?;
        if slot.0 > now_ms {
            return None;
        }
        let timer = self.queue.remove(&slot)?;
        self.slots.remove(&timer.id);

        let id = timer.id;
        match timer.repeat_ms {
            Some(interval) => {
                let job = timer.job.clone();
                self.insert(slot.0.saturating_add(interval), timer);
                Some((id, job))
            }
            None => Some((id, timer.job)),
        }
    }

    /// Due time of the earliest timer.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|slot| slot.0)
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.slots.clear();
    }
}

impl<J: Clone> Default for Scheduler<J> {
    fn default() -> Self {
        Self::new()
    }
}
