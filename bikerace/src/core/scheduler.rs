use std::collections::{BTreeMap, HashMap};

/// Handle of a scheduled timer, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Timer<E> {
    handle: TimerHandle,
    period: Option<u64>,
    event: E,
}

/// Scheduler is a virtual clock with one-shot and periodic timers. Nothing happens between calls:
/// the owner pops due timers one at a time and the clock jumps to each timer's due time. Timers
/// due at the same instant fire in the order they were (re)scheduled.
#[derive(Debug)]
pub struct Scheduler<E> {
    now_ms: u64,
    seq: u64,
    next_handle: u64,
    queue: BTreeMap<(u64, u64), Timer<E>>,
    keys: HashMap<TimerHandle, (u64, u64)>,
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Scheduler<E> {
        Scheduler {
            now_ms: 0,
            seq: 0,
            next_handle: 0,
            queue: BTreeMap::new(),
            keys: HashMap::new(),
        }
    }

    /// (ms) Current virtual time.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.keys.contains_key(&handle)
    }

    /// (ms) Due time of the earliest timer.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|&(due, _)| due)
    }

    pub fn schedule_once(&mut self, delay_ms: u64, event: E) -> TimerHandle {
        let handle = self.new_handle();
        self.insert(self.now_ms + delay_ms, handle, None, event);
        handle
    }

    /// schedule_every fires `event` every `period_ms`, first one period from now.
    pub fn schedule_every(&mut self, period_ms: u64, event: E) -> TimerHandle {
        let handle = self.new_handle();
        self.insert(self.now_ms + period_ms, handle, Some(period_ms.max(1)), event);
        handle
    }

    /// cancel removes the timer, returns false if it already fired (one-shot) or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.keys.remove(&handle) {
            Some(key) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    /// pop_due removes the earliest timer with a due time not later than `until_ms`, moves the clock
    /// to it and returns its event. Periodic timers are rescheduled before returning.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerHandle, E)> {
        let key = *self.queue.keys().next()?;
        if key.0 > until_ms {
            return None;
        }
        let timer = self.queue.remove(&key)?;
        self.keys.remove(&timer.handle);
        self.now_ms = self.now_ms.max(key.0);

        let fired = timer.event.clone();
        if let Some(period) = timer.period {
            self.insert(key.0 + period, timer.handle, timer.period, timer.event);
        }
        Some((timer.handle, fired))
    }

    /// pop_next is `pop_due` without an upper bound.
    pub fn pop_next(&mut self) -> Option<(TimerHandle, E)> {
        self.pop_due(u64::MAX)
    }

    /// advance_clock moves the clock forward without firing anything.
    pub fn advance_clock(&mut self, to_ms: u64) {
        self.now_ms = self.now_ms.max(to_ms);
    }

    fn new_handle(&mut self) -> TimerHandle {
        self.next_handle += 1;
        TimerHandle(self.next_handle)
    }

    fn insert(&mut self, due_ms: u64, handle: TimerHandle, period: Option<u64>, event: E) {
        self.seq += 1;
        let key = (due_ms, self.seq);
        self.queue.insert(
            key,
            Timer {
                handle,
                period,
                event,
            },
        );
        self.keys.insert(handle, key);
    }
}

impl<E: Clone> Default for Scheduler<E> {
    fn default() -> Self {
        Scheduler::new()
    }
}
