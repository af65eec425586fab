//! Writer-priority readers–writers gate.
//!
//! Many readers may hold the gate at once; a writer holds it alone. A reader
//! that arrives while a writer is active *or waiting* queues behind the
//! waiting writers, so a steady stream of readers cannot starve bookings.
//! Writers are served in arrival order. When the last writer in line leaves,
//! every reader that queued behind it is released together: the first one is
//! woken by the writer and each released reader wakes the next.
//!
//! The gate is a mutex over a handful of counters plus two condition
//! variables, one per side. Whoever releases the gate does the admission
//! bookkeeping for the thread it wakes (marks the writer active, or counts
//! the reader in) before dropping the mutex, so no other arrival can slip in
//! between the wake-up and the woken thread running.
//!
//! ```text
//!            enter_read                 enter_read
//!   Idle ───────────────▶ Reading(1) ───────────────▶ Reading(n+1)
//!    │ ▲                     │  ▲                        │
//!    │ │ exit_write          │  └──── exit_read ─────────┘
//!    │ │ (nobody waiting)    │ exit_read (last, writer waiting)
//!    ▼ │                     ▼
//!   Writing ◀────────────── Writing ──exit_write──▶ Reading(k) / Writing
//! ```

use std::cell::UnsafeCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;
use tracing::{debug, trace};

type Ticket = u64;

#[derive(Debug, Default)]
struct GateState {
    active_readers: usize,
    writer_active: bool,
    waiting_readers: VecDeque<Ticket>,
    waiting_writers: VecDeque<Ticket>,
    /// Readers counted into `active_readers` by a releasing thread that have
    /// not woken up yet.
    admitted_readers: HashSet<Ticket>,
    /// Writer handed the gate by a releasing thread that has not woken up yet.
    admitted_writer: Option<Ticket>,
    /// Queued readers below this ticket were waiting when the gate was last
    /// opened to readers, and are released as one batch.
    cohort_end: Ticket,
    next_ticket: Ticket,
}

impl GateState {
    fn issue_ticket(&mut self) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    /// Hands the gate to the longest-waiting writer, if there is one.
    fn admit_writer(&mut self) -> bool {
        let Some(ticket) = self.waiting_writers.pop_front() else {
            return false;
        };
        debug_assert!(!self.writer_active && self.active_readers == 0);
        self.writer_active = true;
        self.admitted_writer = Some(ticket);
        true
    }

    /// Starts a new reader batch covering everyone queued right now and admits
    /// its first member.
    fn open_reader_cohort(&mut self) -> bool {
        self.cohort_end = self.next_ticket;
        self.admit_reader_in_cohort()
    }

    fn admit_reader_in_cohort(&mut self) -> bool {
        match self.waiting_readers.front().copied() {
            Some(ticket) if ticket < self.cohort_end => {
                debug_assert!(!self.writer_active);
                self.waiting_readers.pop_front();
                self.active_readers += 1;
                self.admitted_readers.insert(ticket);
                true
            }
            _ => false,
        }
    }

    fn stats(&self) -> GateStats {
        GateStats {
            active_readers: self.active_readers,
            waiting_readers: self.waiting_readers.len(),
            waiting_writers: self.waiting_writers.len(),
            writer_active: self.writer_active,
        }
    }
}

/// Which side of the gate a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => f.write_str("read"),
            AccessMode::Write => f.write_str("write"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("gave up after {waited:?} waiting for {mode} access")]
    Timeout { mode: AccessMode, waited: Duration },
}

/// Counters of the gate at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub active_readers: usize,
    pub waiting_readers: usize,
    pub waiting_writers: usize,
    pub writer_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    Idle,
    Reading(usize),
    Writing,
}

impl GateStats {
    pub fn mode(&self) -> GateMode {
        if self.writer_active {
            GateMode::Writing
        } else if self.active_readers > 0 {
            GateMode::Reading(self.active_readers)
        } else {
            GateMode::Idle
        }
    }
}

/// Writer-priority readers–writers lock owning the value it protects.
pub struct Gate<T> {
    state: Mutex<GateState>,
    readers: Condvar,
    writers: Condvar,
    data: UnsafeCell<T>,
}

// SAFETY: `data` is only reached through guards, and the gate admits either
// any number of readers or exactly one writer, never both.
unsafe impl<T: Send> Send for Gate<T> {}
unsafe impl<T: Send + Sync> Sync for Gate<T> {}

impl<T> Gate<T> {
    pub fn new(data: T) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            readers: Condvar::new(),
            writers: Condvar::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Blocks until the caller may read. Never fails.
    pub fn enter_read(&self) -> ReadGuard<'_, T> {
        let mut state = self.state.lock();
        if let Some(ticket) = self.queue_reader(&mut state) {
            let admitted = self.await_reader(&mut state, ticket, None);
            debug_assert!(admitted);
            self.pass_to_next_reader(&mut state);
        }
        trace!(active_readers = state.active_readers, "reader entered");
        ReadGuard { gate: self }
    }

    /// Like [`enter_read`](Self::enter_read), but leaves the queue and fails
    /// once `timeout` has elapsed without being admitted.
    pub fn enter_read_timeout(&self, timeout: Duration) -> Result<ReadGuard<'_, T>, GateError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        if let Some(ticket) = self.queue_reader(&mut state) {
            if !self.await_reader(&mut state, ticket, Some(deadline)) {
                state.waiting_readers.retain(|queued| *queued != ticket);
                debug!(ticket, ?timeout, "reader left the queue");
                return Err(GateError::Timeout {
                    mode: AccessMode::Read,
                    waited: timeout,
                });
            }
            self.pass_to_next_reader(&mut state);
        }
        trace!(active_readers = state.active_readers, "reader entered");
        Ok(ReadGuard { gate: self })
    }

    /// Blocks until the caller is the only one inside. Never fails.
    pub fn enter_write(&self) -> WriteGuard<'_, T> {
        let mut state = self.state.lock();
        if let Some(ticket) = self.queue_writer(&mut state) {
            let admitted = self.await_writer(&mut state, ticket, None);
            debug_assert!(admitted);
        }
        trace!("writer entered");
        WriteGuard { gate: self }
    }

    /// Like [`enter_write`](Self::enter_write), but leaves the queue and fails
    /// once `timeout` has elapsed without being admitted.
    pub fn enter_write_timeout(&self, timeout: Duration) -> Result<WriteGuard<'_, T>, GateError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        if let Some(ticket) = self.queue_writer(&mut state) {
            if !self.await_writer(&mut state, ticket, Some(deadline)) {
                state.waiting_writers.retain(|queued| *queued != ticket);
                debug!(ticket, ?timeout, "writer left the queue");
                // Readers parked behind this writer must not wait for a
                // writer that is never coming.
                if !state.writer_active
                    && state.waiting_writers.is_empty()
                    && state.open_reader_cohort()
                {
                    self.readers.notify_all();
                }
                return Err(GateError::Timeout {
                    mode: AccessMode::Write,
                    waited: timeout,
                });
            }
        }
        trace!("writer entered");
        Ok(WriteGuard { gate: self })
    }

    pub fn stats(&self) -> GateStats {
        self.state.lock().stats()
    }

    /// Counts the reader in right away, or queues it and returns its ticket
    /// when a writer is active or waiting.
    fn queue_reader(&self, state: &mut GateState) -> Option<Ticket> {
        if !state.writer_active && state.waiting_writers.is_empty() {
            state.active_readers += 1;
            return None;
        }
        let ticket = state.issue_ticket();
        state.waiting_readers.push_back(ticket);
        debug!(
            ticket,
            writer_active = state.writer_active,
            waiting_writers = state.waiting_writers.len(),
            "reader queued behind writers"
        );
        Some(ticket)
    }

    fn queue_writer(&self, state: &mut GateState) -> Option<Ticket> {
        if !state.writer_active && state.active_readers == 0 {
            state.writer_active = true;
            return None;
        }
        let ticket = state.issue_ticket();
        state.waiting_writers.push_back(ticket);
        debug!(
            ticket,
            writer_active = state.writer_active,
            active_readers = state.active_readers,
            "writer queued"
        );
        Some(ticket)
    }

    /// Waits until a releasing thread has counted `ticket` in. Returns `false`
    /// if the deadline passed first.
    fn await_reader(
        &self,
        state: &mut MutexGuard<'_, GateState>,
        ticket: Ticket,
        deadline: Option<Instant>,
    ) -> bool {
        while !state.admitted_readers.remove(&ticket) {
            match deadline {
                None => self.readers.wait(state),
                Some(deadline) => {
                    if self.readers.wait_until(state, deadline).timed_out() {
                        return state.admitted_readers.remove(&ticket);
                    }
                }
            }
        }
        true
    }

    fn await_writer(
        &self,
        state: &mut MutexGuard<'_, GateState>,
        ticket: Ticket,
        deadline: Option<Instant>,
    ) -> bool {
        while state.admitted_writer != Some(ticket) {
            match deadline {
                None => self.writers.wait(state),
                Some(deadline) => {
                    if self.writers.wait_until(state, deadline).timed_out()
                        && state.admitted_writer != Some(ticket)
                    {
                        return false;
                    }
                }
            }
        }
        state.admitted_writer = None;
        true
    }

    /// Chained wake: a reader released from the queue lets the next member of
    /// its batch in before entering.
    fn pass_to_next_reader(&self, state: &mut GateState) {
        if state.admit_reader_in_cohort() {
            self.readers.notify_all();
        }
    }

    fn exit_read(&self) {
        let mut state = self.state.lock();
        state.active_readers -= 1;
        trace!(active_readers = state.active_readers, "reader left");
        if state.active_readers == 0 && state.admit_writer() {
            // Condvar waiters check their own ticket, so wake them all and let
            // the admitted one through.
            self.writers.notify_all();
        }
    }

    fn exit_write(&self) {
        let mut state = self.state.lock();
        state.writer_active = false;
        trace!("writer left");
        if state.admit_writer() {
            self.writers.notify_all();
        } else if state.open_reader_cohort() {
            self.readers.notify_all();
        }
    }
}

impl<T> fmt::Debug for Gate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate").field("stats", &self.stats()).finish_non_exhaustive()
    }
}

/// Shared access to the gated value. Leaving the gate happens on drop.
pub struct ReadGuard<'a, T> {
    gate: &'a Gate<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a live read guard means no writer is inside the gate.
        unsafe { &*self.gate.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.gate.exit_read();
    }
}

/// Exclusive access to the gated value. Leaving the gate happens on drop.
pub struct WriteGuard<'a, T> {
    gate: &'a Gate<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a live write guard means nobody else is inside the gate.
        unsafe { &*self.gate.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: a live write guard means nobody else is inside the gate.
        unsafe { &mut *self.gate.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.gate.exit_write();
    }
}
