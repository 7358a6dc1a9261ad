//! Waiters and waiter sets
//!
//! A [`Waiter`] is the resume token of one wait operation. It can be
//! registered with several dispatchers at once (wait-many); whichever
//! dispatcher fires first wins, and every later attempt to awake it is
//! ignored. Blocking callers park on a condition variable, async callers on an
//! [`AtomicWaker`].
//!
//! Lock order: a dispatcher's lock is always taken before a waiter's slot
//! lock, never the other way around.

use core_types::{Signals, SignalsState};
use futures::task::AtomicWaker;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

static NEXT_WAITER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a waiter, used to deregister it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(u64);

/// Why a waiter was resumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// The requested signals became satisfied
    Satisfied,
    /// The requested signals can never become satisfied
    Unsatisfiable,
    /// The handle was closed or moved while the wait was pending
    HandleClosed,
}

/// The single resumption of a waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Awakening {
    /// Caller-supplied context; the handle index for wait-many
    pub context: usize,
    pub reason: WakeReason,
    /// Dispatcher state at the moment of the transition
    pub state: SignalsState,
}

/// Resume token for one wait
#[derive(Debug)]
pub struct Waiter {
    id: WaiterId,
    slot: Mutex<Slot>,
    condvar: Condvar,
    waker: AtomicWaker,
}

#[derive(Debug, Default)]
struct Slot {
    awakened: bool,
    awakening: Option<Awakening>,
}

impl Waiter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: WaiterId(NEXT_WAITER_ID.fetch_add(1, Ordering::Relaxed)),
            slot: Mutex::new(Slot::default()),
            condvar: Condvar::new(),
            waker: AtomicWaker::new(),
        })
    }

    pub fn id(&self) -> WaiterId {
        self.id
    }

    /// Resumes the waiter; returns false if it was already resumed
    pub fn awake(&self, context: usize, reason: WakeReason, state: SignalsState) -> bool {
        {
            let mut slot = self.slot.lock();
            if slot.awakened {
                return false;
            }
            slot.awakened = true;
            slot.awakening = Some(Awakening {
                context,
                reason,
                state,
            });
        }
        self.condvar.notify_all();
        self.waker.wake();
        true
    }

    /// Takes the awakening if one has arrived
    pub fn try_take(&self) -> Option<Awakening> {
        self.slot.lock().awakening.take()
    }

    /// Blocks until awoken or until `deadline` passes; `None` blocks forever
    ///
    /// Returns `None` on timeout. The caller must still deregister the waiter
    /// and then call [`Waiter::try_take`], since an awakening may race the
    /// timeout.
    pub fn wait_until(&self, deadline: Option<Instant>) -> Option<Awakening> {
        let mut slot = self.slot.lock();
        loop {
            if let Some(awakening) = slot.awakening.take() {
                return Some(awakening);
            }
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut slot, deadline).timed_out() {
                        return slot.awakening.take();
                    }
                }
                None => self.condvar.wait(&mut slot),
            }
        }
    }

    /// Polls for the awakening from an async task
    pub fn poll_awakening(&self, cx: &mut Context<'_>) -> Poll<Awakening> {
        if let Some(awakening) = self.try_take() {
            return Poll::Ready(awakening);
        }
        self.waker.register(cx.waker());
        // An awake may have landed between the first check and registering
        match self.try_take() {
            Some(awakening) => Poll::Ready(awakening),
            None => Poll::Pending,
        }
    }
}

#[derive(Debug)]
struct WaiterEntry {
    waiter: Arc<Waiter>,
    signals: Signals,
    context: usize,
}

/// Pending waits registered with one dispatcher
#[derive(Debug, Default)]
pub struct WaiterSet {
    entries: Vec<WaiterEntry>,
}

impl WaiterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, waiter: Arc<Waiter>, signals: Signals, context: usize) {
        self.entries.push(WaiterEntry {
            waiter,
            signals,
            context,
        });
    }

    pub fn remove(&mut self, id: WaiterId) {
        self.entries.retain(|entry| entry.waiter.id() != id);
    }

    /// Resumes and removes every waiter decided by `state`
    pub fn notify(&mut self, state: SignalsState) {
        self.entries.retain(|entry| {
            let reason = if state.satisfies(entry.signals) {
                WakeReason::Satisfied
            } else if !state.can_satisfy(entry.signals) {
                WakeReason::Unsatisfiable
            } else {
                return true;
            };
            entry.waiter.awake(entry.context, reason, state);
            false
        });
    }

    /// Resumes every waiter with [`WakeReason::HandleClosed`]
    pub fn cancel_all(&mut self) {
        for entry in self.entries.drain(..) {
            entry
                .waiter
                .awake(entry.context, WakeReason::HandleClosed, SignalsState::none());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of registering a waiter with a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The waiter was added and will be resumed later
    Pending,
    /// The wait is already decided; the waiter was not added
    Ready(WakeReason, SignalsState),
}

/// Decides a wait against the current state, registering it if undecided
pub fn register(
    waiters: &mut WaiterSet,
    state: SignalsState,
    waiter: &Arc<Waiter>,
    signals: Signals,
    context: usize,
) -> Registration {
    if state.satisfies(signals) {
        Registration::Ready(WakeReason::Satisfied, state)
    } else if !state.can_satisfy(signals) {
        Registration::Ready(WakeReason::Unsatisfiable, state)
    } else {
        waiters.add(Arc::clone(waiter), signals, context);
        Registration::Pending
    }
}
