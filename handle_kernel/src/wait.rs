//! Waiting on dispatchers
//!
//! These are the only operations in the kernel that suspend the caller. A wait
//! registers one [`Waiter`] with every dispatcher involved, parks (or returns
//! a pending future), and deregisters on the way out whatever the outcome.

use crate::dispatcher::Dispatcher;
use crate::waiter::{Awakening, Registration, WakeReason, Waiter};
use core_types::{Signals, SignalsState};
use kernel_api::{Deadline, KernelError, WaitError, WaitManyError, WaitManyResult};
use log::trace;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

fn deadline_instant(deadline: Deadline) -> Option<Instant> {
    deadline
        .to_duration()
        .and_then(|duration| Instant::now().checked_add(duration))
}

fn finish(reason: WakeReason, state: SignalsState) -> Result<SignalsState, WaitError> {
    match reason {
        WakeReason::Satisfied => Ok(state),
        WakeReason::Unsatisfiable => Err(WaitError::with_state(KernelError::FailedPrecondition, state)),
        WakeReason::HandleClosed => Err(WaitError::with_state(
            KernelError::FailedPrecondition,
            SignalsState::none(),
        )),
    }
}

/// Blocks until `signals` is satisfied on `dispatcher`
pub fn wait_one(
    dispatcher: &Arc<Dispatcher>,
    signals: Signals,
    deadline: Deadline,
) -> Result<SignalsState, WaitError> {
    let waiter = Waiter::new();
    if let Registration::Ready(reason, state) = dispatcher.add_waiter(&waiter, signals, 0) {
        return finish(reason, state);
    }

    trace!("waiting on {} for {:?}", dispatcher.kind(), signals);
    let mut awakening = if deadline.is_immediate() {
        None
    } else {
        waiter.wait_until(deadline_instant(deadline))
    };
    if awakening.is_none() {
        dispatcher.remove_waiter(waiter.id());
        awakening = waiter.try_take();
    }

    match awakening {
        Some(Awakening { reason, state, .. }) => finish(reason, state),
        None => Err(WaitError::with_state(
            KernelError::DeadlineExceeded,
            dispatcher.signals_state(),
        )),
    }
}

/// Blocks until any dispatcher has any of its requested signals satisfied
///
/// `dispatchers` and `signals` must be non-empty and of equal length.
pub fn wait_many(
    dispatchers: &[Arc<Dispatcher>],
    signals: &[Signals],
    deadline: Deadline,
) -> Result<WaitManyResult, WaitManyError> {
    let waiter = Waiter::new();
    let mut registered = 0;
    let mut immediate = None;
    for (index, (dispatcher, requested)) in dispatchers.iter().zip(signals).enumerate() {
        match dispatcher.add_waiter(&waiter, *requested, index) {
            Registration::Pending => registered = index + 1,
            Registration::Ready(reason, state) => {
                immediate = Some(Awakening {
                    context: index,
                    reason,
                    state,
                });
                break;
            }
        }
    }

    // An earlier handle that fired during registration wins over a later one
    let mut awakening = waiter.try_take().or(immediate);
    if awakening.is_none() && !deadline.is_immediate() {
        trace!("waiting on {} handles", dispatchers.len());
        awakening = waiter.wait_until(deadline_instant(deadline));
    }
    for dispatcher in &dispatchers[..registered] {
        dispatcher.remove_waiter(waiter.id());
    }
    if awakening.is_none() {
        awakening = waiter.try_take();
    }

    let mut states: Vec<SignalsState> = dispatchers.iter().map(|d| d.signals_state()).collect();
    let Some(awakening) = awakening else {
        return Err(WaitManyError {
            error: KernelError::DeadlineExceeded,
            index: None,
            signals_states: Some(states),
        });
    };

    let index = awakening.context;
    match awakening.reason {
        WakeReason::Satisfied => {
            states[index] = awakening.state;
            Ok(WaitManyResult {
                index,
                signals_states: states,
            })
        }
        WakeReason::Unsatisfiable | WakeReason::HandleClosed => {
            states[index] = if awakening.reason == WakeReason::HandleClosed {
                SignalsState::none()
            } else {
                awakening.state
            };
            Err(WaitManyError {
                error: KernelError::FailedPrecondition,
                index: Some(index),
                signals_states: Some(states),
            })
        }
    }
}

enum WaitFutureState {
    Ready(Result<SignalsState, WaitError>),
    Waiting {
        dispatcher: Arc<Dispatcher>,
        waiter: Arc<Waiter>,
    },
    Done,
}

/// Future resolving when `signals` is satisfied on one handle
///
/// Resolves to the same result a blocking wait with an indefinite deadline
/// would return. Dropping the future withdraws the wait.
#[must_use = "futures do nothing unless polled"]
pub struct WaitFuture {
    state: WaitFutureState,
}

impl WaitFuture {
    /// Registers a wait on `dispatcher`
    pub fn new(dispatcher: Arc<Dispatcher>, signals: Signals) -> Self {
        let waiter = Waiter::new();
        let state = match dispatcher.add_waiter(&waiter, signals, 0) {
            Registration::Ready(reason, state) => WaitFutureState::Ready(finish(reason, state)),
            Registration::Pending => WaitFutureState::Waiting { dispatcher, waiter },
        };
        Self { state }
    }

    /// A future that resolves immediately to `error`
    pub fn failed(error: KernelError) -> Self {
        Self {
            state: WaitFutureState::Ready(Err(WaitError::new(error))),
        }
    }
}

impl Future for WaitFuture {
    type Output = Result<SignalsState, WaitError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match mem::replace(&mut this.state, WaitFutureState::Done) {
            WaitFutureState::Ready(result) => Poll::Ready(result),
            WaitFutureState::Waiting { dispatcher, waiter } => match waiter.poll_awakening(cx) {
                Poll::Ready(awakening) => {
                    dispatcher.remove_waiter(waiter.id());
                    Poll::Ready(finish(awakening.reason, awakening.state))
                }
                Poll::Pending => {
                    this.state = WaitFutureState::Waiting { dispatcher, waiter };
                    Poll::Pending
                }
            },
            WaitFutureState::Done => Poll::Ready(Err(WaitError::new(KernelError::FailedPrecondition))),
        }
    }
}

impl Drop for WaitFuture {
    fn drop(&mut self) {
        if let WaitFutureState::Waiting { dispatcher, waiter } = &self.state {
            dispatcher.remove_waiter(waiter.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message_queue::Message;
    use futures::executor::block_on;
    use futures::task::noop_waker_ref;
    use std::thread;
    use std::time::Duration;

    fn pipe_pair() -> (Arc<Dispatcher>, Arc<Dispatcher>) {
        let (a, b) = Dispatcher::message_pipe_pair(16);
        (Arc::new(a), Arc::new(b))
    }

    fn send(from: &Dispatcher, text: &str) {
        let endpoint = from.as_message_pipe_endpoint().unwrap();
        endpoint
            .pipe
            .write_message(endpoint.port, Message::new(text.as_bytes().to_vec(), Vec::new()))
            .unwrap();
    }

    #[test]
    fn test_wait_already_satisfied() {
        let (a, _b) = pipe_pair();
        let state = wait_one(&a, Signals::WRITABLE, Deadline::IMMEDIATE).unwrap();
        assert!(state.satisfies(Signals::WRITABLE));
    }

    #[test]
    fn test_wait_poll_times_out() {
        let (a, _b) = pipe_pair();
        let err = wait_one(&a, Signals::READABLE, Deadline::IMMEDIATE).unwrap_err();
        assert_eq!(err.error, KernelError::DeadlineExceeded);
        assert_eq!(err.signals_state.unwrap().satisfied, Signals::WRITABLE);
    }

    #[test]
    fn test_wait_short_deadline() {
        let (a, _b) = pipe_pair();
        let err = wait_one(&a, Signals::READABLE, Deadline::from_millis(5)).unwrap_err();
        assert_eq!(err.error, KernelError::DeadlineExceeded);
    }

    #[test]
    fn test_wait_woken_by_other_thread() {
        let (a, b) = pipe_pair();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            send(&b, "hi");
            b
        });
        let state = wait_one(&a, Signals::READABLE, Deadline::INDEFINITE).unwrap();
        assert!(state.satisfies(Signals::READABLE));
        writer.join().unwrap();
    }

    #[test]
    fn test_wait_becomes_unsatisfiable() {
        let (a, b) = pipe_pair();
        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            b.close();
        });
        let err = wait_one(&a, Signals::READABLE, Deadline::INDEFINITE).unwrap_err();
        assert_eq!(err.error, KernelError::FailedPrecondition);
        assert_eq!(err.signals_state.unwrap().satisfied, Signals::PEER_CLOSED);
        closer.join().unwrap();
    }

    #[test]
    fn test_wait_many_prefers_lowest_ready_index() {
        let (a, b) = pipe_pair();
        let (c, d) = pipe_pair();
        send(&b, "x");
        send(&d, "y");
        let result = wait_many(
            &[Arc::clone(&c), Arc::clone(&a)],
            &[Signals::READABLE, Signals::READABLE],
            Deadline::IMMEDIATE,
        )
        .unwrap();
        assert_eq!(result.index, 0);
        assert_eq!(result.signals_states.len(), 2);
        assert!(result.signals_states[1].satisfies(Signals::READABLE));
    }

    #[test]
    fn test_wait_many_deadline_reports_all_states() {
        let (a, _b) = pipe_pair();
        let (c, _d) = pipe_pair();
        let err = wait_many(
            &[a, c],
            &[Signals::READABLE, Signals::READABLE],
            Deadline::from_millis(2),
        )
        .unwrap_err();
        assert_eq!(err.error, KernelError::DeadlineExceeded);
        assert_eq!(err.index, None);
        assert_eq!(err.signals_states.unwrap().len(), 2);
    }

    #[test]
    fn test_wait_many_unsatisfiable_index() {
        let (a, _b) = pipe_pair();
        let (c, d) = pipe_pair();
        d.close();
        let err = wait_many(
            &[a, c],
            &[Signals::READABLE, Signals::WRITABLE],
            Deadline::INDEFINITE,
        )
        .unwrap_err();
        assert_eq!(err.error, KernelError::FailedPrecondition);
        assert_eq!(err.index, Some(1));
    }

    #[test]
    fn test_wait_future_resolves() {
        let (a, b) = pipe_pair();
        let mut future = WaitFuture::new(Arc::clone(&a), Signals::READABLE);
        let mut cx = Context::from_waker(noop_waker_ref());
        assert!(Pin::new(&mut future).poll(&mut cx).is_pending());

        send(&b, "hi");
        let state = block_on(future).unwrap();
        assert!(state.satisfies(Signals::READABLE));
    }

    #[test]
    fn test_dropped_future_deregisters() {
        let (a, _b) = pipe_pair();
        let future = WaitFuture::new(Arc::clone(&a), Signals::READABLE);
        drop(future);
        let endpoint = a.as_message_pipe_endpoint().unwrap();
        // A fresh wait still registers and times out normally
        assert!(endpoint.pipe.is_open(endpoint.port));
        assert_eq!(
            wait_one(&a, Signals::READABLE, Deadline::IMMEDIATE)
                .unwrap_err()
                .error,
            KernelError::DeadlineExceeded
        );
    }

    #[test]
    fn test_failed_future() {
        let err = block_on(WaitFuture::failed(KernelError::InvalidArgument)).unwrap_err();
        assert_eq!(err.error, KernelError::InvalidArgument);
        assert_eq!(err.signals_state, None);
    }
}
