//! Message Pipe Conformance Tests
//!
//! These tests validate message pipe behavior end to end:
//! - Readiness of a fresh pipe and after writes/reads
//! - FIFO ordering and exact payload delivery
//! - Peer closure as end of stream
//! - Handle transfer through messages, including discarded messages

use core_types::{Handle, Signals};
use handle_kernel::audit::HandleEvent;
use handle_kernel::System;
use kernel_api::{
    Deadline, KernelError, MessageSizes, ReadMessageFlags, WriteDataFlags, WriteMessageFlags,
};
use kernel_config::{KernelConfig, KernelLimits};
use tests_conformance::{receive, send, system_with_pipe};

#[test]
fn test_fresh_pipe_is_writable_not_readable() {
    let (system, h0, _h1) = system_with_pipe().unwrap();

    let state = system.wait(h0, Signals::WRITABLE, Deadline::IMMEDIATE).unwrap();
    assert!(state.satisfies(Signals::WRITABLE));

    let err = system
        .wait(h0, Signals::READABLE, Deadline::IMMEDIATE)
        .unwrap_err();
    assert_eq!(err.error, KernelError::DeadlineExceeded);
    assert_eq!(err.signals_state.unwrap().satisfied, Signals::WRITABLE);
}

#[test]
fn test_hello_round_trip() {
    let (system, h0, h1) = system_with_pipe().unwrap();
    send(&system, h1, b"hello\0").unwrap();

    let state = system.wait(h0, Signals::READABLE, Deadline::IMMEDIATE).unwrap();
    assert!(state.satisfies(Signals::READABLE));

    let mut bytes = [0u8; 64];
    let sizes = system
        .read_message(h0, &mut bytes, &mut [], ReadMessageFlags::empty())
        .unwrap();
    assert_eq!(sizes.num_bytes, 6);
    assert_eq!(&bytes[..6], b"hello\0");

    // Unreadable again right after the only message is taken
    let err = system
        .wait(h0, Signals::READABLE, Deadline::IMMEDIATE)
        .unwrap_err();
    assert_eq!(err.error, KernelError::DeadlineExceeded);
}

#[test]
fn test_peer_close_ends_wait() {
    let (system, h0, h1) = system_with_pipe().unwrap();
    send(&system, h1, b"hello\0").unwrap();
    receive(&system, h0).unwrap();
    system.close(h0).unwrap();

    let err = system
        .wait(
            h1,
            Signals::READABLE | Signals::WRITABLE,
            Deadline::from_millis(1000),
        )
        .unwrap_err();
    assert_eq!(err.error, KernelError::FailedPrecondition);
    let state = err.signals_state.unwrap();
    assert_eq!(state.satisfied, Signals::PEER_CLOSED);
    assert_eq!(state.satisfiable, Signals::PEER_CLOSED);
}

#[test]
fn test_closed_handle_is_invalid_everywhere() {
    let (system, h0, h1) = system_with_pipe().unwrap();
    system.close(h0).unwrap();

    assert_eq!(system.close(h0), Err(KernelError::InvalidArgument));
    assert_eq!(send(&system, h0, b"x"), Err(KernelError::InvalidArgument));
    assert_eq!(
        receive(&system, h0).unwrap_err().error,
        KernelError::InvalidArgument
    );
    assert_eq!(
        system
            .wait(h0, Signals::READABLE, Deadline::IMMEDIATE)
            .unwrap_err()
            .error,
        KernelError::InvalidArgument
    );
    assert_eq!(
        system.write_data(h0, b"x", WriteDataFlags::empty()),
        Err(KernelError::InvalidArgument)
    );
    assert!(system.close(h1).is_ok());
}

#[test]
fn test_messages_arrive_in_order() {
    let (system, h0, h1) = system_with_pipe().unwrap();
    for i in 0..10u8 {
        send(&system, h0, &[i; 3]).unwrap();
    }
    for i in 0..10u8 {
        let (bytes, handles) = receive(&system, h1).unwrap();
        assert_eq!(bytes, vec![i; 3]);
        assert!(handles.is_empty());
    }
}

#[test]
fn test_empty_queue_results() {
    let (system, h0, h1) = system_with_pipe().unwrap();
    assert_eq!(
        receive(&system, h0).unwrap_err().error,
        KernelError::ShouldWait
    );

    // Queued data stays readable after the writer goes away
    send(&system, h1, b"last").unwrap();
    system.close(h1).unwrap();
    assert_eq!(receive(&system, h0).unwrap().0, b"last");
    assert_eq!(
        receive(&system, h0).unwrap_err().error,
        KernelError::FailedPrecondition
    );
    assert_eq!(send(&system, h0, b"x"), Err(KernelError::FailedPrecondition));
}

#[test]
fn test_peek_then_grow() {
    let (system, h0, h1) = system_with_pipe().unwrap();
    let buffer = system.create_shared_buffer(None, 16).unwrap();
    system
        .write_message(h0, b"payload", &[buffer], WriteMessageFlags::empty())
        .unwrap();

    let err = system
        .read_message(h1, &mut [], &mut [], ReadMessageFlags::empty())
        .unwrap_err();
    assert_eq!(err.error, KernelError::ResourceExhausted);
    assert_eq!(
        err.required,
        Some(MessageSizes {
            num_bytes: 7,
            num_handles: 1
        })
    );

    let mut bytes = vec![0u8; 7];
    let mut handles = vec![Handle::INVALID; 1];
    system
        .read_message(h1, &mut bytes, &mut handles, ReadMessageFlags::empty())
        .unwrap();
    assert_eq!(bytes, b"payload");
    assert_eq!(system.get_buffer_information(handles[0]).unwrap().num_bytes, 16);
}

#[test]
fn test_may_discard_closes_carried_handles() {
    let (system, h0, h1) = system_with_pipe().unwrap();
    let (inner0, inner1) = system.create_message_pipe(None).unwrap();
    system
        .write_message(h0, b"too big", &[inner1], WriteMessageFlags::empty())
        .unwrap();

    let err = system
        .read_message(h1, &mut [0; 2], &mut [], ReadMessageFlags::MAY_DISCARD)
        .unwrap_err();
    assert_eq!(err.error, KernelError::ResourceExhausted);
    assert_eq!(
        receive(&system, h1).unwrap_err().error,
        KernelError::ShouldWait
    );

    let state = system.signals_state(inner0).unwrap();
    assert_eq!(state.satisfied, Signals::PEER_CLOSED);
}

#[test]
fn test_pipe_endpoint_travels_through_pipe() {
    let (system, h0, h1) = system_with_pipe().unwrap();
    let (inner0, inner1) = system.create_message_pipe(None).unwrap();
    system
        .write_message(h0, b"take this", &[inner1], WriteMessageFlags::empty())
        .unwrap();
    assert_eq!(send(&system, inner1, b"x"), Err(KernelError::InvalidArgument));

    let (_, handles) = receive(&system, h1).unwrap();
    let received = handles[0];
    send(&system, inner0, b"over the moved end").unwrap();
    assert_eq!(receive(&system, received).unwrap().0, b"over the moved end");

    assert_eq!(
        system.count_audit_events(|e| matches!(e, HandleEvent::SentInMessage { .. })),
        1
    );
}

#[test]
fn test_attaching_busy_data_pipe_handle() {
    let (system, h0, _h1) = system_with_pipe().unwrap();
    let (producer, _consumer) = system.create_data_pipe(None).unwrap();
    let _lease = system.begin_write_data(producer).unwrap();
    assert_eq!(
        system.write_message(h0, b"", &[producer], WriteMessageFlags::empty()),
        Err(KernelError::Busy)
    );
    system.end_write_data(producer, 0).unwrap();
    system
        .write_message(h0, b"", &[producer], WriteMessageFlags::empty())
        .unwrap();
}

#[test]
fn test_message_limits() {
    let system = System::with_config(KernelConfig {
        limits: KernelLimits::default()
            .with_max_message_num_bytes(4)
            .with_max_message_num_handles(1)
            .with_max_queued_messages(2),
        ..KernelConfig::default()
    });
    let (h0, h1) = system.create_message_pipe(None).unwrap();
    assert_eq!(send(&system, h0, b"12345"), Err(KernelError::ResourceExhausted));

    let a = system.create_shared_buffer(None, 1).unwrap();
    let b = system.create_shared_buffer(None, 1).unwrap();
    assert_eq!(
        system.write_message(h0, b"", &[a, b], WriteMessageFlags::empty()),
        Err(KernelError::ResourceExhausted)
    );

    send(&system, h0, b"1").unwrap();
    send(&system, h0, b"2").unwrap();
    assert_eq!(send(&system, h0, b"3"), Err(KernelError::ResourceExhausted));
    receive(&system, h1).unwrap();
    send(&system, h0, b"3").unwrap();
}
