//! Data Pipe Conformance Tests
//!
//! These tests validate data pipe flow control:
//! - Threshold signals as the pipe fills and drains
//! - Option round-trips and validation
//! - Two-phase writes and reads, including both at once
//! - Closure of either side
//! - A streaming producer and consumer on separate threads

use core_types::{Handle, Signals};
use handle_kernel::System;
use kernel_api::{
    CreateDataPipeOptions, DataPipeConsumerOptions, DataPipeProducerOptions, Deadline,
    KernelError, ReadDataFlags, WriteDataFlags,
};
use std::sync::Arc;
use std::thread;

fn pipe(system: &System, element_num_bytes: u32, capacity_num_bytes: u32) -> (Handle, Handle) {
    system
        .create_data_pipe(Some(CreateDataPipeOptions::new(
            element_num_bytes,
            capacity_num_bytes,
        )))
        .unwrap()
}

fn write_threshold_met(system: &System, producer: Handle) -> bool {
    system
        .signals_state(producer)
        .unwrap()
        .satisfies(Signals::WRITE_THRESHOLD)
}

#[test]
fn test_write_threshold_follows_free_space() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 2, 4);

    assert_eq!(system.write_data(producer, &[1, 2], WriteDataFlags::empty()), Ok(2));
    assert!(write_threshold_met(&system, producer));

    assert_eq!(system.write_data(producer, &[3, 4], WriteDataFlags::empty()), Ok(2));
    assert!(!write_threshold_met(&system, producer));
    assert_eq!(
        system.write_data(producer, &[5, 6], WriteDataFlags::empty()),
        Err(KernelError::ShouldWait)
    );

    let mut element = [0u8; 2];
    assert_eq!(system.read_data(consumer, &mut element, ReadDataFlags::empty()), Ok(2));
    assert_eq!(element, [1, 2]);
    assert!(write_threshold_met(&system, producer));
}

#[test]
fn test_consumer_threshold_round_trip() {
    let system = System::new();
    let (_producer, consumer) = pipe(&system, 1, 8);

    system
        .set_data_pipe_consumer_options(consumer, Some(DataPipeConsumerOptions::with_threshold(3)))
        .unwrap();
    assert_eq!(
        system
            .get_data_pipe_consumer_options(consumer)
            .unwrap()
            .read_threshold_num_bytes,
        3
    );

    system.set_data_pipe_consumer_options(consumer, None).unwrap();
    assert_eq!(
        system
            .get_data_pipe_consumer_options(consumer)
            .unwrap()
            .read_threshold_num_bytes,
        0
    );
}

#[test]
fn test_read_threshold_signal() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 1, 8);
    system
        .set_data_pipe_consumer_options(consumer, Some(DataPipeConsumerOptions::with_threshold(3)))
        .unwrap();

    system.write_data(producer, b"ab", WriteDataFlags::empty()).unwrap();
    let state = system.signals_state(consumer).unwrap();
    assert!(state.satisfies(Signals::READABLE));
    assert!(!state.satisfies(Signals::READ_THRESHOLD));

    system.write_data(producer, b"c", WriteDataFlags::empty()).unwrap();
    let state = system
        .wait(consumer, Signals::READ_THRESHOLD, Deadline::IMMEDIATE)
        .unwrap();
    assert!(state.satisfies(Signals::READ_THRESHOLD));
}

#[test]
fn test_threshold_validation_leaves_options_unchanged() {
    let system = System::new();
    let (producer, _consumer) = pipe(&system, 4, 16);
    system
        .set_data_pipe_producer_options(producer, Some(DataPipeProducerOptions::with_threshold(8)))
        .unwrap();

    for bad in [6, 20] {
        assert_eq!(
            system.set_data_pipe_producer_options(
                producer,
                Some(DataPipeProducerOptions::with_threshold(bad))
            ),
            Err(KernelError::InvalidArgument)
        );
    }
    assert_eq!(
        system
            .get_data_pipe_producer_options(producer)
            .unwrap()
            .write_threshold_num_bytes,
        8
    );
}

#[test]
fn test_short_write_and_all_or_none() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 1, 4);
    assert_eq!(
        system.write_data(producer, b"abcdef", WriteDataFlags::ALL_OR_NONE),
        Err(KernelError::OutOfRange)
    );
    assert_eq!(system.write_data(producer, b"abcdef", WriteDataFlags::empty()), Ok(4));

    let mut out = [0u8; 8];
    assert_eq!(
        system.read_data(consumer, &mut out, ReadDataFlags::ALL_OR_NONE),
        Err(KernelError::OutOfRange)
    );
    assert_eq!(system.read_data(consumer, &mut out, ReadDataFlags::QUERY), Ok(4));
    assert_eq!(system.read_data(consumer, &mut out[..2], ReadDataFlags::PEEK), Ok(2));
    assert_eq!(system.read_data(consumer, &mut out[..1], ReadDataFlags::DISCARD), Ok(1));
    assert_eq!(system.read_data(consumer, &mut out, ReadDataFlags::empty()), Ok(3));
    assert_eq!(&out[..3], b"bcd");
    assert_eq!(
        system.read_data(
            consumer,
            &mut out,
            ReadDataFlags::QUERY | ReadDataFlags::PEEK
        ),
        Err(KernelError::InvalidArgument)
    );
}

#[test]
fn test_element_multiples_enforced() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 4, 16);
    assert_eq!(
        system.write_data(producer, b"abc", WriteDataFlags::empty()),
        Err(KernelError::InvalidArgument)
    );
    system.write_data(producer, b"abcd", WriteDataFlags::empty()).unwrap();
    assert_eq!(
        system.read_data(consumer, &mut [0u8; 2], ReadDataFlags::empty()),
        Err(KernelError::InvalidArgument)
    );

    system.begin_write_data(producer).unwrap();
    assert_eq!(
        system.end_write_data(producer, 3),
        Err(KernelError::InvalidArgument)
    );
    // The failed commit still ended the two-phase write
    assert_eq!(
        system.end_write_data(producer, 0),
        Err(KernelError::FailedPrecondition)
    );
    assert_eq!(system.read_data(consumer, &mut [0u8; 16], ReadDataFlags::QUERY), Ok(4));
}

#[test]
fn test_two_phase_write_in_place() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 1, 8);

    let lease = system.begin_write_data(producer).unwrap();
    assert_eq!(lease.len(), 8);
    assert_eq!(system.begin_write_data(producer).unwrap_err(), KernelError::Busy);
    assert_eq!(
        system.write_data(producer, b"x", WriteDataFlags::empty()),
        Err(KernelError::Busy)
    );
    assert!(!system
        .signals_state(producer)
        .unwrap()
        .satisfies(Signals::WRITABLE));

    lease.write_at(0, b"hey").unwrap();
    system.end_write_data(producer, 3).unwrap();
    assert_eq!(lease.write_at(0, b"!"), Err(KernelError::FailedPrecondition));

    let mut out = [0u8; 8];
    assert_eq!(system.read_data(consumer, &mut out, ReadDataFlags::empty()), Ok(3));
    assert_eq!(&out[..3], b"hey");
}

#[test]
fn test_two_phase_read_in_place() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 1, 8);
    system.write_data(producer, b"stream", WriteDataFlags::empty()).unwrap();

    let lease = system.begin_read_data(consumer).unwrap();
    assert_eq!(lease.to_vec().unwrap(), b"stream");
    assert_eq!(
        system.read_data(consumer, &mut [0u8; 1], ReadDataFlags::empty()),
        Err(KernelError::Busy)
    );
    system.end_read_data(consumer, 3).unwrap();
    assert_eq!(
        system.end_read_data(consumer, 0),
        Err(KernelError::FailedPrecondition)
    );

    let mut out = [0u8; 3];
    system.read_data(consumer, &mut out, ReadDataFlags::empty()).unwrap();
    assert_eq!(&out, b"eam");
}

#[test]
fn test_two_phase_write_and_read_together() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 1, 8);
    system.write_data(producer, b"abcd", WriteDataFlags::empty()).unwrap();

    let read = system.begin_read_data(consumer).unwrap();
    let write = system.begin_write_data(producer).unwrap();
    assert_eq!(read.len(), 4);
    assert_eq!(write.len(), 4);

    write.write_at(0, b"efgh").unwrap();
    assert_eq!(read.to_vec().unwrap(), b"abcd");
    system.end_write_data(producer, 4).unwrap();
    system.end_read_data(consumer, 4).unwrap();

    let mut out = [0u8; 8];
    assert_eq!(system.read_data(consumer, &mut out, ReadDataFlags::empty()), Ok(4));
    assert_eq!(&out[..4], b"efgh");
}

#[test]
fn test_closed_producer_keeps_buffered_data() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 1, 8);
    system.write_data(producer, b"tail", WriteDataFlags::empty()).unwrap();
    system.close(producer).unwrap();

    let state = system.signals_state(consumer).unwrap();
    assert!(state.satisfies(Signals::READABLE));
    assert!(state.satisfies(Signals::PEER_CLOSED));

    let mut out = [0u8; 8];
    assert_eq!(system.read_data(consumer, &mut out, ReadDataFlags::empty()), Ok(4));
    assert_eq!(
        system.read_data(consumer, &mut out, ReadDataFlags::empty()),
        Err(KernelError::FailedPrecondition)
    );
    let state = system.signals_state(consumer).unwrap();
    assert_eq!(state.satisfiable, Signals::PEER_CLOSED);
}

#[test]
fn test_unreachable_read_threshold_fails_wait() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 1, 8);
    system
        .set_data_pipe_consumer_options(consumer, Some(DataPipeConsumerOptions::with_threshold(4)))
        .unwrap();
    system.write_data(producer, b"ab", WriteDataFlags::empty()).unwrap();
    system.close(producer).unwrap();

    let state = system.signals_state(consumer).unwrap();
    assert_eq!(state.satisfied, Signals::READABLE | Signals::PEER_CLOSED);
    assert_eq!(state.satisfiable, Signals::READABLE | Signals::PEER_CLOSED);

    let err = system
        .wait(consumer, Signals::READ_THRESHOLD, Deadline::INDEFINITE)
        .unwrap_err();
    assert_eq!(err.error, KernelError::FailedPrecondition);
    assert_eq!(err.signals_state, Some(state));
}

#[test]
fn test_raising_threshold_after_producer_close_ends_wait() {
    let system = Arc::new(System::new());
    let (producer, consumer) = pipe(&system, 1, 8);
    system.write_data(producer, b"abc", WriteDataFlags::empty()).unwrap();
    system.close(producer).unwrap();

    // An open two-phase read keeps READ_THRESHOLD reachable but unsatisfied
    let _lease = system.begin_read_data(consumer).unwrap();
    let waiter = {
        let system = Arc::clone(&system);
        thread::spawn(move || system.wait(consumer, Signals::READ_THRESHOLD, Deadline::INDEFINITE))
    };
    thread::sleep(std::time::Duration::from_millis(20));
    system
        .set_data_pipe_consumer_options(consumer, Some(DataPipeConsumerOptions::with_threshold(4)))
        .unwrap();

    let err = waiter.join().unwrap().unwrap_err();
    assert_eq!(err.error, KernelError::FailedPrecondition);
    assert!(!err.signals_state.unwrap().can_satisfy(Signals::READ_THRESHOLD));
}

#[test]
fn test_closed_consumer_leaves_only_peer_closed() {
    let system = System::new();
    let (producer, consumer) = pipe(&system, 1, 8);
    system.close(consumer).unwrap();

    let state = system.signals_state(producer).unwrap();
    assert_eq!(state.satisfied, Signals::PEER_CLOSED);
    assert_eq!(state.satisfiable, Signals::PEER_CLOSED);
    assert_eq!(
        system.write_data(producer, b"x", WriteDataFlags::empty()),
        Err(KernelError::FailedPrecondition)
    );
    let err = system
        .wait(producer, Signals::WRITABLE, Deadline::INDEFINITE)
        .unwrap_err();
    assert_eq!(err.error, KernelError::FailedPrecondition);
}

#[test]
fn test_streaming_between_threads() {
    let system = Arc::new(System::new());
    let (producer, consumer) = pipe(&system, 1, 16);
    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

    let writer = {
        let system = Arc::clone(&system);
        let payload = payload.clone();
        thread::spawn(move || {
            let mut sent = 0;
            while sent < payload.len() {
                match system.write_data(producer, &payload[sent..], WriteDataFlags::empty()) {
                    Ok(n) => sent += n,
                    Err(KernelError::ShouldWait) => {
                        system
                            .wait(producer, Signals::WRITABLE, Deadline::INDEFINITE)
                            .unwrap();
                    }
                    Err(error) => panic!("write failed: {error}"),
                }
            }
            system.close(producer).unwrap();
        })
    };

    let mut received = Vec::new();
    let mut chunk = [0u8; 7];
    loop {
        match system.read_data(consumer, &mut chunk, ReadDataFlags::empty()) {
            Ok(n) => received.extend_from_slice(&chunk[..n]),
            Err(KernelError::ShouldWait) => {
                // Fails once the producer is gone; the next read reports it
                let _ = system.wait(consumer, Signals::READABLE, Deadline::INDEFINITE);
            }
            Err(KernelError::FailedPrecondition) => break,
            Err(error) => panic!("read failed: {error}"),
        }
    }
    writer.join().unwrap();
    assert_eq!(received, payload);
}
