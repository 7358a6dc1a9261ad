//! Default System Conformance Tests
//!
//! These tests go through the free functions in `handle_kernel::core`. They
//! share one process-wide system, so they only assert on handles they created.

use core_types::Signals;
use handle_kernel::core;
use handle_kernel::default_system;
use kernel_api::{Deadline, KernelError, MapBufferFlags, ReadMessageFlags, WriteMessageFlags};

#[test]
fn test_free_functions_round_trip_a_message() {
    let (h0, h1) = core::create_message_pipe(None).unwrap();
    core::write_message(h0, b"default", &[], WriteMessageFlags::empty()).unwrap();

    let state = core::wait(h1, Signals::READABLE, Deadline::IMMEDIATE).unwrap();
    assert!(state.satisfies(Signals::READABLE));
    let (bytes, handles) = core::read_message_owned(h1, ReadMessageFlags::empty()).unwrap();
    assert_eq!(bytes, b"default");
    assert!(handles.is_empty());

    core::close(h0).unwrap();
    core::close(h1).unwrap();
    assert_eq!(core::close(h1), Err(KernelError::InvalidArgument));
}

#[test]
fn test_free_functions_and_method_calls_agree() {
    let handle = core::create_shared_buffer(None, 8).unwrap();
    let info = default_system().get_buffer_information(handle).unwrap();
    assert_eq!(info.num_bytes, 8);

    let mapping = core::map_buffer(handle, 0, 8, MapBufferFlags::empty()).unwrap();
    assert_eq!(mapping.system(), default_system().id());
    core::unmap_buffer(mapping).unwrap();
    default_system().close(handle).unwrap();
}

#[test]
fn test_time_ticks_never_go_backwards() {
    let earlier = core::time_ticks_now();
    let later = core::time_ticks_now();
    assert!(later >= earlier);
}

#[test]
fn test_async_wait_on_default_system() {
    let (h0, h1) = core::create_message_pipe(None).unwrap();
    let pending = core::wait_async(h1, Signals::READABLE);
    core::write_message(h0, b"", &[], WriteMessageFlags::empty()).unwrap();
    let state = futures::executor::block_on(pending).unwrap();
    assert!(state.satisfies(Signals::READABLE));
    core::close(h0).unwrap();
    core::close(h1).unwrap();
}
