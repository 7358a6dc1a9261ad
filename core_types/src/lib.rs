//! # Core Types
//!
//! This crate defines the fundamental types shared by every layer of Conduit.
//!
//! ## Philosophy
//!
//! - **Handles are names, not pointers**: A [`Handle`] is an opaque integer
//!   that only means something inside the handle table that issued it.
//! - **Readiness is data**: Every resource reports readiness as a
//!   [`SignalsState`] pair, so one wait primitive serves every resource kind.
//! - **No ambient namespaces**: Each handle table carries a [`SystemId`].
//!
//! ## Key Types
//!
//! - [`Handle`]: Opaque reference to a kernel resource
//! - [`Signals`]: Readiness bits (readable, writable, peer closed, thresholds)
//! - [`SignalsState`]: Satisfied/satisfiable signal pair
//! - [`SystemId`]: Identifier for a handle namespace

pub mod handle;
pub mod ids;
pub mod signals;

pub use handle::Handle;
pub use ids::SystemId;
pub use signals::{Signals, SignalsState};
