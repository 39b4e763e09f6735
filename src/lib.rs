//! An ergonomic, transport-agnostic implementation of the server side of the
//! [GDB Remote Serial Protocol](https://sourceware.org/gdb/onlinedocs/gdb/Remote-Protocol.html)
//! — the stub a `gdb` (or `gdb-multiarch`) client connects to when debugging
//! a remote target.
//!
//! The crate is the protocol engine only: it owns packet framing and
//! checksumming, command dispatch, target-description generation, and
//! `qSupported` feature negotiation. Everything else is a pluggable
//! collaborator supplied by the embedder:
//!
//! - the **transport** — anything that can move bytes implements
//!   [`conn::Connection`] (impls for `TcpStream`/`UnixStream` ship with the
//!   `std` feature);
//! - the **target** — a CPU core, emulator, or hypervisor vCPU implements
//!   [`target::Target`], opting into restart/kill/tracepoint support via
//!   extension traits and exposing its register file as a static descriptor
//!   table.
//!
//! A session is a [`stub::GdbStub`]: feed it a connection and a target, and
//! re-enter [`run`](stub::GdbStub::run) until it reports a disconnect. The
//! receive loop is single-threaded and cooperative; the only suspension
//! points are the transport's `poll`/`read`/`write_all`, and the 0x03
//! out-of-band interrupt is the only cancellation signal.
//!
//! ## Features
//!
//! - `std` (default): `Connection` impls for common transport types, and
//!   `std::error::Error` on the session error type.
//!
//! The crate is `#![no_std]` without it (an allocator is still required;
//! packet and reply buffers may be caller-supplied via the builder to keep
//! large allocations out of the heap's way).

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(all(feature = "std", unix), feature(unix_socket_peek))]

extern crate alloc;

pub mod common;
pub mod conn;
pub mod monitor;
pub mod stub;
pub mod target;

mod protocol;
mod tdesc;
mod util;

pub use crate::stub::Error;
pub use crate::stub::GdbStub;
pub use crate::stub::GdbStubBuilder;
pub use crate::stub::RunExit;
