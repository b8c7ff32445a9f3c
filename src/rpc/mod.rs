//! Line-delimited JSON RPC over a Unix domain socket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          RpcServer                           │
//! │   accept loop ──spawn──▶ Session (one task per connection)   │
//! │                                                              │
//! │   ┌────────────┐    ┌─────────────┐    ┌───────────────┐     │
//! │   │ Connection │───▶│ LineDecoder │───▶│  Dispatcher   │     │
//! │   │ read/write │    │  (framing)  │    │ (MethodTable) │     │
//! │   └────────────┘    └─────────────┘    └───────────────┘     │
//! │          ▲                                     │             │
//! │          └──────────── Envelope ◀──────────────┘             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each request line produces exactly one response line on the same
//! connection, in arrival order.

pub mod codec;
pub mod dispatch;
pub mod methods;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use codec::LineDecoder;
pub use dispatch::Dispatcher;
pub use methods::{Binding, InvocationError, MethodEntry, MethodTable};
pub use protocol::{Envelope, ErrorEnvelope, Request, ResultType, SuccessEnvelope};
pub use server::{serve, RpcServer};
pub use session::{Session, SessionState};
pub use transport::Connection;
