//! Name-queue service
//!
//! Holds the names of people waiting to be verified. An RFID reader (or
//! anything else) enqueues names; the session daemon polls them:
//! - POST /enqueue/:name - Append a name
//! - GET /dequeue - Pop the oldest name, `{}` when empty
//! - GET /health - Health check
//!
//! Names live in memory only and are lost on restart.

mod fifo;
mod handlers;
mod routes;

pub use fifo::NameQueue;
pub use routes::create_router;
