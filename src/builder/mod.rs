//! Request-side planning input
//!
//! Parses and validates what a client sends for a collection field. The
//! output of this module is plain data; turning it into SQL is the job of
//! [`crate::ast`].

mod connection;
mod cursor;
mod filter;
mod order_by;

pub use connection::*;
pub use cursor::*;
pub use filter::*;
pub use order_by::*;
