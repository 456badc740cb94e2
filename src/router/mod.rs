//! Request router
//!
//! Protocol-agnostic request routing state machine, shared by the HTTP/1.1,
//! HTTPS, and HTTP/3 listeners.

pub mod state_machine;

pub use state_machine::{route, ForwardInstruction, RedirectInstruction, RouteContext, RouteOutcome};
