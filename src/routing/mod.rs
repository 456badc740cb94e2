//! Routing table
//!
//! Compiled vhost/mapping lookup structure, one instance per protocol.

pub mod table;

pub use table::{host_key, CompiledMapping, RoutingTable};
