//! Trade route resolution.
//!
//! [`RouteResolver`] decides which market(s) connect two tokens, in order of
//! precedence:
//!
//! 1. static wormhole/native one-to-one markets ([`WormholeNativeTable`]);
//! 2. deterministic sollet/wormhole bridge markets ([`derive_bridge_market`]);
//! 3. direct or transitive quote-currency markets from the
//!    [`crate::client::RouteTable`].

mod registry;
mod resolver;
mod wormhole;

pub use registry::*;
pub use resolver::*;
pub use wormhole::*;
