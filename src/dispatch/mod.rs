//! Inbound message handling.
//!
//! Every message goes through [`DISPATCH_ORDER`]: the reaction handler
//! observes it, the command handler may consume it, and whatever is left is
//! offered to auto-join.

mod autojoin;
mod reaction;
mod router;

pub use autojoin::AutoJoinHandler;
pub use reaction::ReactionHandler;
pub use router::{DISPATCH_ORDER, Dispatcher, Stage};
