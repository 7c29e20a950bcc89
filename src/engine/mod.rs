//! Engine modules: the state machine that runs an installer.
//!
//! The engine sits between the parsed configuration and the caller. It owns
//! the layered state and decides which step comes next.

pub mod installer;
pub mod layers;
