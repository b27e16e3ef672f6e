//! Domain layer
//!
//! Identifier types shared by the user directory and the session store.

pub mod id;

pub use id::{SessionId, UserId};
