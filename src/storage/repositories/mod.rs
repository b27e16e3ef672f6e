//! Repository modules for data access
//!
//! Each repository is a stateless handle. Every method takes the caller's
//! connection so that several repository calls can share one transaction.

pub mod session;
pub mod user;

pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
