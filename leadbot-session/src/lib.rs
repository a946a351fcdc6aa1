//! # leadbot-session
//!
//! Lead records and conversation history for leadbot.
//!
//! - [`LeadStore`] - tenant-scoped persistence trait
//! - [`InMemoryLeadStore`] - process-local store for development and tests
//! - `PgLeadStore` - PostgreSQL store (feature `postgres`)

pub mod error;
pub mod inmemory;
pub mod lead;
pub mod message;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;

pub use error::{Result, SessionError};
pub use inmemory::InMemoryLeadStore;
pub use lead::{Lead, LeadStatus, TimelineEvent};
pub use message::{MessageRole, NewMessage, StoredMessage};
#[cfg(feature = "postgres")]
pub use postgres::PgLeadStore;
pub use store::LeadStore;
