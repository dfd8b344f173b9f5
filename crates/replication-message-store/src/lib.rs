//! Durable storage of outbound replication messages.
//!
//! A message is written once, with the instances it still has to reach, by the
//! persist stage of the sender pipeline. Each successful delivery removes one
//! target; the record disappears with its last target. On startup every
//! remaining record is loaded back so delivery resumes where it stopped.
//!
//! # Invariant
//!
//! A record exists on disk if and only if at least one of its targets has not
//! yet been sent the message.
//!
//! ```ignore
//! let store = SqliteMessageStore::open(&paths.database_file())?;
//! let record = store.write_record(&message, &targets)?;
//! store.remove_target(&message.id, &targets[0])?;
//! ```

mod error;
mod migrations;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use sqlite::SqliteMessageStore;
pub use store::{normalize_targets, MessageStore, StoredMessageRecord};
