//! Storage contract and built-in credential stores.
//!
//! A store holds at most one [`CredentialPair`]. The gateway reads it before every dispatch and
//! writes it only inside the recovery protocol, so implementations are synchronous and must not
//! block on I/O for long.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::CredentialPair};

/// Storage backend contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the active credential pair, if any.
	fn get(&self) -> Result<Option<CredentialPair>, StoreError>;

	/// Atomically replaces the active credential pair.
	fn set(&self, pair: CredentialPair) -> Result<(), StoreError>;

	/// Removes the active credential pair.
	fn clear(&self) -> Result<(), StoreError>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
