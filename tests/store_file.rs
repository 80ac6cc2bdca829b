// std
use std::{
	fs,
	path::{Path, PathBuf},
	sync::atomic::{AtomicUsize, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};
// self
use session_gateway::{
	auth::CredentialPair,
	store::{CredentialStore, FileStore, StoreError},
};

static NEXT_SCRATCH: AtomicUsize = AtomicUsize::new(0);

/// Unique directory under the system temp dir, removed on drop even when an assertion fails.
struct ScratchDir(PathBuf);
impl ScratchDir {
	fn new() -> Self {
		let nanos = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.expect("System clock should be after the epoch.")
			.as_nanos();
		let seq = NEXT_SCRATCH.fetch_add(1, Ordering::Relaxed);
		let name = format!("session-gateway-{}-{nanos}-{seq}", std::process::id());

		Self(std::env::temp_dir().join(name))
	}

	fn file(&self, name: &str) -> PathBuf {
		self.0.join(name)
	}

	fn path(&self) -> &Path {
		&self.0
	}
}
impl Drop for ScratchDir {
	fn drop(&mut self) {
		let _ = fs::remove_dir_all(&self.0);
	}
}

#[test]
fn credentials_survive_reopening() {
	let scratch = ScratchDir::new();
	let path = scratch.file("credentials.json");
	let store = FileStore::open(&path).expect("Store should open on a fresh path.");

	assert_eq!(store.get().expect("Read should succeed."), None);

	let pair = CredentialPair::with_refresh("access-1", "refresh-1");

	store.set(pair.clone()).expect("Write should succeed.");

	assert!(path.exists());

	let reopened = FileStore::open(&path).expect("Store should reopen.");

	assert_eq!(reopened.get().expect("Read should succeed."), Some(pair));

	let rotated = CredentialPair::with_refresh("access-2", "refresh-2");

	reopened.set(rotated.clone()).expect("Replacement should succeed.");

	let reopened = FileStore::open(&path).expect("Store should reopen again.");

	assert_eq!(reopened.get().expect("Read should succeed."), Some(rotated));
}

#[test]
fn clear_removes_the_backing_file() {
	let scratch = ScratchDir::new();
	let path = scratch.file("credentials.json");
	let store = FileStore::open(&path).expect("Store should open.");

	store.set(CredentialPair::new("access-1", None)).expect("Write should succeed.");
	store.clear().expect("Clear should succeed.");

	assert!(!path.exists());
	assert_eq!(store.get().expect("Read should succeed."), None);

	store.clear().expect("Clearing an empty store is a no-op.");

	assert_eq!(FileStore::open(&path).expect("Store should reopen.").get().expect("Read."), None);
}

#[test]
fn failed_removal_keeps_memory_in_sync_with_the_file() {
	let scratch = ScratchDir::new();
	let path = scratch.file("credentials.json");
	let store = FileStore::open(&path).expect("Store should open.");
	let pair = CredentialPair::with_refresh("access-1", "refresh-1");

	store.set(pair.clone()).expect("Write should succeed.");

	// A directory at the store path makes file removal fail.
	fs::remove_file(&path).expect("Credential file should be removable.");
	fs::create_dir(&path).expect("Blocking directory should be created.");

	let err = store.clear().expect_err("Removal should fail while a directory blocks it.");

	assert!(matches!(err, StoreError::Backend { .. }));
	assert_eq!(store.get().expect("Read should succeed."), Some(pair));
}

#[test]
fn corrupted_file_is_reported_as_serialization_error() {
	let scratch = ScratchDir::new();
	let path = scratch.file("credentials.json");

	fs::create_dir_all(scratch.path()).expect("Scratch directory should be created.");
	fs::write(&path, b"{ not json").expect("Corrupted fixture should be written.");

	let err = FileStore::open(&path).expect_err("Corrupted file should fail to load.");

	assert!(matches!(err, StoreError::Serialization { .. }));
}
