// self
use tokengate::{
	auth::{Realm, TokenPair, TokenSecret},
	store::{self, MemoryStore, TokenStore},
};

#[test]
fn set_get_remove_round_trip() {
	let store = MemoryStore::default();

	store
		.set("accessToken:user", &TokenSecret::new("access-1"))
		.expect("Saving a secret into memory store should succeed.");

	let fetched = store
		.get("accessToken:user")
		.expect("Reading from memory store should succeed.")
		.expect("Stored secret should remain present.");

	assert_eq!(fetched.expose(), "access-1");

	store.remove("accessToken:user").expect("Removing a secret should succeed.");
	store.remove("accessToken:user").expect("Removing an absent key should be a no-op.");

	assert!(store.get("accessToken:user").expect("Read should succeed.").is_none());
	assert!(store.is_empty());
}

#[test]
fn clones_share_the_same_backing_map() {
	let store = MemoryStore::default();
	let clone = store.clone();

	store::persist_pair(&store, &Realm::admin(), &TokenPair::new("a", "r"))
		.expect("Persisting a pair should succeed.");

	assert_eq!(clone.len(), 2);
	assert!(clone.contains("accessToken:admin"));
	assert!(clone.contains("refreshToken:admin"));
}

#[test]
fn refresh_rotation_replaces_both_secrets() {
	let store = MemoryStore::default();
	let realm = Realm::user();

	store::persist_pair(&store, &realm, &TokenPair::new("a-1", "r-1"))
		.expect("Initial pair should persist.");
	store::persist_pair(&store, &realm, &TokenPair::new("a-2", "r-2"))
		.expect("Rotated pair should persist.");

	assert_eq!(
		store::load_access_token(&store, &realm).expect("Read should succeed."),
		Some(TokenSecret::new("a-2"))
	);
	assert_eq!(
		store::load_refresh_token(&store, &realm).expect("Read should succeed."),
		Some(TokenSecret::new("r-2"))
	);
}
