//! Live collection state, optionally partitioned per client fingerprint.
//!
//! The untouched snapshot taken at construction lives next to the working
//! copies. Each fingerprint key gets its own clone of the snapshot the first
//! time it is seen; nothing is ever evicted until [`CollectionSet::reset`].

use crate::Record;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Key used when fingerprinting is off or the client sent no identity.
pub const DEFAULT_FINGERPRINT: &str = "default";

/// Number of hex characters kept from the digest.
const FINGERPRINT_LEN: usize = 16;

/// Derive a fingerprint key from a client identity header value.
pub fn fingerprint(identity: Option<&str>) -> String {
    match identity {
        Some(value) if !value.is_empty() => {
            let digest = format!("{:x}", Sha256::digest(value.as_bytes()));
            digest[..FINGERPRINT_LEN].to_string()
        }
        _ => DEFAULT_FINGERPRINT.to_string(),
    }
}

/// Snapshot plus working collections.
#[derive(Debug, Clone)]
pub struct CollectionSet {
    original: Vec<Record>,
    live: HashMap<String, Vec<Record>>,
}

impl CollectionSet {
    /// Take ownership of the initial collection and snapshot it.
    pub fn new(collection: Vec<Record>) -> Self {
        let original = collection.clone();
        let mut live = HashMap::new();
        live.insert(DEFAULT_FINGERPRINT.to_string(), collection);
        Self { original, live }
    }

    /// The snapshot taken at construction.
    pub fn original(&self) -> &[Record] {
        &self.original
    }

    /// Working collection for a key, if it has been created.
    pub fn get(&self, key: &str) -> Option<&[Record]> {
        self.live.get(key).map(Vec::as_slice)
    }

    /// Working collection for a key, cloned from the snapshot on first use.
    pub fn working_mut(&mut self, key: &str) -> &mut Vec<Record> {
        if !self.live.contains_key(key) {
            tracing::debug!(fingerprint = %key, "Creating collection for new fingerprint");
        }
        self.live
            .entry(key.to_string())
            .or_insert_with(|| self.original.clone())
    }

    /// Number of working collections currently held.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Always false; the default collection exists from construction.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Drop every working copy and restore the default one from the snapshot.
    pub fn reset(&mut self) {
        self.live.clear();
        self.live
            .insert(DEFAULT_FINGERPRINT.to_string(), self.original.clone());
    }
}
