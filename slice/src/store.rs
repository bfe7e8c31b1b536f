// Copyright 2025 The Braid Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Implements the storage primitives required by the slice: keyed
//! persistence of pending headers and pending block bodies over a simple
//! key-value backend supplied by the surrounding process.

use crate::core::core::{Body, Hash, Header};
use crate::core::ser::{self, Readable, Writeable};
use crate::error::{Error, ErrorKind};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const SEP: u8 = b':';

const PENDING_HEADER_PREFIX: u8 = b'P';
const PENDING_BODY_PREFIX: u8 = b'B';

/// Minimal key-value surface the slice needs from its database. The
/// production backend (an LMDB or RocksDB wrapper) is owned by the
/// surrounding process.
pub trait KvBackend: Send + Sync {
	/// Value stored under the given key, if any.
	fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

	/// Stores a value under the given key, overwriting any previous one.
	fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), Error>;

	/// Removes the value stored under the given key.
	fn delete(&self, key: &[u8]) -> Result<(), Error>;
}

/// An in-memory key-value backend, used in tests and light deployments.
pub struct MemBackend {
	map: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemBackend {
	/// Creates an empty in-memory backend.
	pub fn new() -> MemBackend {
		MemBackend {
			map: RwLock::new(HashMap::new()),
		}
	}
}

impl Default for MemBackend {
	fn default() -> MemBackend {
		MemBackend::new()
	}
}

impl KvBackend for MemBackend {
	fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
		let map = self.map.read().unwrap();
		Ok(map.get(key).cloned())
	}

	fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), Error> {
		let mut map = self.map.write().unwrap();
		map.insert(key.to_vec(), value);
		Ok(())
	}

	fn delete(&self, key: &[u8]) -> Result<(), Error> {
		let mut map = self.map.write().unwrap();
		map.remove(key);
		Ok(())
	}
}

/// An implementation of the slice persistence layer backed by a simple
/// key-value store.
pub struct SliceStore {
	db: Arc<dyn KvBackend>,
}

impl SliceStore {
	/// Creates a slice store over the given backend.
	pub fn new(db: Arc<dyn KvBackend>) -> SliceStore {
		SliceStore { db }
	}

	/// The pending header persisted for the given block hash.
	pub fn read_pending_header(&self, hash: &Hash) -> Result<Option<Header>, Error> {
		self.get_ser(&to_key(PENDING_HEADER_PREFIX, hash))
	}

	/// Persists the assembled pending header for the given block hash.
	/// Written only at PRIME, where assembly terminates.
	pub fn write_pending_header(&self, hash: &Hash, header: &Header) -> Result<(), Error> {
		self.put_ser(&to_key(PENDING_HEADER_PREFIX, hash), header)
	}

	/// The pending block body persisted for the given header hash.
	pub fn read_pending_block_body(&self, hash: &Hash) -> Result<Option<Body>, Error> {
		self.get_ser(&to_key(PENDING_BODY_PREFIX, hash))
	}

	/// Persists the pending block body for the given header hash.
	pub fn write_pending_block_body(&self, hash: &Hash, body: &Body) -> Result<(), Error> {
		self.put_ser(&to_key(PENDING_BODY_PREFIX, hash), body)
	}

	fn get_ser<T: Readable>(&self, key: &[u8]) -> Result<Option<T>, Error> {
		match self.db.get(key)? {
			Some(value) => {
				let thing = ser::deserialize(&mut &value[..])?;
				Ok(Some(thing))
			}
			None => Ok(None),
		}
	}

	fn put_ser<T: Writeable>(&self, key: &[u8], thing: &T) -> Result<(), Error> {
		let value =
			ser::ser_vec(thing).map_err(|e| ErrorKind::StoreErr(format!("ser: {}", e)))?;
		self.db.put(key, value)
	}
}

fn to_key(prefix: u8, hash: &Hash) -> Vec<u8> {
	let mut key = Vec::with_capacity(34);
	key.push(prefix);
	key.push(SEP);
	key.extend_from_slice(hash.as_ref());
	key
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::core::core::{Body, Transaction};

	#[test]
	fn pending_header_round_trip() {
		let store = SliceStore::new(Arc::new(MemBackend::new()));
		let hash = Hash([3; 32]);
		assert_eq!(store.read_pending_header(&hash).unwrap(), None);

		let mut header = Header::default();
		header.time = 99;
		store.write_pending_header(&hash, &header).unwrap();
		assert_eq!(store.read_pending_header(&hash).unwrap(), Some(header));
	}

	#[test]
	fn bodies_and_headers_do_not_collide() {
		let store = SliceStore::new(Arc::new(MemBackend::new()));
		let hash = Hash([4; 32]);
		let body = Body {
			transactions: vec![Transaction(vec![9, 9])],
		};
		store.write_pending_block_body(&hash, &body).unwrap();
		assert_eq!(store.read_pending_header(&hash).unwrap(), None);
		assert_eq!(store.read_pending_block_body(&hash).unwrap(), Some(body));
	}
}
