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

//! Base types the slice coordinator requires: the interfaces of its
//! external collaborators, the slice configuration and the dominant client
//! state machine.

use crate::core::core::{Block, Difficulty, Hash, Header, PendingHeader, Termini};
use crate::core::{Context, Location};
use crate::error::Error;
use std::sync::Arc;

/// Access to the canonical header chain owned by the surrounding node. The
/// header chain persists committed headers and bodies and owns termini and
/// total difficulty storage.
pub trait HeaderChain: Send + Sync {
	/// Persists the header and body of the given block.
	fn append(&self, block: &Block) -> Result<(), Error>;

	/// Committed header for the given hash, if known.
	fn header_by_hash(&self, hash: &Hash) -> Option<Header>;

	/// Stored termini for the given block hash, if known.
	fn termini_by_hash(&self, hash: &Hash) -> Option<Termini>;

	/// Persists the termini computed for the given block hash.
	fn write_termini(&self, hash: &Hash, termini: Termini) -> Result<(), Error>;

	/// The current head of this context's chain.
	fn current_header(&self) -> Header;

	/// Switches the current head to the given header.
	fn set_current_header(&self, header: &Header) -> Result<(), Error>;

	/// Total difficulty triple stored for the block at the given hash and
	/// height, if known.
	fn td(&self, hash: &Hash, number: u64) -> Option<[Difficulty; 3]>;

	/// Total difficulty triple stored for the given block hash, if known.
	fn td_by_hash(&self, hash: &Hash) -> Option<[Difficulty; 3]>;

	/// Persists the total difficulty triple for the given block. The array
	/// shape is kept for wire compatibility, only the current context's
	/// slot carries a meaningful value.
	fn write_td(&self, hash: &Hash, number: u64, td: [Difficulty; 3]) -> Result<(), Error>;

	/// The genesis header anchoring this context's chain.
	fn genesis_header(&self) -> Header;
}

/// Consensus engine hooks the slice relies on.
pub trait Engine: Send + Sync {
	/// The highest (lowest-numbered) context whose difficulty the header
	/// satisfies.
	fn difficulty_order(&self, header: &Header) -> Result<Context, Error>;

	/// Verifies the proof of work carried by the header.
	fn verify_seal(&self, header: &Header) -> Result<(), Error>;
}

/// Candidate production and mining feed of the local miner's worker.
pub trait Worker: Send + Sync {
	/// Produces a fresh candidate pending header on top of the given parent.
	fn generate_pending_header(&self, parent: &Header) -> Result<Header, Error>;

	/// Hands a fully assembled pending header to the local mining loop.
	fn publish_pending_header(&self, header: Header);
}

/// RPC surface of a dominant or subordinate peer slice.
pub trait PeerClient: Send + Sync {
	/// Appends a block into the peer slice. Synchronous request/response;
	/// the returned pending header is the peer's fully assembled candidate.
	fn append(
		&self,
		block: &Block,
		dom_terminus: Hash,
		td: Difficulty,
		dom_reorg: bool,
		origin: bool,
	) -> Result<PendingHeader, Error>;

	/// Forwards an assembled pending header up to the peer, fire-and-forward.
	/// Implementations must not block on the receiving slice's processing:
	/// the caller may still hold its own append lock.
	fn send_pending_header(&self, header: &Header, terminus: Hash) -> Result<(), Error>;
}

/// Dials peer slices. Supplied by the surrounding process, which owns the
/// actual transport.
pub trait PeerDialer: Send + Sync {
	/// Establishes a client for the slice at the given url.
	fn dial(&self, url: &str) -> Result<Arc<dyn PeerClient>, Error>;
}

/// Connection state of the dominant peer client. The client is dialed on a
/// separate thread at startup and, once per start, re-dialed on the genesis
/// handshake edge; modeling the states explicitly keeps readers of the
/// pointer honest about both.
#[derive(Clone)]
pub enum DomClient {
	/// No dominant client available.
	Disconnected,
	/// A dial is in flight.
	Dialing,
	/// The dominant client is usable.
	Ready(Arc<dyn PeerClient>),
}

impl DomClient {
	/// The usable client, if the state machine reached `Ready`.
	pub fn client(&self) -> Option<Arc<dyn PeerClient>> {
		match self {
			DomClient::Ready(client) => Some(client.clone()),
			_ => None,
		}
	}

	/// Whether the dominant client is usable.
	pub fn is_ready(&self) -> bool {
		match self {
			DomClient::Ready(_) => true,
			_ => false,
		}
	}
}

/// Configuration of a slice instance, supplied at construction by the
/// surrounding process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceConfig {
	/// The context this process occupies, fixed for its lifetime.
	pub context: Context,
	/// The location this slice serves.
	pub location: Location,
	/// Per-context genesis hashes.
	pub genesis_hashes: [Hash; 3],
	/// Url of the dominant slice, empty at PRIME.
	pub dom_url: String,
	/// Urls of the subordinate slices, empty at ZONE, indexed by
	/// sub-location.
	pub sub_urls: Vec<String>,
}

impl SliceConfig {
	/// The genesis hash at this slice's own context.
	pub fn genesis_hash(&self) -> Hash {
		self.genesis_hashes[self.context as usize]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn config_serde_round_trip() {
		let config = SliceConfig {
			context: Context::Region,
			location: Location::new(1, 2),
			genesis_hashes: [Hash([1; 32]), Hash([2; 32]), Hash([3; 32])],
			dom_url: "http://127.0.0.1:8545".to_owned(),
			sub_urls: vec!["http://127.0.0.1:8546".to_owned()],
		};
		let json = serde_json::to_string(&config).unwrap();
		let back: SliceConfig = serde_json::from_str(&json).unwrap();
		assert_eq!(back.context, Context::Region);
		assert_eq!(back.location, config.location);
		assert_eq!(back.genesis_hash(), Hash([2; 32]));
		assert_eq!(back.dom_url, config.dom_url);
	}
}
