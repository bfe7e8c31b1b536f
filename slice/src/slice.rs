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

//! Facade and coordinator for one chain context. Owns the append pipeline,
//! the pending header cache, the future block pool and the peer clients
//! above and below, and serialises every state mutation behind a single
//! append lock.

use crate::core::core::{
	Block, Body, Difficulty, Hash, Hashed, Header, PendingHeader, ZERO_HASH,
};
use crate::core::context::NUM_SUB_LOCATIONS;
use crate::core::Context;
use crate::error::{Error, ErrorKind};
use crate::pipe::{self, AppendContext};
use crate::store::{KvBackend, SliceStore};
use crate::types::{DomClient, Engine, HeaderChain, PeerClient, PeerDialer, SliceConfig, Worker};
use chrono::Utc;
use lru_cache::LruCache;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

/// Maximum number of blocks parked while their parent is unknown.
pub const MAX_FUTURE_BLOCKS: usize = 256;

/// Horizon in seconds past which a block is too far in the future to park.
pub const MAX_TIME_FUTURE_BLOCKS: u64 = 30;

/// Bound on the per-location pending header cache.
pub const PENDING_HEADER_LIMIT: usize = 10;

/// How often parked future blocks are fed back into the append pipeline.
const FUTURE_BLOCKS_INTERVAL: Duration = Duration::from_secs(3);

/// How many reinjection rounds a parked block survives before it is
/// considered permanently orphaned and dropped.
const FUTURE_BLOCK_RETRY_BUDGET: u32 = 100;

/// Startup debounce before publishing a genesis-parented pending header at
/// PRIME.
const GENESIS_PUBLISH_DELAY: Duration = Duration::from_secs(10);

struct FutureBlock {
	block: Block,
	attempts: u32,
}

/// Bounded pool of blocks whose parent is not yet known, reinjected into
/// the append pipeline by the ticker until they connect, exhaust their
/// retry budget or fall off the LRU.
struct FutureBlockPool {
	blocks: Mutex<LruCache<Hash, FutureBlock>>,
}

impl FutureBlockPool {
	fn new() -> FutureBlockPool {
		FutureBlockPool {
			blocks: Mutex::new(LruCache::new(MAX_FUTURE_BLOCKS)),
		}
	}

	fn contains(&self, hash: &Hash) -> bool {
		let mut blocks = self.blocks.lock().unwrap();
		blocks.contains_key(hash)
	}

	fn insert(&self, block: Block) {
		let mut blocks = self.blocks.lock().unwrap();
		blocks.insert(block.hash(), FutureBlock { block, attempts: 0 });
	}

	fn remove(&self, hash: &Hash) {
		let mut blocks = self.blocks.lock().unwrap();
		blocks.remove(hash);
	}

	fn len(&self) -> usize {
		let blocks = self.blocks.lock().unwrap();
		blocks.len()
	}

	fn snapshot(&self) -> Vec<Block> {
		let blocks = self.blocks.lock().unwrap();
		blocks.iter().map(|(_, fb)| fb.block.clone()).collect()
	}

	/// Bumps the retry counter, returning the new count.
	fn bump_attempts(&self, hash: &Hash) -> u32 {
		let mut blocks = self.blocks.lock().unwrap();
		match blocks.get_mut(hash) {
			Some(fb) => {
				fb.attempts += 1;
				fb.attempts
			}
			None => 0,
		}
	}
}

/// Slice state mutated under the append lock.
struct SliceState {
	/// The current local pending header and its termini.
	pending_header: PendingHeader,
	/// Recent pending headers per location key, ascending by total
	/// difficulty.
	ph_cache: HashMap<u64, Vec<PendingHeader>>,
	/// Connection state of the dominant peer.
	dom: DomClient,
}

impl SliceState {
	/// Files the pending header under its location key and returns the
	/// best (highest total difficulty) candidate for that location. The
	/// cache stays sorted ascending and bounded: past the limit the
	/// smallest entry is blanked out with the nil pending header and
	/// dropped from the front.
	fn sort_and_get_best(&mut self, ph: PendingHeader) -> PendingHeader {
		let key = ph.header.location.cache_key();
		let entries = self.ph_cache.entry(key).or_insert_with(Vec::new);
		entries.push(ph);
		entries.sort_by(|a, b| a.td.cmp(&b.td));
		if entries.len() > PENDING_HEADER_LIMIT {
			entries[0] = PendingHeader::default();
			entries.remove(0);
		}
		entries.last().cloned().unwrap_or_else(PendingHeader::default)
	}
}

/// Coordinator for one chain context. Appends blocks under a single
/// exclusive lock, recursing into the subordinate slice below and
/// assembling the multi-context pending header that flows back up.
pub struct Slice {
	config: SliceConfig,
	hc: Arc<dyn HeaderChain>,
	engine: Arc<dyn Engine>,
	worker: Arc<dyn Worker>,
	dialer: Arc<dyn PeerDialer>,
	store: SliceStore,
	sub_clients: Vec<Option<Arc<dyn PeerClient>>>,
	state: Arc<RwLock<SliceState>>,
	future_blocks: FutureBlockPool,
	stop: Arc<AtomicBool>,
}

impl Slice {
	/// Builds a slice over the given collaborators, dials its peers and
	/// starts its background loops. Subordinate clients are dialed
	/// synchronously; the dominant client is dialed on its own thread and
	/// published through the dom state machine, with the ZONE startup
	/// announce wired to dial completion.
	pub fn new(
		db: Arc<dyn KvBackend>,
		config: SliceConfig,
		hc: Arc<dyn HeaderChain>,
		engine: Arc<dyn Engine>,
		worker: Arc<dyn Worker>,
		dialer: Arc<dyn PeerDialer>,
	) -> Result<Arc<Slice>, Error> {
		let mut sub_clients: Vec<Option<Arc<dyn PeerClient>>> = vec![None; NUM_SUB_LOCATIONS];
		if !config.context.is_leaf() {
			for (i, url) in config.sub_urls.iter().enumerate().take(NUM_SUB_LOCATIONS) {
				if url.is_empty() {
					warn!("slice: empty sub client url at index {}", i);
					continue;
				}
				sub_clients[i] = Some(dialer.dial(url)?);
			}
		}

		let store = SliceStore::new(db);

		// the pending header we would mine on after a restart: the one
		// persisted for the current head's parent, else the genesis anchor
		let current = hc.current_header();
		let parent = current.parent_hash(config.context);
		let startup_header = match store.read_pending_header(&parent)? {
			Some(header) => header,
			None => hc.genesis_header(),
		};

		let slice = Arc::new(Slice {
			config,
			hc,
			engine,
			worker,
			dialer,
			store,
			sub_clients,
			state: Arc::new(RwLock::new(SliceState {
				pending_header: PendingHeader::default(),
				ph_cache: HashMap::new(),
				dom: DomClient::Disconnected,
			})),
			future_blocks: FutureBlockPool::new(),
			stop: Arc::new(AtomicBool::new(false)),
		});

		if !slice.config.context.is_root() {
			let startup = if slice.config.context.is_leaf() {
				Some(startup_header)
			} else {
				None
			};
			slice.spawn_dom_dial(startup);
		}

		let sl = slice.clone();
		let _ = thread::Builder::new()
			.name("future_blocks".to_string())
			.spawn(move || Slice::update_future_blocks(sl));

		Ok(slice)
	}

	/// Entry point for blocks originating at this context (local miner or
	/// node front end). Runs the append pipeline with no dominant claim,
	/// parks the block when its parent is unknown, and routes the produced
	/// pending header through the per-location cache, returning the best
	/// candidate for the block's location.
	pub fn slice_append(&self, block: Block) -> Result<PendingHeader, Error> {
		let ph = match self.append(&block, ZERO_HASH, Difficulty::zero(), false, true) {
			Ok(ph) => ph,
			Err(e) => {
				if e.kind() == ErrorKind::FutureBlock {
					if let Err(add) = self.add_future_block(&block) {
						debug!("slice: not parking block {}: {}", block.hash(), add);
					}
				}
				return Err(e);
			}
		};

		let mut state = self.state.write().unwrap();
		Ok(state.sort_and_get_best(ph))
	}

	/// The append pipeline. Under the exclusive append lock: runs the
	/// coincidence recursion check, persists the block, accumulates total
	/// difficulty, applies the head rule, recurses into the subordinate
	/// slice, assembles the multi-context pending header and publishes it
	/// (persisted and fed to the miner at PRIME, forwarded to the dominant
	/// peer elsewhere). Any failing step aborts the pipeline; nothing is
	/// published for a block that did not fully commit.
	pub fn append(
		&self,
		block: &Block,
		dom_terminus: Hash,
		td: Difficulty,
		dom_reorg: bool,
		origin: bool,
	) -> Result<PendingHeader, Error> {
		let mut state = self.state.write().unwrap();
		self.append_locked(&mut state, block, dom_terminus, td, dom_reorg, origin)
	}

	fn append_locked(
		&self,
		state: &mut SliceState,
		block: &Block,
		dom_terminus: Hash,
		td: Difficulty,
		dom_reorg: bool,
		origin: bool,
	) -> Result<PendingHeader, Error> {
		let context = self.config.context;
		let actx = AppendContext {
			config: &self.config,
			hc: self.hc.as_ref(),
			engine: self.engine.as_ref(),
			worker: self.worker.as_ref(),
		};

		let local_terminus = pipe::pcrc(&actx, &block.header, dom_terminus)?;

		self.hc.append(block)?;

		let td = if origin {
			pipe::calc_td(&actx, &block.header)?
		} else {
			td
		};
		let mut td_triple = [Difficulty::zero(); 3];
		td_triple[context as usize] = td;
		self.hc
			.write_td(&block.hash(), block.number(context), td_triple)?;

		// the head decision made here is also the one the subordinate
		// follows; below the origin the dominant context has already decided
		let reorg = if origin {
			pipe::hlcr(&actx, td)
		} else {
			dom_reorg
		};

		let local_ph = pipe::set_header_chain_head(&actx, &block.header, td, reorg)?;
		state.pending_header = local_ph.clone();
		let mut assembled = local_ph.header.clone();

		if let Some(sub_context) = context.sub() {
			let index = block
				.header
				.location
				.terminus_index(context)
				.ok_or(ErrorKind::InvalidLocation)?;
			let sub_client = self
				.sub_clients
				.get(index)
				.and_then(|client| client.clone())
				.ok_or_else(|| {
					ErrorKind::SubAppend(format!("no subordinate client at index {}", index))
				})?;
			let sub_ph = sub_client.append(block, local_terminus, td, reorg, false)?;
			assembled = pipe::combine_pending_header(&local_ph.header, sub_ph.header, sub_context);
		}

		if context.is_root() {
			self.store.write_pending_header(&block.hash(), &assembled)?;
			self.worker.publish_pending_header(assembled.clone());
		} else {
			match state.dom.client() {
				Some(dom) => {
					if let Err(e) = dom.send_pending_header(&assembled, local_terminus) {
						warn!("slice: failed to forward pending header to dom: {}", e);
					}
				}
				None => warn!("slice: dom client not ready, pending header not forwarded"),
			}
		}

		debug!(
			"slice: appended block {} at {} in {}",
			block.hash(),
			block.number(context),
			context,
		);

		Ok(PendingHeader {
			header: assembled,
			termini: state.pending_header.termini,
			td: state.pending_header.td,
		})
	}

	/// Handles a pending header pushed up by a subordinate slice. Stale
	/// updates, whose terminus claim no longer matches our pending termini
	/// for that sub-location, are dropped. Otherwise our own context slot
	/// is combined in and the result is published at PRIME or forwarded
	/// further up with our dominant terminus. A genesis-parented header
	/// marks the startup handshake: PRIME debounces its publication,
	/// REGION re-dials its dominant client and replays the announce.
	pub fn receive_pending_header(&self, header: Header, terminus: Hash) -> Result<(), Error> {
		let context = self.config.context;
		let (combined, dom, dom_terminus) = {
			let state = self.state.read().unwrap();
			let index = header
				.location
				.terminus_index(context)
				.ok_or(ErrorKind::InvalidLocation)?;
			if state.pending_header.termini.sub_terminus(index) != terminus {
				info!("slice: stale pending header update from sub {}", header.location);
				return Ok(());
			}
			let combined =
				pipe::combine_pending_header(&state.pending_header.header, header, context);
			(
				combined,
				state.dom.client(),
				state.pending_header.termini.dom_terminus(),
			)
		};

		if context.is_root() {
			if combined.parent_hash(context) == self.config.genesis_hash() {
				self.schedule_genesis_publish(combined);
			} else {
				self.worker.publish_pending_header(combined);
			}
		} else if combined.parent_hash(context) == self.config.genesis_hash() {
			// once-per-start edge: replay the dom handshake
			self.spawn_dom_dial(Some(combined));
		} else {
			match dom {
				Some(dom) => {
					if let Err(e) = dom.send_pending_header(&combined, dom_terminus) {
						warn!("slice: failed to forward pending header to dom: {}", e);
					}
				}
				None => warn!("slice: dom client not ready, pending header not forwarded"),
			}
		}
		Ok(())
	}

	/// Parks a block whose parent is not yet known, provided its timestamp
	/// is within the accepted future horizon and its seal verifies. The
	/// pool is a bounded resource, so the cheap checks run before a slot
	/// is taken.
	pub fn add_future_block(&self, block: &Block) -> Result<(), Error> {
		let max = Utc::now().timestamp() as u64 + MAX_TIME_FUTURE_BLOCKS;
		if block.time() > max {
			return Err(ErrorKind::Other(format!(
				"future block timestamp {} > allowed {}",
				block.time(),
				max
			))
			.into());
		}
		self.engine.verify_seal(&block.header)?;
		if !self.future_blocks.contains(&block.hash()) {
			self.future_blocks.insert(block.clone());
		}
		Ok(())
	}

	/// Whether the given hash is parked in the future block pool.
	pub fn is_future_block(&self, hash: &Hash) -> bool {
		self.future_blocks.contains(hash)
	}

	/// Number of blocks currently parked.
	pub fn future_block_count(&self) -> usize {
		self.future_blocks.len()
	}

	/// Reinjects parked blocks into the append pipeline, lowest height
	/// first so contiguous ancestries connect in order. Connected blocks
	/// and terminally failing ones leave the pool; still-orphaned blocks
	/// stay until their retry budget runs out.
	fn proc_future_blocks(&self) {
		let mut blocks = self.future_blocks.snapshot();
		if blocks.is_empty() {
			return;
		}
		let context = self.config.context;
		blocks.sort_by_key(|b| b.number(context));

		for block in blocks {
			let hash = block.hash();
			match self.append(&block, ZERO_HASH, Difficulty::zero(), false, true) {
				Ok(_) => self.future_blocks.remove(&hash),
				Err(e) => {
					if e.kind() == ErrorKind::FutureBlock {
						let attempts = self.future_blocks.bump_attempts(&hash);
						if attempts >= FUTURE_BLOCK_RETRY_BUDGET {
							warn!(
								"slice: dropping orphaned future block {} after {} rounds",
								hash, attempts,
							);
							self.future_blocks.remove(&hash);
						}
					} else {
						debug!("slice: dropping future block {}: {}", hash, e);
						self.future_blocks.remove(&hash);
					}
				}
			}
		}
	}

	/// The ticker loop feeding parked blocks back into the pipeline.
	fn update_future_blocks(slice: Arc<Slice>) {
		while !slice.stop.load(Ordering::Relaxed) {
			thread::sleep(FUTURE_BLOCKS_INTERVAL);
			if slice.stop.load(Ordering::Relaxed) {
				break;
			}
			slice.proc_future_blocks();
		}
	}

	/// Drives the dom client state machine through a dial on its own
	/// thread. When a startup header is supplied the announce handshake
	/// runs on completion.
	fn spawn_dom_dial(&self, startup: Option<Header>) {
		{
			let mut state = self.state.write().unwrap();
			if let DomClient::Dialing = state.dom {
				return;
			}
			state.dom = DomClient::Dialing;
		}

		let dialer = self.dialer.clone();
		let config = self.config.clone();
		let state = self.state.clone();
		let hc = self.hc.clone();
		let engine = self.engine.clone();
		let worker = self.worker.clone();
		let _ = thread::Builder::new()
			.name("dom_dial".to_string())
			.spawn(move || match dialer.dial(&config.dom_url) {
				Ok(client) => {
					{
						let mut state = state.write().unwrap();
						state.dom = DomClient::Ready(client.clone());
					}
					if let Some(header) = startup {
						announce_to_dom(
							&config,
							hc.as_ref(),
							engine.as_ref(),
							worker.as_ref(),
							&state,
							client.as_ref(),
							&header,
						);
					}
				}
				Err(e) => {
					warn!("slice: failed to dial dom at {}: {}", config.dom_url, e);
					state.write().unwrap().dom = DomClient::Disconnected;
				}
			});
	}

	/// Publishes a genesis-parented pending header after the startup
	/// debounce, on a scheduler thread of its own.
	fn schedule_genesis_publish(&self, header: Header) {
		let worker = self.worker.clone();
		let stop = self.stop.clone();
		let _ = thread::Builder::new()
			.name("genesis_debounce".to_string())
			.spawn(move || {
				thread::sleep(GENESIS_PUBLISH_DELAY);
				if !stop.load(Ordering::Relaxed) {
					worker.publish_pending_header(header);
				}
			});
	}

	/// Hash of the current head of this context's chain.
	pub fn head_hash(&self) -> Hash {
		self.hc.current_header().hash()
	}

	/// A snapshot of the current local pending header.
	pub fn pending_header(&self) -> PendingHeader {
		self.state.read().unwrap().pending_header.clone()
	}

	/// Whether the dominant client state machine reached `Ready`.
	pub fn is_dom_ready(&self) -> bool {
		self.state.read().unwrap().dom.is_ready()
	}

	/// The pending block body stored for the given header hash.
	pub fn pending_block_body(&self, hash: &Hash) -> Result<Option<Body>, Error> {
		self.store.read_pending_block_body(hash)
	}

	/// This slice's configuration.
	pub fn config(&self) -> &SliceConfig {
		&self.config
	}

	/// Stops the background loops. Blocks parked at this point stay
	/// parked; a restart re-seeds from the header chain.
	pub fn stop(&self) {
		self.stop.store(true, Ordering::Relaxed);
	}
}

impl Drop for Slice {
	fn drop(&mut self) {
		self.stop();
	}
}

/// The dom handshake run when the dial completes: ZONE rebuilds its local
/// pending header on the startup anchor and announces it upward with its
/// genesis terminus; REGION forwards its current pending header the same
/// way; PRIME has nothing above it.
fn announce_to_dom(
	config: &SliceConfig,
	hc: &dyn HeaderChain,
	engine: &dyn Engine,
	worker: &dyn Worker,
	state: &RwLock<SliceState>,
	dom: &dyn PeerClient,
	startup: &Header,
) {
	let genesis = config.genesis_hash();
	match config.context {
		Context::Zone => {
			let actx = AppendContext {
				config,
				hc,
				engine,
				worker,
			};
			let td = hc
				.td_by_hash(&startup.hash())
				.map(|td| td[config.context as usize])
				.unwrap_or_else(Difficulty::zero);
			match pipe::set_header_chain_head(&actx, startup, td, true) {
				Ok(ph) => {
					let header = ph.header.clone();
					state.write().unwrap().pending_header = ph;
					if let Err(e) = dom.send_pending_header(&header, genesis) {
						warn!("slice: startup announce to dom failed: {}", e);
					}
				}
				Err(e) => warn!("slice: startup pending header failed: {}", e),
			}
		}
		Context::Region => {
			let header = state.read().unwrap().pending_header.header.clone();
			if let Err(e) = dom.send_pending_header(&header, genesis) {
				warn!("slice: startup announce to dom failed: {}", e);
			}
		}
		Context::Prime => (),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::core::Location;

	fn ph_at(location: Location, td: u128) -> PendingHeader {
		let mut ph = PendingHeader::default();
		ph.header.location = location;
		ph.td = Difficulty::from_num(td);
		ph
	}

	fn empty_state() -> SliceState {
		SliceState {
			pending_header: PendingHeader::default(),
			ph_cache: HashMap::new(),
			dom: DomClient::Disconnected,
		}
	}

	#[test]
	fn cache_returns_highest_td() {
		let mut state = empty_state();
		let loc = Location::new(1, 1);
		assert_eq!(state.sort_and_get_best(ph_at(loc, 3)).td.to_num(), 3);
		assert_eq!(state.sort_and_get_best(ph_at(loc, 9)).td.to_num(), 9);
		// a lower candidate does not displace the best
		assert_eq!(state.sort_and_get_best(ph_at(loc, 5)).td.to_num(), 9);
	}

	#[test]
	fn cache_is_bounded_and_evicts_smallest() {
		let mut state = empty_state();
		let loc = Location::new(1, 1);
		for td in 1..=10 {
			state.sort_and_get_best(ph_at(loc, td));
		}
		// cache now holds tds 1..10; a mid-range push evicts td=1
		let best = state.sort_and_get_best(ph_at(loc, 5));
		assert_eq!(best.td.to_num(), 10);

		let entries = &state.ph_cache[&loc.cache_key()];
		assert_eq!(entries.len(), PENDING_HEADER_LIMIT);
		assert_eq!(entries[0].td.to_num(), 2);
		assert!(entries.windows(2).all(|w| w[0].td <= w[1].td));
		assert!(!entries.iter().any(|ph| ph.td.to_num() == 1));
	}

	#[test]
	fn cache_keys_by_location() {
		let mut state = empty_state();
		let one = Location::new(1, 1);
		let two = Location::new(1, 2);
		state.sort_and_get_best(ph_at(one, 100));
		// a different zone keeps its own optimum
		assert_eq!(state.sort_and_get_best(ph_at(two, 7)).td.to_num(), 7);
		assert_eq!(state.sort_and_get_best(ph_at(one, 1)).td.to_num(), 100);
	}
}
