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


use self::slice_test_helper::*;
use braid_core as core;
use braid_slice as slice;

use self::core::core::{Difficulty, Hash, Hashed};
use self::core::{Context, Location};
use self::slice::store::SliceStore;
use self::slice::types::{HeaderChain, PeerClient};
use self::slice::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

/// A block received at PRIME flows down through REGION into ZONE, every
/// context commits it, and the pending header assembled on the way back up
/// is persisted under the block hash and fed to the miner.
#[test]
fn append_recurses_through_all_contexts() {
	let genesis = genesis();
	let location = Location::new(1, 1);

	let zone_dom = Arc::new(MailboxPeer::new());
	let zone = build_slice(
		Context::Zone,
		location,
		&genesis,
		Some(zone_dom.clone() as Arc<dyn PeerClient>),
		vec![],
		b"zone",
	);
	// let the startup handshake finish before driving appends
	assert!(wait_until(
		|| zone_dom.sent_count() >= 1,
		Duration::from_secs(5)
	));

	let region_dom = Arc::new(MailboxPeer::new());
	let region = build_slice(
		Context::Region,
		location,
		&genesis,
		Some(region_dom.clone() as Arc<dyn PeerClient>),
		vec![Arc::new(LoopbackClient::new(zone.slice.clone())) as Arc<dyn PeerClient>],
		b"region",
	);
	assert!(wait_until(
		|| region.slice.is_dom_ready(),
		Duration::from_secs(5)
	));

	let prime = build_slice(
		Context::Prime,
		location,
		&genesis,
		None,
		vec![Arc::new(LoopbackClient::new(region.slice.clone())) as Arc<dyn PeerClient>],
		b"prime",
	);

	let b1 = make_child(&genesis, location, 10, now());
	let b1_hash = b1.hash();
	let best = prime.slice.slice_append(b1.clone()).unwrap();

	// every context committed the block and now points its sub-location
	// terminus at it
	for ts in [&prime, &region, &zone].iter() {
		assert!(ts.hc.contains(&b1_hash));
		let termini = ts.hc.termini_by_hash(&b1_hash).unwrap();
		assert_eq!(termini.sub_terminus(0), b1_hash);
		assert_eq!(termini.dom_terminus(), genesis.hash());
	}

	// every context switched its head to the new block
	assert_eq!(prime.hc.current_header().hash(), b1_hash);
	assert_eq!(region.hc.current_header().hash(), b1_hash);
	assert_eq!(zone.hc.current_header().hash(), b1_hash);

	// the assembled pending header is persisted at PRIME under the block
	// hash and fed to the local miner
	let store = SliceStore::new(prime.db.clone());
	let persisted = store.read_pending_header(&b1_hash).unwrap().unwrap();
	let published = prime.worker.published();
	assert_eq!(published.len(), 1);
	assert_eq!(published[0], persisted);

	// each slot of the assembled header comes from the context the overlay
	// rule assigns it to: the zone candidate is the base, then REGION
	// overlays its zone slot, then PRIME overlays its region slot
	assert_eq!(persisted.slot(Context::Prime).extra, b"zone".to_vec());
	assert_eq!(persisted.slot(Context::Region).extra, b"prime".to_vec());
	assert_eq!(persisted.slot(Context::Zone).extra, b"region".to_vec());

	// REGION forwarded its assembled header up with its pre-append local
	// terminus
	assert!(region_dom.sent_count() >= 1);
	let (_, terminus) = region_dom.sent().pop().unwrap();
	assert_eq!(terminus, genesis.hash());

	// the best candidate returned for the location carries the termini and
	// total difficulty of the new PRIME head
	assert_eq!(best.td, Difficulty::from_num(10));
	assert_eq!(best.termini.sub_terminus(0), b1_hash);
}

/// A nonzero dominant terminus claim that disagrees with the stored parent
/// termini rejects the block before anything is persisted.
#[test]
fn terminus_twist_rejects_block() {
	let genesis = genesis();
	let location = Location::new(1, 1);
	let sub = Arc::new(MailboxPeer::new());
	let region = build_slice(
		Context::Region,
		location,
		&genesis,
		None,
		vec![sub.clone() as Arc<dyn PeerClient>],
		b"region",
	);

	let b1 = make_child(&genesis, location, 10, now());
	let twisted = Hash([0xee; 32]);
	let err = region
		.slice
		.append(&b1, twisted, Difficulty::from_num(10), false, false)
		.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::TerminusTwist);

	// no termini written, header chain untouched, nothing forwarded down
	assert!(!region.hc.contains(&b1.hash()));
	assert_eq!(region.hc.termini_by_hash(&b1.hash()), None);
	assert!(sub.appended().is_empty());
}

/// A parent of dominant order becomes the dominant terminus of its
/// children.
#[test]
fn dominant_order_parent_becomes_dom_terminus() {
	let genesis = genesis();
	let location = Location::new(1, 1);
	let zone = build_slice(Context::Zone, location, &genesis, None, vec![], b"zone");

	let b1 = make_child(&genesis, location, 5, now());
	zone.slice.slice_append(b1.clone()).unwrap();

	// b1 satisfies REGION difficulty, so blocks on top of it root their
	// dominant terminus at b1
	zone.engine.set_order(b1.hash(), Context::Region);
	let b2 = make_child(&b1.header, location, 5, now());
	zone.slice.slice_append(b2.clone()).unwrap();

	let termini = zone.hc.termini_by_hash(&b2.hash()).unwrap();
	assert_eq!(termini.sub_terminus(0), b2.hash());
	assert_eq!(termini.dom_terminus(), b1.hash());

	// ... while a ZONE-order parent leaves the dominant terminus alone
	let b3 = make_child(&b2.header, location, 5, now());
	zone.slice.slice_append(b3.clone()).unwrap();
	let termini = zone.hc.termini_by_hash(&b3.hash()).unwrap();
	assert_eq!(termini.dom_terminus(), b1.hash());
}

/// Appending the same block twice surfaces the header chain's duplicate
/// error unchanged.
#[test]
fn duplicate_append_surfaces_store_error() {
	let genesis = genesis();
	let location = Location::new(1, 1);
	let zone = build_slice(Context::Zone, location, &genesis, None, vec![], b"zone");

	let b1 = make_child(&genesis, location, 5, now());
	zone.slice.slice_append(b1.clone()).unwrap();
	let err = zone.slice.slice_append(b1).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Other("duplicate block".to_string()));
}
