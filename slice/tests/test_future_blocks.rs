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

use self::core::core::Hashed;
use self::core::{Context, Location};
use self::slice::types::HeaderChain;
use self::slice::{ErrorKind, MAX_TIME_FUTURE_BLOCKS};
use std::time::Duration;

/// A block arriving before its parent is parked and reprocessed by the
/// ticker once the parent connects.
#[test]
fn parked_block_connects_on_tick() {
	let genesis = genesis();
	let location = Location::new(1, 1);
	let zone = build_slice(Context::Zone, location, &genesis, None, vec![], b"zone");

	let b1 = make_child(&genesis, location, 5, now());
	let b2 = make_child(&b1.header, location, 5, now());

	// b2 first: parent unknown, parked
	let err = zone.slice.slice_append(b2.clone()).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::FutureBlock);
	assert!(zone.slice.is_future_block(&b2.hash()));
	assert_eq!(zone.slice.future_block_count(), 1);

	// connect the parent, then wait for the reinjection tick
	zone.slice.slice_append(b1.clone()).unwrap();
	assert!(wait_until(
		|| !zone.slice.is_future_block(&b2.hash()),
		Duration::from_secs(10)
	));
	assert!(wait_until(
		|| zone.hc.current_header().hash() == b2.hash(),
		Duration::from_secs(10)
	));
	assert!(zone.hc.termini_by_hash(&b2.hash()).is_some());
}

/// Blocks timestamped past the future horizon are rejected outright and
/// never parked.
#[test]
fn too_far_future_blocks_are_not_parked() {
	let genesis = genesis();
	let location = Location::new(1, 1);
	let zone = build_slice(Context::Zone, location, &genesis, None, vec![], b"zone");

	let unknown_parent = make_child(&genesis, location, 1, now());
	let mut far = make_child(&unknown_parent.header, location, 5, now());
	far.header.time = now() + MAX_TIME_FUTURE_BLOCKS + 60;

	let err = zone.slice.slice_append(far.clone()).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::FutureBlock);
	assert!(!zone.slice.is_future_block(&far.hash()));
	assert_eq!(zone.slice.future_block_count(), 0);

	// rejected by the explicit entry point as well
	assert!(zone.slice.add_future_block(&far).is_err());
}

/// A block whose seal does not verify never takes a slot in the pool.
#[test]
fn invalid_seal_is_not_parked() {
	let genesis = genesis();
	let location = Location::new(1, 1);
	let zone = build_slice(Context::Zone, location, &genesis, None, vec![], b"zone");
	zone.engine.set_seal_valid(false);

	let orphan_parent = make_child(&genesis, location, 2, now());
	let orphan = make_child(&orphan_parent.header, location, 2, now());
	assert!(zone.slice.add_future_block(&orphan).is_err());
	assert_eq!(zone.slice.future_block_count(), 0);
}

/// Parking the same block twice keeps a single entry.
#[test]
fn parking_deduplicates_by_hash() {
	let genesis = genesis();
	let location = Location::new(1, 1);
	let zone = build_slice(Context::Zone, location, &genesis, None, vec![], b"zone");

	let orphan_parent = make_child(&genesis, location, 9, now());
	let orphan = make_child(&orphan_parent.header, location, 9, now());
	zone.slice.add_future_block(&orphan).unwrap();
	zone.slice.add_future_block(&orphan).unwrap();
	assert_eq!(zone.slice.future_block_count(), 1);
}
