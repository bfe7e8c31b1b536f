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

//! Termini vectors and pending headers, the cross-context bookkeeping that
//! rides along every appended block.

use crate::context::NUM_SUB_LOCATIONS;
use crate::core::difficulty::Difficulty;
use crate::core::hash::Hash;
use crate::core::header::Header;
use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// For each block, the most recent block hash observed in each of the three
/// sub-locations reachable from it, plus the last dominant-order ancestor.
/// Only ever written by the coincidence recursion check; plain copy
/// semantics keep the stored vector untouched while a working copy is
/// updated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Termini([Hash; NUM_SUB_LOCATIONS + 1]);

impl Termini {
	/// Builds a termini vector out of its four hashes, dominant last.
	pub fn new(termini: [Hash; NUM_SUB_LOCATIONS + 1]) -> Termini {
		Termini(termini)
	}

	/// The latest known block hash for the given 0-based sub-location slot.
	pub fn sub_terminus(&self, index: usize) -> Hash {
		self.0[index]
	}

	/// The last dominant-order ancestor shared by every sibling.
	pub fn dom_terminus(&self) -> Hash {
		self.0[NUM_SUB_LOCATIONS]
	}

	/// Records a new head for the given sub-location slot.
	pub fn set_sub_terminus(&mut self, index: usize, hash: Hash) {
		self.0[index] = hash;
	}

	/// Records a new dominant-order ancestor.
	pub fn set_dom_terminus(&mut self, hash: Hash) {
		self.0[NUM_SUB_LOCATIONS] = hash;
	}
}

impl Writeable for Termini {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		for hash in self.0.iter() {
			hash.write(writer)?;
		}
		Ok(())
	}
}

impl Readable for Termini {
	fn read<R: Reader>(reader: &mut R) -> Result<Termini, ser::Error> {
		Ok(Termini([
			Hash::read(reader)?,
			Hash::read(reader)?,
			Hash::read(reader)?,
			Hash::read(reader)?,
		]))
	}
}

/// A mined-on candidate: a header carrying fields from all three contexts,
/// the termini of the head it extends and the total difficulty at the
/// producing context. The default value is the nil pending header used to
/// pad or mark absent slots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingHeader {
	/// The assembled candidate header.
	pub header: Header,
	/// Termini of the head the candidate builds on.
	pub termini: Termini,
	/// Total difficulty at the producing context.
	pub td: Difficulty,
}

impl PendingHeader {
	/// Whether this is the nil pending header.
	pub fn is_nil(&self) -> bool {
		self.termini == Termini::default() && self.td.is_zero()
	}
}

impl Writeable for PendingHeader {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.header.write(writer)?;
		self.termini.write(writer)?;
		self.td.write(writer)
	}
}

impl Readable for PendingHeader {
	fn read<R: Reader>(reader: &mut R) -> Result<PendingHeader, ser::Error> {
		Ok(PendingHeader {
			header: Header::read(reader)?,
			termini: Termini::read(reader)?,
			td: Difficulty::read(reader)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ser::{deserialize, ser_vec};

	#[test]
	fn termini_accessors() {
		let mut termini = Termini::default();
		termini.set_sub_terminus(1, Hash([1; 32]));
		termini.set_dom_terminus(Hash([9; 32]));
		assert_eq!(termini.sub_terminus(0), Hash::default());
		assert_eq!(termini.sub_terminus(1), Hash([1; 32]));
		assert_eq!(termini.dom_terminus(), Hash([9; 32]));
	}

	#[test]
	fn termini_updates_copy_not_alias() {
		let stored = Termini::new([Hash([1; 32]); 4]);
		let mut working = stored;
		working.set_sub_terminus(0, Hash([2; 32]));
		working.set_dom_terminus(Hash([3; 32]));
		// the "stored" vector must keep its pre-update values
		assert_eq!(stored.sub_terminus(0), Hash([1; 32]));
		assert_eq!(stored.dom_terminus(), Hash([1; 32]));
	}

	#[test]
	fn nil_pending_header() {
		let nil = PendingHeader::default();
		assert!(nil.is_nil());
		assert!(nil.td.is_zero());

		let mut ph = PendingHeader::default();
		ph.td = Difficulty::from_num(1);
		assert!(!ph.is_nil());
	}

	#[test]
	fn pending_header_ser_round_trip() {
		let mut ph = PendingHeader::default();
		ph.td = Difficulty::from_num(77);
		ph.termini.set_dom_terminus(Hash([5; 32]));
		let vec = ser_vec(&ph).unwrap();
		let back: PendingHeader = deserialize(&mut &vec[..]).unwrap();
		assert_eq!(back, ph);
	}
}
