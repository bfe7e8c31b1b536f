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

//! The fixed three-tier hierarchy every braid process lives in, and the
//! location coordinates identifying a zone within it.

use crate::ser::{self, Readable, Reader, Writeable, Writer};
use byteorder::{BigEndian, ByteOrder};
use std::fmt;

/// Number of chain contexts in the hierarchy.
pub const NUM_CONTEXTS: usize = 3;

/// Maximum number of sub-locations directly below any context.
pub const NUM_SUB_LOCATIONS: usize = 3;

/// One of the three chain contexts a process can occupy. A lower value is a
/// higher tier: PRIME dominates REGION, REGION dominates ZONE.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Context {
	/// The root context.
	Prime = 0,
	/// The middle context, dominated by PRIME.
	Region = 1,
	/// The leaf context, dominated by REGION.
	Zone = 2,
}

impl Context {
	/// Context for the given tier index, if any.
	pub fn from_index(index: usize) -> Option<Context> {
		match index {
			0 => Some(Context::Prime),
			1 => Some(Context::Region),
			2 => Some(Context::Zone),
			_ => None,
		}
	}

	/// The dominant context directly above this one, absent at PRIME.
	pub fn dom(self) -> Option<Context> {
		match self {
			Context::Prime => None,
			Context::Region => Some(Context::Prime),
			Context::Zone => Some(Context::Region),
		}
	}

	/// The subordinate context directly below this one, absent at ZONE.
	pub fn sub(self) -> Option<Context> {
		match self {
			Context::Prime => Some(Context::Region),
			Context::Region => Some(Context::Zone),
			Context::Zone => None,
		}
	}

	/// Whether this is the root of the hierarchy.
	pub fn is_root(self) -> bool {
		self == Context::Prime
	}

	/// Whether this is a leaf of the hierarchy.
	pub fn is_leaf(self) -> bool {
		self == Context::Zone
	}
}

impl fmt::Display for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			Context::Prime => f.write_str("prime"),
			Context::Region => f.write_str("region"),
			Context::Zone => f.write_str("zone"),
		}
	}
}

/// Coordinates of a slice in the hierarchy: a 1-based pair of byte indices,
/// region-in-prime first, zone-in-region second. The zero pair marks a
/// header that has not been stamped with a location yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location(pub [u8; 2]);

impl Location {
	/// Builds a location out of 1-based region and zone indices.
	pub fn new(region: u8, zone: u8) -> Location {
		Location([region, zone])
	}

	/// The 1-based region index within PRIME.
	pub fn region(&self) -> u8 {
		self.0[0]
	}

	/// The 1-based zone index within the region.
	pub fn zone(&self) -> u8 {
		self.0[1]
	}

	/// The 0-based termini (and sub client) slot this location occupies at
	/// the given context level: the region index at PRIME, the zone index
	/// below. None when the relevant byte is unset or out of range.
	pub fn terminus_index(&self, ctx: Context) -> Option<usize> {
		let byte = match ctx {
			Context::Prime => self.region(),
			Context::Region | Context::Zone => self.zone(),
		};
		if byte == 0 || byte as usize > NUM_SUB_LOCATIONS {
			return None;
		}
		Some(byte as usize - 1)
	}

	/// The 8-byte big-endian encoding of the location, used to key the
	/// pending header cache.
	pub fn cache_key(&self) -> u64 {
		let mut bytes = [0; 8];
		bytes[..2].copy_from_slice(&self.0);
		BigEndian::read_u64(&bytes)
	}
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}, {})", self.region(), self.zone())
	}
}

impl Writeable for Location {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_fixed_bytes(&self.0)
	}
}

impl Readable for Location {
	fn read<R: Reader>(reader: &mut R) -> Result<Location, ser::Error> {
		let bytes = reader.read_fixed_bytes(2)?;
		Ok(Location([bytes[0], bytes[1]]))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn context_navigation() {
		assert_eq!(Context::Prime.dom(), None);
		assert_eq!(Context::Prime.sub(), Some(Context::Region));
		assert_eq!(Context::Region.dom(), Some(Context::Prime));
		assert_eq!(Context::Region.sub(), Some(Context::Zone));
		assert_eq!(Context::Zone.dom(), Some(Context::Region));
		assert_eq!(Context::Zone.sub(), None);
		assert!(Context::Prime < Context::Zone);
	}

	#[test]
	fn terminus_indexing() {
		let loc = Location::new(2, 3);
		assert_eq!(loc.terminus_index(Context::Prime), Some(1));
		assert_eq!(loc.terminus_index(Context::Region), Some(2));
		assert_eq!(loc.terminus_index(Context::Zone), Some(2));

		// unset and out of range bytes have no slot
		assert_eq!(Location::default().terminus_index(Context::Prime), None);
		assert_eq!(Location::new(4, 1).terminus_index(Context::Prime), None);
	}

	#[test]
	fn cache_keys_are_location_unique() {
		let k11 = Location::new(1, 1).cache_key();
		let k12 = Location::new(1, 2).cache_key();
		let k21 = Location::new(2, 1).cache_key();
		assert_ne!(k11, k12);
		assert_ne!(k11, k21);
		assert_ne!(k12, k21);
		// big-endian: the location bytes land in the most significant slots
		assert_eq!(k11, 0x0101_0000_0000_0000);
	}
}
