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

//! Blocks and block headers. A braid header carries one group of chain
//! fields per context, laid out as a fixed array of per-context slots
//! indexed by `Context`, plus the scalar timestamp and location.

use crate::context::{Context, Location, NUM_CONTEXTS};
use crate::core::difficulty::Difficulty;
use crate::core::hash::{DefaultHashable, Hash, Hashed};
use crate::ser::{self, Readable, Reader, Writeable, Writer};
use std::fmt;

/// Miner / fee recipient address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Address(pub [u8; 20]);

impl AsRef<[u8]> for Address {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl Writeable for Address {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_fixed_bytes(self)
	}
}

impl Readable for Address {
	fn read<R: Reader>(reader: &mut R) -> Result<Address, ser::Error> {
		let v = reader.read_fixed_bytes(20)?;
		let mut a = [0; 20];
		a.copy_from_slice(&v);
		Ok(Address(a))
	}
}

/// 2048-bit log bloom filter.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Bloom(pub [u8; 256]);

impl Default for Bloom {
	fn default() -> Bloom {
		Bloom([0; 256])
	}
}

impl fmt::Debug for Bloom {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Bloom({:02x}{:02x}{:02x}{:02x}..)",
			self.0[0], self.0[1], self.0[2], self.0[3]
		)
	}
}

impl AsRef<[u8]> for Bloom {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl Writeable for Bloom {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_fixed_bytes(self)
	}
}

impl Readable for Bloom {
	fn read<R: Reader>(reader: &mut R) -> Result<Bloom, ser::Error> {
		let v = reader.read_fixed_bytes(256)?;
		let mut b = [0; 256];
		b.copy_from_slice(&v);
		Ok(Bloom(b))
	}
}

/// The group of header fields belonging to a single context. Headers carry
/// one slot per context so that the same block can be appended at every
/// level of the hierarchy it satisfies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderSlot {
	/// Hash of the previous block at this context.
	pub parent_hash: Hash,
	/// Block height at this context.
	pub number: u64,
	/// Difficulty the block satisfies at this context.
	pub difficulty: Difficulty,
	/// Difficulty target advertised by the network at this context.
	pub network_difficulty: Difficulty,
	/// Hash of the uncle set.
	pub uncle_hash: Hash,
	/// State root after execution.
	pub root: Hash,
	/// Root of the transaction set.
	pub tx_hash: Hash,
	/// Root of the receipt set.
	pub receipt_hash: Hash,
	/// Log bloom over the receipts.
	pub bloom: Bloom,
	/// Recipient of the block reward.
	pub coinbase: Address,
	/// Base fee per unit of gas.
	pub base_fee: u64,
	/// Gas ceiling of the block.
	pub gas_limit: u64,
	/// Gas spent by the block.
	pub gas_used: u64,
	/// Arbitrary extra data.
	pub extra: Vec<u8>,
}

impl Writeable for HeaderSlot {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.parent_hash.write(writer)?;
		writer.write_u64(self.number)?;
		self.difficulty.write(writer)?;
		self.network_difficulty.write(writer)?;
		self.uncle_hash.write(writer)?;
		self.root.write(writer)?;
		self.tx_hash.write(writer)?;
		self.receipt_hash.write(writer)?;
		self.bloom.write(writer)?;
		self.coinbase.write(writer)?;
		writer.write_u64(self.base_fee)?;
		writer.write_u64(self.gas_limit)?;
		writer.write_u64(self.gas_used)?;
		writer.write_bytes(&self.extra)
	}
}

impl Readable for HeaderSlot {
	fn read<R: Reader>(reader: &mut R) -> Result<HeaderSlot, ser::Error> {
		Ok(HeaderSlot {
			parent_hash: Hash::read(reader)?,
			number: reader.read_u64()?,
			difficulty: Difficulty::read(reader)?,
			network_difficulty: Difficulty::read(reader)?,
			uncle_hash: Hash::read(reader)?,
			root: Hash::read(reader)?,
			tx_hash: Hash::read(reader)?,
			receipt_hash: Hash::read(reader)?,
			bloom: Bloom::read(reader)?,
			coinbase: Address::read(reader)?,
			base_fee: reader.read_u64()?,
			gas_limit: reader.read_u64()?,
			gas_used: reader.read_u64()?,
			extra: reader.read_bytes_len_prefix()?,
		})
	}
}

/// A block header, immutable once hashed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
	/// Per-context field groups, indexed by `Context`.
	pub slots: [HeaderSlot; NUM_CONTEXTS],
	/// Scalar block timestamp, unix seconds.
	pub time: u64,
	/// The (region, zone) pair the block belongs to.
	pub location: Location,
}

impl Header {
	/// The field group for the given context.
	pub fn slot(&self, ctx: Context) -> &HeaderSlot {
		&self.slots[ctx as usize]
	}

	/// Mutable access to the field group for the given context.
	pub fn slot_mut(&mut self, ctx: Context) -> &mut HeaderSlot {
		&mut self.slots[ctx as usize]
	}

	/// Parent hash at the given context.
	pub fn parent_hash(&self, ctx: Context) -> Hash {
		self.slot(ctx).parent_hash
	}

	/// Block height at the given context.
	pub fn number(&self, ctx: Context) -> u64 {
		self.slot(ctx).number
	}

	/// Difficulty at the given context.
	pub fn difficulty(&self, ctx: Context) -> Difficulty {
		self.slot(ctx).difficulty
	}
}

impl Writeable for Header {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		for slot in self.slots.iter() {
			slot.write(writer)?;
		}
		writer.write_u64(self.time)?;
		self.location.write(writer)
	}
}

impl Readable for Header {
	fn read<R: Reader>(reader: &mut R) -> Result<Header, ser::Error> {
		let slots = [
			HeaderSlot::read(reader)?,
			HeaderSlot::read(reader)?,
			HeaderSlot::read(reader)?,
		];
		Ok(Header {
			slots,
			time: reader.read_u64()?,
			location: Location::read(reader)?,
		})
	}
}

impl DefaultHashable for Header {}

/// An opaque transaction payload. Execution semantics live entirely with
/// the transaction pool and worker collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction(pub Vec<u8>);

impl Writeable for Transaction {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_bytes(&self.0)
	}
}

impl Readable for Transaction {
	fn read<R: Reader>(reader: &mut R) -> Result<Transaction, ser::Error> {
		Ok(Transaction(reader.read_bytes_len_prefix()?))
	}
}

/// A block body: the transactions committed to by the header's tx roots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body {
	/// Transactions included in the block.
	pub transactions: Vec<Transaction>,
}

impl Writeable for Body {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u64(self.transactions.len() as u64)?;
		for tx in self.transactions.iter() {
			tx.write(writer)?;
		}
		Ok(())
	}
}

impl Readable for Body {
	fn read<R: Reader>(reader: &mut R) -> Result<Body, ser::Error> {
		let len = reader.read_u64()?;
		if len > 1_000_000 {
			return Err(ser::Error::TooLargeReadErr(format!(
				"transaction count too large: {}",
				len
			)));
		}
		let mut transactions = Vec::with_capacity(len as usize);
		for _ in 0..len {
			transactions.push(Transaction::read(reader)?);
		}
		Ok(Body { transactions })
	}
}

/// A full block: a header plus the body it commits to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
	/// The block header.
	pub header: Header,
	/// The block body.
	pub body: Body,
}

impl Block {
	/// The block hash, which is the hash of its header.
	pub fn hash(&self) -> Hash {
		self.header.hash()
	}

	/// Block height at the given context.
	pub fn number(&self, ctx: Context) -> u64 {
		self.header.number(ctx)
	}

	/// The block timestamp.
	pub fn time(&self) -> u64 {
		self.header.time
	}
}

impl Writeable for Block {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.header.write(writer)?;
		self.body.write(writer)
	}
}

impl Readable for Block {
	fn read<R: Reader>(reader: &mut R) -> Result<Block, ser::Error> {
		Ok(Block {
			header: Header::read(reader)?,
			body: Body::read(reader)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ser::{deserialize, ser_vec};

	fn sample_header() -> Header {
		let mut header = Header::default();
		header.time = 1_700_000_000;
		header.location = Location::new(1, 2);
		for (i, slot) in header.slots.iter_mut().enumerate() {
			slot.number = i as u64 + 5;
			slot.difficulty = Difficulty::from_num(1000 + i as u128);
			slot.parent_hash = Hash([i as u8 + 1; 32]);
			slot.extra = vec![i as u8; 3];
		}
		header
	}

	#[test]
	fn header_ser_round_trip() {
		let header = sample_header();
		let vec = ser_vec(&header).unwrap();
		let back: Header = deserialize(&mut &vec[..]).unwrap();
		assert_eq!(back, header);
		assert_eq!(back.hash(), header.hash());
	}

	#[test]
	fn hash_commits_to_every_slot() {
		let header = sample_header();
		let mut tweaked = header.clone();
		tweaked.slot_mut(Context::Zone).gas_used = 1;
		assert_ne!(header.hash(), tweaked.hash());

		let mut tweaked = header.clone();
		tweaked.time += 1;
		assert_ne!(header.hash(), tweaked.hash());

		let mut tweaked = header;
		tweaked.location = Location::new(2, 2);
		assert_ne!(tweaked.hash(), sample_header().hash());
	}

	#[test]
	fn block_ser_round_trip() {
		let block = Block {
			header: sample_header(),
			body: Body {
				transactions: vec![Transaction(vec![1, 2, 3]), Transaction(vec![])],
			},
		};
		let vec = ser_vec(&block).unwrap();
		let back: Block = deserialize(&mut &vec[..]).unwrap();
		assert_eq!(back, block);
		assert_eq!(back.hash(), block.header.hash());
	}
}
