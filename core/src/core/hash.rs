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

//! Hash Function
//!
//! Primary hash function used in the protocol: blake2b-256 over the
//! canonical binary serialization of a type.

use crate::ser::{self, Readable, Reader, Writeable, Writer};
use blake2_rfc::blake2b::Blake2b;
use serde::de;
use std::fmt;

/// A hash to uniquely (or close enough) identify one of the main blockchain
/// constructs. Used pervasively for blocks and headers.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash, Default)]
pub struct Hash(pub [u8; 32]);

/// The "zero" hash, marking absent dominant termini and unset parents.
pub const ZERO_HASH: Hash = Hash([0; 32]);

impl Hash {
	/// Creates a new hash from a vector, which must hold at least 32 bytes.
	pub fn from_vec(v: &[u8]) -> Hash {
		let mut h = [0; 32];
		h.copy_from_slice(&v[0..32]);
		Hash(h)
	}

	/// Converts the hash to a byte vector
	pub fn to_vec(&self) -> Vec<u8> {
		self.0.to_vec()
	}

	/// Whether this is the zero hash.
	pub fn is_zero(&self) -> bool {
		*self == ZERO_HASH
	}

	/// Hex representation of the hash.
	pub fn to_hex(&self) -> String {
		let mut s = String::with_capacity(64);
		for byte in self.0.iter() {
			s.push_str(&format!("{:02x}", byte));
		}
		s
	}

	/// Parses a 64 character hex string back into a hash.
	pub fn from_hex(hex: &str) -> Result<Hash, ser::Error> {
		if hex.len() != 64 {
			return Err(ser::Error::CorruptedData);
		}
		let mut h = [0; 32];
		for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
			let s = std::str::from_utf8(chunk).map_err(|_| ser::Error::CorruptedData)?;
			h[i] = u8::from_str_radix(s, 16).map_err(|_| ser::Error::CorruptedData)?;
		}
		Ok(Hash(h))
	}
}

impl fmt::Display for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// abbreviated for logs, the full hex lives in serialization
		for byte in self.0[..6].iter() {
			write!(f, "{:02x}", byte)?;
		}
		Ok(())
	}
}

impl AsRef<[u8]> for Hash {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl Writeable for Hash {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_fixed_bytes(self)
	}
}

impl Readable for Hash {
	fn read<R: Reader>(reader: &mut R) -> Result<Hash, ser::Error> {
		let v = reader.read_fixed_bytes(32)?;
		Ok(Hash::from_vec(&v))
	}
}

impl serde::Serialize for Hash {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> serde::Deserialize<'de> for Hash {
	fn deserialize<D>(deserializer: D) -> Result<Hash, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		deserializer.deserialize_str(HashVisitor)
	}
}

struct HashVisitor;

impl<'de> de::Visitor<'de> for HashVisitor {
	type Value = Hash;

	fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
		formatter.write_str("a 64 character hex string")
	}

	fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
	where
		E: de::Error,
	{
		Hash::from_hex(s).map_err(|_| de::Error::invalid_value(de::Unexpected::Str(s), &self))
	}
}

/// Serializer that outputs a hash of the serialized object
pub struct HashWriter {
	state: Blake2b,
}

impl HashWriter {
	/// Consume the `HashWriter`, outputting its current hash into a 32-byte
	/// array
	pub fn finalize(self, output: &mut [u8]) {
		output.copy_from_slice(self.state.finalize().as_bytes());
	}
}

impl Default for HashWriter {
	fn default() -> HashWriter {
		HashWriter {
			state: Blake2b::new(32),
		}
	}
}

impl Writer for HashWriter {
	fn write_fixed_bytes<T: AsRef<[u8]>>(&mut self, bytes: T) -> Result<(), ser::Error> {
		self.state.update(bytes.as_ref());
		Ok(())
	}
}

/// A trait for types that have a canonical hash
pub trait Hashed {
	/// Obtain the hash of the object
	fn hash(&self) -> Hash;
}

/// Implementing this trait means the type gets its hash from its canonical
/// `Writeable` byte serialization.
pub trait DefaultHashable: Writeable {}

impl<D: DefaultHashable> Hashed for D {
	fn hash(&self) -> Hash {
		let mut hasher = HashWriter::default();
		Writeable::write(self, &mut hasher).unwrap();
		let mut ret = [0; 32];
		hasher.finalize(&mut ret);
		Hash(ret)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hex_round_trip() {
		let mut h = [0; 32];
		h[0] = 0xab;
		h[31] = 0x01;
		let hash = Hash(h);
		assert_eq!(Hash::from_hex(&hash.to_hex()).unwrap(), hash);
		assert!(Hash::from_hex("deadbeef").is_err());
	}

	#[test]
	fn hashes_commit_to_content() {
		impl DefaultHashable for u64 {}
		impl Writeable for u64 {
			fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
				writer.write_u64(*self)
			}
		}
		assert_eq!(1u64.hash(), 1u64.hash());
		assert_ne!(1u64.hash(), 2u64.hash());
	}

	#[test]
	fn serde_as_hex() {
		let hash = Hash([7; 32]);
		let json = serde_json::to_string(&hash).unwrap();
		assert_eq!(json, format!("\"{}\"", hash.to_hex()));
		let back: Hash = serde_json::from_str(&json).unwrap();
		assert_eq!(back, hash);
	}
}
