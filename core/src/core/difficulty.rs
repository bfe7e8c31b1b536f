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

//! Definition of the difficulty carried by headers, per context, and of the
//! cumulative total difficulty the head selection rule compares. Plain
//! value semantics: accumulating a total difficulty never mutates a stored
//! one.

use crate::ser::{self, Readable, Reader, Writeable, Writer};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// The difficulty is defined as the maximum target divided by the block
/// hash. Wide enough that summing per-block difficulties over any realistic
/// chain cannot overflow.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Difficulty {
	num: u128,
}

impl Difficulty {
	/// Difficulty of zero, the sentinel carried by nil pending headers.
	pub fn zero() -> Difficulty {
		Difficulty { num: 0 }
	}

	/// Convert a `u128` into a `Difficulty`
	pub fn from_num(num: u128) -> Difficulty {
		Difficulty { num }
	}

	/// Converts the difficulty into a plain number
	pub fn to_num(self) -> u128 {
		self.num
	}

	/// Whether this difficulty is zero.
	pub fn is_zero(self) -> bool {
		self.num == 0
	}
}

impl fmt::Display for Difficulty {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.num)
	}
}

impl Add<Difficulty> for Difficulty {
	type Output = Difficulty;
	fn add(self, other: Difficulty) -> Difficulty {
		Difficulty {
			num: self.num + other.num,
		}
	}
}

impl AddAssign for Difficulty {
	fn add_assign(&mut self, other: Difficulty) {
		self.num += other.num;
	}
}

impl Sum for Difficulty {
	fn sum<I: Iterator<Item = Difficulty>>(iter: I) -> Difficulty {
		iter.fold(Difficulty::zero(), |a, b| a + b)
	}
}

impl Writeable for Difficulty {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u64((self.num >> 64) as u64)?;
		writer.write_u64(self.num as u64)
	}
}

impl Readable for Difficulty {
	fn read<R: Reader>(reader: &mut R) -> Result<Difficulty, ser::Error> {
		let hi = reader.read_u64()?;
		let lo = reader.read_u64()?;
		Ok(Difficulty {
			num: (u128::from(hi) << 64) | u128::from(lo),
		})
	}
}

impl Serialize for Difficulty {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.num.to_string())
	}
}

impl<'de> Deserialize<'de> for Difficulty {
	fn deserialize<D>(deserializer: D) -> Result<Difficulty, D::Error>
	where
		D: Deserializer<'de>,
	{
		deserializer.deserialize_str(DiffVisitor)
	}
}

struct DiffVisitor;

impl<'de> de::Visitor<'de> for DiffVisitor {
	type Value = Difficulty;

	fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
		formatter.write_str("a difficulty")
	}

	fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
	where
		E: de::Error,
	{
		let num: u128 = s
			.parse()
			.map_err(|_| de::Error::invalid_value(de::Unexpected::Str(s), &"a decimal number"))?;
		Ok(Difficulty { num })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ser::{deserialize, ser_vec};

	#[test]
	fn accumulation_is_by_value() {
		let stored = Difficulty::from_num(100);
		let total = stored + Difficulty::from_num(1);
		assert_eq!(stored.to_num(), 100);
		assert_eq!(total.to_num(), 101);
	}

	#[test]
	fn ordering() {
		assert!(Difficulty::from_num(100) < Difficulty::from_num(101));
		assert!(Difficulty::zero() < Difficulty::from_num(1));
	}

	#[test]
	fn ser_round_trip() {
		let d = Difficulty::from_num(u128::from(u64::max_value()) + 42);
		let vec = ser_vec(&d).unwrap();
		assert_eq!(vec.len(), 16);
		let back: Difficulty = deserialize(&mut &vec[..]).unwrap();
		assert_eq!(back, d);
	}

	#[test]
	fn serde_as_decimal_string() {
		let d = Difficulty::from_num(12345);
		let json = serde_json::to_string(&d).unwrap();
		assert_eq!(json, "\"12345\"");
		let back: Difficulty = serde_json::from_str(&json).unwrap();
		assert_eq!(back, d);
	}
}
