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

//! Core types shared by every braid context: hashes, difficulties, the
//! triple-slotted headers and blocks, termini vectors, pending headers and
//! the binary serialization layer they persist through.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

extern crate blake2_rfc;
extern crate byteorder;
extern crate serde;
#[macro_use]
extern crate serde_derive;

pub mod context;
pub mod core;
pub mod ser;

pub use crate::context::{Context, Location};
