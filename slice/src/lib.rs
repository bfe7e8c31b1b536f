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

//! The slice coordinator: appends blocks into one chain context while
//! coordinating with the dominant context above and the subordinate
//! contexts below, so that every accepted block preserves cross-context
//! ordering and yields a coherent multi-context pending header for mining.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

use braid_core as core;

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate failure_derive;

mod slice;
pub mod error;
pub mod pipe;
pub mod store;
pub mod types;

pub use crate::error::{Error, ErrorKind};
pub use crate::slice::{
	Slice, MAX_FUTURE_BLOCKS, MAX_TIME_FUTURE_BLOCKS, PENDING_HEADER_LIMIT,
};
