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

//! Error types for the slice coordinator.

use crate::core::ser;
use failure::{Backtrace, Context, Fail};
use std::fmt::{self, Display};

/// Error definition
#[derive(Debug)]
pub struct Error {
	inner: Context<ErrorKind>,
}

/// Slice error definitions
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	/// The block's parent (or its total difficulty) is not known yet. The
	/// only error recovered locally, by parking the block for later.
	#[fail(display = "Future block: parent unknown")]
	FutureBlock,
	/// The dominant context's terminus claim disagrees with the stored
	/// termini of the block's parent. The block's ancestry diverges from
	/// the dominant view and must be rejected.
	#[fail(display = "Termini do not match, block rejected due to twist with dom")]
	TerminusTwist,
	/// A header or configuration carries a location byte that has no slot
	/// at the current context.
	#[fail(display = "Invalid location for context")]
	InvalidLocation,
	/// Internal issue when trying to save or load data from store
	#[fail(display = "Store error: {}", _0)]
	StoreErr(String),
	/// The downward append to a subordinate slice could not be issued.
	#[fail(display = "Sub append error: {}", _0)]
	SubAppend(String),
	/// Failure dialing or calling a peer slice.
	#[fail(display = "Peer error: {}", _0)]
	PeerErr(String),
	/// The worker could not produce a candidate pending header.
	#[fail(display = "Worker error: {}", _0)]
	WorkerErr(String),
	/// Anything else
	#[fail(display = "Other error: {}", _0)]
	Other(String),
}

impl Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.inner, f)
	}
}

impl Error {
	/// get kind
	pub fn kind(&self) -> ErrorKind {
		self.inner.get_context().clone()
	}
	/// get cause
	pub fn cause(&self) -> Option<&dyn Fail> {
		self.inner.cause()
	}
	/// get backtrace
	pub fn backtrace(&self) -> Option<&Backtrace> {
		self.inner.backtrace()
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Error {
		Error {
			inner: Context::new(kind),
		}
	}
}

impl From<Context<ErrorKind>> for Error {
	fn from(inner: Context<ErrorKind>) -> Error {
		Error { inner }
	}
}

impl From<ser::Error> for Error {
	fn from(error: ser::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::StoreErr(format!("{}", error))),
		}
	}
}
