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

//! Implementation of the individual rules of the block append pipeline:
//! the coincidence recursion check over termini, the cumulative-difficulty
//! head rule, total difficulty accumulation, head updates and pending
//! header assembly.

use crate::core::core::{Difficulty, Hash, Hashed, Header, PendingHeader, Termini, ZERO_HASH};
use crate::core::Context;
use crate::error::{Error, ErrorKind};
use crate::types::{Engine, HeaderChain, SliceConfig, Worker};
use chrono::Utc;

/// Contextual information required to process a new block: the slice
/// configuration and the collaborators the rules consult.
pub struct AppendContext<'a> {
	/// Configuration of the appending slice.
	pub config: &'a SliceConfig,
	/// The canonical header chain.
	pub hc: &'a dyn HeaderChain,
	/// The consensus engine.
	pub engine: &'a dyn Engine,
	/// The local miner's worker.
	pub worker: &'a dyn Worker,
}

/// The coincidence recursion check. Validates that the block's parent
/// termini are consistent with the dominant context's terminus claim,
/// computes and persists the block's own termini, and returns the parent's
/// pre-update local terminus for use as the dominant terminus of the
/// subordinate append that follows.
///
/// Fails with `FutureBlock` when the parent is unknown and `TerminusTwist`
/// when a nonzero dominant claim disagrees with the stored termini.
pub fn pcrc(ctx: &AppendContext<'_>, header: &Header, dom_terminus: Hash) -> Result<Hash, Error> {
	let context = ctx.config.context;
	let parent_hash = header.parent_hash(context);

	let termini = match ctx.hc.termini_by_hash(&parent_hash) {
		Some(termini) => termini,
		None => return Err(ErrorKind::FutureBlock.into()),
	};

	let index = header
		.location
		.terminus_index(context)
		.ok_or(ErrorKind::InvalidLocation)?;
	let local_terminus = termini.sub_terminus(index);

	if dom_terminus != ZERO_HASH && termini.dom_terminus() != dom_terminus {
		return Err(ErrorKind::TerminusTwist.into());
	}

	// working copy, the stored parent termini stay untouched
	let mut new_termini = termini;
	new_termini.set_sub_terminus(index, header.hash());

	// a dominant-order parent becomes the dominant terminus going forward
	let parent_header = match ctx.hc.header_by_hash(&parent_hash) {
		Some(parent) => parent,
		None => return Err(ErrorKind::FutureBlock.into()),
	};
	let parent_order = ctx.engine.difficulty_order(&parent_header)?;
	if (parent_order as usize) < (context as usize) {
		new_termini.set_dom_terminus(parent_hash);
	}

	ctx.hc.write_termini(&header.hash(), new_termini)?;

	Ok(local_terminus)
}

/// The cumulative-difficulty head rule: the head switches iff the incoming
/// total difficulty strictly exceeds the stored total difficulty of the
/// current head at the current context. An absent stored value reads as
/// zero so that the first block after genesis wins the comparison.
pub fn hlcr(ctx: &AppendContext<'_>, extern_td: Difficulty) -> bool {
	let context = ctx.config.context;
	let current = ctx.hc.current_header();
	let current_td = ctx
		.hc
		.td_by_hash(&current.hash())
		.map(|td| td[context as usize])
		.unwrap_or_else(Difficulty::zero);
	current_td < extern_td
}

/// Total difficulty of the given header at the current context: the
/// parent's stored total difficulty plus the header's own difficulty. The
/// addition is by value, the stored parent total is never mutated.
pub fn calc_td(ctx: &AppendContext<'_>, header: &Header) -> Result<Difficulty, Error> {
	let context = ctx.config.context;
	let parent_hash = header.parent_hash(context);
	let parent_number = match header.number(context).checked_sub(1) {
		Some(number) => number,
		None => return Err(ErrorKind::FutureBlock.into()),
	};
	let prior = ctx
		.hc
		.td(&parent_hash, parent_number)
		.ok_or(ErrorKind::FutureBlock)?;
	Ok(prior[context as usize] + header.difficulty(context))
}

/// Applies an already decided head switch and produces the local pending
/// header on top of the new head: a fresh worker candidate (stamped with
/// the slice location and wall-clock time at ZONE), the head's termini and
/// the head's total difficulty.
pub fn set_header_chain_head(
	ctx: &AppendContext<'_>,
	head: &Header,
	td: Difficulty,
	reorg: bool,
) -> Result<PendingHeader, Error> {
	if reorg {
		ctx.hc.set_current_header(head)?;
	}

	let mut candidate = ctx.worker.generate_pending_header(head)?;
	if ctx.config.context.is_leaf() {
		candidate.location = ctx.config.location;
		candidate.time = Utc::now().timestamp() as u64;
	}

	let termini = ctx
		.hc
		.termini_by_hash(&head.hash())
		.unwrap_or_else(Termini::default);

	Ok(PendingHeader {
		header: candidate,
		termini,
		td,
	})
}

/// Overlays the per-context fields of `local` onto `sub` at the given
/// index, leaving the network difficulty and every other index of `sub`
/// untouched. Idempotent for fixed inputs.
pub fn combine_pending_header(local: &Header, mut sub: Header, index: Context) -> Header {
	{
		let src = local.slot(index);
		let dst = sub.slot_mut(index);
		dst.parent_hash = src.parent_hash;
		dst.uncle_hash = src.uncle_hash;
		dst.number = src.number;
		dst.extra = src.extra.clone();
		dst.base_fee = src.base_fee;
		dst.gas_limit = src.gas_limit;
		dst.gas_used = src.gas_used;
		dst.tx_hash = src.tx_hash;
		dst.receipt_hash = src.receipt_hash;
		dst.root = src.root;
		dst.difficulty = src.difficulty;
		dst.coinbase = src.coinbase;
		dst.bloom = src.bloom;
	}
	sub
}
