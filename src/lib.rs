//! In-memory ordered index built on a [red-black][rbt] tree, balanced in
//! a single top-down pass on both insert and delete.
//!
//! * [`Rbt`], the index itself, generic over `Ord` keys.
//! * [`SharedRbt`], an [`Rbt`] behind a reader/writer lock, concurrent
//!   lookups and a single writer at a time.
//! * [`StrTree`], a [`SharedRbt`] keyed by null-terminated strings.
//!
//! Inserting a key that is already present is a no-op, the rejected key
//! and value are handed back to the caller. Use [`Rbt::set`] to insert or
//! update.
//!
//! [rbt]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree

mod error;
mod rbt;
mod shared;
mod store;
mod strtree;
mod walk;

pub use crate::error::Error;
pub use crate::rbt::{IntoIter, Iter, Rbt, Stats};
pub use crate::shared::SharedRbt;
pub use crate::strtree::StrTree;
pub use crate::walk::Walk;

#[cfg(test)]
mod strtree_test;
