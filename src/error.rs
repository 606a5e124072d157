use std::{error, fmt};

use crate::walk::Walk;

/// Error enumerates over all possible errors that this package
/// shall return.
///
/// Key-not-found and duplicate-key outcomes are not errors, they are
/// reported through `Option` and `Result` values of the individual calls.
#[derive(Debug, PartialEq)]
pub enum Error<K> {
    /// Traversal order is part of the [`Walk`] contract but not
    /// implemented by this index.
    Unsupported(Walk),
    /// Key cannot be represented as a null-terminated string.
    InvalidKey(String),
    /// Returned by load_from() API when the same key is loaded twice.
    DuplicateKey(K),
    /// Fatal case, root node is colored red.
    RedRoot,
    /// Fatal case, breaking one of the red-black rules.
    ConsecutiveReds,
    /// Fatal case, breaking one of the red-black rules. The String
    /// component of this variant can be used for debugging.
    UnbalancedBlacks(String),
    /// Fatal case, index entries are not in sort-order.
    SortError(K, K),
    /// Fatal case, entry counter disagrees with reachable nodes.
    CountMismatch { counter: usize, entries: usize },
}

impl<K> fmt::Display for Error<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Unsupported(walk) => write!(f, "{:?} walk not supported", walk),
            Error::InvalidKey(msg) => write!(f, "invalid key: {}", msg),
            Error::DuplicateKey(key) => write!(f, "duplicate key {:?}", key),
            Error::RedRoot => write!(f, "root node is red"),
            Error::ConsecutiveReds => write!(f, "consecutive red nodes"),
            Error::UnbalancedBlacks(msg) => write!(f, "unbalanced blacks, {}", msg),
            Error::SortError(a, b) => write!(f, "sort error {:?} and {:?}", a, b),
            Error::CountMismatch { counter, entries } => write!(
                f,
                "counter {} does not match {} reachable entries",
                counter, entries
            ),
        }
    }
}

impl<K> error::Error for Error<K> where K: fmt::Debug {}
