//! Coin selection: picking UTxOs that cover a target value.

use crate::error::Error;
use crate::primitives::{Utxo, Value};

mod largest_first;

pub use largest_first::LargestFirst;

/// Result of a selection round. `selected` and `remaining` partition
/// the union of the pre-selected and available sets; nothing is ever
/// duplicated or dropped.
#[derive(Debug, Clone)]
pub struct Selection {
    pub selected: Vec<Utxo>,
    pub remaining: Vec<Utxo>,
}

/// A coin selection strategy.
///
/// Contract:
/// - every pre-selected UTxO ends up in `selected`;
/// - the combined value of `selected` covers `target` componentwise;
/// - `selected` and `remaining` together are exactly the inputs, with
///   no duplicates;
/// - the ordering of `available` carries no meaning and callers keep
///   ownership semantics simple by handing the vectors over.
pub trait CoinSelector {
    fn select(
        &self,
        pre_selected: Vec<Utxo>,
        available: Vec<Utxo>,
        target: &Value,
    ) -> Result<Selection, Error>;
}
