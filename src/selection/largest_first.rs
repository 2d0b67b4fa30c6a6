use std::cmp::Reverse;

use tracing::trace;

use super::{CoinSelector, Selection};
use crate::error::Error;
use crate::primitives::{Utxo, Value};

/// Largest-first selection: for each required asset, and finally for
/// lovelace, UTxOs are taken in descending order of the quantity they
/// hold until the running total meets the target.
///
/// When the target is empty but nothing is pre-selected, the single
/// largest-lovelace UTxO is still taken so the transaction has an
/// input.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestFirst;

impl CoinSelector for LargestFirst {
    fn select(
        &self,
        pre_selected: Vec<Utxo>,
        available: Vec<Utxo>,
        target: &Value,
    ) -> Result<Selection, Error> {
        let mut selected = pre_selected;
        let mut remaining = available;

        let mut covered = Value::default();
        for utxo in &selected {
            covered = covered.checked_add(utxo.value())?;
        }

        for (policy, name, required) in target.assets_iter() {
            while covered.quantity_of(policy, name) < required {
                remaining.sort_by_key(|utxo| Reverse(utxo.value().quantity_of(policy, name)));

                let candidate = remaining
                    .first()
                    .filter(|utxo| utxo.value().quantity_of(policy, name) > 0)
                    .cloned();
                let Some(utxo) = candidate else {
                    return Err(Error::InsufficientFunds(format!(
                        "{}.{}",
                        policy,
                        hex::encode(name.as_slice()),
                    )));
                };

                trace!(%policy, quantity = utxo.value().quantity_of(policy, name), "asset pick");
                covered = covered.checked_add(utxo.value())?;
                selected.push(remaining.remove(0));
            }
        }

        remaining.sort_by_key(|utxo| Reverse(utxo.coin()));
        while covered.coin < target.coin {
            if remaining.is_empty() {
                return Err(Error::InsufficientFunds("lovelace".into()));
            }
            let utxo = remaining.remove(0);
            trace!(coin = utxo.coin(), "lovelace pick");
            covered = covered.checked_add(utxo.value())?;
            selected.push(utxo);
        }

        // an empty input set is not a transaction
        if selected.is_empty() {
            if remaining.is_empty() {
                return Err(Error::InsufficientFunds("lovelace".into()));
            }
            selected.push(remaining.remove(0));
        }

        Ok(Selection {
            selected,
            remaining,
        })
    }
}
