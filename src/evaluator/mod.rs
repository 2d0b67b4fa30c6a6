//! Execution-unit evaluation of the Plutus redeemers in a draft
//! transaction.

use pallas::ledger::primitives::conway::RedeemerTag;

use crate::primitives::{ExUnits, Utxo};
use crate::provider::Provider;

/// One evaluated redeemer, addressed by its wire pointer. The index
/// refers to the canonical position of the redeemer's referent in the
/// submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemerEval {
    pub tag: RedeemerTag,
    pub index: u32,
    pub ex_units: ExUnits,
}

/// Prices the redeemers of a tentative transaction.
///
/// The transaction handed over always carries the maximum execution
/// budget in every redeemer, so evaluators see worst-case sizes. The
/// caller matches results back by `(tag, index)` and tolerates any
/// ordering the evaluator returns.
pub trait TxEvaluator {
    fn evaluate(
        &self,
        tx_cbor: &[u8],
        resolved_utxos: &[Utxo],
    ) -> impl Future<Output = anyhow::Result<Vec<RedeemerEval>>> + Send;
}

/// The default evaluator: hand the transaction to the provider.
pub struct ProviderEvaluator<'a, P> {
    provider: &'a P,
}

impl<'a, P> ProviderEvaluator<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }
}

impl<P: Provider + Sync> TxEvaluator for ProviderEvaluator<'_, P> {
    async fn evaluate(
        &self,
        tx_cbor: &[u8],
        resolved_utxos: &[Utxo],
    ) -> anyhow::Result<Vec<RedeemerEval>> {
        self.provider.evaluate_tx(tx_cbor, resolved_utxos).await
    }
}

/// Evaluator for transactions without Plutus scripts; any call is a
/// contract violation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScripts;

impl TxEvaluator for NoScripts {
    async fn evaluate(
        &self,
        _tx_cbor: &[u8],
        _resolved_utxos: &[Utxo],
    ) -> anyhow::Result<Vec<RedeemerEval>> {
        anyhow::bail!("transaction unexpectedly contains redeemers")
    }
}
