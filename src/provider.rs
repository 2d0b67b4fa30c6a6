use crate::evaluator::RedeemerEval;
use crate::params::ProtocolParams;
use crate::primitives::Utxo;

/// The on-chain context supplier: protocol parameters, transaction
/// evaluation and the network identity.
///
/// Implementations typically wrap an Ogmios or Blockfrost style
/// endpoint; the core never retries a failed call and surfaces the
/// error as-is.
pub trait Provider {
    fn get_parameters(&self) -> impl Future<Output = anyhow::Result<ProtocolParams>> + Send;

    /// Evaluate the scripts of a fully-formed (but not necessarily
    /// signed) transaction. `additional_utxos` resolves inputs the
    /// chain does not know yet.
    fn evaluate_tx(
        &self,
        tx_cbor: &[u8],
        additional_utxos: &[Utxo],
    ) -> impl Future<Output = anyhow::Result<Vec<RedeemerEval>>> + Send;

    fn network_magic(&self) -> u32;
}
