use pallas::ledger::primitives::TransactionInput;

use crate::primitives::TxHash;

/// Reference to a transaction output: producing transaction hash plus
/// output index. Ordering matches the ledger's canonical input order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Input {
    pub tx_hash: TxHash,
    pub index: u64,
}

impl Input {
    pub fn new(tx_hash: TxHash, index: u64) -> Self {
        Self { tx_hash, index }
    }

    pub fn to_wire(&self) -> TransactionInput {
        TransactionInput {
            transaction_id: self.tx_hash,
            index: self.index,
        }
    }
}

impl From<&TransactionInput> for Input {
    fn from(input: &TransactionInput) -> Self {
        Self {
            tx_hash: input.transaction_id,
            index: input.index,
        }
    }
}
