use crate::primitives::{Input, Output, Value};

/// An unspent transaction output: the reference and the output it
/// points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub input: Input,
    pub output: Output,
}

impl Utxo {
    pub fn new(input: Input, output: Output) -> Self {
        Self { input, output }
    }

    pub fn coin(&self) -> u64 {
        self.output.value.coin
    }

    pub fn value(&self) -> &Value {
        &self.output.value
    }

    /// True for outputs holding nothing but lovelace, the only kind
    /// eligible as collateral.
    pub fn is_pure_lovelace(&self) -> bool {
        !self.output.value.has_assets()
            && self.output.datum.is_none()
            && self.output.script_ref.is_none()
    }
}
