use pallas::codec::utils::KeepRaw;
use pallas::ledger::addresses::Address;
use pallas::ledger::primitives::Fragment;
use pallas::ledger::primitives::conway::{self, PostAlonzoTransactionOutput};

use crate::error::Error;
use crate::primitives::{DatumOption, Script, ScriptKind, Value};

/// A transaction output under construction: address, value, optional
/// datum and optional reference script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub address: Address,
    pub value: Value,
    pub datum: Option<DatumOption>,
    pub script_ref: Option<Script>,
}

impl Output {
    pub fn new(address: Address, value: Value) -> Self {
        Self {
            address,
            value,
            datum: None,
            script_ref: None,
        }
    }

    pub fn lovelace(address: Address, coin: u64) -> Self {
        Self::new(address, Value::lovelace(coin))
    }

    pub fn with_datum(mut self, datum: DatumOption) -> Self {
        self.datum = Some(datum);
        self
    }

    pub fn with_script_ref(mut self, script: Script) -> Self {
        self.script_ref = Some(script);
        self
    }

    pub fn coin(&self) -> u64 {
        self.value.coin
    }

    /// The Plutus language carried as a reference script, if any.
    pub fn reference_script_kind(&self) -> Option<ScriptKind> {
        self.script_ref.as_ref().map(|script| script.kind)
    }

    /// Convert to the Conway wire representation. Inline datums and
    /// native reference scripts are validated as CBOR here.
    pub fn to_wire(&self) -> Result<conway::TransactionOutput<'static>, Error> {
        let datum_option = self
            .datum
            .as_ref()
            .map(DatumOption::to_wire)
            .transpose()?
            .map(KeepRaw::from);
        let script_ref = self
            .script_ref
            .as_ref()
            .map(Script::to_wire_ref)
            .transpose()?;

        Ok(conway::TransactionOutput::PostAlonzo(KeepRaw::from(
            PostAlonzoTransactionOutput {
                address: self.address.to_vec().into(),
                value: self.value.to_wire()?,
                datum_option,
                script_ref,
            },
        )))
    }

    /// Serialized size of the wire output, the quantity the min-ADA
    /// computation is driven by.
    pub fn wire_size(&self) -> Result<u64, Error> {
        let encoded = self
            .to_wire()?
            .encode_fragment()
            .map_err(|e| Error::Encoding(e.to_string()))?;
        Ok(encoded.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::value::asset_name;
    use pallas::crypto::hash::Hash;
    use pallas::ledger::addresses::{
        Network, ShelleyAddress, ShelleyDelegationPart, ShelleyPaymentPart,
    };

    fn test_address() -> Address {
        Address::Shelley(ShelleyAddress::new(
            Network::Testnet,
            ShelleyPaymentPart::key_hash(Hash::from([1u8; 28])),
            ShelleyDelegationPart::Null,
        ))
    }

    #[test]
    fn wire_output_round_trips() {
        let output = Output::new(
            test_address(),
            Value::lovelace(2_000_000).with_asset(Hash::from([9u8; 28]), asset_name(b"TOK"), 40),
        );

        let encoded = output.to_wire().unwrap().encode_fragment().unwrap();
        let decoded = conway::TransactionOutput::decode_fragment(&encoded).unwrap();
        let conway::TransactionOutput::PostAlonzo(inner) = decoded else {
            panic!("expected post-alonzo output");
        };
        assert!(matches!(
            inner.value,
            conway::Value::Multiasset(2_000_000, _)
        ));
    }

    #[test]
    fn wire_size_grows_with_datum() {
        let plain = Output::lovelace(test_address(), 1_000_000);
        let with_datum = plain
            .clone()
            .with_datum(DatumOption::Hash(Hash::from([7u8; 32])));
        assert!(with_datum.wire_size().unwrap() > plain.wire_size().unwrap());
    }
}
