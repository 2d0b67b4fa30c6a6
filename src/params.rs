use num::BigRational;
use num::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::primitives::ScriptKind;

/// Protocol parameters consumed by fee computation and balancing.
///
/// Field naming matches the camelCase the provider wire format uses, so
/// a provider response deserializes straight into this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolParams {
    /// Per-byte fee coefficient (`a` in `a * size + b`).
    pub min_fee_coefficient: u64,
    /// Constant fee term (`b`).
    pub min_fee_constant: u64,
    /// Multiplied by the serialized UTxO size to obtain the minimum
    /// lovelace an output must hold.
    pub coins_per_utxo_byte: u64,
    /// Tiered pricing for scripts carried by reference inputs.
    #[serde(default)]
    pub min_fee_reference_scripts: MinFeeReferenceScripts,
    /// Price per unit of memory and per CPU step.
    pub script_execution_prices: ExecutionPrices,
    pub max_execution_units_per_transaction: ExecutionUnits,
    pub max_transaction_size: u64,
    /// Upper bound on the serialized size of a single output's value.
    pub max_value_size: u64,
    /// Percentage of the fee that must be provided as collateral.
    pub collateral_percentage: u64,
    pub max_collateral_inputs: u64,
    pub stake_credential_deposit: u64,
    pub stake_pool_deposit: u64,
    pub delegate_representative_deposit: u64,
    pub governance_action_deposit: u64,
    pub plutus_cost_models: CostModels,
}

impl ProtocolParams {
    /// The largest fee any transaction can be charged, used as the
    /// dummy fee during the first sizing pass so that fee bytes are
    /// realistic before the real fee is known.
    pub fn max_tx_fee(&self) -> Result<u64, Error> {
        let size_fee = self
            .min_fee_coefficient
            .checked_mul(self.max_transaction_size)
            .and_then(|fee| fee.checked_add(self.min_fee_constant))
            .ok_or(Error::IntegerOverflow)?;

        let max_units = self.max_execution_units_per_transaction;
        let script_fee = price_ex_units(
            &self.script_execution_prices,
            max_units.memory,
            max_units.cpu,
        )?;

        size_fee.checked_add(script_fee).ok_or(Error::IntegerOverflow)
    }

    /// Reject parameter sets that cannot drive a balance at all.
    pub fn validate(&self) -> Result<(), Error> {
        if self.script_execution_prices.memory.denominator == 0
            || self.script_execution_prices.cpu.denominator == 0
        {
            return Err(Error::ProtocolParamsIncomplete("scriptExecutionPrices"));
        }
        if self.coins_per_utxo_byte == 0 {
            return Err(Error::ProtocolParamsIncomplete("coinsPerUtxoByte"));
        }
        if self.max_transaction_size == 0 {
            return Err(Error::ProtocolParamsIncomplete("maxTransactionSize"));
        }
        Ok(())
    }
}

/// Ceiling of `mem * mem_price + cpu * cpu_price` in lovelace.
pub(crate) fn price_ex_units(
    prices: &ExecutionPrices,
    mem: u64,
    cpu: u64,
) -> Result<u64, Error> {
    let total = prices.memory.to_rational()? * BigRational::from_integer(mem.into())
        + prices.cpu.to_rational()? * BigRational::from_integer(cpu.into());
    rational_ceil_to_u64(&total)
}

pub(crate) fn rational_ceil_to_u64(value: &BigRational) -> Result<u64, Error> {
    value
        .ceil()
        .to_integer()
        .to_u64()
        .ok_or(Error::LossOfPrecision)
}

/// Tiered reference-script pricing: the first `range` bytes cost `base`
/// lovelace per byte, every following tier costs `multiplier` times the
/// previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinFeeReferenceScripts {
    pub base: f64,
    pub range: u64,
    pub multiplier: f64,
}

impl Default for MinFeeReferenceScripts {
    fn default() -> Self {
        // current mainnet values
        Self {
            base: 15.0,
            range: 25_600,
            multiplier: 1.2,
        }
    }
}

/// A ratio as the provider delivers it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn to_rational(&self) -> Result<BigRational, Error> {
        if self.denominator == 0 {
            return Err(Error::InvalidArgument("zero denominator".into()));
        }
        Ok(BigRational::new(
            self.numerator.into(),
            self.denominator.into(),
        ))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPrices {
    pub memory: Ratio,
    pub cpu: Ratio,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionUnits {
    pub memory: u64,
    pub cpu: u64,
}

/// Plutus cost models per language version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostModels {
    pub plutus_v1: Option<Vec<i64>>,
    pub plutus_v2: Option<Vec<i64>>,
    pub plutus_v3: Option<Vec<i64>>,
}

impl CostModels {
    /// The cost model for a flagged script kind; a missing model for a
    /// used language makes the script data hash impossible to compute.
    pub fn for_kind(&self, kind: ScriptKind) -> Result<&Vec<i64>, Error> {
        let model = match kind {
            ScriptKind::Native => return Err(Error::InvalidArgument(
                "native scripts have no cost model".into(),
            )),
            ScriptKind::PlutusV1 => &self.plutus_v1,
            ScriptKind::PlutusV2 => &self.plutus_v2,
            ScriptKind::PlutusV3 => &self.plutus_v3,
        };
        model
            .as_ref()
            .ok_or(Error::ProtocolParamsIncomplete("plutusCostModels"))
    }
}

/// The networks the builder knows slot arithmetic for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkId {
    Mainnet,
    Preprod,
    Preview,
}

impl NetworkId {
    pub fn magic(&self) -> u32 {
        match self {
            NetworkId::Mainnet => 764_824_073,
            NetworkId::Preprod => 1,
            NetworkId::Preview => 2,
        }
    }

    pub fn from_magic(magic: u32) -> Result<Self, Error> {
        match magic {
            764_824_073 => Ok(NetworkId::Mainnet),
            1 => Ok(NetworkId::Preprod),
            2 => Ok(NetworkId::Preview),
            other => Err(Error::InvalidArgument(format!(
                "unknown network magic {other}"
            ))),
        }
    }

    /// The network id byte carried in address headers and the body's
    /// network id field.
    pub fn id_byte(&self) -> u8 {
        match self {
            NetworkId::Mainnet => 1,
            NetworkId::Preprod | NetworkId::Preview => 0,
        }
    }
}
