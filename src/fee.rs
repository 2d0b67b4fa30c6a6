//! Fee arithmetic: linear size fee, redeemer pricing, tiered
//! reference-script fee and the min-ADA fixed point.

use num::BigRational;

use crate::error::Error;
use crate::params::{MinFeeReferenceScripts, ProtocolParams, price_ex_units, rational_ceil_to_u64};
use crate::primitives::{ExUnits, Output};

/// Bytes a single vkey witness adds to the signed transaction. Unsigned
/// drafts are padded by this much per expected signature so the fee
/// does not come up short after signing.
pub const SIGNATURE_PADDING_BYTES: u64 = 100;

/// UTxO-map overhead added on top of the serialized output when sizing
/// for min-ADA.
const UTXO_OVERHEAD_BYTES: u64 = 160;

/// `⌈a × size + b⌉` over the serialized transaction, with `size`
/// already including any signature padding.
pub fn min_fee_without_scripts(tx_size: u64, params: &ProtocolParams) -> Result<u64, Error> {
    params
        .min_fee_coefficient
        .checked_mul(tx_size)
        .and_then(|fee| fee.checked_add(params.min_fee_constant))
        .ok_or(Error::IntegerOverflow)
}

/// Price of every redeemer budget at the protocol's ex-unit prices.
pub fn min_script_fee<'a>(
    budgets: impl Iterator<Item = &'a ExUnits>,
    params: &ProtocolParams,
) -> Result<u64, Error> {
    let mut mem: u64 = 0;
    let mut steps: u64 = 0;
    for budget in budgets {
        mem = mem.checked_add(budget.mem).ok_or(Error::IntegerOverflow)?;
        steps = steps
            .checked_add(budget.steps)
            .ok_or(Error::IntegerOverflow)?;
    }
    price_ex_units(&params.script_execution_prices, mem, steps)
}

/// Tiered fee for scripts carried by reference inputs: the first
/// `range` bytes cost `base` per byte, each further tier costs
/// `multiplier` times the previous one, rounding up per tier.
pub fn reference_script_fee(
    total_script_bytes: u64,
    pricing: &MinFeeReferenceScripts,
) -> Result<u64, Error> {
    if total_script_bytes == 0 {
        return Ok(0);
    }

    let mut tier_price =
        BigRational::from_float(pricing.base).ok_or(Error::LossOfPrecision)?;
    let multiplier =
        BigRational::from_float(pricing.multiplier).ok_or(Error::LossOfPrecision)?;

    let mut fee: u64 = 0;
    let mut left = total_script_bytes;
    while left > 0 {
        let chunk = left.min(pricing.range);
        let chunk_fee = BigRational::from_integer(chunk.into()) * tier_price.clone();
        fee = fee
            .checked_add(rational_ceil_to_u64(&chunk_fee)?)
            .ok_or(Error::IntegerOverflow)?;
        left -= chunk;
        tier_price *= multiplier.clone();
    }

    Ok(fee)
}

/// Minimum lovelace the output must hold, given that the coin field
/// itself is part of the serialized size the minimum is computed over.
///
/// Solved as a fixed point: start from the output as-is, re-price with
/// the size of the candidate coin until the serialized width of the
/// coin stops changing.
pub fn min_ada_for_output(output: &Output, coins_per_utxo_byte: u64) -> Result<u64, Error> {
    let serialized = output.wire_size()?;
    let current_coin_width = cbor_uint_width(output.value.coin);

    let mut last_width = current_coin_width;
    loop {
        let tentative = serialized
            .checked_add(UTXO_OVERHEAD_BYTES)
            .and_then(|size| size.checked_add(last_width))
            .and_then(|size| size.checked_sub(current_coin_width))
            .and_then(|size| size.checked_mul(coins_per_utxo_byte))
            .ok_or(Error::IntegerOverflow)?;

        let width = cbor_uint_width(tentative);
        if width == last_width {
            return Ok(tentative);
        }
        last_width = width;
    }
}

/// Serialized width in bytes of a CBOR unsigned integer.
fn cbor_uint_width(value: u64) -> u64 {
    match value {
        0..=0x17 => 1,
        0x18..=0xff => 2,
        0x100..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// The complete fee of a draft: linear size fee over the padded size,
/// redeemer pricing, and the reference-script tiers.
pub fn total_fee<'a>(
    tx_size: u64,
    padded_signatures: u64,
    budgets: impl Iterator<Item = &'a ExUnits>,
    reference_script_bytes: u64,
    params: &ProtocolParams,
) -> Result<u64, Error> {
    let padded_size = tx_size
        .checked_add(
            padded_signatures
                .checked_mul(SIGNATURE_PADDING_BYTES)
                .ok_or(Error::IntegerOverflow)?,
        )
        .ok_or(Error::IntegerOverflow)?;

    let size_fee = min_fee_without_scripts(padded_size, params)?;
    let script_fee = min_script_fee(budgets, params)?;
    let reference_fee =
        reference_script_fee(reference_script_bytes, &params.min_fee_reference_scripts)?;

    size_fee
        .checked_add(script_fee)
        .and_then(|fee| fee.checked_add(reference_fee))
        .ok_or(Error::IntegerOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::testing;
    use crate::primitives::{Hash, Value};
    use pallas::ledger::addresses::{
        Address, Network, ShelleyAddress, ShelleyDelegationPart, ShelleyPaymentPart,
    };

    fn address() -> Address {
        Address::Shelley(ShelleyAddress::new(
            Network::Testnet,
            ShelleyPaymentPart::key_hash(Hash::from([1u8; 28])),
            ShelleyDelegationPart::Key(Hash::from([2u8; 28])),
        ))
    }

    #[test]
    fn linear_fee_matches_by_hand() {
        let params = testing::params();
        assert_eq!(
            min_fee_without_scripts(300, &params).unwrap(),
            44 * 300 + 155_381
        );
    }

    #[test]
    fn script_fee_sums_over_redeemers() {
        let params = testing::params();
        let budgets = [ExUnits::new(1_000_000, 500_000_000), ExUnits::new(500, 700)];
        let fee = min_script_fee(budgets.iter(), &params).unwrap();

        // 577/10000 * mem + 721/10000000 * steps, rounded up once
        let expected = (577u128 * 1_000_500 * 1_000 + 721 * 500_000_700).div_ceil(10_000_000);
        assert_eq!(fee as u128, expected);
    }

    #[test]
    fn reference_fee_ramps_per_tier() {
        let pricing = MinFeeReferenceScripts {
            base: 10.0,
            range: 1_000,
            multiplier: 1.5,
        };

        // one full tier and a half tier at 1.5x
        let fee = reference_script_fee(1_500, &pricing).unwrap();
        assert_eq!(fee, 10_000 + 7_500);

        // empty reference scripts cost nothing
        assert_eq!(reference_script_fee(0, &pricing).unwrap(), 0);
    }

    #[test]
    fn min_ada_scales_with_output_size() {
        let params = testing::params();
        let small = Output::lovelace(address(), 0);
        let large = Output::new(
            address(),
            Value::lovelace(0).with_asset(
                Hash::from([3u8; 28]),
                crate::primitives::value::asset_name(b"SOMETOKEN"),
                1_000_000,
            ),
        );

        let small_min = min_ada_for_output(&small, params.coins_per_utxo_byte).unwrap();
        let large_min = min_ada_for_output(&large, params.coins_per_utxo_byte).unwrap();
        assert!(large_min > small_min);
        // a bare payment output needs roughly one ada on these params
        assert!(small_min > 800_000 && small_min < 1_400_000);
    }

    #[test]
    fn min_ada_is_stable_once_satisfied() {
        let params = testing::params();
        let output = Output::lovelace(address(), 0);
        let min = min_ada_for_output(&output, params.coins_per_utxo_byte).unwrap();

        let funded = Output::lovelace(address(), min);
        let again = min_ada_for_output(&funded, params.coins_per_utxo_byte).unwrap();
        assert_eq!(min, again);
    }

    #[test]
    fn cbor_widths() {
        assert_eq!(cbor_uint_width(0), 1);
        assert_eq!(cbor_uint_width(23), 1);
        assert_eq!(cbor_uint_width(24), 2);
        assert_eq!(cbor_uint_width(255), 2);
        assert_eq!(cbor_uint_width(65_535), 3);
        assert_eq!(cbor_uint_width(4_000_000_000), 5);
        assert_eq!(cbor_uint_width(u64::MAX), 9);
    }
}
