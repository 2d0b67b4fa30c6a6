use std::collections::BTreeMap;

use pallas::codec::utils::Bytes;
use pallas::ledger::primitives::conway;
use pallas::ledger::primitives::{Fragment, NonZeroInt, PositiveCoin};

use crate::error::Error;
use crate::primitives::{AssetName, PolicyId};

/// A transaction-output value: lovelace plus a multi-asset bundle.
///
/// Asset quantities are unsigned; signed quantities only exist in a
/// [`MintBundle`] or a [`ValueDelta`]. All arithmetic is checked and an
/// overflow is an error, never a wrap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Value {
    pub coin: u64,
    pub assets: BTreeMap<PolicyId, BTreeMap<AssetName, u64>>,
}

impl Value {
    pub fn lovelace(coin: u64) -> Self {
        Self {
            coin,
            assets: BTreeMap::new(),
        }
    }

    pub fn new(coin: u64, assets: BTreeMap<PolicyId, BTreeMap<AssetName, u64>>) -> Self {
        Self { coin, assets }.normalized()
    }

    pub fn with_asset(
        mut self,
        policy: PolicyId,
        name: impl Into<AssetName>,
        quantity: u64,
    ) -> Self {
        if quantity > 0 {
            self.assets
                .entry(policy)
                .or_default()
                .insert(name.into(), quantity);
        }
        self
    }

    pub fn quantity_of(&self, policy: &PolicyId, name: &AssetName) -> u64 {
        self.assets
            .get(policy)
            .and_then(|assets| assets.get(name))
            .copied()
            .unwrap_or(0)
    }

    pub fn has_assets(&self) -> bool {
        !self.assets.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.coin == 0 && self.assets.is_empty()
    }

    /// Iterate over every (policy, name, quantity) triple.
    pub fn assets_iter(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, u64)> {
        self.assets.iter().flat_map(|(policy, assets)| {
            assets
                .iter()
                .map(move |(name, quantity)| (policy, name, *quantity))
        })
    }

    /// Drop zero-quantity assets and empty policy groups.
    pub fn normalized(mut self) -> Self {
        for assets in self.assets.values_mut() {
            assets.retain(|_, quantity| *quantity != 0);
        }
        self.assets.retain(|_, assets| !assets.is_empty());
        self
    }

    pub fn checked_add(&self, other: &Value) -> Result<Value, Error> {
        let coin = self
            .coin
            .checked_add(other.coin)
            .ok_or(Error::IntegerOverflow)?;
        let mut assets = self.assets.clone();
        for (policy, name, quantity) in other.assets_iter() {
            let slot = assets
                .entry(*policy)
                .or_default()
                .entry(name.clone())
                .or_insert(0);
            *slot = slot.checked_add(quantity).ok_or(Error::IntegerOverflow)?;
        }
        Ok(Value { coin, assets }.normalized())
    }

    /// Componentwise subtraction. Underflow in any component is an
    /// overflow error; use [`ValueDelta`] when the sign is not known.
    pub fn checked_sub(&self, other: &Value) -> Result<Value, Error> {
        let coin = self
            .coin
            .checked_sub(other.coin)
            .ok_or(Error::IntegerOverflow)?;
        let mut assets = self.assets.clone();
        for (policy, name, quantity) in other.assets_iter() {
            let slot = assets
                .entry(*policy)
                .or_default()
                .entry(name.clone())
                .or_insert(0);
            *slot = slot.checked_sub(quantity).ok_or(Error::IntegerOverflow)?;
        }
        Ok(Value { coin, assets }.normalized())
    }

    /// True when `self` is componentwise at least `other`.
    pub fn covers(&self, other: &Value) -> bool {
        if self.coin < other.coin {
            return false;
        }
        other
            .assets_iter()
            .all(|(policy, name, quantity)| self.quantity_of(policy, name) >= quantity)
    }

    /// Convert to the Conway wire representation.
    pub fn to_wire(&self) -> Result<conway::Value, Error> {
        if self.assets.is_empty() {
            return Ok(conway::Value::Coin(self.coin));
        }

        let mut bundle: conway::Multiasset<PositiveCoin> = BTreeMap::new();
        for (policy, name, quantity) in self.assets_iter() {
            let quantity = PositiveCoin::try_from(quantity).map_err(|_| {
                Error::InvalidArgument("zero asset quantity in output value".into())
            })?;
            bundle
                .entry(*policy)
                .or_default()
                .insert(name.clone(), quantity);
        }

        Ok(conway::Value::Multiasset(self.coin, bundle))
    }

    /// Serialized size of the wire value in bytes. Used to enforce the
    /// per-output value size limit when splitting change.
    pub fn wire_size(&self) -> Result<u64, Error> {
        let encoded = self
            .to_wire()?
            .encode_fragment()
            .map_err(|e| Error::Encoding(e.to_string()))?;
        Ok(encoded.len() as u64)
    }
}

impl From<&Value> for ValueDelta {
    fn from(value: &Value) -> Self {
        let mut delta = ValueDelta::default();
        delta.add_value(value);
        delta
    }
}

/// Signed value arithmetic for balancing: inputs and withdrawals count
/// up, outputs, fees and deposits count down, mint counts either way.
///
/// Quantities are tracked as `i128` so that no sum of `u64` components
/// can overflow mid-computation; conversion back to [`Value`] checks
/// the range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueDelta {
    pub coin: i128,
    pub assets: BTreeMap<PolicyId, BTreeMap<AssetName, i128>>,
}

impl ValueDelta {
    pub fn add_coin(&mut self, coin: u64) {
        self.coin += coin as i128;
    }

    pub fn sub_coin(&mut self, coin: u64) {
        self.coin -= coin as i128;
    }

    pub fn add_value(&mut self, value: &Value) {
        self.coin += value.coin as i128;
        for (policy, name, quantity) in value.assets_iter() {
            *self
                .assets
                .entry(*policy)
                .or_default()
                .entry(name.clone())
                .or_insert(0) += quantity as i128;
        }
    }

    pub fn sub_value(&mut self, value: &Value) {
        self.coin -= value.coin as i128;
        for (policy, name, quantity) in value.assets_iter() {
            *self
                .assets
                .entry(*policy)
                .or_default()
                .entry(name.clone())
                .or_insert(0) -= quantity as i128;
        }
    }

    /// Apply a mint bundle: positive quantities add, negative subtract.
    pub fn apply_mint(&mut self, mint: &MintBundle) {
        for (policy, name, quantity) in mint.iter() {
            *self
                .assets
                .entry(*policy)
                .or_default()
                .entry(name.clone())
                .or_insert(0) += quantity as i128;
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.coin == 0 && self.assets.values().flatten().all(|(_, q)| *q == 0)
    }

    /// The positive components as an unsigned value; negatives clamp to
    /// zero.
    pub fn surplus(&self) -> Result<Value, Error> {
        let coin = clamp_to_u64(self.coin)?;
        let mut assets: BTreeMap<PolicyId, BTreeMap<AssetName, u64>> = BTreeMap::new();
        for (policy, names) in &self.assets {
            for (name, quantity) in names {
                if *quantity > 0 {
                    assets
                        .entry(*policy)
                        .or_default()
                        .insert(name.clone(), clamp_to_u64(*quantity)?);
                }
            }
        }
        Ok(Value { coin, assets }.normalized())
    }

    /// The negated negative components as an unsigned value; this is the
    /// shortfall a coin selector must cover.
    pub fn shortfall(&self) -> Result<Value, Error> {
        let mut negated = ValueDelta {
            coin: -self.coin,
            assets: BTreeMap::new(),
        };
        for (policy, names) in &self.assets {
            for (name, quantity) in names {
                negated
                    .assets
                    .entry(*policy)
                    .or_default()
                    .insert(name.clone(), -*quantity);
            }
        }
        negated.surplus()
    }
}

fn clamp_to_u64(quantity: i128) -> Result<u64, Error> {
    if quantity <= 0 {
        return Ok(0);
    }
    u64::try_from(quantity).map_err(|_| Error::IntegerOverflow)
}

/// Pending mints and burns, keyed by policy and asset name. Positive
/// quantities mint, negative quantities burn; zero entries are removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintBundle(BTreeMap<PolicyId, BTreeMap<AssetName, i64>>);

impl MintBundle {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add(&mut self, policy: PolicyId, name: AssetName, quantity: i64) -> Result<(), Error> {
        let assets = self.0.entry(policy).or_default();
        let slot = assets.entry(name.clone()).or_insert(0);
        *slot = slot.checked_add(quantity).ok_or(Error::IntegerOverflow)?;
        if *slot == 0 {
            assets.remove(&name);
        }
        if self.0.get(&policy).is_some_and(|assets| assets.is_empty()) {
            self.0.remove(&policy);
        }
        Ok(())
    }

    pub fn policies(&self) -> impl Iterator<Item = &PolicyId> {
        self.0.keys()
    }

    pub fn contains_policy(&self, policy: &PolicyId) -> bool {
        self.0.contains_key(policy)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, i64)> {
        self.0.iter().flat_map(|(policy, assets)| {
            assets
                .iter()
                .map(move |(name, quantity)| (policy, name, *quantity))
        })
    }

    /// The minted (positive) side as an unsigned value with zero coin.
    pub fn minted(&self) -> Value {
        let mut value = Value::default();
        for (policy, name, quantity) in self.iter() {
            if quantity > 0 {
                value = value.with_asset(*policy, name.clone(), quantity as u64);
            }
        }
        value
    }

    /// The burned (negative) side as an unsigned value with zero coin.
    pub fn burned(&self) -> Value {
        let mut value = Value::default();
        for (policy, name, quantity) in self.iter() {
            if quantity < 0 {
                value = value.with_asset(*policy, name.clone(), quantity.unsigned_abs());
            }
        }
        value
    }

    /// Conway wire mint map. `None` when nothing is minted or burned.
    pub fn to_wire(&self) -> Option<conway::Multiasset<NonZeroInt>> {
        if self.0.is_empty() {
            return None;
        }
        let mut bundle: conway::Multiasset<NonZeroInt> = BTreeMap::new();
        for (policy, name, quantity) in self.iter() {
            let Ok(quantity) = NonZeroInt::try_from(quantity) else {
                continue;
            };
            bundle
                .entry(*policy)
                .or_default()
                .insert(name.clone(), quantity);
        }
        Some(bundle)
    }
}

pub fn asset_name(bytes: &[u8]) -> AssetName {
    Bytes::from(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pallas::crypto::hash::Hash;

    fn policy(byte: u8) -> PolicyId {
        Hash::from([byte; 28])
    }

    #[test]
    fn add_and_sub_are_inverse() {
        let a = Value::lovelace(5_000_000).with_asset(policy(1), asset_name(b"TOK"), 7);
        let b = Value::lovelace(1_500_000).with_asset(policy(1), asset_name(b"TOK"), 3);

        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.coin, 6_500_000);
        assert_eq!(sum.quantity_of(&policy(1), &asset_name(b"TOK")), 10);

        let back = sum.checked_sub(&b).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn sub_underflow_is_an_error() {
        let a = Value::lovelace(1);
        let b = Value::lovelace(2);
        assert!(matches!(a.checked_sub(&b), Err(Error::IntegerOverflow)));
    }

    #[test]
    fn covers_is_componentwise() {
        let have = Value::lovelace(10).with_asset(policy(1), asset_name(b"A"), 5);
        let want_ok = Value::lovelace(10).with_asset(policy(1), asset_name(b"A"), 5);
        let want_more_assets = Value::lovelace(1).with_asset(policy(1), asset_name(b"A"), 6);
        let want_other_asset = Value::lovelace(1).with_asset(policy(2), asset_name(b"B"), 1);

        assert!(have.covers(&want_ok));
        assert!(!have.covers(&want_more_assets));
        assert!(!have.covers(&want_other_asset));
    }

    #[test]
    fn delta_tracks_shortfall_and_surplus() {
        let mut delta = ValueDelta::default();
        delta.add_value(&Value::lovelace(3_000_000));
        delta.sub_value(&Value::lovelace(5_000_000).with_asset(policy(1), asset_name(b"T"), 4));

        let shortfall = delta.shortfall().unwrap();
        assert_eq!(shortfall.coin, 2_000_000);
        assert_eq!(shortfall.quantity_of(&policy(1), &asset_name(b"T")), 4);
        assert_eq!(delta.surplus().unwrap(), Value::default());
    }

    #[test]
    fn mint_bundle_splits_sides_and_cancels() {
        let mut mint = MintBundle::default();
        mint.add(policy(1), asset_name(b"NEW"), 50).unwrap();
        mint.add(policy(2), asset_name(b"OLD"), -20).unwrap();

        assert_eq!(
            mint.minted().quantity_of(&policy(1), &asset_name(b"NEW")),
            50
        );
        assert_eq!(
            mint.burned().quantity_of(&policy(2), &asset_name(b"OLD")),
            20
        );

        mint.add(policy(1), asset_name(b"NEW"), -50).unwrap();
        assert!(!mint.contains_policy(&policy(1)));
    }

    #[test]
    fn wire_value_has_no_multiasset_when_empty() {
        let plain = Value::lovelace(42).to_wire().unwrap();
        assert!(matches!(plain, conway::Value::Coin(42)));
    }
}
