use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use pallas::ledger::primitives::conway::{self, RedeemerTag, Voter};

use crate::primitives::{Input, PolicyId, RewardAccount};

/// Execution budget of a single Plutus redeemer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

impl ExUnits {
    pub fn new(mem: u64, steps: u64) -> Self {
        Self { mem, steps }
    }

    pub fn to_wire(self) -> conway::ExUnits {
        conway::ExUnits {
            mem: self.mem,
            steps: self.steps,
        }
    }
}

impl From<conway::ExUnits> for ExUnits {
    fn from(units: conway::ExUnits) -> Self {
        Self {
            mem: units.mem,
            steps: units.steps,
        }
    }
}

/// What a redeemer is attached to. The variant order mirrors the wire
/// tag order so that iteration over the redeemer map is already sorted
/// by (tag, referent).
///
/// `Cert` and `Propose` carry the insertion position of their referent,
/// which is canonical for those collections.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RedeemerPurpose {
    Spend(Input),
    Mint(PolicyId),
    Cert(u32),
    Reward(RewardAccount),
    Vote(Voter),
    Propose(u32),
}

impl RedeemerPurpose {
    pub fn tag(&self) -> RedeemerTag {
        match self {
            RedeemerPurpose::Spend(_) => RedeemerTag::Spend,
            RedeemerPurpose::Mint(_) => RedeemerTag::Mint,
            RedeemerPurpose::Cert(_) => RedeemerTag::Cert,
            RedeemerPurpose::Reward(_) => RedeemerTag::Reward,
            RedeemerPurpose::Vote(_) => RedeemerTag::Vote,
            RedeemerPurpose::Propose(_) => RedeemerTag::Propose,
        }
    }
}

/// Redeemer payload: raw CBOR-encoded Plutus data plus the execution
/// budget once it is known. A `None` budget means "to be filled by the
/// evaluator during balancing".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemerEntry {
    pub data: Vec<u8>,
    pub ex_units: Option<ExUnits>,
}

/// The builder-side redeemer store, keyed by purpose. Wire indices are
/// not assigned here; they are derived from the final body collections
/// at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redeemers(BTreeMap<RedeemerPurpose, RedeemerEntry>);

impl Redeemers {
    pub fn insert(&mut self, purpose: RedeemerPurpose, data: Vec<u8>, ex_units: Option<ExUnits>) {
        self.0.insert(purpose, RedeemerEntry { data, ex_units });
    }

    pub fn remove(&mut self, purpose: &RedeemerPurpose) {
        self.0.remove(purpose);
    }

    /// Set every budget to the given units, the upper bound used before
    /// evaluation.
    pub fn saturate_ex_units(&mut self, units: ExUnits) {
        for entry in self.0.values_mut() {
            entry.ex_units = Some(units);
        }
    }
}

impl Deref for Redeemers {
    type Target = BTreeMap<RedeemerPurpose, RedeemerEntry>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Redeemers {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
