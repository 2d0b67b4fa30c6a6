use std::collections::BTreeMap;

use pallas::ledger::primitives::conway::{GovAction, GovActionId, VotingProcedure, Voter};

use crate::primitives::{
    Anchor, Certificate, Input, Metadatum, MintBundle, Output, PubKeyHash, Redeemers,
    RewardAccount, Script, ScriptHash, Utxo, datum_hash,
};

/// A governance proposal staged for submission. Like certificate
/// deposits, a `None` deposit is filled from the protocol parameters
/// when the transaction is balanced.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub deposit: Option<u64>,
    pub return_account: RewardAccount,
    pub action: GovAction,
    pub anchor: Anchor,
}

/// The transaction draft: everything the facade has accumulated, in
/// builder-level form. Wire form is derived from this on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagingTransaction {
    pub inputs: Vec<Input>,
    pub reference_inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub fee: Option<u64>,
    pub mint: MintBundle,
    pub validity_start_slot: Option<u64>,
    pub ttl_slot: Option<u64>,
    pub network_id: Option<u8>,
    pub collateral_inputs: Vec<Input>,
    pub collateral_return: Option<Output>,
    pub total_collateral: Option<u64>,
    pub required_signers: Vec<PubKeyHash>,
    pub scripts: BTreeMap<ScriptHash, Script>,
    /// Datum witnesses in insertion order, deduplicated by hash.
    pub datums: Vec<Vec<u8>>,
    pub redeemers: Redeemers,
    pub certificates: Vec<Certificate>,
    pub withdrawals: BTreeMap<RewardAccount, u64>,
    pub votes: BTreeMap<Voter, BTreeMap<GovActionId, VotingProcedure>>,
    pub proposals: Vec<Proposal>,
    pub metadata: BTreeMap<u64, Metadatum>,
}

impl StagingTransaction {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_input(&mut self, input: Input) {
        self.inputs.push(input);
    }

    pub fn add_datum(&mut self, bytes: Vec<u8>) {
        let hash = datum_hash(&bytes);
        if !self.datums.iter().any(|existing| datum_hash(existing) == hash) {
            self.datums.push(bytes);
        }
    }

    pub fn add_script(&mut self, script: Script) {
        self.scripts.insert(script.hash(), script);
    }

    /// Whether the witness set will carry redeemers or datums, which
    /// forces a script data hash into the body.
    pub fn has_witness_data(&self) -> bool {
        !self.redeemers.is_empty() || !self.datums.is_empty()
    }

    /// Whether phase-two scripts are involved at all, which forces
    /// collateral.
    pub fn needs_collateral(&self) -> bool {
        !self.redeemers.is_empty()
            || self.scripts.values().any(|script| script.kind.is_plutus())
    }

    /// Total deposit delta: certificate deposits and refunds plus
    /// proposal deposits. Positive means the transaction locks value.
    pub fn deposit_delta(&self) -> i64 {
        let certs: i64 = self
            .certificates
            .iter()
            .map(Certificate::deposit_delta)
            .sum();
        let proposals: i64 = self
            .proposals
            .iter()
            .map(|proposal| proposal.deposit.unwrap_or(0) as i64)
            .sum();
        certs + proposals
    }

    /// The UTxOs backing inputs and reference inputs, for handing to an
    /// evaluator.
    pub fn resolved_utxos(&self, known: &BTreeMap<Input, Output>) -> Vec<Utxo> {
        self.inputs
            .iter()
            .chain(self.reference_inputs.iter())
            .filter_map(|input| {
                known
                    .get(input)
                    .map(|output| Utxo::new(input.clone(), output.clone()))
            })
            .collect()
    }
}
