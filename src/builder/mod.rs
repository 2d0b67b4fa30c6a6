//! The transaction builder facade: accumulate a draft with chained
//! calls, then `build` it against protocol parameters, a coin selector
//! and an evaluator.

use std::collections::{BTreeMap, BTreeSet};

use pallas::ledger::addresses::Address;

use crate::error::Error;
use crate::evaluator::{ProviderEvaluator, TxEvaluator};
use crate::params::{NetworkId, ProtocolParams};
use crate::primitives::{
    Certificate, Credential, DRep, DatumOption, Input, Metadatum, Output, PolicyId, PubKeyHash,
    RedeemerPurpose, RewardAccount, Script, ScriptKind, Utxo, Value, Vote, Voter, VotingProcedure,
    value,
};
use crate::provider::Provider;
use crate::selection::CoinSelector;
use crate::time::SlotConfig;

mod balance;
mod build;
mod governance;
mod staging;

pub use balance::MAX_ITERS;
pub use build::BuiltTransaction;
pub use staging::{Proposal, StagingTransaction};

use balance::BalanceContext;

/// Incremental transaction assembler.
///
/// Operations consume and return the builder, so a finished draft can
/// only be built once; there is no state to mutate afterwards. Fallible
/// operations return `Result<Self, Error>` and abort the chain early
/// via `?`.
pub struct TxBuilder {
    staging: StagingTransaction,
    network: NetworkId,
    change_address: Option<Address>,
    collateral_address: Option<Address>,
    change_datum: Option<DatumOption>,
    utxos: Option<Vec<Utxo>>,
    collateral_utxos: Option<Vec<Utxo>>,
    resolved: BTreeMap<Input, Output>,
    languages: BTreeSet<ScriptKind>,
    signer_padding: u64,
    minimum_fee: u64,
}

impl TxBuilder {
    pub fn new(network: NetworkId) -> Self {
        let mut staging = StagingTransaction::new();
        staging.network_id = Some(network.id_byte());
        Self {
            staging,
            network,
            change_address: None,
            collateral_address: None,
            change_datum: None,
            utxos: None,
            collateral_utxos: None,
            resolved: BTreeMap::new(),
            languages: BTreeSet::new(),
            signer_padding: 0,
            minimum_fee: 0,
        }
    }

    /// Where any surplus value goes. Required before `build`.
    pub fn set_change_address(mut self, address: Address) -> Self {
        self.change_address = Some(address);
        self
    }

    /// Where the collateral surplus goes when the transaction carries
    /// Plutus scripts. Required before `build` in that case.
    pub fn set_collateral_change_address(mut self, address: Address) -> Self {
        self.collateral_address = Some(address);
        self
    }

    /// Datum attached to change outputs, for script-owned wallets.
    pub fn set_change_datum(mut self, datum: DatumOption) -> Self {
        self.change_datum = Some(datum);
        self
    }

    /// The spendable pool the balancing loop may select from.
    pub fn set_utxos(mut self, utxos: Vec<Utxo>) -> Self {
        for utxo in &utxos {
            self.resolved
                .insert(utxo.input.clone(), utxo.output.clone());
        }
        self.utxos = Some(utxos);
        self
    }

    /// Pure-lovelace UTxOs eligible as collateral.
    pub fn set_collateral_utxos(mut self, utxos: Vec<Utxo>) -> Self {
        for utxo in &utxos {
            self.resolved
                .insert(utxo.input.clone(), utxo.output.clone());
        }
        self.collateral_utxos = Some(utxos);
        self
    }

    /// Write the network id body field directly.
    pub fn set_network_id(mut self, id: u8) -> Self {
        self.staging.network_id = Some(id);
        self
    }

    /// A floor under the computed fee.
    pub fn set_minimum_fee(mut self, fee: u64) -> Self {
        self.minimum_fee = fee;
        self
    }

    /// The transaction is invalid in slots before this one.
    pub fn set_invalid_before(mut self, slot: u64) -> Self {
        self.staging.validity_start_slot = Some(slot);
        self
    }

    /// The transaction is invalid in this slot and after.
    pub fn set_invalid_after(mut self, slot: u64) -> Self {
        self.staging.ttl_slot = Some(slot);
        self
    }

    /// As [`Self::set_invalid_before`], from a Unix timestamp in
    /// seconds.
    pub fn set_invalid_before_ex(self, unix_time: u64) -> Result<Self, Error> {
        let slot = SlotConfig::for_network(self.network).slot_at(unix_time)?;
        Ok(self.set_invalid_before(slot))
    }

    /// As [`Self::set_invalid_after`], from a Unix timestamp in
    /// seconds.
    pub fn set_invalid_after_ex(self, unix_time: u64) -> Result<Self, Error> {
        let slot = SlotConfig::for_network(self.network).slot_at(unix_time)?;
        Ok(self.set_invalid_after(slot))
    }

    /// Pay plain lovelace to an address. The amount is raised to the
    /// output's minimum at build time if it falls short.
    pub fn send_lovelace(self, address: Address, coin: u64) -> Self {
        self.add_output(Output::lovelace(address, coin))
    }

    /// Pay an arbitrary value to an address.
    pub fn send_value(self, address: Address, value: Value) -> Self {
        self.add_output(Output::new(address, value))
    }

    /// Lock lovelace under a datum, typically at a script address.
    pub fn lock_lovelace(self, address: Address, coin: u64, datum: DatumOption) -> Self {
        self.add_output(Output::lovelace(address, coin).with_datum(datum))
    }

    /// Lock a value under a datum.
    pub fn lock_value(self, address: Address, value: Value, datum: DatumOption) -> Self {
        self.add_output(Output::new(address, value).with_datum(datum))
    }

    pub fn add_output(mut self, output: Output) -> Self {
        self.staging.outputs.push(output);
        self
    }

    /// Spend a specific UTxO. A redeemer is mandatory when the source
    /// address is script-locked; an optional datum witness is stored
    /// alongside for hash-datum outputs.
    pub fn add_input(
        mut self,
        utxo: Utxo,
        redeemer: Option<Vec<u8>>,
        datum: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        if self.staging.inputs.contains(&utxo.input) {
            return Err(Error::DuplicateKey(format!(
                "input {}#{}",
                utxo.input.tx_hash, utxo.input.index
            )));
        }

        if utxo.output.address.has_script() && redeemer.is_none() {
            return Err(Error::MissingRedeemer);
        }

        if let Some(data) = redeemer {
            self.staging.redeemers.insert(
                RedeemerPurpose::Spend(utxo.input.clone()),
                data,
                None,
            );
        }
        if let Some(datum) = datum {
            self.staging.add_datum(datum);
        }

        self.resolved
            .insert(utxo.input.clone(), utxo.output.clone());
        self.staging.add_input(utxo.input);
        Ok(self)
    }

    /// Read a UTxO without spending it. A Plutus script carried as its
    /// reference script flags that language for the script data hash.
    pub fn add_reference_input(mut self, utxo: Utxo) -> Self {
        if let Some(kind) = utxo.output.reference_script_kind() {
            if kind.is_plutus() {
                self.languages.insert(kind);
            }
        }
        self.resolved
            .insert(utxo.input.clone(), utxo.output.clone());
        if !self.staging.reference_inputs.contains(&utxo.input) {
            self.staging.reference_inputs.push(utxo.input);
        }
        self
    }

    /// Mint (positive) or burn (negative) an asset quantity. The first
    /// redeemer supplied for a policy becomes that policy's minting
    /// redeemer; native-script policies pass `None`.
    pub fn mint_token(
        mut self,
        policy: PolicyId,
        name: &[u8],
        quantity: i64,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        if quantity == 0 {
            return Err(Error::InvalidArgument("mint quantity of zero".into()));
        }
        if name.len() > 32 {
            return Err(Error::InvalidArgument(
                "asset name longer than 32 bytes".into(),
            ));
        }

        self.staging
            .mint
            .add(policy, value::asset_name(name), quantity)?;

        if self.staging.mint.contains_policy(&policy) {
            if let Some(data) = redeemer {
                self.staging
                    .redeemers
                    .insert(RedeemerPurpose::Mint(policy), data, None);
            }
        } else {
            // the whole policy cancelled out
            self.staging
                .redeemers
                .remove(&RedeemerPurpose::Mint(policy));
        }

        Ok(self)
    }

    /// Install a metadata label. The auxiliary data hash is recomputed
    /// whenever the transaction is rendered.
    pub fn set_metadata(mut self, label: u64, metadatum: Metadatum) -> Self {
        self.staging.metadata.insert(label, metadatum);
        self
    }

    /// Disclose a key that will sign, so fees account for its witness.
    pub fn add_signer(mut self, key_hash: PubKeyHash) -> Self {
        if !self.staging.required_signers.contains(&key_hash) {
            self.staging.required_signers.push(key_hash);
        }
        self
    }

    /// Pad the fee computation by this many additional signatures
    /// beyond what the builder can infer.
    pub fn pad_signer_count(mut self, count: u8) -> Self {
        self.signer_padding = count as u64;
        self
    }

    /// Append a certificate; a supplied redeemer becomes the
    /// certificate's CERTIFYING redeemer at its position.
    pub fn add_certificate(
        mut self,
        certificate: Certificate,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        let position = self.staging.certificates.len() as u32;
        self.staging.certificates.push(certificate);
        if let Some(data) = redeemer {
            self.staging
                .redeemers
                .insert(RedeemerPurpose::Cert(position), data, None);
        }
        Ok(self)
    }

    /// Register a reward account, locking the stake credential deposit
    /// from the protocol parameters.
    pub fn register_reward_address(
        self,
        credential: Credential,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        self.add_certificate(
            Certificate::StakeRegistration {
                credential,
                deposit: None,
            },
            redeemer,
        )
    }

    /// Deregister a reward account and refund its deposit. Script
    /// credentials must authorize via a redeemer.
    pub fn deregister_reward_address(
        self,
        credential: Credential,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        require_script_redeemer(&credential, &redeemer)?;
        self.add_certificate(
            Certificate::StakeDeregistration {
                credential,
                deposit: None,
            },
            redeemer,
        )
    }

    /// Delegate stake to a pool.
    pub fn delegate_stake(
        self,
        credential: Credential,
        pool: PubKeyHash,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        require_script_redeemer(&credential, &redeemer)?;
        self.add_certificate(Certificate::StakeDelegation { credential, pool }, redeemer)
    }

    /// Delegate voting power to a DRep.
    pub fn delegate_voting_power(
        self,
        credential: Credential,
        drep: DRep,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        require_script_redeemer(&credential, &redeemer)?;
        self.add_certificate(Certificate::VoteDelegation { credential, drep }, redeemer)
    }

    /// Register as a delegate representative, locking the DRep deposit.
    pub fn register_drep(
        self,
        credential: Credential,
        anchor: Option<crate::primitives::Anchor>,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        self.add_certificate(
            Certificate::DRepRegistration {
                credential,
                deposit: None,
                anchor,
            },
            redeemer,
        )
    }

    /// Update a DRep's anchor.
    pub fn update_drep(
        self,
        credential: Credential,
        anchor: Option<crate::primitives::Anchor>,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        require_script_redeemer(&credential, &redeemer)?;
        self.add_certificate(Certificate::DRepUpdate { credential, anchor }, redeemer)
    }

    /// Retire a DRep and refund the deposit.
    pub fn deregister_drep(
        self,
        credential: Credential,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        require_script_redeemer(&credential, &redeemer)?;
        self.add_certificate(
            Certificate::DRepDeregistration {
                credential,
                deposit: None,
            },
            redeemer,
        )
    }

    /// Withdraw rewards. A redeemer is mandatory exactly when the
    /// reward credential is a script.
    pub fn withdraw_rewards(
        mut self,
        account: RewardAccount,
        amount: u64,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        if account.is_script() && redeemer.is_none() {
            return Err(Error::MissingRedeemer);
        }
        if self.staging.withdrawals.contains_key(&account) {
            return Err(Error::DuplicateKey("withdrawal account".into()));
        }

        if let Some(data) = redeemer {
            self.staging
                .redeemers
                .insert(RedeemerPurpose::Reward(account.clone()), data, None);
        }
        self.staging.withdrawals.insert(account, amount);
        Ok(self)
    }

    /// Cast a vote on a governance action. Script-hash voters must
    /// authorize via a redeemer.
    pub fn vote(
        mut self,
        voter: Voter,
        action: crate::primitives::GovActionId,
        vote: Vote,
        anchor: Option<crate::primitives::Anchor>,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        let script_voter = matches!(
            voter,
            Voter::ConstitutionalCommitteeScript(_) | Voter::DRepScript(_)
        );
        if script_voter && redeemer.is_none() {
            return Err(Error::MissingRedeemer);
        }

        if let Some(data) = redeemer {
            self.staging
                .redeemers
                .insert(RedeemerPurpose::Vote(voter.clone()), data, None);
        }
        self.staging
            .votes
            .entry(voter)
            .or_default()
            .insert(action, VotingProcedure { vote, anchor });
        Ok(self)
    }

    /// Attach a script witness and flag its language.
    pub fn add_script(mut self, kind: ScriptKind, bytes: Vec<u8>) -> Self {
        if kind.is_plutus() {
            self.languages.insert(kind);
        }
        self.staging.add_script(Script::new(kind, bytes));
        self
    }

    /// Attach a datum witness for a hash-datum output being spent.
    pub fn add_datum(mut self, bytes: Vec<u8>) -> Self {
        self.staging.add_datum(bytes);
        self
    }

    /// Balance the draft and render the unsigned transaction. Consumes
    /// the builder: the result is final.
    pub async fn build<S, E>(
        mut self,
        params: &ProtocolParams,
        selector: &S,
        evaluator: &E,
    ) -> Result<BuiltTransaction, Error>
    where
        S: CoinSelector,
        E: TxEvaluator,
    {
        let change_address = self
            .change_address
            .as_ref()
            .ok_or(Error::MissingArgument("change address"))?;
        let utxos = self.utxos.take().ok_or(Error::MissingArgument("utxos"))?;

        // language flags from attached witness scripts
        for script in self.staging.scripts.values() {
            if script.kind.is_plutus() {
                self.languages.insert(script.kind);
            }
        }

        let needs_collateral = self.staging.needs_collateral();
        let collateral_pool = if needs_collateral {
            self.collateral_utxos
                .take()
                .ok_or(Error::MissingArgument("collateral utxos"))?
        } else {
            self.collateral_utxos.take().unwrap_or_default()
        };
        if needs_collateral && self.collateral_address.is_none() {
            return Err(Error::MissingArgument("collateral change address"));
        }

        let available: Vec<Utxo> = utxos
            .into_iter()
            .filter(|utxo| !self.staging.inputs.contains(&utxo.input))
            .collect();

        let mut ctx = BalanceContext {
            params,
            change_address,
            collateral_address: self.collateral_address.as_ref(),
            change_datum: self.change_datum.as_ref(),
            available,
            collateral_pool,
            resolved: self.resolved.clone(),
            languages: self.languages.clone(),
            signer_padding: self.signer_padding,
            minimum_fee: self.minimum_fee,
        };

        balance::balance(&mut self.staging, &mut ctx, selector, evaluator).await
    }

    /// Convenience: fetch parameters from a provider and evaluate
    /// through it.
    pub async fn build_with_provider<P, S>(
        self,
        provider: &P,
        selector: &S,
    ) -> Result<BuiltTransaction, Error>
    where
        P: Provider + Sync,
        S: CoinSelector,
    {
        let params = provider.get_parameters().await.map_err(Error::Provider)?;
        let evaluator = ProviderEvaluator::new(provider);
        self.build(&params, selector, &evaluator).await
    }

    /// Read access to the accumulated draft, mainly for inspection in
    /// tests and tooling.
    pub fn draft(&self) -> &StagingTransaction {
        &self.staging
    }
}

fn require_script_redeemer(
    credential: &Credential,
    redeemer: &Option<Vec<u8>>,
) -> Result<(), Error> {
    if credential.is_script() && redeemer.is_none() {
        return Err(Error::MissingRedeemer);
    }
    Ok(())
}
