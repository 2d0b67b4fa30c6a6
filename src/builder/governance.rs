//! Governance proposal helpers: each constructs a Conway governance
//! action, prices it with the action deposit from the protocol
//! parameters at build time, and appends it to the proposal set.

use std::collections::BTreeMap;

use pallas::codec::utils::Set;
use pallas::ledger::primitives::StakeCredential;
use pallas::ledger::primitives::conway::{
    Constitution, GovAction, GovActionId, ProtocolParamUpdate, RationalNumber,
};

use super::TxBuilder;
use super::staging::Proposal;
use crate::error::Error;
use crate::primitives::{Anchor, RedeemerPurpose, RewardAccount, ScriptHash};

impl TxBuilder {
    /// Propose a protocol parameter change. Parameter changes are
    /// guarded by the constitution's guardrail script, so a redeemer is
    /// required whenever `guardrail` names one.
    #[allow(clippy::too_many_arguments)]
    pub fn propose_parameter_change(
        self,
        update: ProtocolParamUpdate,
        previous: Option<GovActionId>,
        guardrail: Option<ScriptHash>,
        return_account: RewardAccount,
        anchor: Anchor,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        if guardrail.is_some() && redeemer.is_none() {
            return Err(Error::MissingRedeemer);
        }
        let action = GovAction::ParameterChange(previous, Box::new(update), guardrail);
        self.push_proposal(action, return_account, anchor, redeemer)
    }

    /// Propose initiating a hard fork to the given protocol version.
    pub fn propose_hardfork(
        self,
        previous: Option<GovActionId>,
        protocol_version: (u64, u64),
        return_account: RewardAccount,
        anchor: Anchor,
    ) -> Result<Self, Error> {
        let action = GovAction::HardForkInitiation(previous, protocol_version);
        self.push_proposal(action, return_account, anchor, None)
    }

    /// Propose treasury withdrawals. Like parameter changes, these are
    /// gated by the guardrail script when one is set.
    pub fn propose_treasury_withdrawals(
        self,
        withdrawals: BTreeMap<RewardAccount, u64>,
        guardrail: Option<ScriptHash>,
        return_account: RewardAccount,
        anchor: Anchor,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        if guardrail.is_some() && redeemer.is_none() {
            return Err(Error::MissingRedeemer);
        }
        let withdrawals = withdrawals
            .into_iter()
            .map(|(account, amount)| (account.to_wire(), amount))
            .collect();
        let action = GovAction::TreasuryWithdrawals(withdrawals, guardrail);
        self.push_proposal(action, return_account, anchor, redeemer)
    }

    /// Propose a motion of no confidence in the committee.
    pub fn propose_no_confidence(
        self,
        previous: Option<GovActionId>,
        return_account: RewardAccount,
        anchor: Anchor,
    ) -> Result<Self, Error> {
        let action = GovAction::NoConfidence(previous);
        self.push_proposal(action, return_account, anchor, None)
    }

    /// Propose adding and removing constitutional committee members.
    #[allow(clippy::too_many_arguments)]
    pub fn propose_update_committee(
        self,
        previous: Option<GovActionId>,
        removed: Vec<StakeCredential>,
        added: BTreeMap<StakeCredential, u64>,
        threshold: RationalNumber,
        return_account: RewardAccount,
        anchor: Anchor,
    ) -> Result<Self, Error> {
        let action =
            GovAction::UpdateCommittee(previous, Set::from(removed), added, threshold);
        self.push_proposal(action, return_account, anchor, None)
    }

    /// Propose replacing the constitution.
    pub fn propose_new_constitution(
        self,
        previous: Option<GovActionId>,
        constitution: Constitution,
        return_account: RewardAccount,
        anchor: Anchor,
    ) -> Result<Self, Error> {
        let action = GovAction::NewConstitution(previous, constitution);
        self.push_proposal(action, return_account, anchor, None)
    }

    /// Propose an informational action with no on-chain effect.
    pub fn propose_info(
        self,
        return_account: RewardAccount,
        anchor: Anchor,
    ) -> Result<Self, Error> {
        self.push_proposal(GovAction::Information, return_account, anchor, None)
    }

    fn push_proposal(
        mut self,
        action: GovAction,
        return_account: RewardAccount,
        anchor: Anchor,
        redeemer: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        let position = self.staging.proposals.len() as u32;
        self.staging.proposals.push(Proposal {
            deposit: None,
            return_account,
            action,
            anchor,
        });
        if let Some(data) = redeemer {
            self.staging
                .redeemers
                .insert(RedeemerPurpose::Propose(position), data, None);
        }
        Ok(self)
    }
}
