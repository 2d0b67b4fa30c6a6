use std::collections::BTreeMap;

use pallas::codec::utils::{KeepRaw, NonEmptySet, Nullable, Set};
use pallas::ledger::primitives::conway::{
    self, LanguageViews, Metadata, NativeScript, PlutusData, PlutusScript, ProposalProcedure,
    Redeemer, TransactionBody, Tx, WitnessSet,
};
use pallas::ledger::primitives::{Fragment, NetworkId as WireNetworkId, alonzo};
use pallas::ledger::traverse::ComputeHash;

use crate::builder::staging::StagingTransaction;
use crate::error::Error;
use crate::primitives::{Input, Output, RedeemerPurpose, ScriptKind, TxHash};
use crate::script_data;

/// How the script data hash is produced for this rendering of the
/// draft.
#[derive(Debug, Clone)]
pub(crate) enum ScriptDataMode {
    /// No phase-two witness data at all.
    Absent,
    /// 32 zero bytes, used while sizes are estimated.
    Dummy,
    /// The real hash over the given language views.
    Real(LanguageViews),
}

/// The finished artifact: an unsigned transaction, its CBOR and the
/// body hash to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub hash: TxHash,
    pub bytes: Vec<u8>,
    pub fee: u64,
}

impl BuiltTransaction {
    pub fn cbor(&self) -> &[u8] {
        &self.bytes
    }

    pub fn cbor_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl StagingTransaction {
    /// The redeemer list in canonical order, each entry carrying the
    /// sorted position of its referent in the final body collections.
    pub(crate) fn canonical_redeemers(
        &self,
    ) -> Result<Vec<(RedeemerPurpose, Redeemer)>, Error> {
        let mut sorted_inputs = self.inputs.clone();
        sorted_inputs.sort();
        sorted_inputs.dedup();

        let mint_policies: Vec<_> = self.mint.policies().copied().collect();
        let withdrawal_accounts: Vec<_> = self.withdrawals.keys().cloned().collect();
        let voters: Vec<_> = self.votes.keys().cloned().collect();

        let mut redeemers = Vec::with_capacity(self.redeemers.len());
        for (purpose, entry) in self.redeemers.iter() {
            let index = match purpose {
                RedeemerPurpose::Spend(input) => sorted_inputs
                    .iter()
                    .position(|candidate| candidate == input)
                    .ok_or_else(|| {
                        Error::IllegalState("spend redeemer targets an unknown input".into())
                    })?,
                RedeemerPurpose::Mint(policy) => mint_policies
                    .iter()
                    .position(|candidate| candidate == policy)
                    .ok_or_else(|| {
                        Error::IllegalState("mint redeemer targets an unknown policy".into())
                    })?,
                RedeemerPurpose::Cert(position) => {
                    if *position as usize >= self.certificates.len() {
                        return Err(Error::IndexOutOfBounds);
                    }
                    *position as usize
                }
                RedeemerPurpose::Reward(account) => withdrawal_accounts
                    .iter()
                    .position(|candidate| candidate == account)
                    .ok_or_else(|| {
                        Error::IllegalState("reward redeemer targets an unknown account".into())
                    })?,
                RedeemerPurpose::Vote(voter) => voters
                    .iter()
                    .position(|candidate| candidate == voter)
                    .ok_or_else(|| {
                        Error::IllegalState("vote redeemer targets an unknown voter".into())
                    })?,
                RedeemerPurpose::Propose(position) => {
                    if *position as usize >= self.proposals.len() {
                        return Err(Error::IndexOutOfBounds);
                    }
                    *position as usize
                }
            };

            let data = PlutusData::decode_fragment(&entry.data)
                .map_err(|e| Error::Decoding(format!("redeemer data: {e}")))?;

            redeemers.push((
                purpose.clone(),
                Redeemer {
                    tag: purpose.tag(),
                    index: index as u32,
                    data,
                    ex_units: entry.ex_units.unwrap_or_default().to_wire(),
                },
            ));
        }

        redeemers.sort_by_key(|(_, redeemer)| (redeemer.tag, redeemer.index));
        Ok(redeemers)
    }

    /// Render the draft into a Conway transaction.
    pub(crate) fn build_tx(&self, script_data: &ScriptDataMode) -> Result<BuiltTransaction, Error> {
        let mut sorted_inputs = self.inputs.clone();
        sorted_inputs.sort();
        sorted_inputs.dedup();
        let inputs: Vec<_> = sorted_inputs.iter().map(Input::to_wire).collect();

        let outputs = self
            .outputs
            .iter()
            .map(Output::to_wire)
            .collect::<Result<Vec<_>, _>>()?;

        let collateral = non_empty_inputs(&self.collateral_inputs);
        let reference_inputs = non_empty_inputs(&self.reference_inputs);

        let required_signers =
            NonEmptySet::try_from(self.required_signers.clone()).ok();

        let network_id = self
            .network_id
            .map(|id| {
                WireNetworkId::try_from(id)
                    .map_err(|_| Error::InvalidArgument(format!("network id {id}")))
            })
            .transpose()?;

        let certificates = self
            .certificates
            .iter()
            .map(|cert| cert.to_wire())
            .collect::<Result<Vec<_>, _>>()?;
        let certificates = NonEmptySet::try_from(certificates).ok();

        let withdrawals = if self.withdrawals.is_empty() {
            None
        } else {
            Some(
                self.withdrawals
                    .iter()
                    .map(|(account, amount)| (account.to_wire(), *amount))
                    .collect::<BTreeMap<_, _>>(),
            )
        };

        let voting_procedures = if self.votes.is_empty() {
            None
        } else {
            Some(self.votes.clone())
        };

        let proposal_procedures = self
            .proposals
            .iter()
            .map(|proposal| {
                let deposit = proposal.deposit.ok_or(Error::ProtocolParamsIncomplete(
                    "governanceActionDeposit",
                ))?;
                Ok(ProposalProcedure {
                    deposit,
                    reward_account: proposal.return_account.to_wire(),
                    gov_action: proposal.action.clone(),
                    anchor: proposal.anchor.clone(),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let proposal_procedures = NonEmptySet::try_from(proposal_procedures).ok();

        let collateral_return = self
            .collateral_return
            .as_ref()
            .map(Output::to_wire)
            .transpose()?;

        // witness scripts, split per language
        let (mut native, mut v1, mut v2, mut v3) = (vec![], vec![], vec![], vec![]);
        for script in self.scripts.values() {
            match script.kind {
                ScriptKind::Native => {
                    let decoded = NativeScript::decode_fragment(&script.bytes)
                        .map_err(|e| Error::Decoding(format!("native script: {e}")))?;
                    native.push(KeepRaw::from(decoded));
                }
                ScriptKind::PlutusV1 => {
                    v1.push(PlutusScript::<1>(script.bytes.clone().into()))
                }
                ScriptKind::PlutusV2 => {
                    v2.push(PlutusScript::<2>(script.bytes.clone().into()))
                }
                ScriptKind::PlutusV3 => {
                    v3.push(PlutusScript::<3>(script.bytes.clone().into()))
                }
            }
        }

        let plutus_data = self
            .datums
            .iter()
            .map(|datum| {
                PlutusData::decode_fragment(datum)
                    .map_err(|e| Error::Decoding(format!("datum: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let wire_redeemers: Vec<_> = self
            .canonical_redeemers()?
            .into_iter()
            .map(|(_, redeemer)| redeemer)
            .collect();
        let witness_redeemers = if wire_redeemers.is_empty() {
            None
        } else {
            Some(conway::Redeemers::List(wire_redeemers))
        };

        let script_data_hash = match script_data {
            ScriptDataMode::Absent => None,
            ScriptDataMode::Dummy if self.has_witness_data() => Some(script_data::dummy()),
            ScriptDataMode::Dummy => None,
            ScriptDataMode::Real(views) => script_data::hash(
                witness_redeemers.as_ref(),
                &plutus_data,
                Some(views),
            ),
        };

        let witness_datums = NonEmptySet::try_from(
            plutus_data
                .iter()
                .cloned()
                .map(KeepRaw::from)
                .collect::<Vec<_>>(),
        )
        .ok()
        .map(KeepRaw::from);

        // auxiliary data and its hash
        let (auxiliary_data, auxiliary_data_hash) = if self.metadata.is_empty() {
            (Nullable::Null, None)
        } else {
            let metadata: Metadata = self
                .metadata
                .iter()
                .map(|(label, metadatum)| (*label, metadatum.clone()))
                .collect();
            let aux = conway::AuxiliaryData::ShelleyMa(alonzo::ShelleyMaAuxiliaryData {
                transaction_metadata: metadata,
                auxiliary_scripts: None,
            });
            let hash = aux.compute_hash();
            (Nullable::Some(KeepRaw::from(aux)), Some(hash))
        };

        let body = TransactionBody {
            inputs: Set::from(inputs),
            outputs,
            fee: self.fee.unwrap_or_default(),
            ttl: self.ttl_slot,
            certificates,
            withdrawals,
            auxiliary_data_hash,
            validity_interval_start: self.validity_start_slot,
            mint: self.mint.to_wire(),
            script_data_hash,
            collateral,
            required_signers,
            network_id,
            collateral_return,
            total_collateral: self.total_collateral,
            reference_inputs,
            voting_procedures,
            proposal_procedures,
            treasury_value: None,
            donation: None,
        };

        let witness_set = WitnessSet {
            vkeywitness: None,
            native_script: NonEmptySet::try_from(native).ok(),
            bootstrap_witness: None,
            plutus_v1_script: NonEmptySet::try_from(v1).ok(),
            plutus_data: witness_datums,
            redeemer: witness_redeemers.map(KeepRaw::from),
            plutus_v2_script: NonEmptySet::try_from(v2).ok(),
            plutus_v3_script: NonEmptySet::try_from(v3).ok(),
        };

        let hash = body.compute_hash();
        let fee = body.fee;

        let tx = Tx {
            transaction_body: KeepRaw::from(body),
            transaction_witness_set: KeepRaw::from(witness_set),
            success: true,
            auxiliary_data,
        };

        let bytes = tx
            .encode_fragment()
            .map_err(|e| Error::Encoding(e.to_string()))?;

        Ok(BuiltTransaction { hash, bytes, fee })
    }
}

fn non_empty_inputs(
    inputs: &[Input],
) -> Option<NonEmptySet<pallas::ledger::primitives::TransactionInput>> {
    NonEmptySet::try_from(inputs.iter().map(Input::to_wire).collect::<Vec<_>>()).ok()
}
