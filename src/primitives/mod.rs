//! Builder-side domain model: values, outputs, scripts, redeemers and
//! certificates, each with its conversion to the Conway wire types.

pub use pallas::crypto::hash::Hash;
pub use pallas::ledger::addresses::Address;
pub use pallas::ledger::primitives::conway::{
    Anchor, DRep, GovAction, GovActionId, Metadatum, Vote, Voter, VotingProcedure,
};

mod certificate;
mod input;
mod output;
mod redeemer;
mod reward;
mod script;
mod utxo;
pub mod value;

pub use certificate::{Certificate, Credential};
pub use input::Input;
pub use output::Output;
pub use redeemer::{ExUnits, RedeemerEntry, RedeemerPurpose, Redeemers};
pub use reward::RewardAccount;
pub use script::{DatumOption, Script, ScriptKind, datum_hash};
pub use utxo::Utxo;
pub use value::{MintBundle, Value, ValueDelta};

pub type TxHash = Hash<32>;
pub type PubKeyHash = Hash<28>;
pub type ScriptHash = Hash<28>;
pub type PolicyId = Hash<28>;
pub type AssetName = pallas::codec::utils::Bytes;
