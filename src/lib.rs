//! Transaction assembly and balancing for Cardano's Conway era.
//!
//! `ballast` takes a declarative description of a transaction — pay
//! here, spend this, mint that, vote so — plus on-chain context
//! (UTxOs, protocol parameters, a script evaluator) and produces a
//! fully balanced, protocol-valid, CBOR-encoded transaction ready for
//! signing. Ledger primitives, addresses and CBOR come from
//! [`pallas`]; this crate owns the assembly and the balancing fixed
//! point on top of them.
//!
//! ```no_run
//! # async fn example() -> Result<(), ballast::Error> {
//! use ballast::{LargestFirst, NetworkId, TxBuilder};
//! # let params: ballast::ProtocolParams = todo!();
//! # let alice: pallas::ledger::addresses::Address = todo!();
//! # let my_address: pallas::ledger::addresses::Address = todo!();
//! # let wallet_utxos = vec![];
//!
//! let tx = TxBuilder::new(NetworkId::Preview)
//!     .set_change_address(my_address)
//!     .set_utxos(wallet_utxos)
//!     .send_lovelace(alice, 2_000_000)
//!     .build(&params, &LargestFirst, &ballast::NoScripts)
//!     .await?;
//!
//! let _cbor = tx.cbor_hex();
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod emip3;
pub mod error;
pub mod evaluator;
pub mod fee;
pub mod params;
pub mod primitives;
pub mod provider;
pub mod script_data;
pub mod selection;
pub mod time;

pub use builder::{BuiltTransaction, MAX_ITERS, Proposal, StagingTransaction, TxBuilder};
pub use error::Error;
pub use evaluator::{NoScripts, ProviderEvaluator, RedeemerEval, TxEvaluator};
pub use params::{NetworkId, ProtocolParams};
pub use primitives::{
    Certificate, Credential, DatumOption, ExUnits, Input, Output, RewardAccount, Script,
    ScriptKind, Utxo, Value,
};
pub use provider::Provider;
pub use selection::{CoinSelector, LargestFirst, Selection};
