//! Script data hash: the canonical digest over redeemers, datums and
//! the language views of the cost models actually used.

use std::collections::BTreeSet;

use pallas::codec::utils::{KeepRaw, NonEmptySet};
use pallas::crypto::hash::Hash;
use pallas::ledger::primitives::conway::{LanguageViews, PlutusData, Redeemers, ScriptData};

use crate::error::Error;
use crate::params::CostModels;
use crate::primitives::ScriptKind;

/// Assemble the language views for the Plutus versions in use.
///
/// Only used languages participate: including an unused cost model
/// would change the hash across unrelated protocol upgrades. A used
/// language without a cost model in the parameters is unpriceable.
pub fn language_views(
    used: &BTreeSet<ScriptKind>,
    cost_models: &CostModels,
) -> Result<LanguageViews, Error> {
    let mut views = Vec::new();
    for kind in used {
        let Some(language) = kind.language_id() else {
            continue;
        };
        views.push((language, cost_models.for_kind(*kind)?.clone()));
    }
    Ok(views.into_iter().collect())
}

/// Compute the script data hash over the final redeemer list, the datum
/// witnesses and the used language views.
///
/// The redeemers must already be in canonical wire order; the datum set
/// keeps insertion order after deduplication, matching what goes into
/// the witness set byte for byte.
pub fn hash(
    redeemers: Option<&Redeemers>,
    datums: &[PlutusData],
    views: Option<&LanguageViews>,
) -> Option<Hash<32>> {
    if redeemers.is_none() && datums.is_empty() {
        return None;
    }

    let datums = NonEmptySet::try_from(
        datums
            .iter()
            .cloned()
            .map(KeepRaw::from)
            .collect::<Vec<_>>(),
    )
    .ok()
    .map(KeepRaw::from);

    let data = ScriptData {
        redeemers: redeemers.cloned(),
        datums,
        language_views: redeemers.and(views).cloned(),
    };

    Some(data.hash())
}

/// The 32-zero-byte stand-in installed while sizes are being estimated,
/// before the real hash can be computed.
pub fn dummy() -> Hash<32> {
    Hash::from([0u8; 32])
}
