use pallas::codec::utils::{CborWrap, KeepRaw};
use pallas::crypto::hash::{Hash, Hasher};
use pallas::ledger::primitives::Fragment;
use pallas::ledger::primitives::conway::{self, NativeScript, PlutusData, PlutusScript};

use crate::error::Error;

/// The script language tag, used both for hashing and for cost model
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScriptKind {
    Native,
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

impl ScriptKind {
    /// Language id as used by the script-data language view: PlutusV1
    /// is 0, PlutusV2 is 1, PlutusV3 is 2. Native scripts have none.
    pub fn language_id(&self) -> Option<u8> {
        match self {
            ScriptKind::Native => None,
            ScriptKind::PlutusV1 => Some(0),
            ScriptKind::PlutusV2 => Some(1),
            ScriptKind::PlutusV3 => Some(2),
        }
    }

    pub fn is_plutus(&self) -> bool {
        !matches!(self, ScriptKind::Native)
    }

    fn hash_tag(&self) -> u8 {
        match self {
            ScriptKind::Native => 0,
            ScriptKind::PlutusV1 => 1,
            ScriptKind::PlutusV2 => 2,
            ScriptKind::PlutusV3 => 3,
        }
    }
}

/// A script carried by the builder, either as a witness or as a
/// reference-script payload on an output.
///
/// `bytes` is the raw script body: CBOR for native scripts, the
/// double-wrapped flat encoding for Plutus scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub kind: ScriptKind,
    pub bytes: Vec<u8>,
}

impl Script {
    pub fn new(kind: ScriptKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    /// Ledger script hash: BLAKE2b-224 over the language tag prefix and
    /// the script body.
    pub fn hash(&self) -> Hash<28> {
        Hasher::<224>::hash_tagged(&self.bytes, self.kind.hash_tag())
    }

    /// Serialized size as it counts toward the reference-script fee.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub(crate) fn to_wire_ref(&self) -> Result<CborWrap<conway::ScriptRef<'static>>, Error> {
        let script_ref = match self.kind {
            ScriptKind::Native => {
                let native = NativeScript::decode_fragment(&self.bytes)
                    .map_err(|e| Error::Decoding(format!("native script: {e}")))?;
                conway::ScriptRef::NativeScript(KeepRaw::from(native))
            }
            ScriptKind::PlutusV1 => {
                conway::ScriptRef::PlutusV1Script(PlutusScript::<1>(self.bytes.clone().into()))
            }
            ScriptKind::PlutusV2 => {
                conway::ScriptRef::PlutusV2Script(PlutusScript::<2>(self.bytes.clone().into()))
            }
            ScriptKind::PlutusV3 => {
                conway::ScriptRef::PlutusV3Script(PlutusScript::<3>(self.bytes.clone().into()))
            }
        };
        Ok(CborWrap(script_ref))
    }
}

/// Datum attached to an output: either a hash reference or the inline
/// CBOR-encoded Plutus data itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatumOption {
    Hash(Hash<32>),
    Inline(Vec<u8>),
}

impl DatumOption {
    /// The datum hash: the referenced hash, or BLAKE2b-256 of the inline
    /// payload.
    pub fn hash(&self) -> Hash<32> {
        match self {
            DatumOption::Hash(hash) => *hash,
            DatumOption::Inline(bytes) => Hasher::<256>::hash(bytes),
        }
    }

    pub(crate) fn to_wire(&self) -> Result<conway::DatumOption<'static>, Error> {
        match self {
            DatumOption::Hash(hash) => Ok(conway::DatumOption::Hash(*hash)),
            DatumOption::Inline(bytes) => {
                let data = PlutusData::decode_fragment(bytes)
                    .map_err(|e| Error::Decoding(format!("inline datum: {e}")))?;
                Ok(conway::DatumOption::Data(CborWrap(data.into())))
            }
        }
    }
}

/// Hash a raw CBOR-encoded datum the way the ledger does.
pub fn datum_hash(bytes: &[u8]) -> Hash<32> {
    Hasher::<256>::hash(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_hash_depends_on_language_tag() {
        let bytes = hex::decode("4d01000033222220051200120011").unwrap();
        let v1 = Script::new(ScriptKind::PlutusV1, bytes.clone());
        let v2 = Script::new(ScriptKind::PlutusV2, bytes);
        assert_ne!(v1.hash(), v2.hash());
    }

    #[test]
    fn inline_datum_hash_matches_payload_hash() {
        // unit constructor, the most common datum on chain
        let unit = hex::decode("d87980").unwrap();
        let datum = DatumOption::Inline(unit.clone());
        assert_eq!(datum.hash(), datum_hash(&unit));
    }
}
