use pallas::codec::utils::Bytes;
use pallas::crypto::hash::Hash;
use pallas::ledger::addresses::{Address, Network};

use crate::error::Error;

// Conway CDDL reward account header: bits 7-5 are 111, bit 4 selects a
// script credential, bits 3-0 carry the network id.
const HEADER_PREFIX: u8 = 0b1110_0000;
const HEADER_SCRIPT_BIT: u8 = 0b0001_0000;
const HEADER_NETWORK_MASK: u8 = 0b0000_1111;

/// A reward (stake) account in raw header+credential form, the shape
/// the withdrawal map is keyed by on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RewardAccount(Bytes);

impl RewardAccount {
    pub fn from_key_hash(network: Network, key_hash: Hash<28>) -> Self {
        Self::from_parts(network, key_hash, false)
    }

    pub fn from_script_hash(network: Network, script_hash: Hash<28>) -> Self {
        Self::from_parts(network, script_hash, true)
    }

    fn from_parts(network: Network, credential: Hash<28>, is_script: bool) -> Self {
        let mut header = HEADER_PREFIX | (network_id(network) & HEADER_NETWORK_MASK);
        if is_script {
            header |= HEADER_SCRIPT_BIT;
        }

        let mut bytes = Vec::with_capacity(1 + 28);
        bytes.push(header);
        bytes.extend_from_slice(credential.as_ref());
        RewardAccount(Bytes::from(bytes))
    }

    /// Parse a stake address into a reward account.
    pub fn from_address(address: &Address) -> Result<Self, Error> {
        match address {
            Address::Stake(stake) => Ok(RewardAccount(Bytes::from(stake.to_vec()))),
            _ => Err(Error::InvalidAddressType),
        }
    }

    /// Whether the account is controlled by a script credential, which
    /// makes withdrawals require a redeemer.
    pub fn is_script(&self) -> bool {
        self.0
            .first()
            .is_some_and(|header| header & HEADER_SCRIPT_BIT != 0)
    }

    /// The 28-byte credential hash behind the header byte.
    pub fn credential_hash(&self) -> Result<Hash<28>, Error> {
        let bytes: &[u8] = self.0.as_ref();
        if bytes.len() != 29 {
            return Err(Error::InvalidCredentialType);
        }
        Ok(Hash::from(&bytes[1..29]))
    }

    pub fn to_wire(&self) -> Bytes {
        self.0.clone()
    }
}

impl AsRef<[u8]> for RewardAccount {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

fn network_id(network: Network) -> u8 {
    match network {
        Network::Testnet => 0,
        Network::Mainnet => 1,
        Network::Other(n) => n,
    }
}
