use pallas::crypto::hash::Hash;
use pallas::ledger::primitives::StakeCredential;
use pallas::ledger::primitives::conway::{self, Anchor, DRep};

use crate::error::Error;
use crate::params::ProtocolParams;

/// A stake or DRep credential by hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Credential {
    Key(Hash<28>),
    Script(Hash<28>),
}

impl Credential {
    pub fn hash(&self) -> Hash<28> {
        match self {
            Credential::Key(hash) | Credential::Script(hash) => *hash,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::Script(_))
    }

    pub fn to_wire(&self) -> StakeCredential {
        match self {
            Credential::Key(hash) => StakeCredential::AddrKeyhash(*hash),
            Credential::Script(hash) => StakeCredential::ScriptHash(*hash),
        }
    }
}

/// Builder-level certificates. Deposits are `Option<u64>`: `None` means
/// the amount is taken from the protocol parameters when the
/// transaction is balanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Certificate {
    StakeRegistration {
        credential: Credential,
        deposit: Option<u64>,
    },
    StakeDeregistration {
        credential: Credential,
        deposit: Option<u64>,
    },
    StakeDelegation {
        credential: Credential,
        pool: Hash<28>,
    },
    /// Delegate voting power to a DRep (Conway vote delegation).
    VoteDelegation {
        credential: Credential,
        drep: DRep,
    },
    DRepRegistration {
        credential: Credential,
        deposit: Option<u64>,
        anchor: Option<Anchor>,
    },
    DRepUpdate {
        credential: Credential,
        anchor: Option<Anchor>,
    },
    DRepDeregistration {
        credential: Credential,
        deposit: Option<u64>,
    },
}

impl Certificate {
    pub fn credential(&self) -> &Credential {
        match self {
            Certificate::StakeRegistration { credential, .. }
            | Certificate::StakeDeregistration { credential, .. }
            | Certificate::StakeDelegation { credential, .. }
            | Certificate::VoteDelegation { credential, .. }
            | Certificate::DRepRegistration { credential, .. }
            | Certificate::DRepUpdate { credential, .. }
            | Certificate::DRepDeregistration { credential, .. } => credential,
        }
    }

    /// Script hash authorizing this certificate, when the credential is
    /// a script.
    pub fn script_hash(&self) -> Option<Hash<28>> {
        match self.credential() {
            Credential::Script(hash) => Some(*hash),
            Credential::Key(_) => None,
        }
    }

    /// Fill an unset deposit from the protocol parameters.
    pub fn fill_deposit(&mut self, params: &ProtocolParams) {
        match self {
            Certificate::StakeRegistration { deposit, .. }
            | Certificate::StakeDeregistration { deposit, .. } => {
                deposit.get_or_insert(params.stake_credential_deposit);
            }
            Certificate::DRepRegistration { deposit, .. }
            | Certificate::DRepDeregistration { deposit, .. } => {
                deposit.get_or_insert(params.delegate_representative_deposit);
            }
            Certificate::StakeDelegation { .. }
            | Certificate::VoteDelegation { .. }
            | Certificate::DRepUpdate { .. } => {}
        }
    }

    /// Lovelace locked by this certificate; registrations count
    /// positive, deregistration refunds count negative.
    pub fn deposit_delta(&self) -> i64 {
        match self {
            Certificate::StakeRegistration { deposit, .. }
            | Certificate::DRepRegistration { deposit, .. } => deposit.unwrap_or(0) as i64,
            Certificate::StakeDeregistration { deposit, .. }
            | Certificate::DRepDeregistration { deposit, .. } => -(deposit.unwrap_or(0) as i64),
            Certificate::StakeDelegation { .. }
            | Certificate::VoteDelegation { .. }
            | Certificate::DRepUpdate { .. } => 0,
        }
    }

    pub fn to_wire(&self) -> Result<conway::Certificate, Error> {
        match self {
            Certificate::StakeRegistration {
                credential,
                deposit,
            } => {
                let deposit = deposit
                    .ok_or(Error::ProtocolParamsIncomplete("stakeCredentialDeposit"))?;
                Ok(conway::Certificate::Reg(credential.to_wire(), deposit))
            }
            Certificate::StakeDeregistration {
                credential,
                deposit,
            } => {
                let deposit = deposit
                    .ok_or(Error::ProtocolParamsIncomplete("stakeCredentialDeposit"))?;
                Ok(conway::Certificate::UnReg(credential.to_wire(), deposit))
            }
            Certificate::StakeDelegation { credential, pool } => Ok(
                conway::Certificate::StakeDelegation(credential.to_wire(), *pool),
            ),
            Certificate::VoteDelegation { credential, drep } => Ok(
                conway::Certificate::VoteDeleg(credential.to_wire(), drep.clone()),
            ),
            Certificate::DRepRegistration {
                credential,
                deposit,
                anchor,
            } => {
                let deposit = deposit.ok_or(Error::ProtocolParamsIncomplete(
                    "delegateRepresentativeDeposit",
                ))?;
                Ok(conway::Certificate::RegDRepCert(
                    credential.to_wire(),
                    deposit,
                    anchor.clone(),
                ))
            }
            Certificate::DRepUpdate { credential, anchor } => Ok(
                conway::Certificate::UpdateDRepCert(credential.to_wire(), anchor.clone()),
            ),
            Certificate::DRepDeregistration {
                credential,
                deposit,
            } => {
                let deposit = deposit.ok_or(Error::ProtocolParamsIncomplete(
                    "delegateRepresentativeDeposit",
                ))?;
                Ok(conway::Certificate::UnRegDRepCert(
                    credential.to_wire(),
                    deposit,
                ))
            }
        }
    }
}
