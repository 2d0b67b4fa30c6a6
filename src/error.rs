use thiserror::Error;

/// Everything that can go wrong while assembling or balancing a
/// transaction. The set is closed on purpose: callers are expected to
/// match on it, and collaborator failures (provider, evaluator) are
/// funnelled through [`Error::Provider`].
#[derive(Debug, Error)]
pub enum Error {
    /// A required piece of builder state was never supplied.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// CBOR serialization failed.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// CBOR deserialization failed.
    #[error("decoding failed: {0}")]
    Decoding(String),

    /// Authentication tag or checksum did not match on decryption.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// The address variant cannot be used where it was supplied.
    #[error("invalid address type")]
    InvalidAddressType,

    /// Credential pair does not classify as any known address kind.
    #[error("invalid credential type")]
    InvalidCredentialType,

    #[error("malformed Plutus cost model")]
    InvalidPlutusCostModel,

    /// Coin selection could not cover the target value.
    #[error("insufficient funds: short of {0}")]
    InsufficientFunds(String),

    /// The change output cannot reach its own minimum lovelace.
    #[error("insufficient funds to cover the minimum lovelace of the change output")]
    InsufficientFundsForChange,

    #[error("collateral would require more than {limit} inputs")]
    CollateralLimit { limit: u64 },

    /// A script-locked input, withdrawal, mint, vote or proposal was
    /// added without a redeemer.
    #[error("script-locked action is missing its redeemer")]
    MissingRedeemer,

    /// Protocol parameters lack a field the computation needs, e.g. the
    /// cost model of a flagged Plutus version.
    #[error("protocol parameters incomplete: {0}")]
    ProtocolParamsIncomplete(&'static str),

    /// The balancing fixed point did not settle within the pass budget.
    #[error("balancing did not converge after {0} passes")]
    BalancingDiverged(u32),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("index out of bounds")]
    IndexOutOfBounds,

    /// A numeric conversion would have dropped information.
    #[error("numeric conversion lost precision")]
    LossOfPrecision,

    /// Value arithmetic overflowed. Never silently truncated.
    #[error("arithmetic overflow in value computation")]
    IntegerOverflow,

    /// Failure reported by an external collaborator (provider or
    /// evaluator). Not retried.
    #[error("provider failure: {0}")]
    Provider(#[from] anyhow::Error),
}
