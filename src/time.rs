use crate::error::Error;
use crate::params::NetworkId;

/// Shelley-era slot arithmetic for a network: the slot counter and the
/// wall clock advance in lockstep from a per-network anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotConfig {
    /// Unix time, in seconds, of `zero_slot`.
    pub zero_time: u64,
    pub zero_slot: u64,
    /// Seconds per slot. One for every network since Shelley.
    pub slot_length: u64,
}

impl SlotConfig {
    pub fn for_network(network: NetworkId) -> Self {
        match network {
            NetworkId::Mainnet => SlotConfig {
                zero_time: 1_596_059_091,
                zero_slot: 4_492_800,
                slot_length: 1,
            },
            NetworkId::Preprod => SlotConfig {
                zero_time: 1_655_769_600,
                zero_slot: 86_400,
                slot_length: 1,
            },
            NetworkId::Preview => SlotConfig {
                zero_time: 1_666_656_000,
                zero_slot: 0,
                slot_length: 1,
            },
        }
    }

    pub fn for_magic(magic: u32) -> Result<Self, Error> {
        Ok(Self::for_network(NetworkId::from_magic(magic)?))
    }

    /// Slot active at the given Unix timestamp (seconds).
    pub fn slot_at(&self, unix_time: u64) -> Result<u64, Error> {
        let elapsed = unix_time.checked_sub(self.zero_time).ok_or_else(|| {
            Error::InvalidArgument("timestamp predates the era anchor".into())
        })?;
        Ok(self.zero_slot + elapsed / self.slot_length)
    }

    /// Unix timestamp (seconds) at the start of the given slot.
    pub fn time_at(&self, slot: u64) -> Result<u64, Error> {
        let since_anchor = slot
            .checked_sub(self.zero_slot)
            .ok_or(Error::IndexOutOfBounds)?;
        since_anchor
            .checked_mul(self.slot_length)
            .and_then(|secs| secs.checked_add(self.zero_time))
            .ok_or(Error::IntegerOverflow)
    }
}
