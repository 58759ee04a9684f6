use rcl_types::{AccountId, Amount, Currency, Drops, Hash256, IouValue, Quality};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Anything stored in the account-state tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntry {
    AccountRoot(AccountRoot),
    TrustLine(TrustLine),
    Offer(Offer),
    LedgerHashes(LedgerHashes),
}

impl LedgerEntry {
    pub fn encode(&self) -> LedgerResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> LedgerResult<Self> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccountRoot(_) => "account-root",
            Self::TrustLine(_) => "trust-line",
            Self::Offer(_) => "offer",
            Self::LedgerHashes(_) => "ledger-hashes",
        }
    }
}

// ---------------------------------------------------------------------------
// AccountRoot
// ---------------------------------------------------------------------------

/// Per-account record: native balance, sequence and flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRoot {
    pub account: AccountId,
    pub balance: Drops,
    /// Number of transactions applied from this account. The next one must
    /// declare `sequence + 1`.
    pub sequence: u32,
    pub flags: u32,
    /// Trust lines and offers owned by this account.
    pub owner_count: u32,
}

impl AccountRoot {
    /// Every issued currency of this account is frozen.
    pub const GLOBAL_FREEZE: u32 = 0x0040_0000;
    /// The account gave up its ability to freeze, permanently.
    pub const NO_FREEZE: u32 = 0x0020_0000;
    /// New trust lines to this account allow rippling on its side.
    pub const DEFAULT_RIPPLE: u32 = 0x0080_0000;

    pub fn new(account: AccountId, balance: Drops) -> Self {
        Self {
            account,
            balance,
            sequence: 0,
            flags: 0,
            owner_count: 0,
        }
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u32) {
        self.flags |= flag;
    }

    pub fn clear_flag(&mut self, flag: u32) {
        self.flags &= !flag;
    }

    pub fn is_globally_frozen(&self) -> bool {
        self.has_flag(Self::GLOBAL_FREEZE)
    }
}

// ---------------------------------------------------------------------------
// TrustLine
// ---------------------------------------------------------------------------

/// A credit line between two accounts in one currency.
///
/// The two parties are ordered: `low < high`. `balance` is seen from the low
/// side, so a positive balance means low holds IOUs issued by high and a
/// negative one means high holds IOUs issued by low. Every other field
/// exists once per side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustLine {
    pub low: AccountId,
    pub high: AccountId,
    pub currency: Currency,
    pub balance: IouValue,
    pub low_limit: IouValue,
    pub high_limit: IouValue,
    pub flags: u32,
    /// The account whose owner count carries this line.
    pub owner: AccountId,
}

impl TrustLine {
    pub const LOW_NO_RIPPLE: u32 = 0x0010_0000;
    pub const HIGH_NO_RIPPLE: u32 = 0x0020_0000;
    pub const LOW_FREEZE: u32 = 0x0040_0000;
    pub const HIGH_FREEZE: u32 = 0x0080_0000;

    /// An empty line between `owner` and `peer`, owned by `owner`.
    pub fn new(owner: AccountId, peer: AccountId, currency: Currency) -> Self {
        let (low, high) = if owner < peer {
            (owner, peer)
        } else {
            (peer, owner)
        };
        Self {
            low,
            high,
            currency,
            balance: IouValue::zero(),
            low_limit: IouValue::zero(),
            high_limit: IouValue::zero(),
            flags: 0,
            owner,
        }
    }

    pub fn is_low(&self, account: &AccountId) -> bool {
        self.low == *account
    }

    pub fn involves(&self, account: &AccountId) -> bool {
        self.low == *account || self.high == *account
    }

    pub fn peer_of(&self, account: &AccountId) -> AccountId {
        if self.is_low(account) {
            self.high
        } else {
            self.low
        }
    }

    /// What `account` holds of its peer's IOUs (negative: what it owes).
    pub fn balance_for(&self, account: &AccountId) -> IouValue {
        if self.is_low(account) {
            self.balance
        } else {
            self.balance.negate()
        }
    }

    pub fn set_balance_for(&mut self, account: &AccountId, value: IouValue) {
        self.balance = if self.is_low(account) {
            value
        } else {
            value.negate()
        };
    }

    /// How much of the peer's IOUs `account` is willing to hold.
    pub fn limit_of(&self, account: &AccountId) -> IouValue {
        if self.is_low(account) {
            self.low_limit
        } else {
            self.high_limit
        }
    }

    pub fn set_limit(&mut self, account: &AccountId, limit: IouValue) {
        if self.is_low(account) {
            self.low_limit = limit;
        } else {
            self.high_limit = limit;
        }
    }

    fn side_flag(&self, account: &AccountId, low: u32, high: u32) -> u32 {
        if self.is_low(account) {
            low
        } else {
            high
        }
    }

    fn set_side_flag(&mut self, flag: u32, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// `account` refuses to ripple through this line.
    pub fn no_ripple(&self, account: &AccountId) -> bool {
        self.flags & self.side_flag(account, Self::LOW_NO_RIPPLE, Self::HIGH_NO_RIPPLE) != 0
    }

    pub fn set_no_ripple(&mut self, account: &AccountId, on: bool) {
        let flag = self.side_flag(account, Self::LOW_NO_RIPPLE, Self::HIGH_NO_RIPPLE);
        self.set_side_flag(flag, on);
    }

    /// `account` has frozen its peer's holdings on this line.
    pub fn frozen_by(&self, account: &AccountId) -> bool {
        self.flags & self.side_flag(account, Self::LOW_FREEZE, Self::HIGH_FREEZE) != 0
    }

    pub fn set_freeze(&mut self, account: &AccountId, on: bool) {
        let flag = self.side_flag(account, Self::LOW_FREEZE, Self::HIGH_FREEZE);
        self.set_side_flag(flag, on);
    }

    /// Zero balance, zero limits and no freeze: the line can be deleted.
    pub fn is_default(&self) -> bool {
        self.balance.is_zero()
            && self.low_limit.is_zero()
            && self.high_limit.is_zero()
            && self.flags & (Self::LOW_FREEZE | Self::HIGH_FREEZE) == 0
    }
}

// ---------------------------------------------------------------------------
// Offer
// ---------------------------------------------------------------------------

/// A standing order in an order book, keyed by (owner, sequence).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub account: AccountId,
    pub sequence: u32,
    pub taker_pays: Amount,
    pub taker_gets: Amount,
    /// Directory key: the book prefix with `quality` in the trailing bits.
    pub book_directory: Hash256,
    pub quality: Quality,
}

// ---------------------------------------------------------------------------
// LedgerHashes
// ---------------------------------------------------------------------------

/// One skip-list entry: consecutive ancestor hashes ending at
/// `last_ledger_sequence`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHashes {
    pub last_ledger_sequence: u32,
    pub hashes: Vec<Hash256>,
}
