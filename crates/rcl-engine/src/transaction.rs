use std::fmt;

use rcl_crypto::{ContentHasher, KeyError, KeyPair, PublicKey};
use rcl_types::{AccountId, Amount, Drops, Hash256};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::result::TxCode;
use crate::sandbox::BalanceDelta;

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// TrustSet: stop rippling through the line on the sender's side.
pub const TF_SET_NO_RIPPLE: u32 = 0x0002_0000;
/// TrustSet: allow rippling through the line on the sender's side.
pub const TF_CLEAR_NO_RIPPLE: u32 = 0x0004_0000;
/// TrustSet: freeze the peer's holdings on the line.
pub const TF_SET_FREEZE: u32 = 0x0010_0000;
/// TrustSet: lift a freeze set with [`TF_SET_FREEZE`].
pub const TF_CLEAR_FREEZE: u32 = 0x0020_0000;

/// AccountSet: permanently give up the ability to freeze.
pub const ASF_NO_FREEZE: u32 = 6;
/// AccountSet: freeze every currency the account issues.
pub const ASF_GLOBAL_FREEZE: u32 = 7;
/// AccountSet: new trust lines ripple on this account's side.
pub const ASF_DEFAULT_RIPPLE: u32 = 8;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxType {
    Payment,
    TrustSet,
    OfferCreate,
    OfferCancel,
    AccountSet,
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Payment => "Payment",
            Self::TrustSet => "TrustSet",
            Self::OfferCreate => "OfferCreate",
            Self::OfferCancel => "OfferCancel",
            Self::AccountSet => "AccountSet",
        };
        f.write_str(name)
    }
}

/// A client-built transaction.
///
/// One flat record covers every type; fields a type does not use stay
/// `None`. The id is the TX_ID-domain hash of the full bincode encoding,
/// signature included. The signature covers the same encoding with the
/// signature field cleared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_type: TxType,
    pub account: AccountId,
    pub sequence: u32,
    pub fee: Drops,
    pub signing_key: PublicKey,
    pub signature: Option<Vec<u8>>,
    pub flags: u32,
    pub destination: Option<AccountId>,
    pub amount: Option<Amount>,
    pub limit_amount: Option<Amount>,
    pub taker_pays: Option<Amount>,
    pub taker_gets: Option<Amount>,
    pub offer_sequence: Option<u32>,
    pub set_flag: Option<u32>,
    pub clear_flag: Option<u32>,
}

impl Transaction {
    /// An unsigned transaction of `tx_type` from the owner of `signing_key`.
    pub fn new(tx_type: TxType, signing_key: PublicKey, sequence: u32, fee: Drops) -> Self {
        Self {
            tx_type,
            account: signing_key.account_id(),
            sequence,
            fee,
            signing_key,
            signature: None,
            flags: 0,
            destination: None,
            amount: None,
            limit_amount: None,
            taker_pays: None,
            taker_gets: None,
            offer_sequence: None,
            set_flag: None,
            clear_flag: None,
        }
    }

    pub fn payment(
        signing_key: PublicKey,
        sequence: u32,
        fee: Drops,
        destination: AccountId,
        amount: Amount,
    ) -> Self {
        Self {
            destination: Some(destination),
            amount: Some(amount),
            ..Self::new(TxType::Payment, signing_key, sequence, fee)
        }
    }

    pub fn trust_set(signing_key: PublicKey, sequence: u32, fee: Drops, limit: Amount) -> Self {
        Self {
            limit_amount: Some(limit),
            ..Self::new(TxType::TrustSet, signing_key, sequence, fee)
        }
    }

    pub fn offer_create(
        signing_key: PublicKey,
        sequence: u32,
        fee: Drops,
        taker_pays: Amount,
        taker_gets: Amount,
    ) -> Self {
        Self {
            taker_pays: Some(taker_pays),
            taker_gets: Some(taker_gets),
            ..Self::new(TxType::OfferCreate, signing_key, sequence, fee)
        }
    }

    pub fn offer_cancel(
        signing_key: PublicKey,
        sequence: u32,
        fee: Drops,
        offer_sequence: u32,
    ) -> Self {
        Self {
            offer_sequence: Some(offer_sequence),
            ..Self::new(TxType::OfferCancel, signing_key, sequence, fee)
        }
    }

    pub fn account_set(signing_key: PublicKey, sequence: u32, fee: Drops) -> Self {
        Self::new(TxType::AccountSet, signing_key, sequence, fee)
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_set_flag(mut self, flag: u32) -> Self {
        self.set_flag = Some(flag);
        self
    }

    pub fn with_clear_flag(mut self, flag: u32) -> Self {
        self.clear_flag = Some(flag);
        self
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Transaction id.
    pub fn id(&self) -> EngineResult<Hash256> {
        ContentHasher::TX_ID
            .hash_bincode(self)
            .map_err(|e| EngineError::Serialization(e.to_string()))
    }

    /// The bytes a signature covers.
    pub fn signing_bytes(&self) -> EngineResult<Vec<u8>> {
        let unsigned = Self {
            signature: None,
            ..self.clone()
        };
        bincode::serialize(&unsigned).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    /// Sign in place with `keys`.
    pub fn sign(mut self, keys: &KeyPair) -> Result<Self, SignError> {
        let message = self.signing_bytes()?;
        self.signature = Some(keys.sign(&message)?);
        Ok(self)
    }
}

/// Failure to sign a transaction.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Transaction tree records
// ---------------------------------------------------------------------------

/// What the engine recorded about an applied transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMeta {
    pub result: TxCode,
    /// Position in the ledger's application order.
    pub index: u32,
    pub deltas: Vec<BalanceDelta>,
}

/// Value stored in a ledger's transaction tree, keyed by transaction id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx: Transaction,
    pub meta: TxMeta,
}

impl TxRecord {
    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> EngineResult<Self> {
        bincode::deserialize(bytes).map_err(|e| EngineError::Serialization(e.to_string()))
    }
}
