use std::fmt;

use serde::{Deserialize, Serialize};

/// The five ways applying a transaction can end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeClass {
    Success,
    /// Structurally invalid or a replay. Never retried.
    Malformed,
    /// Signing key or signature rejected. Never retried.
    BadSignature,
    /// May succeed once other transactions of the same close apply.
    Retriable,
    /// Well formed but refused by ledger rules. Never retried.
    Permanent,
}

impl OutcomeClass {
    /// Whether a failed transaction stays in the canonical set.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Retriable)
    }
}

impl fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Malformed => "malformed",
            Self::BadSignature => "bad-signature",
            Self::Retriable => "retriable",
            Self::Permanent => "permanent",
        };
        f.write_str(name)
    }
}

/// Result code of one transaction application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxCode {
    Success,

    // Malformed
    Unsupported,
    MissingField,
    BadAmount,
    BadFee,
    InvalidFlags,
    Redundant,
    BadSequence,
    PastSequence,

    // BadSignature
    SigningKeyMismatch,
    InvalidSignature,

    // Retriable
    NoAccount,
    FutureSequence,
    InsufficientFunds,
    NoTrustLine,
    LimitExceeded,
    NoIssuer,
    UnfundedOffer,

    // Permanent
    Frozen,
    NoRipple,
    NoSuchOffer,
    NoPermission,
    RedundantLine,
    /// A balance would leave the representable issued-value range.
    Overflow,
}

impl TxCode {
    pub fn class(&self) -> OutcomeClass {
        match self {
            Self::Success => OutcomeClass::Success,
            Self::Unsupported
            | Self::MissingField
            | Self::BadAmount
            | Self::BadFee
            | Self::InvalidFlags
            | Self::Redundant
            | Self::BadSequence
            | Self::PastSequence => OutcomeClass::Malformed,
            Self::SigningKeyMismatch | Self::InvalidSignature => OutcomeClass::BadSignature,
            Self::NoAccount
            | Self::FutureSequence
            | Self::InsufficientFunds
            | Self::NoTrustLine
            | Self::LimitExceeded
            | Self::NoIssuer
            | Self::UnfundedOffer => OutcomeClass::Retriable,
            Self::Frozen
            | Self::NoRipple
            | Self::NoSuchOffer
            | Self::NoPermission
            | Self::RedundantLine
            | Self::Overflow => OutcomeClass::Permanent,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_retriable(&self) -> bool {
        self.class().is_retriable()
    }

    /// Short stable token, used in logs and reports.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Unsupported => "unsupported",
            Self::MissingField => "missing_field",
            Self::BadAmount => "bad_amount",
            Self::BadFee => "bad_fee",
            Self::InvalidFlags => "invalid_flags",
            Self::Redundant => "redundant",
            Self::BadSequence => "bad_sequence",
            Self::PastSequence => "past_sequence",
            Self::SigningKeyMismatch => "signing_key_mismatch",
            Self::InvalidSignature => "invalid_signature",
            Self::NoAccount => "no_account",
            Self::FutureSequence => "future_sequence",
            Self::InsufficientFunds => "insufficient_funds",
            Self::NoTrustLine => "no_trust_line",
            Self::LimitExceeded => "limit_exceeded",
            Self::NoIssuer => "no_issuer",
            Self::UnfundedOffer => "unfunded_offer",
            Self::Frozen => "frozen",
            Self::NoRipple => "no_ripple",
            Self::NoSuchOffer => "no_such_offer",
            Self::NoPermission => "no_permission",
            Self::RedundantLine => "redundant_line",
            Self::Overflow => "overflow",
        }
    }
}

impl fmt::Display for TxCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.token(), self.class())
    }
}
