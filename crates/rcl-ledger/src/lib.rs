//! Ledgers of the replicated closing ledger.
//!
//! A [`Ledger`] is a [`LedgerHeader`] plus two Merkle trees: account state
//! (keyed by [`keylet`] functions, holding [`LedgerEntry`] values) and the
//! transactions applied in it. Ledgers move from open to sealed to closed;
//! only a closed ledger can be the parent of the next one.
//!
//! Close times count seconds from 2000-01-01 and are rounded to the
//! ledger's close-time resolution (see [`clock`]).

pub mod clock;
pub mod config;
pub mod entries;
pub mod error;
pub mod header;
pub mod keylet;
pub mod ledger;

pub use clock::{
    network_to_unix, round_close_time, CloseClock, FixedClock, SystemCloseClock,
    NETWORK_EPOCH_OFFSET,
};
pub use config::{ConfigError, LedgerConfig};
pub use entries::{AccountRoot, LedgerEntry, LedgerHashes, Offer, TrustLine};
pub use error::{LedgerError, LedgerResult};
pub use header::LedgerHeader;
pub use ledger::{Ledger, LedgerState, SKIP_LIST_SIZE};
