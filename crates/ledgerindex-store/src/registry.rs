//! The fixed registry of sub-databases.
//!
//! Callers address sub-databases through [`IndexDb`], never by runtime
//! name; the mapping to column-family names is assigned once here and the
//! handles are validated when the environment opens.

use std::fmt;

/// The sub-databases of the index environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexDb {
    /// Spend marker → transaction id (duplicate-sorted).
    KeyImage,
    /// Output public key → transaction id (duplicate-sorted).
    OutputKey,
    /// Output public key → amount (single-valued).
    OutputAmount,
    /// Block timestamp → output record (duplicate-sorted, range-scanned).
    OutputInfo,
    /// Transaction public key → transaction id (duplicate-sorted).
    TxPubKey,
    /// Payment id → transaction id (duplicate-sorted).
    PaymentId,
    /// Encrypted payment id → transaction id (duplicate-sorted).
    EncryptedPaymentId,
}

/// Value multiplicity of a sub-database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    /// One value per key; a later put replaces the earlier one.
    Single,
    /// Many values per key, enumerated in insertion order.
    DupSorted,
}

impl IndexDb {
    pub const ALL: [IndexDb; 7] = [
        IndexDb::KeyImage,
        IndexDb::OutputKey,
        IndexDb::OutputAmount,
        IndexDb::OutputInfo,
        IndexDb::TxPubKey,
        IndexDb::PaymentId,
        IndexDb::EncryptedPaymentId,
    ];

    /// Column-family name inside the environment.
    pub fn name(self) -> &'static str {
        match self {
            IndexDb::KeyImage => "key_image",
            IndexDb::OutputKey => "output_key",
            IndexDb::OutputAmount => "output_amount",
            IndexDb::OutputInfo => "output_info",
            IndexDb::TxPubKey => "tx_pub_key",
            IndexDb::PaymentId => "payment_id",
            IndexDb::EncryptedPaymentId => "encrypted_payment_id",
        }
    }

    pub fn kind(self) -> DbKind {
        match self {
            IndexDb::OutputAmount => DbKind::Single,
            _ => DbKind::DupSorted,
        }
    }
}

impl fmt::Display for IndexDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Internal column family holding the duplicate-sequence counter.
pub(crate) const CF_META: &str = "meta";

/// Meta key for the next duplicate-entry sequence number.
pub(crate) const NEXT_SEQ_KEY: &[u8] = b"next_seq";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        for (i, a) in IndexDb::ALL.iter().enumerate() {
            for b in &IndexDb::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
            assert_ne!(a.name(), CF_META);
        }
    }

    #[test]
    fn only_amounts_are_single_valued() {
        for db in IndexDb::ALL {
            let expected = if db == IndexDb::OutputAmount {
                DbKind::Single
            } else {
                DbKind::DupSorted
            };
            assert_eq!(db.kind(), expected);
        }
    }
}
