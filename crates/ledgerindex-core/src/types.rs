//! Shared types for the indexing pipeline.
//!
//! Numeric identifiers that end up as index keys or values use a
//! fixed-width big-endian encoding so byte-lexicographic order equals
//! numeric order; range scans and the store's native sort both rely on it.

use std::fmt;

use serde::{Deserialize, Serialize};

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

// ─── TxId ─────────────────────────────────────────────────────────────────────

/// Compact surrogate id for a transaction, assigned by the ledger.
///
/// Used everywhere instead of the full hash to keep index entries small and
/// to allow direct join-back to the ledger. Never recomputed locally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TxId(pub u64);

impl TxId {
    /// Fixed-width big-endian encoding (sorts numerically as bytes).
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Fixed-size byte identifiers ──────────────────────────────────────────────

macro_rules! byte_newtype {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "("))?;
                write_hex(f, &self.0)?;
                write!(f, ")")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_hex(f, &self.0)
            }
        }
    };
}

byte_newtype!(
    /// Full transaction hash, used only at the ledger boundary.
    TxHash,
    32
);

byte_newtype!(
    /// Block hash.
    BlockHash,
    32
);

byte_newtype!(
    /// Spend marker of a consumed input. One per spent output; in a
    /// consistent chain each should appear at most once across all
    /// transactions (not enforced by the store).
    KeyImage,
    32
);

byte_newtype!(
    /// An output (or transaction) public key.
    PublicKey,
    32
);

byte_newtype!(
    /// Full-length payment identifier embedded in a transaction.
    PaymentId,
    32
);

byte_newtype!(
    /// Short encrypted payment identifier.
    EncryptedPaymentId,
    8
);

impl PaymentId {
    /// The "absent" sentinel; entries equal to it are not indexed.
    pub const NULL: PaymentId = PaymentId([0u8; 32]);

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl EncryptedPaymentId {
    /// The "absent" sentinel; entries equal to it are not indexed.
    pub const NULL: EncryptedPaymentId = EncryptedPaymentId([0u8; 8]);

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

// ─── Ledger entities ──────────────────────────────────────────────────────────

/// One output created by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub public_key: PublicKey,
    pub amount: u64,
}

/// A transaction as handed over by the ledger, already parsed down to the
/// attributes this index cares about.
///
/// `payment_id` and `encrypted_payment_id` are independent: a transaction
/// may carry one, both, or neither, and either may still equal its NULL
/// sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger-assigned surrogate id.
    pub id: TxId,
    pub hash: TxHash,
    pub tx_pub_key: PublicKey,
    pub key_images: Vec<KeyImage>,
    pub outputs: Vec<TxOutput>,
    pub payment_id: Option<PaymentId>,
    pub encrypted_payment_id: Option<EncryptedPaymentId>,
}

/// A block header plus the hashes of its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub hash: BlockHash,
    /// Unix timestamp (seconds). Keys the output-info index.
    pub timestamp: u64,
    /// The block's coinbase-equivalent transaction.
    pub miner_tx_hash: TxHash,
    /// Remaining transactions, in block order.
    pub tx_hashes: Vec<TxHash>,
}

impl Block {
    /// All transaction hashes in block order, coinbase first.
    pub fn all_tx_hashes(&self) -> impl Iterator<Item = &TxHash> {
        std::iter::once(&self.miner_tx_hash).chain(self.tx_hashes.iter())
    }

    pub fn tx_count(&self) -> usize {
        1 + self.tx_hashes.len()
    }
}

// ─── OutputInfo ───────────────────────────────────────────────────────────────

/// Composite record stored under the block timestamp in the output-info
/// index. Many outputs share one timestamp (one per block), so the index
/// is multi-valued and ordered by timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub out_pub_key: PublicKey,
    pub tx_id: TxId,
    pub tx_pub_key: PublicKey,
    pub amount: u64,
    /// Position of the output within its transaction.
    pub index_in_tx: u32,
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_id_be_roundtrip() {
        let id = TxId(0x0102_0304_0506_0708);
        assert_eq!(TxId::from_be_bytes(id.to_be_bytes()), id);
    }

    #[test]
    fn tx_id_bytes_sort_numerically() {
        assert!(TxId(255).to_be_bytes() < TxId(256).to_be_bytes());
        assert!(TxId(256).to_be_bytes() < TxId(1 << 40).to_be_bytes());
    }

    #[test]
    fn payment_id_sentinels() {
        assert!(PaymentId::NULL.is_null());
        assert!(EncryptedPaymentId::NULL.is_null());

        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        assert!(!PaymentId(bytes).is_null());
    }

    #[test]
    fn block_tx_order_is_coinbase_first() {
        let block = Block {
            height: 7,
            hash: BlockHash([0xbb; 32]),
            timestamp: 1_450_000_000,
            miner_tx_hash: TxHash([0x01; 32]),
            tx_hashes: vec![TxHash([0x02; 32]), TxHash([0x03; 32])],
        };
        let hashes: Vec<_> = block.all_tx_hashes().collect();
        assert_eq!(hashes.len(), 3);
        assert_eq!(*hashes[0], block.miner_tx_hash);
        assert_eq!(block.tx_count(), 3);
    }

    #[test]
    fn hex_display() {
        let key = PublicKey([0xab; 32]);
        assert_eq!(key.to_string(), "ab".repeat(32));
    }
}
