//! Fixed-width values carried through deposits and withdrawals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::{DIGEST_LEN, hash};

macro_rules! bytes32 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; DIGEST_LEN]);

        impl $name {
            pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

/// Formats public values as hex
macro_rules! public_debug {
    ($name:ident) => {
        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }
    };
}

/// Never prints key material
macro_rules! redacted_debug {
    ($name:ident) => {
        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(<redacted>)", stringify!($name))
            }
        }
    };
}

bytes32!(
    /// Hash preimage known only to the note holder. Losing it loses the deposit.
    Secret
);
redacted_debug!(Secret);

bytes32!(
    /// Independent secret whose hash is revealed when the note is spent
    NullifierSecret
);
redacted_debug!(NullifierSecret);

bytes32!(
    /// `H(secret || nullifier_secret)`
    Precommitment
);
public_debug!(Precommitment);

bytes32!(
    /// Merkle leaf: `H(amount_le || precommitment)`
    Commitment
);
public_debug!(Commitment);

bytes32!(
    /// `H(nullifier_secret)`, the double-spend tag
    NullifierHash
);
public_debug!(NullifierHash);

impl Precommitment {
    pub fn derive(secret: &Secret, nullifier_secret: &NullifierSecret) -> Self {
        Self(hash(&[secret.as_ref(), nullifier_secret.as_ref()]))
    }
}

impl Commitment {
    /// Placeholder for "no leaf inserted" (full withdrawal)
    pub const ZERO: Self = Self([0u8; DIGEST_LEN]);

    pub fn derive(amount: u64, precommitment: &Precommitment) -> Self {
        let amount_le = amount.to_le_bytes();
        Self(hash(&[amount_le.as_slice(), precommitment.as_ref()]))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; DIGEST_LEN]
    }
}

impl NullifierHash {
    pub fn derive(nullifier_secret: &NullifierSecret) -> Self {
        Self(hash(&[nullifier_secret.as_ref()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let s = Secret([0xab; 32]);
        let out = format!("{:?}", s);
        assert!(!out.contains("ab"));
        assert_eq!(out, "Secret(<redacted>)");
    }

    #[test]
    fn test_commitment_binds_amount() {
        let pre = Precommitment([3u8; 32]);
        assert_ne!(Commitment::derive(1, &pre), Commitment::derive(2, &pre));
    }

    #[test]
    fn test_precommitment_order_matters() {
        let a = Precommitment::derive(&Secret([1u8; 32]), &NullifierSecret([2u8; 32]));
        let b = Precommitment::derive(&Secret([2u8; 32]), &NullifierSecret([1u8; 32]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_nullifier_hash_is_not_identity() {
        let ns = NullifierSecret([5u8; 32]);
        assert_ne!(NullifierHash::derive(&ns).0, ns.0);
    }
}
