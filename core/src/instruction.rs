//! Ledger Instruction Payloads
//!
//! ```text
//! Deposit  (40 bytes):   amount u64 LE | precommitment [32]
//! Withdraw (76 + n):     amount u64 LE | nullifier_hash [32] | new_commitment [32]
//!                        | proof_len u32 LE | proof [n]
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};
use thiserror::Error;
use zyncx_privacy::{Commitment, NullifierHash, Precommitment};

pub const DEPOSIT_IX_SIZE: usize = 8 + 32;
pub const WITHDRAW_IX_HEADER_SIZE: usize = 8 + 32 + 32 + 4;

/// Upper bound on proof bytes accepted in one instruction
pub const MAX_PROOF_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    #[error("instruction truncated: needed {expected} bytes, got {found}")]
    Truncated { expected: usize, found: usize },

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),

    #[error("proof of {0} bytes exceeds the {MAX_PROOF_LEN} byte limit")]
    ProofTooLarge(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositInstruction {
    pub amount: u64,
    pub precommitment: Precommitment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawInstruction {
    pub amount: u64,
    pub nullifier_hash: NullifierHash,
    /// All zero on a full withdrawal
    pub new_commitment: Commitment,
    pub proof: Vec<u8>,
}

fn read_word(cursor: &mut Cursor<&[u8]>) -> std::io::Result<[u8; 32]> {
    let mut word = [0u8; 32];
    cursor.read_exact(&mut word)?;
    Ok(word)
}

fn ensure_len(bytes: &[u8], expected: usize) -> Result<(), InstructionError> {
    if bytes.len() < expected {
        return Err(InstructionError::Truncated {
            expected,
            found: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(InstructionError::TrailingBytes(bytes.len() - expected));
    }
    Ok(())
}

impl DepositInstruction {
    pub fn to_bytes(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut cursor = Cursor::new(Vec::with_capacity(DEPOSIT_IX_SIZE));
        cursor.write_u64::<LittleEndian>(self.amount)?;
        cursor.write_all(&self.precommitment.0)?;
        Ok(cursor.into_inner())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InstructionError> {
        ensure_len(bytes, DEPOSIT_IX_SIZE)?;

        let truncated = |_| InstructionError::Truncated {
            expected: DEPOSIT_IX_SIZE,
            found: bytes.len(),
        };
        let mut cursor = Cursor::new(bytes);
        let amount = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
        let precommitment = Precommitment(read_word(&mut cursor).map_err(truncated)?);

        Ok(Self {
            amount,
            precommitment,
        })
    }
}

impl WithdrawInstruction {
    pub fn to_bytes(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut cursor = Cursor::new(Vec::with_capacity(
            WITHDRAW_IX_HEADER_SIZE + self.proof.len(),
        ));
        cursor.write_u64::<LittleEndian>(self.amount)?;
        cursor.write_all(&self.nullifier_hash.0)?;
        cursor.write_all(&self.new_commitment.0)?;
        cursor.write_u32::<LittleEndian>(self.proof.len() as u32)?;
        cursor.write_all(&self.proof)?;
        Ok(cursor.into_inner())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InstructionError> {
        if bytes.len() < WITHDRAW_IX_HEADER_SIZE {
            return Err(InstructionError::Truncated {
                expected: WITHDRAW_IX_HEADER_SIZE,
                found: bytes.len(),
            });
        }

        let header_truncated = |_| InstructionError::Truncated {
            expected: WITHDRAW_IX_HEADER_SIZE,
            found: bytes.len(),
        };
        let mut cursor = Cursor::new(bytes);
        let amount = cursor.read_u64::<LittleEndian>().map_err(header_truncated)?;
        let nullifier_hash = NullifierHash(read_word(&mut cursor).map_err(header_truncated)?);
        let new_commitment = Commitment(read_word(&mut cursor).map_err(header_truncated)?);
        let proof_len = cursor.read_u32::<LittleEndian>().map_err(header_truncated)? as usize;

        if proof_len > MAX_PROOF_LEN {
            return Err(InstructionError::ProofTooLarge(proof_len));
        }
        ensure_len(bytes, WITHDRAW_IX_HEADER_SIZE + proof_len)?;

        let proof = bytes[WITHDRAW_IX_HEADER_SIZE..].to_vec();

        Ok(Self {
            amount,
            nullifier_hash,
            new_commitment,
            proof,
        })
    }

    /// Full withdrawals leave no change note behind
    pub fn is_partial(&self) -> bool {
        !self.new_commitment.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn withdraw() -> WithdrawInstruction {
        WithdrawInstruction {
            amount: 1_000_000_000,
            nullifier_hash: NullifierHash([0xaa; 32]),
            new_commitment: Commitment([0xbb; 32]),
            proof: vec![1, 2, 3, 4, 5],
        }
    }

    #[test]
    fn test_deposit_layout() {
        let ix = DepositInstruction {
            amount: 0x0102030405060708,
            precommitment: Precommitment([7u8; 32]),
        };
        let bytes = ix.to_bytes().unwrap();

        assert_eq!(bytes.len(), DEPOSIT_IX_SIZE);
        assert_eq!(&bytes[..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(DepositInstruction::from_bytes(&bytes).unwrap(), ix);
    }

    #[test]
    fn test_withdraw_layout() {
        let ix = withdraw();
        let bytes = ix.to_bytes().unwrap();

        assert_eq!(bytes.len(), WITHDRAW_IX_HEADER_SIZE + 5);
        assert_eq!(&bytes[72..76], &5u32.to_le_bytes());
        assert_eq!(&bytes[76..], &[1, 2, 3, 4, 5]);
        assert_eq!(WithdrawInstruction::from_bytes(&bytes).unwrap(), ix);
        assert!(ix.is_partial());
    }

    #[test]
    fn test_truncated_deposit() {
        let bytes = DepositInstruction {
            amount: 1,
            precommitment: Precommitment([1u8; 32]),
        }
        .to_bytes()
        .unwrap();

        assert_eq!(
            DepositInstruction::from_bytes(&bytes[..39]),
            Err(InstructionError::Truncated {
                expected: 40,
                found: 39
            })
        );
        let mut long = bytes.clone();
        long.push(0);
        assert_eq!(
            DepositInstruction::from_bytes(&long),
            Err(InstructionError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_truncated_withdraw() {
        let bytes = withdraw().to_bytes().unwrap();

        assert_eq!(
            WithdrawInstruction::from_bytes(&bytes[..50]),
            Err(InstructionError::Truncated {
                expected: WITHDRAW_IX_HEADER_SIZE,
                found: 50
            })
        );
        assert_eq!(
            WithdrawInstruction::from_bytes(&bytes[..bytes.len() - 1]),
            Err(InstructionError::Truncated {
                expected: bytes.len(),
                found: bytes.len() - 1
            })
        );
    }

    #[test]
    fn test_oversized_proof_length() {
        let mut bytes = withdraw().to_bytes().unwrap();
        bytes[72..76].copy_from_slice(&(MAX_PROOF_LEN as u32 + 1).to_le_bytes());
        assert_eq!(
            WithdrawInstruction::from_bytes(&bytes),
            Err(InstructionError::ProofTooLarge(MAX_PROOF_LEN + 1))
        );
    }

    #[test]
    fn test_full_withdrawal_flag() {
        let mut ix = withdraw();
        ix.new_commitment = Commitment::ZERO;
        assert!(!ix.is_partial());
    }
}
