//! Static footprint analysis.
//!
//! Approximates the state a transaction may touch before it executes. The
//! contract: the advertised read/write sets are a superset of anything
//! execution actually accesses. The analyser may be swapped for a more
//! precise one; only that superset property is load-bearing.

use crate::access::AccessSet;
use shared_types::{Address, Hash, SignedTransaction};

/// A transaction's approximated read and write sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Footprint {
    /// Accounts/slots the transaction may read.
    pub reads: AccessSet,
    /// Accounts/slots the transaction may write.
    pub writes: AccessSet,
}

/// Compute the access footprint of `tx` for the recovered `sender`.
///
/// - The sender's balance/nonce is always read and written (fee debit,
///   nonce bump).
/// - A recipient's balance is read and written.
/// - A non-empty payload adds the first 32 payload bytes as a heuristic
///   storage slot of the recipient, plus a wildcard storage marker on the
///   same account: the heuristic alone cannot name every slot an indirect
///   call might touch, and the wildcard keeps the footprint a superset.
pub fn analyze(tx: &SignedTransaction, sender: Address) -> Footprint {
    let mut footprint = Footprint::default();

    footprint.reads.touch_balance(sender);
    footprint.writes.touch_balance(sender);

    if let Some(recipient) = tx.to {
        footprint.reads.touch_balance(recipient);
        footprint.writes.touch_balance(recipient);

        if !tx.data.is_empty() {
            let slot = heuristic_slot(&tx.data);
            footprint.reads.touch_slot(recipient, slot);
            footprint.writes.touch_slot(recipient, slot);
            footprint.reads.touch_wildcard(recipient);
            footprint.writes.touch_wildcard(recipient);
        }
    }

    footprint
}

/// First 32 payload bytes, zero-padded, interpreted as a storage slot.
pub fn heuristic_slot(data: &[u8]) -> Hash {
    let mut slot = [0u8; 32];
    let len = data.len().min(32);
    slot[..len].copy_from_slice(&data[..len]);
    Hash::from(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::U256;

    fn addr(v: u8) -> Address {
        Address::from_low_u64_be(v as u64)
    }

    fn transfer(to: Option<Address>, data: Vec<u8>) -> SignedTransaction {
        SignedTransaction {
            from: [0xAA; 32],
            to,
            value: U256::from(1u64),
            nonce: 0,
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: 21_000,
            data,
            signature: [0u8; 64],
        }
    }

    #[test]
    fn test_plain_transfer_touches_both_balances() {
        let fp = analyze(&transfer(Some(addr(2)), vec![]), addr(1));

        assert!(fp.writes.get(&addr(1)).unwrap().balance);
        assert!(fp.writes.get(&addr(2)).unwrap().balance);
        assert!(fp.reads.get(&addr(1)).unwrap().balance);
        // No storage access for an empty payload.
        assert!(fp.writes.get(&addr(2)).unwrap().slots.is_empty());
        assert!(!fp.writes.get(&addr(2)).unwrap().wildcard);
    }

    #[test]
    fn test_payload_adds_heuristic_slot_and_wildcard() {
        let data = vec![0x01, 0x02, 0x03];
        let fp = analyze(&transfer(Some(addr(2)), data.clone()), addr(1));

        let access = fp.writes.get(&addr(2)).unwrap();
        assert!(access.slots.contains(&heuristic_slot(&data)));
        assert!(access.wildcard);
    }

    #[test]
    fn test_no_recipient_touches_sender_only() {
        let fp = analyze(&transfer(None, vec![0xFF; 40]), addr(1));

        assert_eq!(fp.writes.addresses().count(), 1);
        assert!(fp.writes.get(&addr(1)).unwrap().balance);
    }

    #[test]
    fn test_heuristic_slot_pads_short_payloads() {
        let short = heuristic_slot(&[0xAB]);
        let mut expected = [0u8; 32];
        expected[0] = 0xAB;
        assert_eq!(short, Hash::from(expected));

        // Longer payloads truncate to the first 32 bytes.
        let long = heuristic_slot(&[0xCD; 64]);
        assert_eq!(long, Hash::from([0xCD; 32]));
    }
}
