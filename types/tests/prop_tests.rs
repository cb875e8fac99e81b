use proptest::prelude::*;

use tally_types::{Address, Nullifier, SurveyStatus, Timestamp, TokenAmount, TxHash};

proptest! {
    /// Address: from_bytes -> parse roundtrip preserves equality.
    #[test]
    fn address_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let addr = Address::from_bytes(&bytes);
        prop_assert_eq!(Address::parse(addr.as_str()).unwrap(), addr);
    }

    /// Address: parsing is case-insensitive on input, canonical on output.
    #[test]
    fn address_case_insensitive(bytes in prop::array::uniform20(0u8..)) {
        let addr = Address::from_bytes(&bytes);
        let upper = format!("0x{}", addr.as_str()[2..].to_ascii_uppercase());
        prop_assert_eq!(Address::parse(&upper).unwrap(), addr);
    }

    /// TxHash roundtrip through the hex wire form.
    #[test]
    fn tx_hash_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        prop_assert_eq!(TxHash::parse(&hash.to_string()).unwrap(), hash);
    }

    /// Nullifier roundtrip through the hex wire form.
    #[test]
    fn nullifier_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let n = Nullifier::new(bytes);
        prop_assert_eq!(Nullifier::parse(&n.to_hex()).unwrap(), n);
    }

    /// TokenAmount JSON roundtrip preserves the full u128 range.
    #[test]
    fn amount_json_roundtrip(raw in 0u128..u128::MAX) {
        let amount = TokenAmount::new(raw);
        let json = serde_json::to_string(&amount).unwrap();
        let back: TokenAmount = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, amount);
    }

    /// TokenAmount: checked_add agrees with plain addition when no overflow.
    #[test]
    fn amount_checked_add(a in 0u128..u128::MAX / 2, b in 0u128..u128::MAX / 2) {
        let sum = TokenAmount::new(a).checked_add(TokenAmount::new(b));
        prop_assert_eq!(sum, Some(TokenAmount::new(a + b)));
    }

    /// Normalization is idempotent: a normalized value normalizes to itself.
    #[test]
    fn normalize_idempotent(raw in 0u64..u64::MAX / 2) {
        let once = Timestamp::normalize(raw);
        let twice = Timestamp::normalize(once.as_secs());
        prop_assert_eq!(once, twice);
    }

    /// Normalized values are always on the seconds scale.
    #[test]
    fn normalize_result_is_seconds_scale(raw in 0u64..u64::MAX / 2) {
        prop_assert!(Timestamp::normalize(raw).as_secs() <= raw);
    }

    /// Status computation is total and finalization always dominates.
    #[test]
    fn finalized_always_past(
        start in 0u64..1_000_000,
        len in 1u64..1_000_000,
        finalized in 0u64..2_000_000,
        now in 0u64..2_000_000,
    ) {
        let status = SurveyStatus::compute(
            Timestamp::new(start),
            Timestamp::new(start + len),
            Some(Timestamp::new(finalized)),
            Timestamp::new(now),
        );
        prop_assert_eq!(status, SurveyStatus::Past);
    }
}
