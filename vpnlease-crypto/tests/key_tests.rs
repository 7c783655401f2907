use proptest::prelude::*;
use vpnlease_crypto::{public_key_from_private, CryptoError, KeyPair, KEY_SIZE};

// ── Generation ───────────────────────────────────────────────────

#[test]
fn generated_keys_are_base64_of_32_bytes() {
    let pair = KeyPair::generate();
    assert_eq!(pair.private_key_base64().len(), 44);
    assert_eq!(pair.public_key_base64().len(), 44);
}

#[test]
fn generated_pairs_differ() {
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    assert_ne!(a.public_key_base64(), b.public_key_base64());
    assert_ne!(a.private_key_base64(), b.private_key_base64());
}

#[test]
fn public_key_is_derived_from_private() {
    let pair = KeyPair::generate();
    let restored = KeyPair::from_private_base64(&pair.private_key_base64()).unwrap();
    assert_eq!(restored.public_key_base64(), pair.public_key_base64());
    assert_eq!(
        public_key_from_private(&pair.private_key_base64()).unwrap(),
        pair.public_key_base64()
    );
}

#[test]
fn debug_redacts_secret() {
    let pair = KeyPair::generate();
    let debug = format!("{pair:?}");
    assert!(debug.contains("[REDACTED]"));
    assert!(!debug.contains(&pair.private_key_base64()));
}

// ── Decoding errors ──────────────────────────────────────────────

#[test]
fn rejects_non_base64() {
    let err = KeyPair::from_private_base64("not base64 at all!").unwrap_err();
    assert!(matches!(err, CryptoError::Encoding(_)));
}

#[test]
fn rejects_wrong_length() {
    let err = KeyPair::from_private_base64("AAAA").unwrap_err();
    match err {
        CryptoError::InvalidKeyLength { expected, actual } => {
            assert_eq!(expected, KEY_SIZE);
            assert_eq!(actual, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

proptest! {
    #[test]
    fn any_32_bytes_restore_deterministically(bytes in proptest::array::uniform32(any::<u8>())) {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let encoded = STANDARD.encode(bytes);
        let a = KeyPair::from_private_base64(&encoded).unwrap();
        let b = KeyPair::from_private_base64(&encoded).unwrap();
        prop_assert_eq!(a.public_key_base64(), b.public_key_base64());
    }
}
