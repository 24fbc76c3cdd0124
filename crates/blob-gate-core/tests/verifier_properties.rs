// crates/blob-gate-core/tests/verifier_properties.rs
// ============================================================================
// Module: Verifier Property-Based Tests
// Description: Property tests for token verification.
// Purpose: Check identity extraction and signature rejection across inputs.
// ============================================================================

//! Property-based tests for token verification invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use blob_gate_core::AuthError;
use blob_gate_core::KeySetHandle;
use blob_gate_core::Timestamp;
use blob_gate_core::TokenClaims;
use blob_gate_core::TokenSigner;
use blob_gate_core::TokenVerifier;
use blob_gate_core::VerificationKeys;
use blob_gate_core::VerifierSettings;
use ed25519_dalek::SigningKey;
use proptest::prelude::*;

const NOW_SECS: i64 = 1_800_000_000;
const ISSUERS: [&str; 2] = ["https://a.test", "https://b.test"];

fn verifier_for(signer: &TokenSigner) -> TokenVerifier {
    TokenVerifier::new(
        KeySetHandle::new(VerificationKeys::new(vec![signer.verification_key()])),
        VerifierSettings::new(ISSUERS),
    )
}

fn now() -> Timestamp {
    Timestamp::from_unix_seconds(NOW_SECS)
}

proptest! {
    #[test]
    fn principal_mirrors_claims(
        subject in "[a-zA-Z0-9_.@-]{1,40}",
        issuer_index in 0usize .. 2,
        ttl in 1i64 .. 86_400,
        scopes in prop::collection::btree_set("[a-z:]{1,12}", 0 .. 4),
    ) {
        let signer = TokenSigner::new(SigningKey::from_bytes(&[5; 32]), None);
        let mut claims = TokenClaims::new(subject.clone(), ISSUERS[issuer_index], NOW_SECS + ttl);
        claims.scopes = Some(scopes.iter().cloned().collect());
        let token = signer.sign(&claims).unwrap();

        let principal = verifier_for(&signer).verify(&token, now()).unwrap();
        prop_assert_eq!(principal.subject().as_str(), subject.as_str());
        prop_assert_eq!(principal.issuer(), ISSUERS[issuer_index]);
        prop_assert_eq!(principal.expires_at(), Timestamp::from_unix_seconds(NOW_SECS + ttl));
        prop_assert_eq!(principal.scopes(), &scopes);
    }

    #[test]
    fn foreign_key_is_always_invalid_signature(
        seed in any::<[u8; 32]>(),
        exp_offset in -86_400i64 .. 86_400,
        issuer in "[a-z]{1,16}",
    ) {
        let trusted = TokenSigner::new(SigningKey::from_bytes(&[9; 32]), None);
        prop_assume!(seed != [9; 32]);
        let forger = TokenSigner::new(SigningKey::from_bytes(&seed), None);
        let token = forger.sign(&TokenClaims::new("mallory", issuer, NOW_SECS + exp_offset)).unwrap();

        prop_assert_eq!(verifier_for(&trusted).verify(&token, now()), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn arbitrary_input_never_verifies(input in ".{0,256}") {
        let signer = TokenSigner::new(SigningKey::from_bytes(&[1; 32]), None);
        prop_assert!(verifier_for(&signer).verify(&input, now()).is_err());
    }
}
