//! Ed25519 message signing and verification against identities.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use veil_types::{Identity, PrivateKey, Signature};

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    let sig = signing_key.sign(message);
    Signature(sig.to_bytes())
}

/// Verify that `identity` signed `message`.
///
/// Returns `false` for an identity that is not a valid Ed25519 point.
pub fn verify_signature(message: &[u8], signature: &Signature, identity: &Identity) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(identity.as_bytes()) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &dalek_sig).is_ok()
}
