//! EMIP-3 envelope for persisting drafts at rest.
//!
//! Layout: `salt(32) ‖ nonce(12) ‖ tag(16) ‖ ciphertext`. The key is
//! PBKDF2-HMAC-SHA512 over the passphrase with 19 162 iterations; the
//! cipher is ChaCha20-Poly1305 (IETF). Callers supply the salt and
//! nonce from their own entropy source.

use cryptoxide::chacha20poly1305::ChaCha20Poly1305;
use cryptoxide::hmac::Hmac;
use cryptoxide::pbkdf2::pbkdf2;
use cryptoxide::sha2::Sha512;

use crate::error::Error;

pub const SALT_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const ITERATIONS: u32 = 19_162;

const HEADER_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

fn derive_key(passphrase: &[u8], salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    let mut mac = Hmac::new(Sha512::new(), passphrase);
    pbkdf2(&mut mac, salt, ITERATIONS, &mut key);
    key
}

/// Seal a payload under a passphrase.
pub fn encrypt(
    payload: &[u8],
    passphrase: &[u8],
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
) -> Vec<u8> {
    let key = derive_key(passphrase, &salt);

    let mut ciphertext = vec![0u8; payload.len()];
    let mut tag = [0u8; TAG_LEN];
    let mut cipher = ChaCha20Poly1305::new(&key, &nonce, &[]);
    cipher.encrypt(payload, &mut ciphertext, &mut tag);

    let mut sealed = Vec::with_capacity(HEADER_LEN + payload.len());
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&tag);
    sealed.extend_from_slice(&ciphertext);
    sealed
}

/// Open a sealed payload. A wrong passphrase or a tampered payload
/// fails the authentication tag.
pub fn decrypt(sealed: &[u8], passphrase: &[u8]) -> Result<Vec<u8>, Error> {
    if sealed.len() < HEADER_LEN {
        return Err(Error::Decoding("sealed payload too short".into()));
    }

    let (salt, rest) = sealed.split_at(SALT_LEN);
    let (nonce, rest) = rest.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let key = derive_key(passphrase, salt);

    let nonce: &[u8; NONCE_LEN] = nonce.try_into().expect("split_at guarantees NONCE_LEN bytes");
    let mut payload = vec![0u8; ciphertext.len()];
    let mut cipher = ChaCha20Poly1305::new(&key, nonce, &[]);
    if !cipher.decrypt(ciphertext, &mut payload, tag) {
        return Err(Error::ChecksumMismatch);
    }

    Ok(payload)
}
