//! Per-user asymmetric key issuance and draw encryption.
//!
//! Every account gets one RSA key pair at registration. Draw numbers are
//! stored as RSA-OAEP ciphertext (base64) and only ever decrypted at read
//! time. A decryption failure is surfaced, never swallowed: a silently
//! wrong plaintext here would corrupt round results.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::sha2::Sha256;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

/// Key size for issued pairs. There is no rotation path; the pair issued
/// at registration is the pair for the life of the account.
const KEY_BITS: usize = 2048;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGen(String),

    #[error("malformed key material: {0}")]
    KeyFormat(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Wrong key or malformed ciphertext. Fatal for the draw being
    /// processed; callers must propagate or report it, not drop it.
    #[error("decryption failed")]
    Decrypt,
}

/// A freshly issued key pair, PEM-serialized for storage.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public_pem: String,
    pub private_pem: String,
}

/// Issues a new RSA key pair. Fails only on entropy or algorithm failure,
/// which aborts account creation.
pub fn generate_keypair() -> Result<KeyPair, CryptoError> {
    let private = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
        .map_err(|e| CryptoError::KeyGen(e.to_string()))?;
    let public = RsaPublicKey::from(&private);

    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGen(e.to_string()))?
        .to_string();
    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGen(e.to_string()))?;

    Ok(KeyPair {
        public_pem,
        private_pem,
    })
}

/// Encrypts a plaintext under a PEM public key, returning base64.
pub fn encrypt(plaintext: &str, public_pem: &str) -> Result<String, CryptoError> {
    let public = RsaPublicKey::from_public_key_pem(public_pem)
        .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;

    let ciphertext = public
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    Ok(BASE64.encode(ciphertext))
}

/// Decrypts base64 ciphertext under a PEM private key.
///
/// Returns [`CryptoError::Decrypt`] when the ciphertext was produced under
/// a different key or is malformed.
pub fn decrypt(ciphertext_b64: &str, private_pem: &str) -> Result<String, CryptoError> {
    let private = RsaPrivateKey::from_pkcs8_pem(private_pem)
        .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;

    let ciphertext = BASE64
        .decode(ciphertext_b64)
        .map_err(|_| CryptoError::Decrypt)?;

    let plaintext = private
        .decrypt(Oaep::new::<Sha256>(), &ciphertext)
        .map_err(|_| CryptoError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
}
