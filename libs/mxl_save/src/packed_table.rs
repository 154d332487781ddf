//! Reads and writes the Fernet-compatible encrypted, compressed envelope the
//! static data tables (`base_items`, `item_types`, `item_mods`, `item_stats`,
//! `skills`) are shipped in.
//!
//! Token layout, all concatenated before base64url encoding:
//!
//! ```text
//! version (1 byte, 0x80) | timestamp (8 bytes, BE) | iv (16 bytes)
//!   | ciphertext (AES-128-CBC, PKCS7-padded, N*16 bytes) | hmac tag (32 bytes)
//! ```
//!
//! The 32-byte key splits into a signing half (`key[..16]`, HMAC-SHA256) and
//! an encryption half (`key[16..]`, AES-128-CBC), matching the upstream
//! tool's `cryptography.fernet.Fernet` key convention. The ciphertext, once
//! decrypted, is a raw deflate stream whose inflated bytes are UTF-8 JSON.

use std::io::{Read, Write};
use std::path::Path;

use aes::Aes128;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;

use crate::error::{Error, Result};

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

const IV_LEN: usize = 16;
const TAG_LEN: usize = 32;
const HEADER_LEN: usize = 1 + 8 + IV_LEN;

struct SplitKey {
    signing_key: [u8; 16],
    encryption_key: [u8; 16],
}

fn split_key(key: &str) -> Result<SplitKey> {
    let raw = URL_SAFE_NO_PAD
        .decode(key.trim_end_matches('='))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(key))
        .map_err(|e| Error::PackedTableError(format!("invalid key encoding: {e}")))?;
    if raw.len() != 32 {
        return Err(Error::PackedTableError(format!(
            "key must decode to 32 bytes, got {}",
            raw.len()
        )));
    }
    let mut signing_key = [0u8; 16];
    let mut encryption_key = [0u8; 16];
    signing_key.copy_from_slice(&raw[..16]);
    encryption_key.copy_from_slice(&raw[16..]);
    Ok(SplitKey {
        signing_key,
        encryption_key,
    })
}

/// Decode a token produced by [`encode_bytes`] back into its cleartext bytes,
/// verifying the HMAC tag before attempting decryption.
pub fn decode_bytes(key: &str, token: &str) -> Result<Vec<u8>> {
    let split = split_key(key)?;
    let raw = URL_SAFE_NO_PAD
        .decode(token.trim_end_matches('='))
        .map_err(|e| Error::PackedTableError(format!("invalid token encoding: {e}")))?;
    if raw.len() < HEADER_LEN + TAG_LEN {
        return Err(Error::PackedTableError("token too short".to_string()));
    }
    let (signed_part, tag) = raw.split_at(raw.len() - TAG_LEN);
    if signed_part[0] != 0x80 {
        return Err(Error::PackedTableError(format!(
            "unsupported token version: {:#x}",
            signed_part[0]
        )));
    }

    let mut mac = HmacSha256::new_from_slice(&split.signing_key)
        .expect("HMAC accepts any key length");
    mac.update(signed_part);
    mac.verify_slice(tag)
        .map_err(|_| Error::PackedTableError("HMAC verification failed".to_string()))?;

    let iv = &signed_part[9..HEADER_LEN];
    let ciphertext = &signed_part[HEADER_LEN..];
    let cleartext = Aes128CbcDec::new(&split.encryption_key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| Error::PackedTableError(format!("decryption failed: {e}")))?;

    let mut inflater = DeflateDecoder::new(cleartext.as_slice());
    let mut out = Vec::new();
    inflater.read_to_end(&mut out)?;
    Ok(out)
}

/// Encrypt and compress `cleartext`, producing a token `decode_bytes` can
/// reverse. `timestamp` is the Unix-epoch second stamped into the token
/// header; callers pass it explicitly so the function stays pure.
pub fn encode_bytes(key: &str, cleartext: &[u8], timestamp: u64, iv: [u8; 16]) -> Result<String> {
    let split = split_key(key)?;

    let mut deflater = DeflateEncoder::new(Vec::new(), Compression::default());
    deflater.write_all(cleartext)?;
    let compressed = deflater.finish()?;

    let ciphertext = Aes128CbcEnc::new(&split.encryption_key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(&compressed);

    let mut signed_part = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    signed_part.push(0x80);
    signed_part.extend_from_slice(&timestamp.to_be_bytes());
    signed_part.extend_from_slice(&iv);
    signed_part.extend_from_slice(&ciphertext);

    let mut mac = HmacSha256::new_from_slice(&split.signing_key)
        .expect("HMAC accepts any key length");
    mac.update(&signed_part);
    let tag = mac.finalize().into_bytes();

    let mut token = signed_part;
    token.extend_from_slice(&tag);
    Ok(URL_SAFE_NO_PAD.encode(token))
}

/// Decode a token file and deserialize its JSON cleartext as `Vec<T>`.
pub fn load_table<T: DeserializeOwned>(key: &str, path: &Path) -> Result<Vec<T>> {
    let token = std::fs::read_to_string(path)?;
    let bytes = decode_bytes(key, token.trim())?;
    let rows = serde_json::from_slice(&bytes)?;
    Ok(rows)
}

/// Serialize `rows` to JSON and write an encoded token to `path`.
pub fn save_table<T: Serialize>(
    key: &str,
    path: &Path,
    rows: &[T],
    timestamp: u64,
    iv: [u8; 16],
) -> Result<()> {
    let json = serde_json::to_vec(rows)?;
    let token = encode_bytes(key, &json, timestamp, iv)?;
    std::fs::write(path, token)?;
    Ok(())
}
