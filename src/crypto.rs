//! Crypto facade (C3): AES-128-CBC decrypt, SHA-1, and title-key unwrap.
//!
//! This is the one place the black-box AES/SHA-1 primitives are touched;
//! every other module goes through here.

use aes::{
    cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit},
    Aes128,
};
use sha1::{Digest, Sha1};

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// The platform common key used to unwrap per-title keys. This is a
/// build-time constant in the original; the all-zero placeholder here
/// stands in for whichever signing-authority-specific key a real deployment
/// supplies (dev/retail). Replace via [`aes_cbc_dec`]'s callers in a build
/// that has the real key available.
pub const COMMON_KEY: [u8; 16] = [0u8; 16];

/// AES-128-CBC decrypts `data` in place using `key` and `iv`. No padding is
/// applied or stripped — every ciphertext in this format is already a
/// multiple of the block size.
pub fn aes_cbc_dec(key: &[u8; 16], iv: &[u8; 16], data: &mut [u8]) {
    let dec = Aes128CbcDec::new(key.into(), iv.into());
    dec.decrypt_padded_mut::<NoPadding>(data)
        .expect("cluster/title-key payloads are always block-aligned");
}

/// Computes the SHA-1 digest of `data`.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Unwraps the 16-byte encrypted title key at `enc_title_key` in place,
/// using [`COMMON_KEY`] and an IV built from the 8-byte title id followed by
/// 8 zero bytes.
pub fn decrypt_title_key(enc_title_key: &mut [u8; 16], title_id: &[u8; 8]) {
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(title_id);
    aes_cbc_dec(&COMMON_KEY, &iv, enc_title_key);
}

#[cfg(test)]
mod test {
    use super::*;
    use aes::cipher::BlockEncryptMut;

    #[test]
    fn title_key_unwrap_matches_plain_cbc_decrypt() {
        // Encrypt a known plaintext key with the common key and the title-id
        // IV, then confirm decrypt_title_key recovers it.
        let key = COMMON_KEY;
        let title_id: [u8; 8] = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut iv = [0u8; 16];
        iv[..8].copy_from_slice(&title_id);

        let plaintext_key: [u8; 16] = [0xAA; 16];
        let mut enc = plaintext_key;
        let encryptor = cbc::Encryptor::<Aes128>::new((&key).into(), (&iv).into());
        encryptor
            .encrypt_padded_mut::<NoPadding>(&mut enc, 16)
            .unwrap();

        let mut buf = enc;
        decrypt_title_key(&mut buf, &title_id);
        assert_eq!(buf, plaintext_key);
    }

    #[test]
    fn sha1_matches_known_vector() {
        // SHA1("") = da39a3ee5e6b4b0d3255bfef95601890afd80709
        let digest = sha1(b"");
        assert_eq!(
            digest,
            [
                0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95,
                0x60, 0x18, 0x90, 0xaf, 0xd8, 0x07, 0x09
            ]
        );
    }
}
