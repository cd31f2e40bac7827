//! Cluster engine (C5): read, decrypt, and hash-verify a single 0x8000-byte
//! cluster, returning its verified 0x7C00-byte payload.
//!
//! Grounded on `original_source/negentig.c::partition_read_block`, with the
//! same group/cluster hash-tree math as `reader_writer.rs::decrypt_verify_group`
//! in the teacher (which batches 64 clusters per "group"; this engine
//! processes one cluster at a time, matching spec.md §4.4's stateless
//! per-call contract).

use bitflags::bitflags;
use std::io::{Read, Seek, SeekFrom};

use crate::crypto::{aes_cbc_dec, sha1};
use crate::error::Result;

pub const CLUSTER_SIZE: usize = 0x8000;
pub const CLUSTER_PAYLOAD_SIZE: usize = 0x7C00;
const HASH_REGION_SIZE: usize = 0x400;
const IV_OFFSET: usize = 0x3D0;
const H0_COUNT: usize = 31;
const H0_SIZE: usize = H0_COUNT * 20; // 620
const H1_OFFSET: usize = 0x280;
const H1_SIZE: usize = 8 * 20; // 160
const H2_OFFSET: usize = 0x340;

bitflags! {
    /// Cumulative per-partition verification-error flags: one bit per
    /// Merkle level. Mirrors the original's `errors` global exactly (bit
    /// values 1, 2, 4, 8 for H0..H3), but lives on the session instead of
    /// being a process-wide static.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VerifyErrors: u8 {
        const H0 = 0b0001;
        const H1 = 0b0010;
        const H2 = 0b0100;
        const H3 = 0b1000;
    }
}

impl VerifyErrors {
    /// Logs one line per set bit, matching the original's end-of-run summary
    /// (`errors & 1 -> "H0 mismatch"`, etc.).
    pub fn report(self) {
        if self.is_empty() {
            return;
        }
        log::warn!("verification errors detected:");
        if self.contains(VerifyErrors::H0) {
            log::warn!("H0 mismatch");
        }
        if self.contains(VerifyErrors::H1) {
            log::warn!("H1 mismatch");
        }
        if self.contains(VerifyErrors::H2) {
            log::warn!("H2 mismatch");
        }
        if self.contains(VerifyErrors::H3) {
            log::warn!("H3 mismatch");
        }
    }
}

/// Reads, decrypts, and verifies cluster `index` of the partition whose raw
/// data starts at `data_offset` (relative to `raw_offset`) within `disc`.
/// `h3` is the partition's persisted 96 KiB hash table. Returns the verified
/// payload and the set of levels that failed verification for this cluster
/// alone (callers accumulate this into a running total).
pub fn read_cluster<RS: Read + Seek>(
    disc: &mut RS,
    raw_offset: u64,
    data_offset: u64,
    title_key: &[u8; 16],
    h3: &[u8],
    index: u64,
) -> Result<([u8; CLUSTER_PAYLOAD_SIZE], VerifyErrors)> {
    let mut raw = [0u8; CLUSTER_SIZE];
    disc.seek(SeekFrom::Start(
        raw_offset + data_offset + CLUSTER_SIZE as u64 * index,
    ))?;
    disc.read_exact(&mut raw)?;

    // The payload IV must be snapshotted from the still-encrypted bytes
    // before the hash region below is decrypted in place — it lives in the
    // same cluster, right before the payload.
    let iv: [u8; 16] = raw[IV_OFFSET..IV_OFFSET + 16].try_into().unwrap();

    let mut payload = [0u8; CLUSTER_PAYLOAD_SIZE];
    payload.copy_from_slice(&raw[HASH_REGION_SIZE..]);
    aes_cbc_dec(title_key, &iv, &mut payload);

    let mut hash_region = [0u8; HASH_REGION_SIZE];
    hash_region.copy_from_slice(&raw[..HASH_REGION_SIZE]);
    aes_cbc_dec(title_key, &[0u8; 16], &mut hash_region);

    let h0 = &hash_region[..H0_SIZE];
    let h1 = &hash_region[H1_OFFSET..H1_OFFSET + H1_SIZE];
    let h2 = &hash_region[H2_OFFSET..H2_OFFSET + H1_SIZE];

    let b1 = (index & 7) as usize;
    let b2 = ((index >> 3) & 7) as usize;
    let b3 = (index >> 6) as usize;

    let mut errors = VerifyErrors::empty();

    for i in 0..H0_COUNT {
        let digest = sha1(&payload[0x400 * i..0x400 * (i + 1)]);
        if digest != h0[20 * i..20 * (i + 1)] {
            log::warn!("H0 mismatch for {:x}.{:02x}", index, i);
            errors |= VerifyErrors::H0;
        }
    }

    let digest = sha1(h0);
    if digest != h1[20 * b1..20 * (b1 + 1)] {
        log::warn!("H1 mismatch for {:x}", index);
        errors |= VerifyErrors::H1;
    }

    let digest = sha1(h1);
    if digest != h2[20 * b2..20 * (b2 + 1)] {
        log::warn!("H2 mismatch for {:x}", index);
        errors |= VerifyErrors::H2;
    }

    let digest = sha1(h2);
    let h3_slot = &h3[20 * b3..20 * (b3 + 1)];
    if digest != h3_slot {
        log::warn!("H3 mismatch for {:x}", index);
        errors |= VerifyErrors::H3;
    }

    Ok((payload, errors))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn build_verified_cluster(title_key: &[u8; 16], payload: &[u8; CLUSTER_PAYLOAD_SIZE]) -> (Vec<u8>, Vec<u8>) {
        use aes::cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};
        type Enc = cbc::Encryptor<aes::Aes128>;

        let mut h0 = [0u8; H0_SIZE];
        for i in 0..H0_COUNT {
            let d = sha1(&payload[0x400 * i..0x400 * (i + 1)]);
            h0[20 * i..20 * (i + 1)].copy_from_slice(&d);
        }
        let mut h1 = [0u8; H1_SIZE];
        let h1_digest = sha1(&h0);
        h1[..20].copy_from_slice(&h1_digest); // b1 = 0 for cluster 0
        let mut h2 = [0u8; H1_SIZE];
        let h2_digest = sha1(&h1);
        h2[..20].copy_from_slice(&h2_digest); // b2 = 0 for cluster 0
        let h3_digest = sha1(&h2);
        let mut h3_table = vec![0u8; 20 * 8];
        h3_table[..20].copy_from_slice(&h3_digest); // b3 = 0

        let mut hash_region = [0u8; HASH_REGION_SIZE];
        hash_region[..H0_SIZE].copy_from_slice(&h0);
        hash_region[H1_OFFSET..H1_OFFSET + H1_SIZE].copy_from_slice(&h1);
        hash_region[H2_OFFSET..H2_OFFSET + H1_SIZE].copy_from_slice(&h2);

        let iv = [7u8; 16];
        let mut enc_payload = *payload;
        Enc::new(title_key.into(), (&iv).into())
            .encrypt_padded_mut::<NoPadding>(&mut enc_payload, CLUSTER_PAYLOAD_SIZE)
            .unwrap();
        Enc::new(title_key.into(), (&[0u8; 16]).into())
            .encrypt_padded_mut::<NoPadding>(&mut hash_region, HASH_REGION_SIZE)
            .unwrap();

        let mut raw = vec![0u8; CLUSTER_SIZE];
        raw[..HASH_REGION_SIZE].copy_from_slice(&hash_region);
        raw[IV_OFFSET..IV_OFFSET + 16].copy_from_slice(&iv);
        raw[HASH_REGION_SIZE..].copy_from_slice(&enc_payload);

        (raw, h3_table)
    }

    #[test]
    fn clean_cluster_verifies_with_no_errors() {
        let title_key = [1u8; 16];
        let payload = [0u8; CLUSTER_PAYLOAD_SIZE];
        let (raw, h3) = build_verified_cluster(&title_key, &payload);
        let mut disc = Cursor::new(raw);
        let (decoded, errors) =
            read_cluster(&mut disc, 0, 0, &title_key, &h3, 0).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(errors, VerifyErrors::empty());
    }

    #[test]
    fn corrupted_payload_byte_sets_only_h0() {
        let title_key = [2u8; 16];
        let payload = [0xABu8; CLUSTER_PAYLOAD_SIZE];
        let (mut raw, h3) = build_verified_cluster(&title_key, &payload);
        // flip a ciphertext byte inside block 0's payload range; after
        // decrypt this perturbs exactly block 0's plaintext (CBC self-heals
        // after one block), so only H0 should mismatch.
        raw[HASH_REGION_SIZE] ^= 0xFF;
        let mut disc = Cursor::new(raw);
        let (_decoded, errors) = read_cluster(&mut disc, 0, 0, &title_key, &h3, 0).unwrap();
        assert_eq!(errors, VerifyErrors::H0);
    }

    #[test]
    fn corrupted_h1_slot_sets_only_h1() {
        let title_key = [3u8; 16];
        let payload = [0x11u8; CLUSTER_PAYLOAD_SIZE];
        let (raw, h3) = build_verified_cluster(&title_key, &payload);

        // Re-derive with a corrupted H1 entry: easiest is to corrupt after
        // decrypting, so rebuild by hand instead of mutating ciphertext.
        use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
        type Dec = cbc::Decryptor<aes::Aes128>;
        let mut hash_region: [u8; HASH_REGION_SIZE] = raw[..HASH_REGION_SIZE].try_into().unwrap();
        Dec::new(title_key.as_ref().into(), (&[0u8; 16]).into())
            .decrypt_padded_mut::<NoPadding>(&mut hash_region)
            .unwrap();
        hash_region[H1_OFFSET] ^= 0xFF;
        use aes::cipher::BlockEncryptMut;
        type Enc = cbc::Encryptor<aes::Aes128>;
        Enc::new(title_key.as_ref().into(), (&[0u8; 16]).into())
            .encrypt_padded_mut::<NoPadding>(&mut hash_region, HASH_REGION_SIZE)
            .unwrap();

        let mut raw2 = raw;
        raw2[..HASH_REGION_SIZE].copy_from_slice(&hash_region);

        let mut disc = Cursor::new(raw2);
        let (_decoded, errors) = read_cluster(&mut disc, 0, 0, &title_key, &h3, 0).unwrap();
        assert_eq!(errors, VerifyErrors::H1);
    }
}
