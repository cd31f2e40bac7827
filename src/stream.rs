//! Partition virtual stream (C6): translates (logical offset, length) reads
//! into a sequence of cluster reads, exposing a flat 0x7C00-byte-per-cluster
//! logical address space.
//!
//! Grounded on `reader.rs::WiiPartitionReadStream`'s block-chunking `Read`
//! loop and `original_source/negentig.c::partition_read`'s `just_a_partition`
//! raw-read bypass.

use std::io::{self, Read, Seek, SeekFrom};

use crate::cluster::{read_cluster, VerifyErrors, CLUSTER_PAYLOAD_SIZE};
use crate::partition::PartitionDescriptor;

/// A read-only view over a partition's decrypted, verified logical stream.
pub struct PartitionStream<'a, RS: Read + Seek> {
    disc: &'a mut RS,
    raw_offset: u64,
    descriptor: &'a PartitionDescriptor,
    h3: &'a [u8],
    /// In "just-a-partition" mode, reads degrade to raw disc reads at
    /// `logical_offset`, bypassing decryption and verification entirely.
    just_a_partition: bool,
    position: u64,
    cumulative_errors: VerifyErrors,
}

impl<'a, RS: Read + Seek> PartitionStream<'a, RS> {
    pub fn new(
        disc: &'a mut RS,
        raw_offset: u64,
        descriptor: &'a PartitionDescriptor,
        h3: &'a [u8],
        just_a_partition: bool,
    ) -> Self {
        PartitionStream {
            disc,
            raw_offset,
            descriptor,
            h3,
            just_a_partition,
            position: 0,
            cumulative_errors: VerifyErrors::empty(),
        }
    }

    /// Verification errors accumulated across every cluster read so far.
    pub fn cumulative_errors(&self) -> VerifyErrors {
        self.cumulative_errors
    }

    /// Reads `len` bytes starting at `logical_offset`, without disturbing
    /// the stream's current seek position.
    pub fn read_at(&mut self, logical_offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len as usize);
        if self.just_a_partition {
            self.disc.seek(SeekFrom::Start(logical_offset))?;
            out.resize(len as usize, 0);
            self.disc.read_exact(&mut out)?;
            return Ok(out);
        }

        let mut offset = logical_offset;
        let mut remaining = len;
        while remaining > 0 {
            let cluster_index = offset / CLUSTER_PAYLOAD_SIZE as u64;
            let offset_in_cluster = (offset % CLUSTER_PAYLOAD_SIZE as u64) as usize;
            let (payload, errors) = read_cluster(
                self.disc,
                self.raw_offset,
                self.descriptor.data_offset,
                &self.descriptor.title_key,
                self.h3,
                cluster_index,
            )
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            self.cumulative_errors |= errors;

            let available = CLUSTER_PAYLOAD_SIZE - offset_in_cluster;
            let to_copy = available.min(remaining as usize);
            out.extend_from_slice(&payload[offset_in_cluster..offset_in_cluster + to_copy]);
            offset += to_copy as u64;
            remaining -= to_copy as u64;
        }
        Ok(out)
    }
}

impl<'a, RS: Read + Seek> Read for PartitionStream<'a, RS> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.read_at(self.position, buf.len() as u64)?;
        buf[..data.len()].copy_from_slice(&data);
        self.position += data.len() as u64;
        Ok(data.len())
    }
}

impl<'a, RS: Read + Seek> Seek for PartitionStream<'a, RS> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(off) => off as i64,
            SeekFrom::Current(off) => self.position as i64 + off,
            SeekFrom::End(off) => self.descriptor.data_size as i64 + off,
        };
        self.position = new_pos.max(0) as u64;
        Ok(self.position)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn single_cluster_disc(title_key: &[u8; 16], payload: &[u8; CLUSTER_PAYLOAD_SIZE]) -> (Vec<u8>, Vec<u8>) {
        use aes::cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};
        use sha1::{Digest, Sha1};
        type Enc = cbc::Encryptor<aes::Aes128>;

        let mut h0 = [0u8; 620];
        for i in 0..31 {
            let mut hasher = Sha1::new();
            hasher.update(&payload[0x400 * i..0x400 * (i + 1)]);
            let d: [u8; 20] = hasher.finalize().into();
            h0[20 * i..20 * (i + 1)].copy_from_slice(&d);
        }
        let mut h1 = [0u8; 160];
        let mut hasher = Sha1::new();
        hasher.update(&h0);
        let h1d: [u8; 20] = hasher.finalize().into();
        h1[..20].copy_from_slice(&h1d);
        let mut h2 = [0u8; 160];
        let mut hasher = Sha1::new();
        hasher.update(&h1);
        let h2d: [u8; 20] = hasher.finalize().into();
        h2[..20].copy_from_slice(&h2d);
        let mut hasher = Sha1::new();
        hasher.update(&h2);
        let h3d: [u8; 20] = hasher.finalize().into();
        let mut h3 = vec![0u8; 20 * 8];
        h3[..20].copy_from_slice(&h3d);

        let mut hash_region = [0u8; 0x400];
        hash_region[..620].copy_from_slice(&h0);
        hash_region[0x280..0x280 + 160].copy_from_slice(&h1);
        hash_region[0x340..0x340 + 160].copy_from_slice(&h2);

        let iv = [9u8; 16];
        let mut enc_payload = *payload;
        Enc::new(title_key.into(), (&iv).into())
            .encrypt_padded_mut::<NoPadding>(&mut enc_payload, CLUSTER_PAYLOAD_SIZE)
            .unwrap();
        Enc::new(title_key.into(), (&[0u8; 16]).into())
            .encrypt_padded_mut::<NoPadding>(&mut hash_region, 0x400)
            .unwrap();

        let mut raw = vec![0u8; 0x8000];
        raw[..0x400].copy_from_slice(&hash_region);
        raw[0x3D0..0x3E0].copy_from_slice(&iv);
        raw[0x400..].copy_from_slice(&enc_payload);

        (raw, h3)
    }

    #[test]
    fn read_zero_len_returns_all_zero_payload() {
        let title_key = [5u8; 16];
        let payload = [0u8; CLUSTER_PAYLOAD_SIZE];
        let (raw, h3) = single_cluster_disc(&title_key, &payload);
        let descriptor = PartitionDescriptor {
            title_id: 0,
            title_key,
            tmd_offset: 0,
            tmd_size: 0,
            cert_offset: 0,
            cert_size: 0,
            h3_offset: 0,
            data_offset: 0,
            data_size: CLUSTER_PAYLOAD_SIZE as u64,
        };
        let mut disc = Cursor::new(raw);
        let mut stream = PartitionStream::new(&mut disc, 0, &descriptor, &h3, false);
        let data = stream.read_at(0, CLUSTER_PAYLOAD_SIZE as u64).unwrap();
        assert_eq!(data.len(), CLUSTER_PAYLOAD_SIZE);
        assert!(data.iter().all(|&b| b == 0));
        assert_eq!(stream.cumulative_errors(), VerifyErrors::empty());
    }

    #[test]
    fn just_a_partition_bypasses_decryption() {
        let descriptor = PartitionDescriptor {
            title_id: 0,
            title_key: [0; 16],
            tmd_offset: 0,
            tmd_size: 0,
            cert_offset: 0,
            cert_size: 0,
            h3_offset: 0,
            data_offset: 0,
            data_size: 16,
        };
        let raw = (0u8..16).collect::<Vec<u8>>();
        let h3 = vec![0u8; 20];
        let mut disc = Cursor::new(raw.clone());
        let mut stream = PartitionStream::new(&mut disc, 0, &descriptor, &h3, true);
        let data = stream.read_at(0, 16).unwrap();
        assert_eq!(data, raw);
    }
}
