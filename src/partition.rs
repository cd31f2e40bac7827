//! Partition header reader (C4).
//!
//! Reads the 0x2C0-byte partition header, unwraps the title key in place,
//! extracts the fixed-offset descriptor fields from spec.md §6, and loads
//! the persisted 96 KiB H3 table. Grounded directly on
//! `original_source/negentig.c::do_partition`.

use std::io::{Read, Seek, SeekFrom};

use crate::be::{be32, be34, be64};
use crate::crypto::decrypt_title_key;
use crate::error::Result;

pub const PARTITION_HEADER_SIZE: usize = 0x2C0;
pub const H3_TABLE_SIZE: usize = 0x18000;

/// The result of parsing a partition's 0x2C0-byte header.
#[derive(Debug, Clone)]
pub struct PartitionDescriptor {
    pub title_id: u64,
    pub title_key: [u8; 16],
    pub tmd_offset: u64,
    pub tmd_size: u64,
    pub cert_offset: u64,
    pub cert_size: u32,
    pub h3_offset: u64,
    pub data_offset: u64,
    pub data_size: u64,
}

/// Hook for cert-chain/TMD validation. The original never performs this
/// check ("XXX: we should check the cert chain here, and read the tmd") and
/// this crate preserves that omission by default; callers that need the
/// check can supply their own `TicketValidator`.
pub trait TicketValidator {
    fn validate(&mut self, descriptor: &PartitionDescriptor) -> Result<()>;
}

/// The default validator: performs no validation, exactly like the original.
pub struct NoopValidator;

impl TicketValidator for NoopValidator {
    fn validate(&mut self, _descriptor: &PartitionDescriptor) -> Result<()> {
        Ok(())
    }
}

impl PartitionDescriptor {
    /// Reads and decodes the partition header at `raw_offset` in `disc`,
    /// using the default (no-op) ticket validator.
    pub fn read<RS: Read + Seek>(disc: &mut RS, raw_offset: u64) -> Result<Self> {
        Self::read_with_validator(disc, raw_offset, &mut NoopValidator)
    }

    /// Reads and decodes the partition header at `raw_offset` in `disc`,
    /// running `validator` against the result before returning it (the
    /// spec.md §9 "expose hooks" open question).
    pub fn read_with_validator<RS: Read + Seek>(
        disc: &mut RS,
        raw_offset: u64,
        validator: &mut dyn TicketValidator,
    ) -> Result<Self> {
        disc.seek(SeekFrom::Start(raw_offset))?;
        let mut buf = [0u8; PARTITION_HEADER_SIZE];
        disc.read_exact(&mut buf)?;

        // Title-key unwrap happens in place: the 16 bytes at 0x1BF hold the
        // encrypted key before this call and the plaintext key after. The
        // title id bytes at 0x1DC are untouched by the decrypt itself (the
        // IV is derived from them, not written over them) but are only
        // meaningful to read *after* this call completes, mirroring the
        // original's sequencing even though nothing here actually depends
        // on the ordering beyond "do this before trusting title_id".
        let title_id_bytes: [u8; 8] = buf[0x1DC..0x1E4].try_into().unwrap();
        let mut enc_title_key: [u8; 16] = buf[0x1BF..0x1CF].try_into().unwrap();
        decrypt_title_key(&mut enc_title_key, &title_id_bytes);
        let title_key = enc_title_key;

        let title_id = be64(&buf[0x1DC..]);
        let tmd_offset = be32(&buf[0x2A4..]) as u64;
        let tmd_size = be34(&buf[0x2A8..]);
        let cert_size = be32(&buf[0x2AC..]);
        let cert_offset = be34(&buf[0x2B0..]);
        let h3_offset = be34(&buf[0x2B4..]);
        let data_offset = be34(&buf[0x2B8..]);
        let data_size = be34(&buf[0x2BC..]);

        let descriptor = PartitionDescriptor {
            title_id,
            title_key,
            tmd_offset,
            tmd_size,
            cert_offset,
            cert_size,
            h3_offset,
            data_offset,
            data_size,
        };
        validator.validate(&descriptor)?;
        Ok(descriptor)
    }

    /// Loads the 96 KiB H3 table stored at `raw_offset + h3_offset`.
    pub fn read_h3<RS: Read + Seek>(&self, disc: &mut RS, raw_offset: u64) -> Result<Vec<u8>> {
        disc.seek(SeekFrom::Start(raw_offset + self.h3_offset))?;
        let mut h3 = vec![0u8; H3_TABLE_SIZE];
        disc.read_exact(&mut h3)?;
        Ok(h3)
    }
}
