//! Disc-level reader (C1): the outermost header and partition table.
//!
//! Grounded on `original_source/negentig.c::do_disc`, fixing the one bug the
//! original carries forward (`u64 partition_offset[32]; // XXX: don't know
//! the real maximum`, a fixed-size stack buffer indexed by the on-disc
//! partition count with no bound check): here the entry table is sized to
//! the declared count, with an explicit sanity ceiling instead of a silent
//! overrun.

use std::io::{Read, Seek, SeekFrom};

use crate::be::{be32, be34};
use crate::error::{DiscError, Result};
use crate::structs::{DiscHeader, WiiPartTableEntry};
use binrw::BinRead;

/// Above this many table entries, a disc is almost certainly corrupt rather
/// than legitimately large (real Wii discs carry at most a handful of
/// partitions per group). Catches the failure mode the original's 32-entry
/// stack array silently overran.
const MAX_PLAUSIBLE_PARTITIONS: u32 = 4096;

const PARTITION_TABLE_POINTER_OFFSET: u64 = 0x40000;
const PARTITION_ENTRY_SIZE: usize = 8;

/// A disc image opened for reading: the disc-level header plus the resolved
/// partition table. Holds no partition-specific state — per-partition
/// decoding happens in [`crate::partition`] and [`crate::driver`].
pub struct DiscImage {
    pub header: DiscHeader,
    pub partitions: Vec<WiiPartTableEntry>,
}

impl DiscImage {
    /// Reads the disc header at offset 0 and the partition table pointed to
    /// from offset 0x40000.
    pub fn read<RS: Read + Seek>(disc: &mut RS) -> Result<Self> {
        disc.seek(SeekFrom::Start(0))?;
        let header = DiscHeader::read(disc)?;
        let partitions = Self::read_partition_table(disc)?;
        Ok(DiscImage { header, partitions })
    }

    fn read_partition_table<RS: Read + Seek>(disc: &mut RS) -> Result<Vec<WiiPartTableEntry>> {
        disc.seek(SeekFrom::Start(PARTITION_TABLE_POINTER_OFFSET))?;
        let mut head = [0u8; 8];
        disc.read_exact(&mut head)?;
        let n_partitions = be32(&head);
        if n_partitions > MAX_PLAUSIBLE_PARTITIONS {
            return Err(DiscError::ImplausiblePartitionCount(n_partitions));
        }
        let table_offset = be34(&head[4..]);

        disc.seek(SeekFrom::Start(table_offset))?;
        let mut table_buf = vec![0u8; n_partitions as usize * PARTITION_ENTRY_SIZE];
        disc.read_exact(&mut table_buf)?;

        let mut entries = Vec::with_capacity(n_partitions as usize);
        for i in 0..n_partitions as usize {
            let base = i * PARTITION_ENTRY_SIZE;
            let mut cur = std::io::Cursor::new(&table_buf[base..base + PARTITION_ENTRY_SIZE]);
            entries.push(WiiPartTableEntry::read(&mut cur)?);
        }
        Ok(entries)
    }

    /// Finds the first partition of a given type, for callers that only want
    /// e.g. the data partition.
    pub fn find_partition(&self, part_type: crate::structs::WiiPartType) -> Result<&WiiPartTableEntry> {
        self.partitions
            .iter()
            .find(|p| p.part_type() == part_type)
            .ok_or(DiscError::PartitionNotFound(part_type))
    }
}
