//! Typed on-disc layouts parsed with `binrw`.
//!
//! Mirrors the field set implied by the teacher crate's `structs` module
//! (`DiscHeader`, `ApploaderHeader`, `DOLHeader`, `WiiPartTableEntry`) — the
//! struct bodies were not part of the retrieved file set, but every field
//! access at the teacher's call sites (`reader.rs`, `builder.rs`) pins down
//! the shape reproduced here. The ticket/TMD/certificate chain is handled in
//! `partition.rs` as raw byte ranges, not typed structs here, since this
//! crate never validates them (spec.md's documented omission) — only their
//! offsets and sizes matter.

use binrw::BinRead;

/// A 34-bit sector address/size: a 32-bit big-endian word shifted left by
/// two to become a byte offset or size. `Deref`s to `u64` so call sites read
/// like `*entry.part_data_off`, matching the teacher's idiom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U34(pub u64);

impl BinRead for U34 {
    type Args<'a> = ();

    fn read_options<R: std::io::Read + std::io::Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<Self> {
        let raw = u32::read_options(reader, endian, ())?;
        Ok(U34((raw as u64) << 2))
    }
}

impl std::ops::Deref for U34 {
    type Target = u64;
    fn deref(&self) -> &u64 {
        &self.0
    }
}

impl From<u64> for U34 {
    fn from(v: u64) -> Self {
        U34(v)
    }
}

/// The disc-level header at absolute offset 0.
#[derive(BinRead, Debug, Clone)]
#[br(big)]
pub struct DiscHeader {
    pub title_id_ascii: [u8; 4],
    pub group_id: [u8; 2],
    #[br(pad_before = 0x1A)]
    pub name: NulTerminatedName,
    #[br(seek_before = std::io::SeekFrom::Start(0x0420))]
    pub dol_off: U34,
    pub fst_off: U34,
    pub fst_sz: U34,
    pub fst_max_sz: U34,
}

/// A fixed-capacity NUL-terminated ASCII string, the way the game name is
/// stored in the disc/partition headers.
#[derive(Debug, Clone, Default)]
pub struct NulTerminatedName(pub String);

impl BinRead for NulTerminatedName {
    type Args<'a> = ();

    fn read_options<R: std::io::Read + std::io::Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<Self> {
        let mut buf = [0u8; 0x40];
        let pos = reader.stream_position()?;
        reader.read_exact(&mut buf)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let s = String::from_utf8_lossy(&buf[..end]).into_owned();
        // the name field isn't fixed-length on disc, only conventionally
        // bounded; rewind to just past the NUL so later seeks aren't thrown
        // off by the generous read above.
        reader.seek(std::io::SeekFrom::Start(pos + end as u64 + 1))?;
        Ok(NulTerminatedName(s))
    }
}

/// A Wii partition-table entry as stored in the entry table pointed to by
/// the word at disc offset 0x40004.
#[derive(BinRead, Debug, Clone, Copy)]
#[br(big)]
pub struct WiiPartTableEntry {
    pub part_data_off: U34,
    pub part_type_raw: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WiiPartType {
    Data,
    Update,
    Channel,
    Other(u32),
}

impl From<u32> for WiiPartType {
    fn from(v: u32) -> Self {
        match v {
            0 => WiiPartType::Data,
            1 => WiiPartType::Update,
            2 => WiiPartType::Channel,
            other => WiiPartType::Other(other),
        }
    }
}

impl WiiPartTableEntry {
    pub fn part_type(&self) -> WiiPartType {
        self.part_type_raw.into()
    }
}

