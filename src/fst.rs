//! FST walker (C7): parses the filesystem descriptor table and recreates
//! the directory hierarchy, emitting files through a [`FileEmitter`].
//!
//! Grounded on `original_source/negentig.c::do_fst`/`do_files`. The
//! recursive `chdir`-based walk in the original is replaced with an
//! explicit path-stack-passing walk (spec.md §9 Design Notes) so this
//! module never touches process state; the host filesystem driver in
//! `emit.rs` receives full paths instead.

use crate::be::be32;
use crate::error::{DiscError, Result};

const ENTRY_SIZE: usize = 12;

struct RawEntry {
    flag: u8,
    name_offset: u32,
    field1: u32,
    size_or_end: u32,
}

/// A parsed filesystem descriptor table.
pub struct Fst {
    entries: Vec<RawEntry>,
    names: Vec<u8>,
}

/// Receives the directory/file events of an FST walk. Implementations
/// decide what "entering a directory" or "emitting a file" means — the
/// walker itself never touches a filesystem.
pub trait FileEmitter {
    /// Called when entering directory `name`. `is_last` indicates whether
    /// this is the last sibling in its parent directory (for tree-style
    /// rendering).
    fn enter_dir(&mut self, name: &str, is_last: bool) -> Result<()>;
    /// Called after all of a directory's descendants have been emitted.
    fn leave_dir(&mut self) -> Result<()>;
    /// Called for each file entry, with its offset/size in the partition's
    /// logical stream.
    fn emit_file(&mut self, name: &str, offset: u64, size: u32, is_last: bool) -> Result<()>;
}

impl Fst {
    /// Parses a contiguous FST buffer (`fst_size` bytes read from the
    /// partition's logical stream at `fst_offset`).
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < ENTRY_SIZE {
            return Err(DiscError::FstIndexOutOfRange {
                index: 0,
                entry_count: 0,
            });
        }
        // Entry 0 is the synthetic root; its third word is the total entry
        // count.
        let entry_count = be32(&buf[8..]);
        let names_offset = ENTRY_SIZE * entry_count as usize;
        if buf.len() < names_offset {
            return Err(DiscError::FstIndexOutOfRange {
                index: entry_count,
                entry_count,
            });
        }

        let mut entries = Vec::with_capacity(entry_count as usize);
        for i in 0..entry_count as usize {
            let base = i * ENTRY_SIZE;
            let word0 = be32(&buf[base..]);
            entries.push(RawEntry {
                flag: (word0 >> 24) as u8,
                name_offset: word0 & 0x00FF_FFFF,
                field1: be32(&buf[base + 4..]),
                size_or_end: be32(&buf[base + 8..]),
            });
        }
        let names = buf[names_offset..].to_vec();
        Ok(Fst { entries, names })
    }

    pub fn entry_count(&self) -> u32 {
        self.entries.len() as u32
    }

    fn name(&self, index: usize) -> Result<&str> {
        let entry = &self.entries[index];
        let start = entry.name_offset as usize;
        let bytes = self.names.get(start..).ok_or(DiscError::FstIndexOutOfRange {
            index: index as u32,
            entry_count: self.entry_count(),
        })?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        std::str::from_utf8(&bytes[..end]).map_err(|_| DiscError::FstIndexOutOfRange {
            index: index as u32,
            entry_count: self.entry_count(),
        })
    }

    /// Walks the tree depth-first, calling `emitter` for every directory and
    /// file, in on-disc entry order. Halts with the continuation index at
    /// `entry_count` (spec.md §8 property 6).
    pub fn walk<E: FileEmitter>(&self, emitter: &mut E) -> Result<()> {
        let n = self.entry_count();
        if n <= 1 {
            return Ok(());
        }
        self.walk_range(emitter, 1, n)?;
        Ok(())
    }

    fn walk_range<E: FileEmitter>(&self, emitter: &mut E, start: u32, end: u32) -> Result<()> {
        let mut j = start;
        while j < end {
            // Position-based guess, overridden for directories below —
            // mirrors the original's `(j == size - 1)` caller-supplied
            // default that only directories recompute from their parent
            // pointer.
            let mut is_last = j == end - 1;

            let idx = j as usize;
            if idx >= self.entries.len() {
                return Err(DiscError::FstIndexOutOfRange {
                    index: j,
                    entry_count: self.entry_count(),
                });
            }
            let entry_flag = self.entries[idx].flag;
            let entry_end = self.entries[idx].size_or_end;
            let name = self.name(idx)?.to_string();

            if entry_flag != 0 {
                let parent = self.entries[idx].field1 as usize;
                if let Some(parent_entry) = self.entries.get(parent) {
                    is_last = parent_entry.size_or_end == entry_end;
                }
                emitter.enter_dir(&name, is_last)?;
                self.walk_range(emitter, j + 1, entry_end)?;
                emitter.leave_dir()?;
                j = entry_end;
            } else {
                let offset = (self.entries[idx].field1 as u64) << 2;
                emitter.emit_file(&name, offset, entry_end, is_last)?;
                j += 1;
            }
        }
        Ok(())
    }
}
