//! File emitter (C8): streams file bytes to the host filesystem, with
//! transparent Yaz0 decompression and RARC magic sniffing for small files.
//!
//! Grounded on `original_source/negentig.c::do_fst_file`/`copy_file` (the
//! streaming-vs-in-memory size threshold, the magic sniff) and
//! `reader_writer.rs::extract_system_files`'s `create_dir_all`/`File::create`
//! idiom for turning a logical path into real host filesystem state.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use crate::config::ExtractConfig;
use crate::error::Result;
use crate::fst::FileEmitter;
use crate::yaz0;

const STREAM_CHUNK_SIZE: u64 = 0x80000;
const RARC_MAGIC: &[u8; 4] = b"RARC";

/// Abstracts "read `len` bytes at logical offset `offset`" so `HostEmitter`
/// doesn't need to know whether it's talking to a `PartitionStream` or a
/// plain file.
pub trait LogicalReader {
    fn read_at(&mut self, offset: u64, len: u64) -> std::io::Result<Vec<u8>>;
}

impl<'a, RS: std::io::Read + std::io::Seek> LogicalReader for crate::stream::PartitionStream<'a, RS> {
    fn read_at(&mut self, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
        crate::stream::PartitionStream::read_at(self, offset, len)
    }
}

/// Recreates the FST's directory hierarchy under `base_dir` on the host
/// filesystem and writes out file contents as the walker visits them.
pub struct HostEmitter<'a, R: LogicalReader> {
    reader: &'a mut R,
    base_dir: PathBuf,
    path: Vec<String>,
    config: &'a ExtractConfig,
}

impl<'a, R: LogicalReader> HostEmitter<'a, R> {
    pub fn new(reader: &'a mut R, base_dir: PathBuf, config: &'a ExtractConfig) -> Self {
        HostEmitter {
            reader,
            base_dir,
            path: Vec::new(),
            config,
        }
    }

    fn current_dir(&self) -> PathBuf {
        let mut p = self.base_dir.clone();
        for part in &self.path {
            p.push(part);
        }
        p
    }

    fn tree_prefix(depth: usize, is_last: bool) -> String {
        format!("{}{}-- ", "    ".repeat(depth), if is_last { '`' } else { '|' })
    }

    fn write_file_contents(&mut self, path: &PathBuf, offset: u64, size: u32) -> Result<()> {
        let size = size as u64;
        if size > self.config.max_size_to_auto_analyse {
            let mut file = File::create(path)?;
            let mut remaining = size;
            let mut cursor = offset;
            while remaining > 0 {
                let chunk = STREAM_CHUNK_SIZE.min(remaining);
                let data = self.reader.read_at(cursor, chunk)?;
                file.write_all(&data)?;
                cursor += chunk;
                remaining -= chunk;
            }
            return Ok(());
        }

        let mut data = self.reader.read_at(offset, size)?;
        if self.config.uncompress_yaz0 && data.len() >= 8 && &data[..4] == yaz0::MAGIC {
            log::info!(" [Yaz0]");
            data = yaz0::decompress(&data);
        }
        if self.config.unpack_rarc && data.len() >= 8 && &data[..4] == RARC_MAGIC {
            log::info!(" [RARC]");
        }

        let mut file = File::create(path)?;
        file.write_all(&data)?;
        Ok(())
    }
}

impl<'a, R: LogicalReader> FileEmitter for HostEmitter<'a, R> {
    fn enter_dir(&mut self, name: &str, is_last: bool) -> Result<()> {
        log::info!("{}{}/", Self::tree_prefix(self.path.len(), is_last), name);
        self.path.push(name.to_string());
        fs::create_dir_all(self.current_dir())?;
        Ok(())
    }

    fn leave_dir(&mut self) -> Result<()> {
        self.path.pop();
        Ok(())
    }

    fn emit_file(&mut self, name: &str, offset: u64, size: u32, is_last: bool) -> Result<()> {
        log::info!("{}{}", Self::tree_prefix(self.path.len(), is_last), name);
        let mut path = self.current_dir();
        fs::create_dir_all(&path)?;
        path.push(name);
        self.write_file_contents(&path, offset, size)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;

    struct FakeReader {
        data: Vec<u8>,
        calls: RefCell<Vec<(u64, u64)>>,
    }

    impl LogicalReader for FakeReader {
        fn read_at(&mut self, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
            self.calls.borrow_mut().push((offset, len));
            Ok(self.data[offset as usize..(offset + len) as usize].to_vec())
        }
    }

    #[test]
    fn small_yaz0_file_is_decompressed_before_write() {
        let mut yaz0_input = Vec::new();
        yaz0_input.extend_from_slice(b"Yaz0");
        yaz0_input.extend_from_slice(&5u32.to_be_bytes());
        yaz0_input.extend_from_slice(&[0u8; 8]);
        yaz0_input.push(0xFF);
        yaz0_input.extend_from_slice(b"Hello");

        let mut reader = FakeReader {
            data: yaz0_input.clone(),
            calls: RefCell::new(Vec::new()),
        };
        let config = ExtractConfig::default();
        let tmp = std::env::temp_dir().join(format!("wiidisc-test-{}", std::process::id()));
        fs::create_dir_all(&tmp).unwrap();
        let mut emitter = HostEmitter::new(&mut reader, tmp.clone(), &config);
        emitter
            .emit_file("f.bin", 0, yaz0_input.len() as u32, true)
            .unwrap();

        let written = fs::read(tmp.join("f.bin")).unwrap();
        assert_eq!(written, b"Hello");
        fs::remove_dir_all(&tmp).ok();
    }
}
