//! Extraction configuration.
//!
//! Replaces the original's file-scope `static` flags (`just_a_partition`,
//! `dump_partition_data`, `uncompress_yaz0`, `unpack_rarc`,
//! `max_size_to_auto_analyse`) with an explicit value threaded through the
//! driver/session, per the Design Notes in spec.md §9. The CLI binary
//! populates this from `clap` args; defaults below match spec.md §6.

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Treat the input as a single pre-decrypted partition image: skip the
    /// disc/partition-table walk and disable decryption+verification.
    pub just_a_partition: bool,
    /// After header processing, dump the entire decrypted+verified logical
    /// stream to `###dat###`.
    pub dump_partition_data: bool,
    /// Auto-decompress Yaz0-magic files below `max_size_to_auto_analyse`.
    pub uncompress_yaz0: bool,
    /// Recognise RARC magic (log only, no unpacking).
    pub unpack_rarc: bool,
    /// Files larger than this are always streamed as-is, no magic sniffing.
    pub max_size_to_auto_analyse: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            just_a_partition: false,
            dump_partition_data: false,
            uncompress_yaz0: true,
            unpack_rarc: true,
            max_size_to_auto_analyse: 0x1000000,
        }
    }
}
