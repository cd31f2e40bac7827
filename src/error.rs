//! Fatal error types.
//!
//! Verification mismatches (H0..H3) are deliberately *not* represented here
//! — they are accumulated in [`crate::cluster::VerifyErrors`] and reported,
//! never propagated. Everything in [`DiscError`] aborts the current
//! operation, the way `fatal()` aborted the whole process in the original.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("layout error: {0}")]
    BinRW(#[from] binrw::Error),

    #[error("fst entry {index} refers outside the {entry_count} declared entries")]
    FstIndexOutOfRange { index: u32, entry_count: u32 },

    #[error("partition type {0:?} not present on this disc")]
    PartitionNotFound(crate::structs::WiiPartType),

    #[error("disc reports {0} partitions, which is absurd")]
    ImplausiblePartitionCount(u32),
}

pub type Result<T> = std::result::Result<T, DiscError>;
