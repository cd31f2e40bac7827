//! Library for extracting and verifying the contents of a Wii optical disc
//! image: header/partition-table parsing, AES-128-CBC + SHA-1 cluster
//! decryption and hash-tree verification, the partition logical stream, the
//! filesystem descriptor table walker, and transparent Yaz0 decompression.

pub mod be;
pub mod cluster;
pub mod config;
pub mod crypto;
pub mod disc;
pub mod driver;
pub mod emit;
pub mod error;
pub mod fst;
pub mod partition;
pub mod session;
pub mod stream;
pub mod structs;
pub mod yaz0;

pub use config::ExtractConfig;
pub use disc::DiscImage;
pub use error::{DiscError, Result};
pub use session::Session;
