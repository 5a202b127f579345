// Licensed under the Apache-2.0 license

use emulator_types::HwAddr;
use thiserror::Error;

/// Configuration errors raised while building a peripheral.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum PeriphError {
    #[error("{device}: port {port} out of range, the controller has {max} ports")]
    PortOutOfRange {
        device: String,
        port: usize,
        max: usize,
    },
    #[error("{device}: port {port} is already bound")]
    PortAlreadyBound { device: String, port: usize },
    #[error("{device}: no downstream ports bound")]
    NoPortsBound { device: String },
    #[error("{device}: block size 0x{block_size:x} must be a power of two of at least 0x{min:x}")]
    InvalidBlockSize {
        device: String,
        block_size: u32,
        min: u32,
    },
    #[error("{device}: downstream size 0x{size:x} is not a multiple of the block size 0x{block_size:x}")]
    InvalidDownstreamSize {
        device: String,
        size: HwAddr,
        block_size: u32,
    },
    #[error("{device}: {lines} lines requested, supported range is 1..={max}")]
    InvalidLineCount {
        device: &'static str,
        lines: usize,
        max: usize,
    },
}

/// A saved MPC state that cannot be loaded.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("blk_idx {blk_idx} is outside the table of {blk_max} words")]
    BlockIndexOutOfRange { blk_idx: u32, blk_max: u32 },
    #[error("lookup table has {len} words, expected {expected}")]
    LutLength { len: usize, expected: usize },
    #[error("malformed state: {0}")]
    Json(#[from] serde_json::Error),
}
