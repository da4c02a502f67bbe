pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const HASH_BITS: u32 = (HASH_SIZE * BYTE) as u32;

/// Each difficulty step is one leading zero hex digit.
pub const BITS_PER_DIFFICULTY: u32 = 4;
pub const MAX_DIFFICULTY: u32 = HASH_BITS / BITS_PER_DIFFICULTY;
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Nonce attempts between two looks at the cancellation flag.
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;
pub const PROGRESS_LOG_INTERVAL: u64 = 1 << 20;

pub const MAX_CLOCK_SKEW_SECS: u64 = 2 * 60 * 60;

pub const ADDRESS_VERSION: u8 = 0x00;
pub const ADDRESS_KEY_HASH_SIZE: usize = 20;
pub const ADDRESS_CHECKSUM_SIZE: usize = 4;

pub const COINBASE_SENDER: &str = "coinbase";
pub const BLOCK_REWARD: u64 = 50;
