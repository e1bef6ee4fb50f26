//! Generated reference numbers.
//!
//! References are random; uniqueness is enforced by storage and callers
//! regenerate on conflict.

use rand::Rng;

/// Attempts made to allocate a unique reference before giving up.
pub const MAX_REFERENCE_ATTEMPTS: usize = 5;

/// 12-digit temporary return reference number for a filing.
pub fn generate_trrn() -> String {
    rand::thread_rng()
        .gen_range(100_000_000_000u64..1_000_000_000_000u64)
        .to_string()
}

/// 14-digit challan reference number for a payment.
pub fn generate_crn() -> String {
    rand::thread_rng()
        .gen_range(10_000_000_000_000u64..100_000_000_000_000u64)
        .to_string()
}
