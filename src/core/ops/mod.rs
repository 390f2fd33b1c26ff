//! core::ops
//!
//! Locking for mutating operations.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive (page, branch) locks with bounded wait
//!
//! # Architecture
//!
//! Every mutating operation:
//! 1. Acquires the lock for each (page, branch) scope it writes
//! 2. Re-reads branch heads under the lock
//! 3. Creates the commit and advances the ref with compare-and-swap
//! 4. Updates the commit index while still holding the lock
//! 5. Releases the lock on drop, on success and failure alike

pub mod lock;

pub use lock::{LockError, PageLock, PageLocks};
