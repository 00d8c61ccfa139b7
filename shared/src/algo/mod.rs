//! Algorithm helpers shared across crates.

pub mod parallel;

pub use parallel::{build_thread_pool, scatter_reduce_into, threads_from_env};
