//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestEnv;
//!
//! #[test]
//! fn test_first_pick() {
//!     let env = TestEnv::seeded(3, 2);
//!     let item = env.engine.current(daily_picks::Category::Movie).unwrap();
//!     assert!(item.id() >= 1);
//! }
//! ```

mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{write_seed_files, TestEnv};
