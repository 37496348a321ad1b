//! # State Channel Test Suite
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs   # Two nodes on one bus and chain, an even-split app
//!     └── lifecycle.rs # Setup, install/uninstall, update, timeouts
//! ```
//!
//! ```bash
//! cargo test -p sc-tests
//! ```

pub mod integration;
