//! # Vectorize Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs      # Shared kernels and input generators
//! │   └── integration/     # Registry → vectorizer → ufunc flows
//! └── benches/             # Criterion benchmarks per strategy/target
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p vectorize-tests
//!
//! # Benchmarks
//! cargo bench -p vectorize-tests
//! ```

pub mod fixtures;
pub mod integration;
