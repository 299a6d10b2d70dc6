//! # Integration Flows
//!
//! End-to-end paths through the public API: configuration → registry →
//! vectorizer → compiled ufunc → call.

pub mod flows;
