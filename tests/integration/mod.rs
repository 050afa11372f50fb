//! Integration test suite for hxview
//!
//! End-to-end tests that drive the assembled pipeline the way an application
//! would: a temporary project directory, the builder, and real renders.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **rendering**: Full pages, fragments, layouts and error reporting
//! - **caching**: Compile-once under concurrency and explicit invalidation
//! - **overrides**: Project templates shadowing bundled defaults
//! - **hot_reload**: Filesystem watcher driving cache invalidation
//! - **eject**: Copying bundled components into a project

mod caching;
mod eject;
mod hot_reload;
mod overrides;
mod rendering;
