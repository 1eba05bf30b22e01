//! Consolidated integration tests for marketplace-client.
//!
//! A single test binary keeps the HTTP mock servers from competing
//! across parallel test executables.

mod file_repository;
mod http_repository;
mod support;
