//! Storage integration tests
//!
//! Migrations against real database files, plus the restart story:
//! encrypted registrations and tokens must read back after the process
//! reopens the database with the same master key, and must not with a
//! different one.

mod persistence;
