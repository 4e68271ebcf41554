//! OAuth integration tests
//!
//! Discovery, dynamic registration, authorization initiation, callback
//! handling, and the background token exchange, all against a mock
//! provider.
