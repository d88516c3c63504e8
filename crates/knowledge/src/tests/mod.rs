//! Crate-level tests spanning learn, index and retrieval.
