//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-sync`). Host applications can depend
//! on `playlist-sync-workspace` and enable `desktop-shims` for the fully wired
//! service, or `engine-only` to embed the reconciliation engine with their own
//! bridge implementations.
