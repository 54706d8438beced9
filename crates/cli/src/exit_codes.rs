//! CLI exit code registry.
//!
//! Exit codes are part of the shell contract — close-of-day scripts branch
//! on them, so they are documented here in one place.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success, all units reconciled                        |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args, unreadable file)              |
//! | 3    | Invalid run config                                   |
//! | 4    | Partial run: one or more units skipped               |
//! | 5    | Runtime failure (data source, output write)          |

/// Success - every estate and division reconciled.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or unreadable input.
pub const EXIT_USAGE: u8 = 2;

/// Config parse or validation failure.
pub const EXIT_CONFIG: u8 = 3;

/// The run completed but skipped units; output is partial.
pub const EXIT_PARTIAL: u8 = 4;

/// Runtime failure outside the per-unit recovery path.
pub const EXIT_RUNTIME: u8 = 5;
