//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `offergrade` exit codes.
//! Exit codes are part of the shell contract: CI jobs gate on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success                                        |
//! | 1    | General error (unspecified)                    |
//! | 2    | CLI usage error (bad args)                     |
//! | 3    | Invalid config                                 |
//! | 4    | Runtime / IO error (unreadable or unwritable)  |
//! | 5    | Candidate payload could not be decoded         |
//! | 6    | A unit selected no ground-truth rows           |
//! | 7    | Schema error (missing field/column, bad kind)  |
//! | 8    | Mean similarity below `--fail-under`           |

use offergrade_linkage::{ErrorCategory, LinkageError};

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Cannot read an input or write an output.
pub const EXIT_RUNTIME: u8 = 4;

/// Candidate payload is not valid JSON or not shaped like an offer list.
pub const EXIT_DECODE: u8 = 5;

/// No ground-truth rows matched a unit key.
pub const EXIT_SELECTION: u8 = 6;

/// Inputs do not carry the configured fields, or carry values of the wrong kind.
pub const EXIT_SCHEMA: u8 = 7;

/// Quality gate: batch mean similarity is below `--fail-under`.
pub const EXIT_BELOW_THRESHOLD: u8 = 8;

/// Map a library error to its exit code.
pub fn linkage_exit_code(err: &LinkageError) -> u8 {
    match err.category() {
        ErrorCategory::Config => EXIT_INVALID_CONFIG,
        ErrorCategory::Schema => EXIT_SCHEMA,
        ErrorCategory::Decode => EXIT_DECODE,
        ErrorCategory::Selection => EXIT_SELECTION,
        ErrorCategory::Io => EXIT_RUNTIME,
    }
}
