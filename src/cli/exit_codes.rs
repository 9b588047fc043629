//! exit codes for qtree commands
//!
//! these follow Unix conventions where 0 = success and non-zero = error
//! specific codes help scripts distinguish between failure types

/// command completed successfully
pub const SUCCESS: i32 = 0;

/// general or unknown error
pub const ERROR: i32 = 1;

/// invalid command-line arguments (unknown field, disallowed operator)
pub const INVALID_ARGS: i32 = 4;

/// fields file missing, unreadable or inconsistent
pub const CONFIG_ERROR: i32 = 5;

/// query could not be parsed or has validation errors
pub const INVALID_QUERY: i32 = 8;
