//! Stable exit codes for monodeploy CLI commands.

/// Run succeeded, or there was nothing to do.
pub const OK: i32 = 0;
/// Fatal error: bad flags or config, discovery or change detection failed,
/// output directory could not be reset.
pub const INVALID: i32 = 1;
/// `monodeploy deploy` finished but at least one action failed or was aborted.
pub const FAILED: i32 = 2;
