//! Integration tests for drivefs-volume
//!
//! Each test mounts a volume against a wiremock server standing in for
//! the OneDrive items API.

mod test_content;
mod test_copy;
mod test_mount;
