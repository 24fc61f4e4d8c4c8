//! Translation of symbolic permission specs into file modes
//!
//! A spec is any combination of `r`, `w` and `x`. Each letter present grants:
//! - `r`: read to owner, group and other
//! - `w`: write to owner and group only (other never gets write)
//! - `x`: execute to owner, group and other
//!
//! Any other character is ignored, so translation never fails.

use nix::sys::stat::Mode;
use std::fmt;

/// Permission bits applied to a file (owner/group/other rwx only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PermissionMode(u32);

impl PermissionMode {
    /// Mode with every permission bit cleared
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Keep only the owner/group/other rwx bits of `bits`
    pub fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & 0o777)
    }

    /// Raw mode bits, suitable for `PermissionsExt::from_mode`
    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: PermissionMode) -> bool {
        self.0 & other.0 == other.0
    }

    fn with(self, mode: Mode) -> Self {
        Self(self.0 | u32::from(mode.bits()))
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// Translate a permission spec such as `"rw"` into a mode
pub fn translate(spec: &str) -> PermissionMode {
    let mut mode = PermissionMode::empty();
    if spec.contains('r') {
        mode = mode.with(Mode::S_IRUSR | Mode::S_IRGRP | Mode::S_IROTH);
    }
    if spec.contains('w') {
        mode = mode.with(Mode::S_IWUSR | Mode::S_IWGRP);
    }
    if spec.contains('x') {
        mode = mode.with(Mode::S_IXUSR | Mode::S_IXGRP | Mode::S_IXOTH);
    }
    mode
}
