pub mod scan_loop;
pub mod snapshot;
pub mod walk;

pub use scan_loop::{ScanLoop, ScanState, StartupError};
pub use snapshot::{Change, Snapshot};
pub use walk::{walk_tree, FileTimes, WalkError};
