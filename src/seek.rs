//! Seeking that never leaves the bounds of the file.

use crate::handle::Source;
use std::io::{self, SeekFrom};

/// Where to move the read cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTarget {
    /// Byte offset from the start of the file.
    Absolute(i64),
    /// Byte offset from the current position.
    Relative(i64),
}

/// Constrain `target` to `[0, size]`.
pub fn clip(target: i64, size: u64) -> u64 {
    u64::try_from(target).map_or(0, |t| t.min(size))
}

/// Move `handle` to `target`, clipped to the current file size.
///
/// Returns the resulting absolute offset.
pub fn bounded_seek<S: Source>(handle: &mut S, target: SeekTarget) -> io::Result<u64> {
    let wanted = match target {
        SeekTarget::Absolute(offset) => offset,
        SeekTarget::Relative(delta) => {
            let now = handle.stream_position()?;
            i64::try_from(now)
                .unwrap_or(i64::MAX)
                .saturating_add(delta)
        }
    };
    let edge = handle.size()?;

    handle.seek(SeekFrom::Start(clip(wanted, edge)))
}
