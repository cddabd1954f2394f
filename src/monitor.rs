//! File size sampling.
//!
//! A failed sample is not fatal here; the caller decides how loudly to report it.

use crate::handle::Source;
use std::io;

/// Outcome of comparing the current size against the last recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    Unchanged,
    Grew { from: u64, to: u64 },
    /// Truncated or replaced by a shorter file.
    Shrank { from: u64, to: u64 },
}

impl Growth {
    pub fn new_size(&self) -> Option<u64> {
        match *self {
            Growth::Unchanged => None,
            Growth::Grew { to, .. } | Growth::Shrank { to, .. } => Some(to),
        }
    }
}

pub fn current_size<S: Source>(handle: &S) -> io::Result<u64> {
    handle.size()
}

pub fn check_growth<S: Source>(handle: &S, last_size: u64) -> io::Result<Growth> {
    let size = current_size(handle)?;

    Ok(match size.cmp(&last_size) {
        std::cmp::Ordering::Equal => Growth::Unchanged,
        std::cmp::Ordering::Greater => Growth::Grew {
            from: last_size,
            to: size,
        },
        std::cmp::Ordering::Less => Growth::Shrank {
            from: last_size,
            to: size,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::mock::MockOpener;
    use crate::handle::Opener;
    use std::path::Path;

    #[test]
    fn test_check_growth() {
        let opener = MockOpener::with_data(b"12345");
        let handle = opener.open(Path::new("mock")).unwrap();

        assert_eq!(check_growth(&handle, 5).unwrap(), Growth::Unchanged);
        assert_eq!(
            check_growth(&handle, 0).unwrap(),
            Growth::Grew { from: 0, to: 5 }
        );
        assert_eq!(
            check_growth(&handle, 9).unwrap(),
            Growth::Shrank { from: 9, to: 5 }
        );
    }

    #[test]
    fn test_new_size() {
        assert_eq!(Growth::Unchanged.new_size(), None);
        assert_eq!(Growth::Grew { from: 1, to: 4 }.new_size(), Some(4));
        assert_eq!(Growth::Shrank { from: 4, to: 0 }.new_size(), Some(0));
    }

    #[test]
    fn test_failed_sample_is_reported() {
        let opener = MockOpener::with_data(b"12345");
        let handle = opener.open(Path::new("mock")).unwrap();
        opener.fs().fail_size = true;

        assert!(check_growth(&handle, 0).is_err());
    }
}
