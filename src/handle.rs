//! File handles for the followed file, and reopening them in place.

use crate::error::FollowError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A readable, seekable handle whose current on-disk size can be queried.
pub trait Source: Read + Seek {
    fn size(&self) -> io::Result<u64>;
}

impl Source for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// Opens fresh handles for a path, always with the same access mode.
pub trait Opener {
    type Handle: Source;

    fn open(&self, path: &Path) -> io::Result<Self::Handle>;
}

/// Opens real files with a fixed set of `OpenOptions`.
#[derive(Debug, Clone)]
pub struct FileOpener {
    options: OpenOptions,
}

impl FileOpener {
    pub fn read_only() -> Self {
        let mut options = OpenOptions::new();
        options.read(true);
        Self { options }
    }
}

impl Opener for FileOpener {
    type Handle = File;

    fn open(&self, path: &Path) -> io::Result<File> {
        self.options.open(path)
    }
}

/// Reopen `handle` on `path`, restoring its read position.
///
/// Picks up a file that was replaced on disk while keeping the logical
/// position. The old handle is closed once the new one is in place.
/// Returns the restored position.
pub fn refresh<O: Opener>(
    opener: &O,
    path: &Path,
    handle: &mut O::Handle,
) -> Result<u64, FollowError> {
    let position = handle.stream_position().map_err(FollowError::Metadata)?;

    let mut fresh = opener
        .open(path)
        .map_err(|source| FollowError::open(path, source))?;
    fresh
        .seek(SeekFrom::Start(position))
        .map_err(FollowError::Metadata)?;

    *handle = fresh;
    Ok(position)
}


#[cfg(test)]
mod tests {
    use super::mock::MockOpener;
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_source_reports_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let handle = FileOpener::read_only().open(file.path()).unwrap();
        assert_eq!(handle.size().unwrap(), 10);
    }

    #[test]
    fn test_refresh_preserves_position() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let opener = FileOpener::read_only();
        let mut handle = opener.open(file.path()).unwrap();
        handle.seek(SeekFrom::Start(6)).unwrap();

        let restored = refresh(&opener, file.path(), &mut handle).unwrap();
        assert_eq!(restored, 6);

        let mut rest = String::new();
        handle.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "world");
    }

    #[test]
    fn test_refresh_picks_up_replaced_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"old-old-").unwrap();

        let opener = FileOpener::read_only();
        let mut handle = opener.open(&path).unwrap();
        handle.seek(SeekFrom::Start(4)).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"new-content").unwrap();

        refresh(&opener, &path, &mut handle).unwrap();
        assert_eq!(handle.size().unwrap(), 11);

        let mut rest = String::new();
        handle.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "content");
    }

    #[test]
    fn test_refresh_open_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.log");
        std::fs::write(&path, b"data").unwrap();

        let opener = FileOpener::read_only();
        let mut handle = opener.open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = refresh(&opener, &path, &mut handle).unwrap_err();
        assert!(matches!(err, FollowError::Open { .. }));
        assert!(err.to_string().contains("gone.log"));
    }

    #[test]
    fn test_mock_refresh_counts_opens() {
        let opener = MockOpener::with_data(b"abc");
        let mut handle = opener.open(Path::new("mock")).unwrap();
        handle.seek(SeekFrom::Start(2)).unwrap();

        assert_eq!(refresh(&opener, Path::new("mock"), &mut handle).unwrap(), 2);
        assert_eq!(opener.fs().opens, 2);
    }
}
