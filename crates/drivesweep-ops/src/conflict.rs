//! Collision-free destination names.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

/// Numbered names tried before an item gives up.
pub const MAX_RENAME_ATTEMPTS: usize = 1000;

/// `name.ext` with a counter: `name (3).ext`, or `name (3)` without extension.
pub fn numbered_name(file_name: &OsStr, n: usize) -> OsString {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem} ({n}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({n})"),
    };
    OsString::from(name)
}

/// Why no destination could be claimed.
#[derive(Debug)]
pub(crate) enum PlaceError {
    /// Every name up to the limit already existed.
    Exhausted,
    /// The placement failed for another reason.
    Io(io::Error),
}

/// Try `dir/file_name`, then `dir/stem (1).ext` and so on, calling `place`
/// on each candidate until it succeeds.
///
/// `place` must fail with [`io::ErrorKind::AlreadyExists`] when the candidate
/// is taken, and must never replace an existing file.
pub(crate) fn place_unique<F>(
    dir: &Path,
    file_name: &OsStr,
    max_attempts: usize,
    mut place: F,
) -> Result<PathBuf, PlaceError>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let candidates = std::iter::once(dir.join(file_name))
        .chain((1..=max_attempts).map(|n| dir.join(numbered_name(file_name, n))));

    for candidate in candidates {
        match place(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(PlaceError::Io(err)),
        }
    }

    Err(PlaceError::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name(OsStr::new("song.mp3"), 1), "song (1).mp3");
        assert_eq!(numbered_name(OsStr::new("archive.tar.gz"), 2), "archive.tar (2).gz");
    }

    #[test]
    fn test_numbered_name_no_extension() {
        assert_eq!(numbered_name(OsStr::new("README"), 7), "README (7)");
    }

    #[test]
    fn test_place_unique_skips_taken_names() {
        let taken = ["a.txt", "a (1).txt"];
        let placed = place_unique(Path::new("/out"), OsStr::new("a.txt"), 10, |candidate| {
            let name = candidate.file_name().unwrap().to_string_lossy().into_owned();
            if taken.contains(&name.as_str()) {
                Err(io::Error::from(io::ErrorKind::AlreadyExists))
            } else {
                Ok(())
            }
        });
        assert_eq!(placed.unwrap(), PathBuf::from("/out/a (2).txt"));
    }

    #[test]
    fn test_place_unique_gives_up() {
        let mut calls = 0;
        let placed = place_unique(Path::new("/out"), OsStr::new("a.txt"), 3, |_| {
            calls += 1;
            Err(io::Error::from(io::ErrorKind::AlreadyExists))
        });
        assert!(matches!(placed, Err(PlaceError::Exhausted)));
        assert_eq!(calls, 4);
    }
}
