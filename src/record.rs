//! File operations against the served directory.
//!
//! None of these lock anything. Two writers to the same file race, and the last completed write
//! wins; a read racing a write can see a truncated file.
use std::fs::{
    self,
    File,
    OpenOptions,
};
use std::io::{
    ErrorKind as IoErrorKind,
    Read,
    Write,
};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use log::{debug, error, info};

use crate::error::RequestError;

/// Mode for newly created files: no execute bits, no group or other write.
pub const FILE_MODE: u32 = 0o644;

/// Open the file at `path` for reading.
pub fn fetch(path: &Path) -> Result<File, RequestError> {
    let f = match File::open(path) {
        Ok(v) => v,
        Err(e) => {
            if e.kind() == IoErrorKind::NotFound {
                debug!("{:?} not found", path);
                return Err(RequestError::not_found());
            }
            error!("cannot open {:?}: {}", path, e);
            return Err(RequestError::internal("system error on read"));
        },
    };
    match f.metadata() {
        Ok(m) => {
            if m.is_dir() {
                return Err(RequestError::not_found());
            }
        },
        Err(e) => {
            error!("cannot stat {:?}: {}", path, e);
            return Err(RequestError::internal("system error on read"));
        },
    }
    Ok(f)
}

/// Read the whole body, then write it to `path`, replacing any previous content.
///
/// # Arguments
///
/// * `path` - Target file.
/// * `f` - Request body.
/// * `expected_size` - Declared body length, if the client sent one.
pub fn store(path: &Path, mut f: impl Read, expected_size: Option<usize>) -> Result<usize, RequestError> {
    let mut data: Vec<u8> = vec!();
    match f.read_to_end(&mut data) {
        Ok(_) => {},
        Err(e) => {
            error!("cannot read from request body: {}", e);
            return Err(RequestError::bad_request(e.to_string()));
        },
    }
    if let Some(v) = expected_size {
        if v != data.len() {
            return Err(RequestError::bad_request(format!(
                "body length {} does not match declared {}",
                data.len(),
                v,
                )));
        }
    }

    let mut of = match OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(path)
    {
        Ok(v) => v,
        Err(e) => {
            error!("cannot open {:?} for write: {}", path, e);
            return Err(RequestError::internal("system error on write"));
        },
    };
    if let Err(e) = of.write_all(&data) {
        error!("cannot write {:?}: {}", path, e);
        return Err(RequestError::internal("system error on write"));
    }
    info!("wrote {} bytes to {:?}", data.len(), path);
    Ok(data.len())
}

/// Remove the file at `path`.
pub fn remove(path: &Path) -> Result<(), RequestError> {
    match fs::symlink_metadata(path) {
        Ok(m) => {
            if m.is_dir() {
                return Err(RequestError::not_found());
            }
        },
        Err(e) => {
            if e.kind() == IoErrorKind::NotFound {
                return Err(RequestError::not_found());
            }
            error!("cannot stat {:?}: {}", path, e);
            return Err(RequestError::internal("system error on delete"));
        },
    }
    match fs::remove_file(path) {
        Ok(_) => {
            info!("removed {:?}", path);
            Ok(())
        },
        Err(e) => {
            if e.kind() == IoErrorKind::NotFound {
                return Err(RequestError::not_found());
            }
            error!("cannot remove {:?}: {}", path, e);
            Err(RequestError::internal("system error on delete"))
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{
        create_dir,
        metadata,
        read,
        write,
    };
    use std::io::{
        self,
        Read,
    };
    use std::os::unix::fs::PermissionsExt;

    use tempfile::tempdir;

    use super::{
        fetch,
        remove,
        store,
    };
    use crate::error::ErrorKind;

    struct BrokenBody;

    impl Read for BrokenBody {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
        }
    }

    #[test]
    fn test_store_fetch() {
        let d = tempdir().unwrap();
        let fp = d.path().join("foo");
        let n = store(&fp, &b"foobar"[..], Some(6)).unwrap();
        assert_eq!(n, 6);

        let mut f = fetch(&fp).unwrap();
        let mut got = vec!();
        f.read_to_end(&mut got).unwrap();
        assert_eq!(got, b"foobar");

        let mode = metadata(&fp).unwrap().permissions().mode();
        assert_eq!(mode & 0o133, 0);
    }

    #[test]
    fn test_store_truncates() {
        let d = tempdir().unwrap();
        let fp = d.path().join("foo");
        write(&fp, "a much longer previous value").unwrap();
        store(&fp, &b"short"[..], None).unwrap();
        assert_eq!(read(&fp).unwrap(), b"short");
    }

    #[test]
    fn test_store_bad_body() {
        let d = tempdir().unwrap();
        let fp = d.path().join("foo");
        let e = store(&fp, BrokenBody, None).unwrap_err();
        assert_eq!(e.kind, ErrorKind::BadRequest);
        assert!(!fp.exists());

        let e = store(&fp, &b"abc"[..], Some(10)).unwrap_err();
        assert_eq!(e.kind, ErrorKind::BadRequest);
        assert!(!fp.exists());
    }

    #[test]
    fn test_store_into_missing_dir() {
        let d = tempdir().unwrap();
        let fp = d.path().join("missing").join("foo");
        let e = store(&fp, &b"abc"[..], None).unwrap_err();
        assert_eq!(e.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_fetch_missing() {
        let d = tempdir().unwrap();
        let e = fetch(&d.path().join("nope")).unwrap_err();
        assert_eq!(e.kind, ErrorKind::NotFound);

        create_dir(d.path().join("sub")).unwrap();
        let e = fetch(&d.path().join("sub")).unwrap_err();
        assert_eq!(e.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_remove() {
        let d = tempdir().unwrap();
        let fp = d.path().join("foo");
        write(&fp, "x").unwrap();
        remove(&fp).unwrap();
        assert!(!fp.exists());

        let e = remove(&fp).unwrap_err();
        assert_eq!(e.kind, ErrorKind::NotFound);
    }
}
