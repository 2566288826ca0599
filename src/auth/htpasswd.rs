//! Credential store backed by an Apache style htpasswd file.
//!
//! Each line is `user:hash`. Supported hashes are bcrypt (`$2a$`, `$2b$`, `$2y$`) and
//! `{SHA}` (base64 of the SHA-1 digest). Entries using other schemes are kept but never verify.
//!
//! The file is read again whenever its modification time changes.
use std::collections::HashMap;
use std::fs;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::RwLock;
use std::time::SystemTime;

use log::{debug, warn};
use sha1::{Digest, Sha1};

use crate::settings::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Hash {
    Bcrypt(String),
    Sha(Vec<u8>),
    Unsupported,
}

impl Hash {
    fn parse(s: &str) -> Hash {
        if s.starts_with("$2a$") || s.starts_with("$2b$") || s.starts_with("$2y$") {
            return Hash::Bcrypt(s.to_string());
        }
        if let Some(v) = s.strip_prefix("{SHA}") {
            return match base64::decode(v) {
                Ok(digest) => Hash::Sha(digest),
                Err(_) => Hash::Unsupported,
            };
        }
        Hash::Unsupported
    }

    fn verify(&self, password: &str) -> bool {
        match self {
            Hash::Bcrypt(h) => {
                match bcrypt::verify(password, h) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("bcrypt verify failed: {}", e);
                        false
                    },
                }
            },
            Hash::Sha(digest) => {
                let got = Sha1::digest(password.as_bytes());
                constant_eq(got.as_slice(), digest)
            },
            Hash::Unsupported => false,
        }
    }
}

fn constant_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

struct Table {
    modified: Option<SystemTime>,
    users: HashMap<String, Hash>,
}

/// Read-only username to password hash mapping.
pub struct CredentialStore {
    path: PathBuf,
    table: RwLock<Table>,
}

impl CredentialStore {

    /// Load the file. Failing to read it is a startup error.
    pub fn load(path: &Path) -> Result<CredentialStore, ConfigError> {
        let table = read_table(path).map_err(|e| ConfigError::Credentials {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(CredentialStore {
            path: path.to_path_buf(),
            table: RwLock::new(table),
        })
    }

    pub fn len(&self) -> usize {
        match self.table.read() {
            Ok(t) => t.users.len(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verify `password` for `user`, re-reading the file first if it changed.
    pub fn verify(&self, user: &str, password: &str) -> bool {
        self.reload();
        let table = match self.table.read() {
            Ok(v) => v,
            Err(_) => {
                return false;
            },
        };
        match table.users.get(user) {
            Some(h) => h.verify(password),
            None => false,
        }
    }

    fn reload(&self) {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        match self.table.read() {
            Ok(t) => {
                if t.modified == modified {
                    return;
                }
            },
            Err(_) => {
                return;
            },
        }
        match read_table(&self.path) {
            Ok(v) => {
                debug!("reloaded credentials from {:?}", self.path);
                if let Ok(mut t) = self.table.write() {
                    *t = v;
                }
            },
            Err(e) => {
                warn!("cannot reload credentials from {:?}, keeping previous: {}", self.path, e);
            },
        }
    }
}

fn read_table(path: &Path) -> Result<Table, std::io::Error> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
    let content = fs::read_to_string(path)?;
    Ok(Table {
        modified,
        users: parse(&content),
    })
}

fn parse(content: &str) -> HashMap<String, Hash> {
    let mut users = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (user, hash) = match line.split_once(':') {
            Some(v) => v,
            None => {
                warn!("skipping malformed htpasswd line");
                continue;
            },
        };
        let h = Hash::parse(hash);
        if h == Hash::Unsupported {
            warn!("unsupported password hash for user {:?}", user);
        }
        users.insert(user.to_string(), h);
    }
    users
}
