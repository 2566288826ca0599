use std::fmt;
use std::net::{
    SocketAddr,
    ToSocketAddrs,
};
use std::path::{
    Path,
    PathBuf,
};

use nix::unistd::geteuid;
use thiserror::Error;
use tiny_http::Method;

use crate::hook::Notifier;

pub const DEFAULT_LISTEN: &str = ":3137";
pub const DEFAULT_REALM: &str = "Protected";

/// Startup configuration errors. Any of these keeps the listener from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("must specify at least one of [-a|-r|-w|-d]")]
    NoOperations,
    #[error("must specify --key with --cert")]
    MissingKey,
    #[error("must specify --cert with --key")]
    MissingCert,
    #[error("tls requested but built without the tls feature")]
    TlsUnsupported,
    #[error("directory {0:?} does not exist or is not a directory")]
    BadDirectory(PathBuf),
    #[error("post-hook does not exist: {0:?}")]
    HookMissing(PathBuf),
    #[error("post-hook is a directory: {0:?}")]
    HookIsDirectory(PathBuf),
    #[error("post-hook is not executable: {0:?}")]
    HookNotExecutable(PathBuf),
    #[error("realm must be printable ascii: {0:?}")]
    BadRealm(String),
    #[error("invalid listen address {0:?}")]
    BadListen(String),
    #[error("cannot read credential file {path:?}: {source}")]
    Credentials {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot read {path:?}: {source}")]
    Tls {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot listen on {addr}: {reason}")]
    Bind {
        addr: String,
        reason: String,
    },
    #[error("refusing to run as root")]
    Privileged,
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// A file operation the server can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Read, Operation::Write, Operation::Delete];

    /// The HTTP verb the operation is routed on.
    pub fn method(&self) -> Method {
        match self {
            Operation::Read => Method::Get,
            Operation::Write => Method::Put,
            Operation::Delete => Method::Delete,
        }
    }

    pub fn from_method(method: &Method) -> Option<Operation> {
        match method {
            Method::Get => Some(Operation::Read),
            Method::Put => Some(Operation::Write),
            Method::Delete => Some(Operation::Delete),
            _ => None,
        }
    }

    /// Verb name as passed to the notifier.
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Read => "GET",
            Operation::Write => "PUT",
            Operation::Delete => "DELETE",
        }
    }

    pub fn is_mutation(&self) -> bool {
        *self != Operation::Read
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.verb())
    }
}

/// The set of enabled operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Operations {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
}

impl Operations {
    pub fn all() -> Operations {
        Operations {
            read: true,
            write: true,
            delete: true,
        }
    }

    pub fn contains(&self, op: Operation) -> bool {
        match op {
            Operation::Read => self.read,
            Operation::Write => self.write,
            Operation::Delete => self.delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.read && !self.write && !self.delete
    }

    pub fn iter(&self) -> impl Iterator<Item = Operation> + '_ {
        Operation::ALL.into_iter().filter(move |op| self.contains(*op))
    }
}

/// Server configuration. Built once at startup, never changed afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub dir: PathBuf,
    pub operations: Operations,
    pub listen: String,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub passwd: Option<PathBuf>,
    pub realm: String,
    pub hook: Option<PathBuf>,
    pub hook_reads: bool,
    pub verbose: bool,
}

impl Settings {

    pub fn new(dir: impl Into<PathBuf>) -> Settings {
        Settings {
            dir: dir.into(),
            operations: Operations::default(),
            listen: DEFAULT_LISTEN.to_string(),
            cert: None,
            key: None,
            passwd: None,
            realm: DEFAULT_REALM.to_string(),
            hook: None,
            hook_reads: false,
            verbose: false,
        }
    }

    /// Check the configuration once, before anything is bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operations.is_empty() {
            return Err(ConfigError::NoOperations);
        }
        match (&self.cert, &self.key) {
            (Some(_), None) => {
                return Err(ConfigError::MissingKey);
            },
            (None, Some(_)) => {
                return Err(ConfigError::MissingCert);
            },
            (Some(_), Some(_)) => {
                if !cfg!(feature = "tls") {
                    return Err(ConfigError::TlsUnsupported);
                }
            },
            (None, None) => {},
        }
        if !valid_realm(&self.realm) {
            return Err(ConfigError::BadRealm(self.realm.clone()));
        }
        if !self.dir.is_dir() {
            return Err(ConfigError::BadDirectory(self.dir.clone()));
        }
        if let Some(hook) = &self.hook {
            Notifier::check(hook)?;
        }
        resolve_listen(&self.listen)?;
        Ok(())
    }

    pub fn tls(&self) -> Option<(&Path, &Path)> {
        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

/// The realm ends up in the `WWW-Authenticate` header, so only visible ASCII and space are allowed.
fn valid_realm(realm: &str) -> bool {
    realm.bytes().all(|b| (b' '..=b'~').contains(&b))
}

/// Resolve `[host]:port`. A missing host binds all interfaces.
pub fn resolve_listen(listen: &str) -> Result<SocketAddr, ConfigError> {
    let addr = if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    };
    let mut addrs = match addr.to_socket_addrs() {
        Ok(v) => v,
        Err(_) => {
            return Err(ConfigError::BadListen(listen.to_string()));
        },
    };
    addrs.next().ok_or_else(|| ConfigError::BadListen(listen.to_string()))
}

/// Refuse to serve with superuser privileges.
pub fn check_privileges() -> Result<(), ConfigError> {
    if geteuid().is_root() {
        return Err(ConfigError::Privileged);
    }
    Ok(())
}
