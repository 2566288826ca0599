//! HTTP Basic access control.
//!
//! With no credential store configured the [Gate] lets every request through. Otherwise the
//! `Authorization` header must carry `Basic` credentials that verify against the
//! [htpasswd](crate::auth::htpasswd) store, or the request is answered with `401` and a
//! `WWW-Authenticate` challenge before any file operation runs.
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use log::debug;

pub mod htpasswd;

use htpasswd::CredentialStore;

/// Credentials submitted by the client.
pub struct AuthSpec {
    pub method: String,
    pub user: String,
    password: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    Malformed,
    Rejected,
}

impl Error for AuthError {}

impl fmt::Display for AuthError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Missing => fmt.write_str("no credentials"),
            AuthError::Malformed => fmt.write_str("auth string malformed"),
            AuthError::Rejected => fmt.write_str("credentials rejected"),
        }
    }
}

impl FromStr for AuthSpec {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<AuthSpec, AuthError> {
        let mut auth_fields = s.trim().splitn(2, ' ');
        let auth_type = match auth_fields.next() {
            Some(v) => v,
            None => {
                return Err(AuthError::Malformed);
            },
        };
        if !auth_type.eq_ignore_ascii_case("basic") {
            return Err(AuthError::Malformed);
        }
        let encoded = match auth_fields.next() {
            Some(v) => v.trim(),
            None => {
                return Err(AuthError::Malformed);
            },
        };
        let decoded = match base64::decode(encoded) {
            Ok(v) => v,
            Err(_) => {
                return Err(AuthError::Malformed);
            },
        };
        let decoded = match String::from_utf8(decoded) {
            Ok(v) => v,
            Err(_) => {
                return Err(AuthError::Malformed);
            },
        };
        match decoded.split_once(':') {
            Some((user, password)) => {
                Ok(AuthSpec {
                    method: "basic".to_string(),
                    user: user.to_string(),
                    password: password.to_string(),
                })
            },
            None => Err(AuthError::Malformed),
        }
    }
}

impl fmt::Debug for AuthSpec {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{} user {:?}", self.method, self.user)
    }
}

/// Outcome of a successful gate check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthResult {
    pub identity: Option<String>,
}

impl AuthResult {
    pub fn active(&self) -> bool {
        self.identity.is_some()
    }
}

/// Access gate in front of every registered route.
pub enum Gate {
    Open,
    Basic {
        challenge: String,
        store: CredentialStore,
    },
}

impl Gate {
    pub fn open() -> Gate {
        Gate::Open
    }

    pub fn basic(realm: &str, store: CredentialStore) -> Gate {
        Gate::Basic {
            challenge: challenge_for(realm),
            store,
        }
    }

    /// Check the value of the request's `Authorization` header, if any.
    pub fn check(&self, authorization: Option<&str>) -> Result<AuthResult, AuthError> {
        let store = match self {
            Gate::Open => {
                return Ok(AuthResult::default());
            },
            Gate::Basic { store, .. } => store,
        };
        let header = authorization.ok_or(AuthError::Missing)?;
        let spec = AuthSpec::from_str(header)?;
        debug!("have auth {:?}", spec);
        if !store.verify(&spec.user, &spec.password) {
            return Err(AuthError::Rejected);
        }
        Ok(AuthResult {
            identity: Some(spec.user),
        })
    }

    /// Value of the `WWW-Authenticate` header sent with a 401.
    pub fn challenge(&self) -> Option<&str> {
        match self {
            Gate::Open => None,
            Gate::Basic { challenge, .. } => Some(challenge.as_str()),
        }
    }
}

fn challenge_for(realm: &str) -> String {
    let mut s = String::from("Basic realm=\"");
    for c in realm.chars() {
        if c == '"' || c == '\\' {
            s.push('\\');
        }
        s.push(c);
    }
    s.push('"');
    s
}
