#![crate_name = "kvdir"]

//! kvdir serves a flat directory of files as a key-value store over HTTP.
//! The key is the filename, the value is the file content, stored as opaque bytes.
//!
//! ## Operations
//!
//! | Method | Path          | Success      | Failure                                  |
//! |--------|---------------|--------------|------------------------------------------|
//! | GET    | `/{filename}` | 200 + body   | 404 if missing, 500 on I/O error         |
//! | PUT    | `/{filename}` | 204          | 400 if body unreadable, 500 on I/O error |
//! | DELETE | `/{filename}` | 204          | 404 if missing, 500 on I/O error         |
//!
//! Each operation is enabled separately on the command line. An operation that is not enabled
//! has no route at all, so requests for it get a plain `404 page not found`, not a JSON error
//! and never a `401`.
//!
//! Failures are answered with a JSON envelope, `{"error": "<message>"}`.
//!
//! Filenames are a single path segment. After percent-decoding, `.`, `..` and names containing
//! `/`, `\` or NUL are rejected with `400`.
//!
//! ## Access control
//!
//! If an htpasswd file is given, every route requires HTTP Basic credentials. See the
//! [kvdir::auth](crate::auth) module.
//!
//! ## Post-hook
//!
//! An external program can be run after every successful write or delete, and optionally after
//! reads. See [kvdir::hook](crate::hook).
//!
//! ## Consistency
//!
//! Requests are handled concurrently and nothing is locked. Two concurrent `PUT`s to the same key
//! leave whichever write finished last, and a `GET` racing a `PUT` may see the old content, the
//! new content, or a truncated file. Clients that need more must coordinate themselves.
//!
//! ## Running the daemon
//!
//! ``` ignore,
//! kvdir --all --listen 127.0.0.1:3137 --passwd ./htpasswd /srv/data
//! ```
//!
//! See `kvdir --help` for all options.

/// Command line parsing into [Settings](crate::settings::Settings).
pub mod arg;

/// HTTP Basic access gate and credential store.
pub mod auth;

/// Failure kinds and the JSON error envelope.
pub mod error;

/// Runs the post-hook program after successful operations.
pub mod hook;

/// File operations against the served directory.
pub mod record;

/// Filename resolution and per-request state.
pub mod request;

/// Turns operation outcomes into file, error, challenge and no-route responses.
pub mod response;

/// Maps enabled operations to handlers behind the access gate.
pub mod router;

/// HTTP and HTTPS listener with one worker thread per request.
pub mod server;

/// Server configuration and startup checks.
pub mod settings;
