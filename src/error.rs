//! Errors surfaced at the crate boundary.
//!
//! Missing cache data is never an error: the executor folds every failure to
//! resolve into an unresolved-field status. The variants here only cover
//! documents the engine cannot even start on. A resolver that panics is not
//! caught; catching around the executor call is the caller's responsibility.

use displaydoc::Display;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Display, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub enum DedupError {
    /// the document contains no operation definition
    MissingOperation,
}
