mod auth;
mod control;
mod dashboard;
mod sensor;

pub use auth::*;
pub use control::*;
pub use dashboard::*;
pub use sensor::*;

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

pub type Id = i32;

/// Response body for endpoints that only report a status message.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Returned when a variant tag cannot be recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl Display for UnknownTag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "unknown tag `{}`", self.0)
    }
}

impl Error for UnknownTag {}
