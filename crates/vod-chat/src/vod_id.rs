use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ChatlogError, Result};

static VOD_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());

/// Numeric identifier of a VOD, without the leading `v`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VodId(String);

impl VodId {
    pub fn parse(input: &str) -> Result<Self> {
        if VOD_ID_REGEX.is_match(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(ChatlogError::invalid_identifier(input))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for VodId {
    type Err = ChatlogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for VodId {
    type Error = ChatlogError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<String> for VodId {
    type Error = ChatlogError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<u64> for VodId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for VodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
