use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};

/// Kind of VPN server a client can hold.
///
/// Discovery documents spell these as `institute_access` / `secure_internet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerType {
    Custom,
    InstituteAccess,
    SecureInternet,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Custom => "custom",
            ServerType::InstituteAccess => "institute_access",
            ServerType::SecureInternet => "secure_internet",
        }
    }
}

impl Display for ServerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}
