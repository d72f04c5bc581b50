//! Device classification for password-bearing inventory assets.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Kind of password-bearing device tracked by the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DeviceKind {
    #[serde(rename = "servidor")]
    Server,
    #[serde(rename = "impressora")]
    Printer,
    #[serde(rename = "ativo_rede")]
    NetworkAsset,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Server => "servidor",
            DeviceKind::Printer => "impressora",
            DeviceKind::NetworkAsset => "ativo_rede",
        }
    }
}

impl Display for DeviceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = DeviceKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "servidor" => Ok(DeviceKind::Server),
            "impressora" => Ok(DeviceKind::Printer),
            "ativo_rede" => Ok(DeviceKind::NetworkAsset),
            other => Err(DeviceKindParseError(other.to_string())),
        }
    }
}

/// Error returned when device kind parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid device kind: {0}")]
pub struct DeviceKindParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [DeviceKind::Server, DeviceKind::Printer, DeviceKind::NetworkAsset] {
            let parsed: DeviceKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
        assert!("roteador".parse::<DeviceKind>().is_err());
    }
}
