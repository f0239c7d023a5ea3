//! The closed set of taxonomy package publishers the tool knows how to fix.

use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;

/// Publishers with a known defect pattern and a matching repair policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provider {
    /// European Banking Authority. Packages are conformant by construction.
    Eba,
    /// EDINET filing system of the Japanese Financial Services Agency.
    Edinet,
    /// Comision para el Mercado Financiero, CL-CI raw building block.
    Cmfclci,
    /// South African Companies and Intellectual Property Commission.
    Cipc,
}

impl Provider {
    /// Map a provider code to a profile. An unrecognized code is a terminal
    /// error, never a silently-ignored default.
    pub fn parse(code: &str) -> Result<Self> {
        match code {
            "EBA" => Ok(Provider::Eba),
            "EDINET" => Ok(Provider::Edinet),
            "CMFCLCI" => Ok(Provider::Cmfclci),
            "CIPC" => Ok(Provider::Cipc),
            other => bail!("unrecognized provider code: {other:?} (expected EBA, EDINET, CMFCLCI, or CIPC)"),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Provider::Eba => "EBA",
            Provider::Edinet => "EDINET",
            Provider::Cmfclci => "CMFCLCI",
            Provider::Cipc => "CIPC",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
