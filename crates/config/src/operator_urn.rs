// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Operator plugin URN parsing and validation.
//!
//! Operator names in TQL are bare identifiers (`where`, `summarize`, `assert_throughput`, ...).
//! Internally each resolves to a URN of the form `urn:tql:operator:<name>` so that the plugin
//! registry, diagnostics, and telemetry attribution share one addressing scheme with the rest
//! of this codebase's node-configuration machinery.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A validated operator plugin URN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperatorUrn {
    /// The bare operator name, e.g. `where`, `summarize`.
    name: Cow<'static, str>,
}

impl OperatorUrn {
    /// Builds an `OperatorUrn` from a bare operator name, validating its shape.
    pub fn new<S: Into<Cow<'static, str>>>(name: S) -> Result<Self, Error> {
        let name = name.into();
        validate_operator_name(&name)?;
        Ok(Self { name })
    }

    /// Returns the bare operator name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for OperatorUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "urn:tql:operator:{}", self.name)
    }
}

impl TryFrom<String> for OperatorUrn {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        parse_urn_or_bare(&raw)
    }
}

impl From<OperatorUrn> for String {
    fn from(urn: OperatorUrn) -> Self {
        urn.to_string()
    }
}

/// Parses either a bare operator name (`where`) or a fully qualified
/// `urn:tql:operator:<name>` string.
pub fn parse_urn_or_bare(raw: &str) -> Result<OperatorUrn, Error> {
    let name = if let Some(stripped) = raw.strip_prefix("urn:") {
        let mut segs = stripped.splitn(3, ':');
        let namespace = segs.next().unwrap_or_default();
        let kind = segs.next().unwrap_or_default();
        let rest = segs.next().unwrap_or_default();
        if namespace.eq_ignore_ascii_case("tql") && kind.eq_ignore_ascii_case("operator") {
            rest.to_string()
        } else {
            return Err(Error::InvalidUserConfig {
                error: format!("invalid operator URN `{raw}`: expected `urn:tql:operator:<name>`"),
            });
        }
    } else {
        raw.to_string()
    };
    validate_operator_name(&name)?;
    Ok(OperatorUrn { name: name.into() })
}

fn validate_operator_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::InvalidUserConfig {
            error: "invalid operator name: must not be empty".to_string(),
        });
    }
    let valid = name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'));
    if !valid {
        return Err(Error::InvalidUserConfig {
            error: format!("invalid operator name `{name}`: must match [a-z0-9_]+"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_names() {
        assert_eq!(OperatorUrn::new("where").unwrap().name(), "where");
        assert_eq!(
            OperatorUrn::new("assert_throughput").unwrap().name(),
            "assert_throughput"
        );
    }

    #[test]
    fn accepts_fully_qualified_urn() {
        let urn = parse_urn_or_bare("urn:tql:operator:summarize").unwrap();
        assert_eq!(urn.name(), "summarize");
        assert_eq!(urn.to_string(), "urn:tql:operator:summarize");
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(OperatorUrn::new("").is_err());
        assert!(OperatorUrn::new("Where").is_err());
        assert!(OperatorUrn::new("where-clause").is_err());
        assert!(parse_urn_or_bare("urn:otel:debug:processor").is_err());
    }
}
