// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Operator configuration.
//!
//! An operator definition names a plugin (by URN) and carries the invocation arguments the
//! pipeline composer (C4) parsed out of the TQL source for that operator. The composer fills
//! `raw_invocation`; the operator plugin's own argument parser is responsible for interpreting
//! it (§6.1).

use crate::{Description, OperatorUrn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User-facing configuration for a single operator instance in a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OperatorUserConfig {
    /// The operator plugin URN, e.g. `where`, `urn:tql:operator:summarize`.
    pub r#type: OperatorUrn,

    /// An optional human-readable description of this operator instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,

    /// Raw invocation arguments (positional and named) as parsed by the composer from TQL
    /// source, or supplied directly when a pipeline is built programmatically.
    ///
    /// Interpreted by the operator plugin itself; not validated by the engine.
    #[serde(default)]
    pub config: Value,
}

impl OperatorUserConfig {
    /// Creates a new `OperatorUserConfig` for the named operator with no arguments.
    pub fn new<U: Into<String>>(operator_name: U) -> Result<Self, crate::error::Error> {
        Ok(Self {
            r#type: OperatorUrn::new(operator_name.into())?,
            description: None,
            config: Value::Null,
        })
    }

    /// Creates a new `OperatorUserConfig` with the given URN and invocation arguments.
    #[must_use]
    pub const fn with_config(r#type: OperatorUrn, config: Value) -> Self {
        Self {
            r#type,
            description: None,
            config,
        }
    }

    /// Returns the operator's plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.r#type.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_user_config_minimal_valid() {
        let json = r#"{ "type": "where" }"#;
        let cfg: OperatorUserConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.name(), "where");
        assert_eq!(cfg.config, Value::Null);
    }

    #[test]
    fn test_yaml_operator_config() {
        let yaml = r#"
type: "summarize"
config: { group_by: ["host"] }
"#;
        let cfg: OperatorUserConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.name(), "summarize");
        assert_eq!(cfg.config["group_by"][0], "host");
    }

    #[test]
    fn rejects_unknown_fields() {
        let json = r#"{ "type": "where", "bogus": 1 }"#;
        let cfg: Result<OperatorUserConfig, _> = serde_json::from_str(json);
        assert!(cfg.is_err());
    }
}
