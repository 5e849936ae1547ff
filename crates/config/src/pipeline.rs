// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline configuration: an ordered, non-empty sequence of operator definitions (§3.5).

use crate::error::{Context, Error};
use crate::operator::OperatorUserConfig;
use crate::settings::PipelineSettings;
use crate::{Description, PipelineId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A pipeline: an ordered, non-empty chain of operator instances plus its runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Identifier of this pipeline, unique within its pipeline group / process.
    pub id: PipelineId,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,

    /// The ordered operator chain. Must be non-empty.
    pub operators: Vec<OperatorUserConfig>,

    /// Runtime knobs for this pipeline (batch sizing, watermarks, checkpoint interval, ...).
    #[serde(default)]
    pub settings: PipelineSettings,
}

impl PipelineConfig {
    /// Creates a new pipeline configuration, validating that the operator chain is non-empty.
    pub fn new(id: PipelineId, operators: Vec<OperatorUserConfig>) -> Result<Self, Error> {
        if operators.is_empty() {
            return Err(Error::EmptyPipeline {
                context: Context::new(id.clone()),
            });
        }
        Ok(Self {
            id,
            description: None,
            operators,
            settings: PipelineSettings::default(),
        })
    }

    /// Returns the first operator in the chain, if any.
    #[must_use]
    pub fn first(&self) -> Option<&OperatorUserConfig> {
        self.operators.first()
    }

    /// Returns the last operator in the chain, if any.
    #[must_use]
    pub fn last(&self) -> Option<&OperatorUserConfig> {
        self.operators.last()
    }

    /// Validates structural invariants: non-empty chain, every operator name non-empty.
    ///
    /// This does not type-check element-type adjacency; that requires the operator registry
    /// and is performed by the pipeline composer (C4) once plugins have been resolved.
    pub fn validate(&self) -> Result<(), Error> {
        if self.operators.is_empty() {
            return Err(Error::EmptyPipeline {
                context: Context::new(self.id.clone()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_pipeline() {
        let err = PipelineConfig::new("p1".into(), vec![]).unwrap_err();
        assert!(matches!(err, Error::EmptyPipeline { .. }));
    }

    #[test]
    fn accepts_single_operator() {
        let op = OperatorUserConfig::new("from").unwrap();
        let cfg = PipelineConfig::new("p1".into(), vec![op]).unwrap();
        assert_eq!(cfg.operators.len(), 1);
        cfg.validate().unwrap();
    }

    #[test]
    fn deserializes_yaml_pipeline() {
        let yaml = r#"
id: demo
operators:
  - type: from
    config: { events: [] }
  - type: where
    config: { expr: "x > 1" }
settings:
  batch_row_cap: 1024
"#;
        let cfg: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.operators.len(), 2);
        assert_eq!(cfg.settings.batch_row_cap, 1024);
    }
}
