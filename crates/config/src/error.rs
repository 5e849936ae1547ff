// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the config crate.

use crate::PipelineId;
use miette::Diagnostic;
use std::fmt::Display;

/// Errors that can occur while processing the configuration of a pipeline or one of its
/// operators.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// A collection of errors that occurred during parsing or validating the configuration.
    #[error("Invalid configuration: {errors:?}")]
    #[diagnostic(code(config::invalid_configuration), url(docsrs))]
    InvalidConfiguration {
        /// A list of errors that occurred during parsing or validating the configuration.
        #[related]
        errors: Vec<Error>,
    },

    /// An error that occurred while reading a configuration file.
    #[error("File read error: {details}\nContext: {context}")]
    #[diagnostic(code(config::file_read_error), url(docsrs))]
    FileReadError {
        /// The context in which the error occurred.
        context: Context,
        /// A description of the error that occurred.
        details: String,
    },

    /// An error that occurred while deserializing a configuration file.
    #[error("{format} deserialization error: {details}\nContext: {context}")]
    #[diagnostic(code(config::deserialization_error), url(docsrs))]
    DeserializationError {
        /// The context in which the error occurred.
        context: Context,
        /// The format of the configuration file (e.g. "YAML").
        format: String,
        /// A description of the error that occurred.
        details: String,
    },

    /// A pipeline was configured with an empty operator chain, violating §3.5's
    /// "ordered, non-empty sequence" invariant.
    #[error("Pipeline has no operators\nContext: {context}")]
    #[diagnostic(code(config::empty_pipeline), url(docsrs))]
    EmptyPipeline {
        /// The context in which the error occurred.
        context: Context,
    },

    /// An invalid user configuration occurred, e.g. a malformed operator URN or argument.
    #[error("An invalid user configuration occurred: {error}")]
    #[diagnostic(code(config::invalid_user_config), url(docsrs))]
    InvalidUserConfig {
        /// A description of the error.
        error: String,
    },

    /// A pipeline with the same id already exists.
    #[error("Pipeline with id `{pipeline_id}` already exists")]
    #[diagnostic(code(config::duplicate_pipeline), url(docsrs))]
    DuplicatePipeline {
        /// The id of the pipeline that was duplicated.
        pipeline_id: PipelineId,
    },
}

/// Context identifying which pipeline an error occurred in.
#[derive(Debug, Default)]
pub struct Context {
    /// The pipeline id, if applicable.
    pub pipeline_id: Option<PipelineId>,
}

impl Context {
    /// Creates a new context for the given pipeline id.
    #[must_use]
    pub const fn new(pipeline_id: PipelineId) -> Self {
        Self {
            pipeline_id: Some(pipeline_id),
        }
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.pipeline_id {
            Some(pipeline_id) => write!(f, "Pipeline: '{pipeline_id}'"),
            None => write!(f, "<no pipeline context>"),
        }
    }
}
