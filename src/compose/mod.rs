//! Composable scenario definitions
//!
//! Definitions reference reusable components by id and override their
//! parameters per use. This module resolves those layers and materializes a
//! fresh executable tree for each run.

pub mod dataset;
pub mod definition;
pub mod export;
pub mod materializer;
pub mod repository;
pub mod resolver;

pub use dataset::exposed_parameters;
pub use definition::{
    ChildDefinition, ComponentRef, ComposableStep, ScenarioDefinition, StepDefinition, TaskDefinition,
};
pub use export::{content_blob, ContentBlob, ContentCategory};
pub use materializer::Materializer;
pub use repository::{ComponentRepository, InMemoryComponentRepository};
pub use resolver::{ParameterResolver, Scope};
