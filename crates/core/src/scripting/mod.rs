//! Script discovery and execution.
//!
//! Scripts advertise their calling contract in an embedded `# -- jojo --`
//! comment block. [`annotation`] parses that block, [`registry`] scans a
//! directory into a queryable snapshot, and [`executor`] runs a script with
//! named parameters and captures its output.

pub mod annotation;
pub mod descriptor;
pub mod executor;
pub mod naming;
pub mod query;
pub mod registry;
pub mod subprocess;

pub use descriptor::{HttpMethod, OutputMode, Param, ScriptDescriptor, ScriptMetadata};
pub use executor::{EngineConfig, ExecutionEngine, ExecutionResult};
pub use query::TagFilter;
pub use registry::{RegistryHandle, ScriptRegistry};
