//! Pipeline engine: per-request state, the component contract, component
//! resolution, persisted metadata, training, and inference.
//!
//! The engine is deliberately thin. A pipeline is an ordered list of
//! components declared in [`Metadata`]; declaration order is execution order
//! for both training and inference, with no scheduler in between. State
//! flows through a [`Message`] during inference and through a shared
//! [`Context`] map between components.

pub mod component;
pub mod message;
pub mod metadata;
pub mod registry;
pub mod runner;
pub mod trainer;

pub use component::{Component, ComponentConfig, Context};
pub use message::Message;
pub use metadata::{ComponentMeta, Metadata};
pub use registry::{ComponentBuilder, ComponentClass, ComponentRegistry};
pub use runner::{ModelSource, Runner};
pub use trainer::Trainer;
