//! Index a live UI component tree into the actions it exposes, and resolve
//! free-text commands to one of them.

#[cfg(feature = "inspect-server")]
pub mod api;
pub mod audit;
pub mod context;
pub mod describe;
pub mod error;
pub mod handler;
pub mod index;
pub mod inspect;
pub mod llm;
pub mod paths;
pub mod resolver;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod tree;
