//! # chainpretty-render
//!
//! Renders decoded events with Tera templates. Templates see the event as
//! `evt` and get a set of chain-aware filters (`amount`, `address`,
//! `tx_link`, `role`, ...).

pub mod env;
pub mod filters;
pub mod render;

pub use env::{resolve_chain_id, ChainDirectory, EnvGlobals, Rainbow};
pub use filters::format_units;
pub use render::{init_environment, Renderer, TemplateRenderer};
