//! # chainpretty-filter
//!
//! Boolean predicates over decoded events, built from JSON/YAML specs, and
//! the template rules that use them.

pub mod compare;
pub mod factory;
pub mod filter;
pub mod rules;

pub use compare::{Number, Operator, Transform};
pub use factory::{FilterCtor, FilterFactory};
pub use filter::{BoxedFilter, EventFilter};
pub use rules::{find_template, load_rules_file, parse_rules_document, read_template_rules, TemplateRule};
