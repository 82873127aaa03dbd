//! Template rules: first matching rule picks the template for an event.
//!
//! ```yaml
//! rules:
//!   - match:
//!       - name: Transfer
//!       - filter_type: arg
//!         arg_name: value
//!         arg_value: 1000
//!         operator: ge
//!         transform: amount
//!     template: ERC20-transfer.md.j2
//! ```

use chainpretty_core::{Event, FilterConfigError};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::factory::FilterFactory;
use crate::filter::{AndFilter, BoxedFilter};

#[derive(Debug)]
pub struct TemplateRule {
    pub template: String,
    pub matcher: BoxedFilter,
}

/// Build the rule list from a parsed rules document.
pub fn read_template_rules(
    factory: &FilterFactory,
    document: &Value,
) -> Result<Vec<TemplateRule>, FilterConfigError> {
    let rules = document
        .get("rules")
        .and_then(Value::as_array)
        .ok_or_else(|| FilterConfigError::Document("expected a top-level 'rules' list".into()))?;

    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            let template = rule
                .get("template")
                .and_then(Value::as_str)
                .ok_or_else(|| FilterConfigError::Document(format!("rule {i} has no 'template'")))?
                .to_string();
            let matcher = match rule.get("match") {
                Some(Value::Array(specs)) if specs.len() == 1 => factory.build(&specs[0])?,
                Some(Value::Array(specs)) => Box::new(AndFilter {
                    filters: specs
                        .iter()
                        .map(|s| factory.build(s))
                        .collect::<Result<_, _>>()?,
                }),
                Some(spec @ Value::Object(_)) => factory.build(spec)?,
                _ => {
                    return Err(FilterConfigError::Document(format!(
                        "rule {i} needs a 'match' object or list"
                    )))
                }
            };
            Ok(TemplateRule { template, matcher })
        })
        .collect()
}

/// Parse a JSON or YAML rules document (JSON is valid YAML).
pub fn parse_rules_document(text: &str) -> Result<Value, FilterConfigError> {
    serde_yaml::from_str(text).map_err(|e| FilterConfigError::Document(e.to_string()))
}

pub fn load_rules_file(
    factory: &FilterFactory,
    path: &Path,
) -> Result<Vec<TemplateRule>, FilterConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| FilterConfigError::Document(format!("{}: {e}", path.display())))?;
    read_template_rules(factory, &parse_rules_document(&text)?)
}

/// Template of the first rule whose matcher accepts the event.
pub fn find_template<'a>(rules: &'a [TemplateRule], event: &Event) -> Option<&'a str> {
    let found = rules
        .iter()
        .find(|rule| rule.matcher.evaluate(event))
        .map(|rule| rule.template.as_str());
    if found.is_none() {
        debug!(event = %event.name, "no template rule matched");
    }
    found
}
