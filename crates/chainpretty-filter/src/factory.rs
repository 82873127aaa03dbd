//! Builds filters from configuration values.
//!
//! A filter spec is either tagged (`{"filter_type": "arg", "arg_name": ...}`)
//! or one of the single-key shorthands:
//!
//! ```text
//! {address: <addr-or-name>}      {name: <event>}  {event: <event>}
//! {and: [<spec>...]}             {or: [<spec>...]}
//! {not: <spec>}
//! ```

use alloy_primitives::Address;
use chainpretty_core::{parse_address, AddressBook, FilterConfigError, InMemoryAddressBook};
use serde_json::{Map, Value};
use std::{collections::HashMap, sync::Arc};

use crate::compare::{Number, Operator, Transform};
use crate::filter::*;

/// Constructor for one filter tag. Receives the filter's parameters (every key
/// except `filter_type`).
pub type FilterCtor = fn(&FilterFactory, &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError>;

/// Tag → constructor registry.
pub struct FilterFactory {
    ctors: HashMap<String, FilterCtor>,
    address_book: Arc<dyn AddressBook>,
}

impl FilterFactory {
    /// Factory with every built-in tag registered.
    pub fn new(address_book: Arc<dyn AddressBook>) -> Self {
        let mut factory = Self::empty(address_book);
        let builtins: [(&str, FilterCtor); 11] = [
            ("address", build_address),
            ("in_address", build_in_address),
            ("name", build_name),
            ("arg", build_arg),
            ("arg_exists", build_arg_exists),
            ("address_arg", build_address_arg),
            ("in_address_arg", build_in_address_arg),
            ("not", build_not),
            ("and", build_and),
            ("or", build_or),
            ("true", build_true),
        ];
        for (tag, ctor) in builtins {
            factory.ctors.insert(tag.to_string(), ctor);
        }
        factory
    }

    /// Factory with no tags registered.
    pub fn empty(address_book: Arc<dyn AddressBook>) -> Self {
        Self {
            ctors: HashMap::new(),
            address_book,
        }
    }

    /// Register a custom tag. Existing tags can't be replaced.
    pub fn register(&mut self, tag: &str, ctor: FilterCtor) -> Result<(), FilterConfigError> {
        if self.ctors.contains_key(tag) {
            return Err(FilterConfigError::DuplicateTag(tag.to_string()));
        }
        self.ctors.insert(tag.to_string(), ctor);
        Ok(())
    }

    pub fn address_book(&self) -> &Arc<dyn AddressBook> {
        &self.address_book
    }

    /// Build a filter from a spec.
    pub fn build(&self, spec: &Value) -> Result<BoxedFilter, FilterConfigError> {
        let obj = spec
            .as_object()
            .ok_or_else(|| FilterConfigError::UnknownShape(spec.to_string()))?;

        if let Some(tag) = obj.get("filter_type") {
            let tag = tag
                .as_str()
                .ok_or_else(|| FilterConfigError::UnknownShape(spec.to_string()))?;
            let ctor = self
                .ctors
                .get(tag)
                .ok_or_else(|| FilterConfigError::UnknownTag(tag.to_string()))?;
            let mut params = obj.clone();
            params.remove("filter_type");
            return ctor(self, &params);
        }

        let mut entries = obj.iter();
        match (entries.next(), entries.next()) {
            (Some((key, value)), None) => match key.as_str() {
                "address" => Ok(Box::new(AddressFilter {
                    value: self.resolve_address(as_str("address", "address", value)?)?,
                })),
                "name" | "event" => Ok(Box::new(NameFilter {
                    value: as_str("name", key, value)?.to_string(),
                })),
                "and" => Ok(Box::new(AndFilter {
                    filters: self.build_list("and", key, value)?,
                })),
                "or" => Ok(Box::new(OrFilter {
                    filters: self.build_list("or", key, value)?,
                })),
                "not" => Ok(Box::new(NotFilter {
                    negated_filter: self.build(value)?,
                })),
                _ => Err(FilterConfigError::UnknownShape(spec.to_string())),
            },
            _ => Err(FilterConfigError::UnknownShape(spec.to_string())),
        }
    }

    fn build_list(&self, tag: &str, param: &str, value: &Value) -> Result<Vec<BoxedFilter>, FilterConfigError> {
        value
            .as_array()
            .ok_or_else(|| invalid(tag, param, "expected a list of filters"))?
            .iter()
            .map(|spec| self.build(spec))
            .collect()
    }

    /// Accept an address literal or a name from the address book.
    pub fn resolve_address(&self, value: &str) -> Result<Address, FilterConfigError> {
        parse_address(value)
            .ok()
            .or_else(|| self.address_book.name_to_addr(value))
            .ok_or_else(|| FilterConfigError::UnknownAddress(value.to_string()))
    }
}

impl Default for FilterFactory {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryAddressBook::new()))
    }
}

// ─── Parameter helpers ────────────────────────────────────────────────────────

fn invalid(tag: &str, param: &str, reason: &str) -> FilterConfigError {
    FilterConfigError::InvalidParam {
        tag: tag.to_string(),
        param: param.to_string(),
        reason: reason.to_string(),
    }
}

fn param<'a>(tag: &str, params: &'a Map<String, Value>, name: &str) -> Result<&'a Value, FilterConfigError> {
    params.get(name).ok_or_else(|| FilterConfigError::MissingParam {
        tag: tag.to_string(),
        param: name.to_string(),
    })
}

fn as_str<'a>(tag: &str, name: &str, value: &'a Value) -> Result<&'a str, FilterConfigError> {
    value.as_str().ok_or_else(|| invalid(tag, name, "expected a string"))
}

fn as_bool(tag: &str, name: &str, value: &Value) -> Result<bool, FilterConfigError> {
    value.as_bool().ok_or_else(|| invalid(tag, name, "expected a boolean"))
}

fn str_param<'a>(tag: &str, params: &'a Map<String, Value>, name: &str) -> Result<&'a str, FilterConfigError> {
    as_str(tag, name, param(tag, params, name)?)
}

// ─── Built-in constructors ────────────────────────────────────────────────────

fn build_address(f: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    let value = f.resolve_address(str_param("address", p, "value")?)?;
    Ok(Box::new(AddressFilter { value }))
}

fn build_in_address(f: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    Ok(Box::new(InAddressBookFilter {
        value: as_bool("in_address", "value", param("in_address", p, "value")?)?,
        book: SharedBook(Arc::clone(f.address_book())),
    }))
}

fn build_name(_: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    Ok(Box::new(NameFilter {
        value: str_param("name", p, "value")?.to_string(),
    }))
}

fn build_arg(_: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    let arg_name = str_param("arg", p, "arg_name")?.to_string();
    let arg_value = param("arg", p, "arg_value")?;
    let operator = match p.get("operator") {
        Some(v) => as_str("arg", "operator", v)?.parse::<Operator>()?,
        None => Operator::default(),
    };
    let transform = match p.get("transform") {
        Some(v) => as_str("arg", "transform", v)?.parse::<Transform>()?,
        None => Transform::default(),
    };

    let expected = match Number::from_config(arg_value, transform.decimals()) {
        Some(Ok(n)) => Expected::Number(n),
        Some(Err(reason)) => return Err(invalid("arg", "arg_value", &reason)),
        None if operator.is_ordering() => {
            return Err(FilterConfigError::NonNumericOrdering {
                operator: operator.as_str().to_string(),
                value: arg_value.to_string(),
            })
        }
        None if transform != Transform::None => {
            return Err(invalid("arg", "transform", "only numeric values can be transformed"))
        }
        None => Expected::Literal(arg_value.clone()),
    };
    Ok(Box::new(ArgFilter {
        arg_name,
        expected,
        operator,
    }))
}

fn build_arg_exists(_: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    Ok(Box::new(ArgExistsFilter {
        arg_name: str_param("arg_exists", p, "arg_name")?.to_string(),
    }))
}

fn build_address_arg(f: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    Ok(Box::new(AddressArgFilter {
        arg_name: str_param("address_arg", p, "arg_name")?.to_string(),
        value: f.resolve_address(str_param("address_arg", p, "arg_value")?)?,
    }))
}

fn build_in_address_arg(f: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    Ok(Box::new(InAddressBookArgFilter {
        arg_name: str_param("in_address_arg", p, "arg_name")?.to_string(),
        value: as_bool("in_address_arg", "arg_value", param("in_address_arg", p, "arg_value")?)?,
        book: SharedBook(Arc::clone(f.address_book())),
    }))
}

fn build_not(f: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    Ok(Box::new(NotFilter {
        negated_filter: f.build(param("not", p, "negated_filter")?)?,
    }))
}

fn build_and(f: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    Ok(Box::new(AndFilter {
        filters: f.build_list("and", "filters", param("and", p, "filters")?)?,
    }))
}

fn build_or(f: &FilterFactory, p: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    Ok(Box::new(OrFilter {
        filters: f.build_list("or", "filters", param("or", p, "filters")?)?,
    }))
}

fn build_true(_: &FilterFactory, _: &Map<String, Value>) -> Result<BoxedFilter, FilterConfigError> {
    Ok(Box::new(TrueFilter))
}
