//! The `EventFilter` trait and the built-in filter variants.

use alloy_primitives::Address;
use chainpretty_core::{AddressBook, ArgValue, Event};
use serde_json::Value;
use std::{fmt, sync::Arc};

use crate::compare::{literal_eq, Number, Operator};

/// A predicate over decoded events.
pub trait EventFilter: Send + Sync + fmt::Debug {
    fn evaluate(&self, event: &Event) -> bool;
}

pub type BoxedFilter = Box<dyn EventFilter>;

/// Shared handle to the address book used by membership filters.
#[derive(Clone)]
pub struct SharedBook(pub Arc<dyn AddressBook>);

impl fmt::Debug for SharedBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AddressBook")
    }
}

// ─── Event-level filters ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AddressFilter {
    pub value: Address,
}

impl EventFilter for AddressFilter {
    fn evaluate(&self, event: &Event) -> bool {
        event.address == self.value
    }
}

#[derive(Debug, Clone)]
pub struct InAddressBookFilter {
    pub value: bool,
    pub book: SharedBook,
}

impl EventFilter for InAddressBookFilter {
    fn evaluate(&self, event: &Event) -> bool {
        self.book.0.has_addr(&event.address) == self.value
    }
}

#[derive(Debug, Clone)]
pub struct NameFilter {
    pub value: String,
}

impl EventFilter for NameFilter {
    fn evaluate(&self, event: &Event) -> bool {
        event.name == self.value
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrueFilter;

impl EventFilter for TrueFilter {
    fn evaluate(&self, _event: &Event) -> bool {
        true
    }
}

// ─── Argument filters ─────────────────────────────────────────────────────────

/// What an `arg` filter compares against, resolved at construction.
#[derive(Debug, Clone)]
pub enum Expected {
    /// Already scaled by the transform
    Number(Number),
    Literal(Value),
}

/// Compares the argument at a dotted path with a configured value.
#[derive(Debug, Clone)]
pub struct ArgFilter {
    pub arg_name: String,
    pub expected: Expected,
    pub operator: Operator,
}

impl ArgFilter {
    fn compare(&self, arg: &ArgValue) -> bool {
        match &self.expected {
            Expected::Number(expected) => match Number::from_arg(arg) {
                Some(actual) => self.operator.holds(actual.cmp(expected)),
                None => self.operator == Operator::Ne,
            },
            Expected::Literal(expected) => {
                let eq = literal_eq(arg, expected);
                match self.operator {
                    Operator::Ne => !eq,
                    _ => eq,
                }
            }
        }
    }
}

impl EventFilter for ArgFilter {
    fn evaluate(&self, event: &Event) -> bool {
        event
            .args
            .lookup_path(&self.arg_name)
            .map_or(false, |arg| self.compare(arg))
    }
}

#[derive(Debug, Clone)]
pub struct ArgExistsFilter {
    pub arg_name: String,
}

impl EventFilter for ArgExistsFilter {
    fn evaluate(&self, event: &Event) -> bool {
        event.args.lookup_path(&self.arg_name).is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AddressArgFilter {
    pub arg_name: String,
    pub value: Address,
}

impl EventFilter for AddressArgFilter {
    fn evaluate(&self, event: &Event) -> bool {
        matches!(
            event.args.lookup_path(&self.arg_name),
            Some(ArgValue::Address(a)) if *a == self.value
        )
    }
}

#[derive(Debug, Clone)]
pub struct InAddressBookArgFilter {
    pub arg_name: String,
    pub value: bool,
    pub book: SharedBook,
}

impl EventFilter for InAddressBookArgFilter {
    fn evaluate(&self, event: &Event) -> bool {
        match event.args.lookup_path(&self.arg_name) {
            Some(ArgValue::Address(a)) => self.book.0.has_addr(a) == self.value,
            Some(_) => !self.value,
            None => false,
        }
    }
}

// ─── Composition ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct NotFilter {
    pub negated_filter: BoxedFilter,
}

impl EventFilter for NotFilter {
    fn evaluate(&self, event: &Event) -> bool {
        !self.negated_filter.evaluate(event)
    }
}

/// True unless some filter is false (an empty `and` is true).
#[derive(Debug)]
pub struct AndFilter {
    pub filters: Vec<BoxedFilter>,
}

impl EventFilter for AndFilter {
    fn evaluate(&self, event: &Event) -> bool {
        self.filters.iter().all(|f| f.evaluate(event))
    }
}

#[derive(Debug)]
pub struct OrFilter {
    pub filters: Vec<BoxedFilter>,
}

impl EventFilter for OrFilter {
    fn evaluate(&self, event: &Event) -> bool {
        self.filters.iter().any(|f| f.evaluate(event))
    }
}
