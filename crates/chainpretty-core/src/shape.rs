//! ABI argument shapes.
//!
//! An `EventShape` is built once from a JSON ABI declaration and then used
//! purely as a decoding template. Building it validates every component
//! type, so unsupported types are rejected at load time instead of
//! silently mis-decoding later.

use serde::Deserialize;
use std::fmt;

use crate::error::ShapeError;

// ─── Types ────────────────────────────────────────────────────────────────────

/// A Solidity ABI type this crate knows how to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolType {
    Bool,
    Address,
    /// Unsigned integer, width in bits
    Uint(usize),
    /// Signed integer, width in bits
    Int(usize),
    /// `bytesN`, length in bytes
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<SolType>),
    FixedArray(Box<SolType>, usize),
    Tuple(ArgumentShape),
}

impl SolType {
    /// Parse an ABI type string. `components` is required when the base type
    /// is `tuple` (including `tuple[]`, `tuple[2]`, ...).
    pub fn parse(
        name: &str,
        ty: &str,
        components: Option<&[AbiParam]>,
    ) -> Result<Self, ShapeError> {
        let unsupported = || ShapeError::UnsupportedType {
            name: name.to_string(),
            ty: ty.to_string(),
        };

        if let Some(prefix) = ty.strip_suffix(']') {
            let open = prefix.rfind('[').ok_or_else(unsupported)?;
            let inner = SolType::parse(name, &prefix[..open], components)?;
            let size = &prefix[open + 1..];
            return if size.is_empty() {
                Ok(SolType::Array(Box::new(inner)))
            } else {
                let n: usize = size.parse().map_err(|_| unsupported())?;
                Ok(SolType::FixedArray(Box::new(inner), n))
            };
        }

        match ty {
            "bool" => Ok(SolType::Bool),
            "address" => Ok(SolType::Address),
            "string" => Ok(SolType::String),
            "bytes" => Ok(SolType::Bytes),
            "uint" => Ok(SolType::Uint(256)),
            "int" => Ok(SolType::Int(256)),
            "tuple" => {
                let components = components
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| ShapeError::MissingComponents {
                        name: name.to_string(),
                    })?;
                Ok(SolType::Tuple(ArgumentShape::from_params(components)?))
            }
            _ => {
                if let Some(bits) = ty.strip_prefix("uint") {
                    int_width(bits).map(SolType::Uint).ok_or_else(unsupported)
                } else if let Some(bits) = ty.strip_prefix("int") {
                    int_width(bits).map(SolType::Int).ok_or_else(unsupported)
                } else if let Some(len) = ty.strip_prefix("bytes") {
                    match len.parse::<usize>() {
                        Ok(n) if (1..=32).contains(&n) => Ok(SolType::FixedBytes(n)),
                        _ => Err(unsupported()),
                    }
                } else {
                    Err(unsupported())
                }
            }
        }
    }

    /// Types whose indexed form is the keccak hash of the value rather than
    /// the value itself.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            SolType::Bytes
                | SolType::String
                | SolType::Array(_)
                | SolType::FixedArray(..)
                | SolType::Tuple(_)
        )
    }
}

fn int_width(bits: &str) -> Option<usize> {
    let n: usize = bits.parse().ok()?;
    (n % 8 == 0 && (8..=256).contains(&n)).then_some(n)
}

/// Canonical signature form: `uint256`, `(address,uint40)`, `bytes32[]`.
impl fmt::Display for SolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolType::Bool => write!(f, "bool"),
            SolType::Address => write!(f, "address"),
            SolType::Uint(bits) => write!(f, "uint{bits}"),
            SolType::Int(bits) => write!(f, "int{bits}"),
            SolType::FixedBytes(n) => write!(f, "bytes{n}"),
            SolType::Bytes => write!(f, "bytes"),
            SolType::String => write!(f, "string"),
            SolType::Array(inner) => write!(f, "{inner}[]"),
            SolType::FixedArray(inner, n) => write!(f, "{inner}[{n}]"),
            SolType::Tuple(shape) => write!(f, "({})", shape.canonical_types()),
        }
    }
}

// ─── Shapes ───────────────────────────────────────────────────────────────────

/// One named, typed component of a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub ty: SolType,
    pub indexed: bool,
}

/// Ordered list of components. Structural equality compares names, types
/// and indexed flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentShape {
    pub components: Vec<Component>,
}

impl ArgumentShape {
    pub fn from_params(params: &[AbiParam]) -> Result<Self, ShapeError> {
        let components = params
            .iter()
            .map(Component::from_param)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }

    /// Comma-joined canonical types, without parentheses.
    pub fn canonical_types(&self) -> String {
        self.components
            .iter()
            .map(|c| c.ty.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn indexed(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.indexed)
    }

    pub fn non_indexed(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| !c.indexed)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Component {
    fn from_param(param: &AbiParam) -> Result<Self, ShapeError> {
        let name = param.name.clone().unwrap_or_default();
        let ty = param.ty.as_deref().ok_or_else(|| ShapeError::Malformed {
            reason: format!("argument '{name}' has no type"),
        })?;
        Ok(Self {
            ty: SolType::parse(&name, ty, param.components.as_deref())?,
            indexed: param.indexed,
            name,
        })
    }
}

/// A named event layout: one member of a collision set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventShape {
    pub name: String,
    pub inputs: ArgumentShape,
}

impl EventShape {
    /// `Name(t1,t2,...)`, the string hashed into the signature topic.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.inputs.canonical_types())
    }

    /// Number of topics (after the signature topic) this shape expects.
    pub fn indexed_count(&self) -> usize {
        self.inputs.indexed().count()
    }

    /// Build from one ABI item. Returns `Ok(None)` for non-event entries and
    /// for anonymous events, which emit no signature topic to index them by.
    pub fn from_abi_item(item: &AbiItem) -> Result<Option<Self>, ShapeError> {
        let kind = item.kind.as_deref().ok_or_else(|| ShapeError::Malformed {
            reason: "declaration has no 'type'".into(),
        })?;
        if kind != "event" || item.anonymous {
            return Ok(None);
        }
        let name = item.name.clone().ok_or_else(|| ShapeError::Malformed {
            reason: "event declaration has no 'name'".into(),
        })?;
        let inputs = item.inputs.as_deref().ok_or_else(|| ShapeError::Malformed {
            reason: format!("event '{name}' has no 'inputs'"),
        })?;
        Ok(Some(Self {
            inputs: ArgumentShape::from_params(inputs)?,
            name,
        }))
    }
}

// ─── JSON ABI declarations ────────────────────────────────────────────────────

/// One entry of a JSON ABI array. Only the fields relevant to events are
/// kept; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiItem {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub inputs: Option<Vec<AbiParam>>,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: Option<String>,
    #[serde(default)]
    pub indexed: bool,
    pub components: Option<Vec<AbiParam>>,
}
