//! Converts alloy-core `DynSolValue` → ChainPretty `ArgValue`.
//!
//! The shape that produced the value is walked alongside it so tuple
//! components keep their declared names.

use alloy_core::dyn_abi::DynSolValue;
use chainpretty_core::{ArgValue, DecodeError, DecodedArgs, SolType};

/// Convert a decoded value of type `ty`.
pub fn normalize(val: DynSolValue, ty: &SolType) -> Result<ArgValue, DecodeError> {
    let mismatch = |got: &DynSolValue| DecodeError::TypeMismatch {
        expected: ty.to_string(),
        got: format!("{got:?}"),
    };

    match (val, ty) {
        (DynSolValue::Bool(b), SolType::Bool) => Ok(ArgValue::Bool(b)),
        (DynSolValue::Uint(u, _), SolType::Uint(_)) => Ok(ArgValue::Uint(u)),
        (DynSolValue::Int(i, _), SolType::Int(_)) => Ok(ArgValue::Int(i)),
        (DynSolValue::Address(a), SolType::Address) => Ok(ArgValue::Address(a)),
        (DynSolValue::String(s), SolType::String) => Ok(ArgValue::Str(s)),

        (DynSolValue::FixedBytes(word, 32), SolType::FixedBytes(32)) => Ok(ArgValue::Hash(word)),
        (DynSolValue::FixedBytes(word, size), SolType::FixedBytes(_)) => Ok(ArgValue::Bytes(
            format!("0x{}", hex::encode(&word[..size])),
        )),
        (DynSolValue::Bytes(b), SolType::Bytes) => {
            Ok(ArgValue::Bytes(format!("0x{}", hex::encode(b))))
        }

        (DynSolValue::Array(vals), SolType::Array(inner))
        | (DynSolValue::FixedArray(vals), SolType::FixedArray(inner, _)) => vals
            .into_iter()
            .map(|v| normalize(v, inner))
            .collect::<Result<Vec<_>, _>>()
            .map(ArgValue::Array),

        (DynSolValue::Tuple(vals), SolType::Tuple(shape)) => {
            if vals.len() != shape.len() {
                return Err(DecodeError::TypeMismatch {
                    expected: ty.to_string(),
                    got: format!("tuple of {} values", vals.len()),
                });
            }
            let mut args = DecodedArgs::with_capacity(vals.len());
            for (v, component) in vals.into_iter().zip(&shape.components) {
                args.push(&component.name, normalize(v, &component.ty)?);
            }
            Ok(ArgValue::Tuple(args))
        }

        (other, _) => Err(mismatch(&other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, I256, U256};
    use chainpretty_core::{ArgumentShape, Component};

    #[test]
    fn scalars() {
        assert_eq!(
            normalize(DynSolValue::Bool(true), &SolType::Bool).unwrap(),
            ArgValue::Bool(true)
        );
        assert_eq!(
            normalize(DynSolValue::Uint(U256::from(42u64), 40), &SolType::Uint(40)).unwrap(),
            ArgValue::Uint(U256::from(42u64))
        );
        assert_eq!(
            normalize(DynSolValue::Int(I256::MINUS_ONE, 24), &SolType::Int(24)).unwrap(),
            ArgValue::Int(I256::MINUS_ONE)
        );
    }

    #[test]
    fn byte_types() {
        let word = B256::repeat_byte(0xab);
        assert_eq!(
            normalize(DynSolValue::FixedBytes(word, 32), &SolType::FixedBytes(32)).unwrap(),
            ArgValue::Hash(word)
        );
        assert_eq!(
            normalize(DynSolValue::FixedBytes(word, 4), &SolType::FixedBytes(4)).unwrap(),
            ArgValue::Bytes("0xabababab".into())
        );
        assert_eq!(
            normalize(DynSolValue::Bytes(vec![1, 2]), &SolType::Bytes).unwrap(),
            ArgValue::Bytes("0x0102".into())
        );
    }

    #[test]
    fn named_tuple() {
        let shape = ArgumentShape {
            components: vec![
                Component { name: "owner".into(), ty: SolType::Address, indexed: false },
                Component { name: "".into(), ty: SolType::Bool, indexed: false },
            ],
        };
        let val = DynSolValue::Tuple(vec![
            DynSolValue::Address(Address::repeat_byte(1)),
            DynSolValue::Bool(false),
        ]);
        let out = normalize(val, &SolType::Tuple(shape)).unwrap();
        let args = out.as_tuple().unwrap();
        assert_eq!(args.get("owner"), Some(&ArgValue::Address(Address::repeat_byte(1))));
        assert_eq!(args.get("_1"), Some(&ArgValue::Bool(false)));
    }

    #[test]
    fn mismatch_is_an_error() {
        assert!(matches!(
            normalize(DynSolValue::Bool(true), &SolType::Address),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }
}
