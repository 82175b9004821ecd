//! SCALE values decoded against a runtime type registry.
//!
//! Only what event inspection needs is kept: unsigned integers, booleans,
//! strings and the shape of composites and variants. Signed and 256-bit
//! integers and bit sequences are read past as [`Value::Opaque`].

use parity_scale_codec::{Compact, Decode};
use scale_info::form::PortableForm;
use scale_info::{PortableRegistry, TypeDef, TypeDefPrimitive};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Structs and tuples
    Composite(Vec<Field>),
    Variant {
        name: String,
        fields: Vec<Field>,
    },
    Sequence(Vec<Value>),
    Unsigned(u128),
    Bool(bool),
    Str(String),
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("type {0} is not in the registry")]
    UnknownType(u32),
    #[error("type {ty} has no variant {index}")]
    UnknownVariant { ty: u32, index: u8 },
    #[error("type {0} has an unsupported bit store")]
    UnsupportedBitStore(u32),
    #[error("input too short")]
    Truncated,
    #[error("{0}")]
    Codec(String),
}

impl From<parity_scale_codec::Error> for DecodeError {
    fn from(e: parity_scale_codec::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

impl Value {
    /// The field called `name` of a composite or variant.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields()?
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .map(|f| &f.value)
    }

    /// The field called `name`, or the first field when fields are unnamed.
    pub fn field_or_first(&self, name: &str) -> Option<&Value> {
        self.field(name).or_else(|| self.first())
    }

    pub fn first(&self) -> Option<&Value> {
        self.fields()?.first().map(|f| &f.value)
    }

    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            Self::Composite(fields) | Self::Variant { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn variant_name(&self) -> Option<&str> {
        match self {
            Self::Variant { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn items(&self) -> &[Value] {
        match self {
            Self::Sequence(items) => items,
            _ => &[],
        }
    }

    /// Integers that fit a `u32`, looking through single-field newtypes.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Unsigned(n) => u32::try_from(*n).ok(),
            Self::Composite(fields) if fields.len() == 1 => fields[0].value.as_u32(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        let items = match self {
            Self::Sequence(items) => items,
            _ => return None,
        };
        items
            .iter()
            .map(|item| match item {
                Self::Unsigned(n) => u8::try_from(*n).ok(),
                _ => None,
            })
            .collect()
    }
}

/// Decode one value of type `ty` from the front of `input`.
pub fn decode(
    registry: &PortableRegistry,
    ty: u32,
    input: &mut &[u8],
) -> Result<Value, DecodeError> {
    let resolved = registry.resolve(ty).ok_or(DecodeError::UnknownType(ty))?;
    match &resolved.type_def {
        TypeDef::Composite(composite) => {
            decode_fields(registry, &composite.fields, input).map(Value::Composite)
        }
        TypeDef::Variant(variant) => {
            let index = u8::decode(input)?;
            let found = variant
                .variants
                .iter()
                .find(|v| v.index == index)
                .ok_or(DecodeError::UnknownVariant { ty, index })?;
            Ok(Value::Variant {
                name: found.name.clone(),
                fields: decode_fields(registry, &found.fields, input)?,
            })
        }
        TypeDef::Sequence(sequence) => {
            let Compact(len) = Compact::<u32>::decode(input)?;
            decode_items(registry, sequence.type_param.id, len as usize, input)
        }
        TypeDef::Array(array) => {
            decode_items(registry, array.type_param.id, array.len as usize, input)
        }
        TypeDef::Tuple(tuple) => tuple
            .fields
            .iter()
            .map(|field| {
                Ok(Field {
                    name: None,
                    value: decode(registry, field.id, input)?,
                })
            })
            .collect::<Result<_, DecodeError>>()
            .map(Value::Composite),
        TypeDef::Primitive(primitive) => decode_primitive(primitive, input),
        TypeDef::Compact(_) => {
            let Compact(n) = Compact::<u128>::decode(input)?;
            Ok(Value::Unsigned(n))
        }
        TypeDef::BitSequence(bits) => {
            let store = registry
                .resolve(bits.bit_store_type.id)
                .ok_or(DecodeError::UnknownType(bits.bit_store_type.id))?;
            let width = match &store.type_def {
                TypeDef::Primitive(TypeDefPrimitive::U8) => 1,
                TypeDef::Primitive(TypeDefPrimitive::U16) => 2,
                TypeDef::Primitive(TypeDefPrimitive::U32) => 4,
                TypeDef::Primitive(TypeDefPrimitive::U64) => 8,
                _ => return Err(DecodeError::UnsupportedBitStore(ty)),
            };
            let Compact(len) = Compact::<u32>::decode(input)?;
            let words = (len as usize).div_ceil(8 * width);
            skip(input, words * width)
        }
    }
}

fn decode_fields(
    registry: &PortableRegistry,
    fields: &[scale_info::Field<PortableForm>],
    input: &mut &[u8],
) -> Result<Vec<Field>, DecodeError> {
    fields
        .iter()
        .map(|field| {
            Ok(Field {
                name: field.name.clone(),
                value: decode(registry, field.ty.id, input)?,
            })
        })
        .collect()
}

fn decode_items(
    registry: &PortableRegistry,
    ty: u32,
    len: usize,
    input: &mut &[u8],
) -> Result<Value, DecodeError> {
    // capacity bounded by the remaining input
    let mut items = Vec::with_capacity(len.min(input.len()));
    for _ in 0..len {
        items.push(decode(registry, ty, input)?);
    }
    Ok(Value::Sequence(items))
}

fn decode_primitive(
    primitive: &TypeDefPrimitive,
    input: &mut &[u8],
) -> Result<Value, DecodeError> {
    let value = match primitive {
        TypeDefPrimitive::Bool => Value::Bool(bool::decode(input)?),
        TypeDefPrimitive::Char => Value::Unsigned(u32::decode(input)?.into()),
        TypeDefPrimitive::Str => Value::Str(String::decode(input)?),
        TypeDefPrimitive::U8 => Value::Unsigned(u8::decode(input)?.into()),
        TypeDefPrimitive::U16 => Value::Unsigned(u16::decode(input)?.into()),
        TypeDefPrimitive::U32 => Value::Unsigned(u32::decode(input)?.into()),
        TypeDefPrimitive::U64 => Value::Unsigned(u64::decode(input)?.into()),
        TypeDefPrimitive::U128 => Value::Unsigned(u128::decode(input)?),
        TypeDefPrimitive::I8 => skip(input, 1)?,
        TypeDefPrimitive::I16 => skip(input, 2)?,
        TypeDefPrimitive::I32 => skip(input, 4)?,
        TypeDefPrimitive::I64 => skip(input, 8)?,
        TypeDefPrimitive::I128 => skip(input, 16)?,
        TypeDefPrimitive::U256 | TypeDefPrimitive::I256 => skip(input, 32)?,
    };
    Ok(value)
}

fn skip(input: &mut &[u8], len: usize) -> Result<Value, DecodeError> {
    if input.len() < len {
        return Err(DecodeError::Truncated);
    }
    *input = &input[len..];
    Ok(Value::Opaque)
}
