//! Prepared statement parameter encoding.
//!
//! Statement arguments are passed as explicit [`Argument`] values and encoded
//! into the three sections of the binary execute command:
//!
//! - a null bitmap of `ceil(n / 8)` bytes, bit `i` set when argument `i` is null,
//! - two type bytes per argument: the column type and `0x80` for unsigned integers,
//! - the concatenated values, skipping null arguments.
//!
//! Integers and floats are written little-endian at their fixed width; text and
//! binary values carry a length-encoded prefix.
use std::any::Any;

use super::{
    ArgumentError,
    constants::*,
    packet::write_lenenc_int,
};

/// Value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Null,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
}

macro_rules! argument_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Argument::$variant(value)
                }
            }
        )*
    };
}

argument_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    bool => Bool,
    f32 => F32,
    f64 => F64,
    String => Text,
    Vec<u8> => Bytes,
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::Text(value.to_string())
    }
}

impl From<&[u8]> for Argument {
    fn from(value: &[u8]) -> Self {
        Argument::Bytes(value.to_vec())
    }
}

impl<T: Into<Argument>> From<Option<T>> for Argument {
    fn from(value: Option<T>) -> Self {
        value.map_or(Argument::Null, Into::into)
    }
}

impl Argument {
    /// Maps a dynamically typed value onto an argument. `isize`/`usize` are
    /// sent as 64-bit integers and `()` as null.
    pub fn from_dynamic(value: &dyn Any) -> Result<Self, ArgumentError> {
        macro_rules! downcast {
            ($($ty:ty => $make:expr),* $(,)?) => {
                $(
                    if let Some(v) = value.downcast_ref::<$ty>() {
                        return Ok($make(v));
                    }
                )*
            };
        }

        downcast! {
            () => |_: &()| Argument::Null,
            Argument => |v: &Argument| v.clone(),
            i8 => |v: &i8| Argument::I8(*v),
            i16 => |v: &i16| Argument::I16(*v),
            i32 => |v: &i32| Argument::I32(*v),
            i64 => |v: &i64| Argument::I64(*v),
            isize => |v: &isize| Argument::I64(*v as i64),
            u8 => |v: &u8| Argument::U8(*v),
            u16 => |v: &u16| Argument::U16(*v),
            u32 => |v: &u32| Argument::U32(*v),
            u64 => |v: &u64| Argument::U64(*v),
            usize => |v: &usize| Argument::U64(*v as u64),
            bool => |v: &bool| Argument::Bool(*v),
            f32 => |v: &f32| Argument::F32(*v),
            f64 => |v: &f64| Argument::F64(*v),
            String => |v: &String| Argument::Text(v.clone()),
            &'static str => |v: &&str| Argument::Text(v.to_string()),
            Vec<u8> => |v: &Vec<u8>| Argument::Bytes(v.clone()),
            &'static [u8] => |v: &&[u8]| Argument::Bytes(v.to_vec()),
        }

        Err(ArgumentError::UnsupportedType(format!("{:?}", value.type_id())))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Argument::Null)
    }

    /// Column type byte and unsigned flag byte.
    pub fn type_tag(&self) -> [u8; 2] {
        match self {
            Argument::Null => [MYSQL_TYPE_NULL, 0],
            Argument::I8(_) | Argument::Bool(_) => [MYSQL_TYPE_TINY, 0],
            Argument::I16(_) => [MYSQL_TYPE_SHORT, 0],
            Argument::I32(_) => [MYSQL_TYPE_LONG, 0],
            Argument::I64(_) => [MYSQL_TYPE_LONGLONG, 0],
            Argument::U8(_) => [MYSQL_TYPE_TINY, UNSIGNED_FLAG],
            Argument::U16(_) => [MYSQL_TYPE_SHORT, UNSIGNED_FLAG],
            Argument::U32(_) => [MYSQL_TYPE_LONG, UNSIGNED_FLAG],
            Argument::U64(_) => [MYSQL_TYPE_LONGLONG, UNSIGNED_FLAG],
            Argument::F32(_) => [MYSQL_TYPE_FLOAT, 0],
            Argument::F64(_) => [MYSQL_TYPE_DOUBLE, 0],
            Argument::Text(_) | Argument::Bytes(_) => [MYSQL_TYPE_STRING, 0],
        }
    }

    /// Appends the binary value. Null arguments write nothing.
    pub fn write_value(&self, buf: &mut Vec<u8>) {
        match self {
            Argument::Null => {}
            Argument::I8(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Argument::I16(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Argument::I32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Argument::I64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Argument::U8(v) => buf.push(*v),
            Argument::U16(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Argument::U32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Argument::U64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Argument::Bool(v) => buf.push(u8::from(*v)),
            Argument::F32(v) => buf.extend_from_slice(&v.to_bits().to_le_bytes()),
            Argument::F64(v) => buf.extend_from_slice(&v.to_bits().to_le_bytes()),
            Argument::Text(v) => {
                write_lenenc_int(buf, v.len() as u64);
                buf.extend_from_slice(v.as_bytes());
            }
            Argument::Bytes(v) => {
                write_lenenc_int(buf, v.len() as u64);
                buf.extend_from_slice(v);
            }
        }
    }
}

/// Encoded parameter block of an execute command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedParams {
    pub null_bitmap: Vec<u8>,
    pub types: Vec<u8>,
    pub values: Vec<u8>,
}

impl EncodedParams {
    /// Appends bitmap, new-params-bound flag, types and values.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.null_bitmap);
        buf.push(NEW_PARAMS_BOUND);
        buf.extend_from_slice(&self.types);
        buf.extend_from_slice(&self.values);
    }
}

/// Encodes `args` for a statement declaring `params` parameters.
pub fn encode_params(params: u16, args: &[Argument]) -> Result<EncodedParams, ArgumentError> {
    let params = usize::from(params);
    if args.len() != params {
        return Err(ArgumentError::Count {
            expected: params,
            got: args.len(),
        });
    }

    let mut encoded = EncodedParams {
        null_bitmap: vec![0; params.div_ceil(8)],
        types: Vec::with_capacity(params * 2),
        values: Vec::new(),
    };

    for (i, arg) in args.iter().enumerate() {
        if arg.is_null() {
            encoded.null_bitmap[i / 8] |= 1 << (i % 8);
        }
        encoded.types.extend_from_slice(&arg.type_tag());
        arg.write_value(&mut encoded.values);
    }

    Ok(encoded)
}

/// Builds a complete execute command payload.
pub fn encode_execute(
    statement_id: u32,
    params: u16,
    args: &[Argument],
) -> Result<Vec<u8>, ArgumentError> {
    let encoded = encode_params(params, args)?;

    let block = encoded.null_bitmap.len() + 1 + encoded.types.len() + encoded.values.len();
    let mut data = Vec::with_capacity(10 + block);
    data.push(COM_STMT_EXECUTE);
    data.extend_from_slice(&statement_id.to_le_bytes());
    data.push(CURSOR_TYPE_NO_CURSOR);
    data.extend_from_slice(&ITERATION_COUNT.to_le_bytes());

    if params > 0 {
        encoded.write_to(&mut data);
    }

    Ok(data)
}
