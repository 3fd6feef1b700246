//! Stringification for setting values.
//!
//! Overrides travel as raw strings (see [`crate::backend::encoding`]); a
//! [`Converter`] is how a [`Value`](serde_json::Value) round-trips through
//! that representation. Built-in converters cover the primitive types the
//! specification names; a setting can be given a custom converter when its
//! declared type needs bespoke stringification (e.g. an enum-of-integer with
//! named variants).

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Converts a setting's value to and from its wire string form.
pub trait Converter: Send + Sync {
    /// Stringify a value for storage/transport.
    ///
    /// # Errors
    /// Returns an error if `value` is not of the shape this converter
    /// expects.
    fn to_string_value(&self, value: &Value) -> Result<String>;

    /// Parse a stored string back into a value.
    ///
    /// # Errors
    /// Returns an error if `raw` cannot be parsed into this converter's type.
    fn from_string_value(&self, raw: &str) -> Result<Value>;

    /// Name used in [`crate::config::SettingMetadata`] and error messages.
    fn type_name(&self) -> &'static str;
}

impl fmt::Debug for dyn Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Converter({})", self.type_name())
    }
}

fn convert_err(type_name: &str, raw: impl fmt::Display) -> Error {
    Error::InvalidDefaultValue {
        key: String::new(),
        reason: format!("cannot interpret '{raw}' as {type_name}"),
    }
}

macro_rules! int_converter {
    ($name:ident, $ty:ty, $type_name:expr) => {
        /// Built-in converter for
        #[doc = $type_name]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl Converter for $name {
            fn to_string_value(&self, value: &Value) -> Result<String> {
                let n = value
                    .as_i64()
                    .ok_or_else(|| convert_err($type_name, value))?;
                Ok(n.to_string())
            }

            fn from_string_value(&self, raw: &str) -> Result<Value> {
                let n: $ty = raw.parse().map_err(|_| convert_err($type_name, raw))?;
                Ok(Value::from(n))
            }

            fn type_name(&self) -> &'static str {
                $type_name
            }
        }
    };
}

int_converter!(I8Converter, i8, "i8");
int_converter!(I16Converter, i16, "i16");
int_converter!(I32Converter, i32, "i32");
int_converter!(I64Converter, i64, "i64");
int_converter!(U8Converter, u8, "u8");
int_converter!(U16Converter, u16, "u16");
int_converter!(U32Converter, u32, "u32");
int_converter!(U64Converter, u64, "u64");

/// Built-in converter for `bool`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolConverter;

impl Converter for BoolConverter {
    fn to_string_value(&self, value: &Value) -> Result<String> {
        let b = value.as_bool().ok_or_else(|| convert_err("bool", value))?;
        Ok(b.to_string())
    }

    fn from_string_value(&self, raw: &str) -> Result<Value> {
        let b: bool = raw.parse().map_err(|_| convert_err("bool", raw))?;
        Ok(Value::Bool(b))
    }

    fn type_name(&self) -> &'static str {
        "bool"
    }
}

/// Built-in converter for `f64` ("double"/"decimal" per the declared type).
#[derive(Debug, Default, Clone, Copy)]
pub struct FloatConverter;

impl Converter for FloatConverter {
    fn to_string_value(&self, value: &Value) -> Result<String> {
        let f = value.as_f64().ok_or_else(|| convert_err("f64", value))?;
        Ok(format!("{f}"))
    }

    fn from_string_value(&self, raw: &str) -> Result<Value> {
        let f: f64 = raw.parse().map_err(|_| convert_err("f64", raw))?;
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| convert_err("f64", raw))
    }

    fn type_name(&self) -> &'static str {
        "f64"
    }
}

/// Built-in converter for `String`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn to_string_value(&self, value: &Value) -> Result<String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| convert_err("string", value))
    }

    fn from_string_value(&self, raw: &str) -> Result<Value> {
        Ok(Value::String(raw.to_string()))
    }

    fn type_name(&self) -> &'static str {
        "string"
    }
}

/// Built-in converter for a single `char`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharConverter;

impl Converter for CharConverter {
    fn to_string_value(&self, value: &Value) -> Result<String> {
        let s = value.as_str().ok_or_else(|| convert_err("char", value))?;
        let mut chars = s.chars();
        let c = chars.next().ok_or_else(|| convert_err("char", value))?;
        if chars.next().is_some() {
            return Err(convert_err("char", value));
        }
        Ok(c.to_string())
    }

    fn from_string_value(&self, raw: &str) -> Result<Value> {
        let mut chars = raw.chars();
        let c = chars.next().ok_or_else(|| convert_err("char", raw))?;
        if chars.next().is_some() {
            return Err(convert_err("char", raw));
        }
        Ok(Value::String(c.to_string()))
    }

    fn type_name(&self) -> &'static str {
        "char"
    }
}

/// Built-in converter for an enum represented as its underlying integer
/// discriminant (the declared "enum-of-integer" shape).
#[derive(Debug, Default, Clone, Copy)]
pub struct EnumIntConverter;

impl Converter for EnumIntConverter {
    fn to_string_value(&self, value: &Value) -> Result<String> {
        let n = value
            .as_i64()
            .ok_or_else(|| convert_err("enum", value))?;
        Ok(n.to_string())
    }

    fn from_string_value(&self, raw: &str) -> Result<Value> {
        let n: i64 = raw.parse().map_err(|_| convert_err("enum", raw))?;
        Ok(Value::from(n))
    }

    fn type_name(&self) -> &'static str {
        "enum"
    }
}

/// Declared primitive shape of a setting, used to resolve the built-in
/// converter when no explicit converter is attached to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Float,
    String,
    Char,
    EnumInt,
}

impl PrimitiveType {
    /// Resolve the built-in converter for this primitive shape.
    #[must_use]
    pub fn built_in_converter(self) -> Arc<dyn Converter> {
        match self {
            PrimitiveType::Bool => Arc::new(BoolConverter),
            PrimitiveType::I8 => Arc::new(I8Converter),
            PrimitiveType::I16 => Arc::new(I16Converter),
            PrimitiveType::I32 => Arc::new(I32Converter),
            PrimitiveType::I64 => Arc::new(I64Converter),
            PrimitiveType::U8 => Arc::new(U8Converter),
            PrimitiveType::U16 => Arc::new(U16Converter),
            PrimitiveType::U32 => Arc::new(U32Converter),
            PrimitiveType::U64 => Arc::new(U64Converter),
            PrimitiveType::Float => Arc::new(FloatConverter),
            PrimitiveType::String => Arc::new(StringConverter),
            PrimitiveType::Char => Arc::new(CharConverter),
            PrimitiveType::EnumInt => Arc::new(EnumIntConverter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(conv: &dyn Converter, value: Value) {
        let s = conv.to_string_value(&value).unwrap();
        let back = conv.from_string_value(&s).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn bool_round_trips() {
        round_trip(&BoolConverter, Value::Bool(true));
        round_trip(&BoolConverter, Value::Bool(false));
    }

    #[test]
    fn integers_round_trip() {
        round_trip(&I32Converter, Value::from(-42i32));
        round_trip(&U64Converter, Value::from(1234567890u64));
    }

    #[test]
    fn float_round_trips() {
        round_trip(&FloatConverter, Value::from(3.5));
    }

    #[test]
    fn string_round_trips() {
        round_trip(&StringConverter, Value::String("hello".into()));
    }

    #[test]
    fn char_rejects_multi_char_strings() {
        let conv = CharConverter;
        assert!(conv.from_string_value("ab").is_err());
        assert!(conv.to_string_value(&Value::String("ab".into())).is_err());
    }

    #[test]
    fn built_in_converter_resolves_by_primitive_type() {
        let conv = PrimitiveType::I16.built_in_converter();
        assert_eq!(conv.type_name(), "i16");
    }
}
