use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::IntoDeserializer;
use serde::forward_to_deserialize_any;

use super::Value;
use crate::error::UnityError;

/// Feeds a [`Value`] tree into serde so typed classes can be derived.
#[derive(Debug)]
pub struct Deserializer<'de>(&'de Value);

impl<'de> Deserializer<'de> {
    pub fn new(input: &'de Value) -> Self {
        Self(input)
    }
}

impl<'de> IntoDeserializer<'de, UnityError> for &'de Value {
    type Deserializer = Deserializer<'de>;

    fn into_deserializer(self) -> Self::Deserializer {
        Deserializer::new(self)
    }
}

impl<'de> serde::de::Deserializer<'de> for Deserializer<'de> {
    type Error = UnityError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        match self.0 {
            Value::SInt8(v) => visitor.visit_i8(*v),
            Value::UInt8(v) => visitor.visit_u8(*v),
            Value::Char(v) => visitor.visit_char(*v),
            Value::SInt16(v) => visitor.visit_i16(*v),
            Value::UInt16(v) => visitor.visit_u16(*v),
            Value::SInt32(v) => visitor.visit_i32(*v),
            Value::UInt32(v) | Value::Type(v) => visitor.visit_u32(*v),
            Value::SInt64(v) => visitor.visit_i64(*v),
            Value::UInt64(v) | Value::FileSize(v) => visitor.visit_u64(*v),
            Value::Float(v) => visitor.visit_f32(*v),
            Value::Double(v) => visitor.visit_f64(*v),
            Value::Bool(v) => visitor.visit_bool(*v),
            Value::String(v) => visitor.visit_borrowed_str(v),
            Value::TypelessData(v) => visitor.visit_borrowed_bytes(v),
            Value::Array(v) => visitor.visit_seq(SeqDeserializer::new(v.iter())),
            Value::Map(v) => visitor.visit_map(MapDeserializer::new(v.iter().map(|(k, v)| (k, v)))),
            Value::Class(v) => visitor.visit_map(MapDeserializer::new(v.iter().map(|(name, value)| (name.as_str(), value)))),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        // older files store flags as UInt8
        match self.0.as_bool() {
            Some(v) if !matches!(self.0, Value::Bool(_)) => visitor.visit_bool(v),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    forward_to_deserialize_any! {
        i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map
        struct newtype_struct enum identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize, Debug)]
    struct Rect {
        x: f32,
        width: f32,
    }

    #[derive(Deserialize, Debug)]
    struct Sample {
        #[serde(rename = "m_Name")]
        name: String,
        #[serde(rename = "m_Rect")]
        rect: Rect,
        #[serde(rename = "m_IsReadable")]
        readable: bool,
        #[serde(rename = "m_Tags", default)]
        tags: Vec<u32>,
        #[serde(rename = "m_Missing", default)]
        missing: Option<i32>,
    }

    #[test]
    fn class_into_struct() {
        let value = Value::Class(vec![
            ("m_Name".to_string(), Value::String("atlas".to_string())),
            (
                "m_Rect".to_string(),
                Value::Class(vec![
                    ("x".to_string(), Value::Float(1.5)),
                    ("y".to_string(), Value::Float(0.0)),
                    ("width".to_string(), Value::Float(32.0)),
                ]),
            ),
            ("m_IsReadable".to_string(), Value::UInt8(1)),
            ("m_Tags".to_string(), Value::Array(vec![Value::UInt32(3), Value::UInt32(4)])),
            ("m_Unused".to_string(), Value::TypelessData(vec![1, 2])),
        ]);

        let sample = Sample::deserialize(Deserializer::new(&value)).unwrap();
        assert_eq!(sample.name, "atlas");
        assert_eq!(sample.rect.x, 1.5);
        assert_eq!(sample.rect.width, 32.0);
        assert!(sample.readable);
        assert_eq!(sample.tags, vec![3, 4]);
        assert_eq!(sample.missing, None);
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let value = Value::String("nope".to_string());
        assert!(Sample::deserialize(Deserializer::new(&value)).is_err());
    }
}
