use serde::de::DeserializeOwned;

use crate::classes::ClassID;
use crate::error::UnityResult;
use crate::typetree::{Deserializer, Value};

/// One row of a serialized file's object table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    pub path_id: i64,
    /// Absolute offset of the payload in the file as loaded.
    pub byte_start: u64,
    pub byte_size: u32,
    pub type_id: i32,
    pub class_id: i32,
    pub is_destroyed: u16,
    pub script_type_index: i16,
    pub stripped: u8,
}

impl ObjectInfo {
    pub fn class(&self) -> ClassID {
        ClassID::from(self.class_id)
    }
}

/// Converts a type tree value into a typed class.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> UnityResult<T> {
    T::deserialize(Deserializer::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::Texture2D;

    #[test]
    fn texture_from_value() {
        let value = Value::Class(vec![
            ("m_Name".to_string(), Value::String("hero".to_string())),
            ("m_Width".to_string(), Value::SInt32(4)),
            ("m_Height".to_string(), Value::SInt32(2)),
            ("m_CompleteImageSize".to_string(), Value::UInt32(32)),
            ("m_TextureFormat".to_string(), Value::SInt32(4)),
            ("m_MipCount".to_string(), Value::SInt32(1)),
            ("image data".to_string(), Value::TypelessData(vec![0; 32])),
            (
                "m_StreamData".to_string(),
                Value::Class(vec![
                    ("offset".to_string(), Value::UInt64(0)),
                    ("size".to_string(), Value::UInt32(0)),
                    ("path".to_string(), Value::String(String::new())),
                ]),
            ),
        ]);
        let tex: Texture2D = from_value(&value).unwrap();
        assert_eq!(tex.name, "hero");
        assert_eq!(tex.size(), (4, 2));
        assert_eq!(tex.image_data.0.len(), 32);
        assert_eq!(tex.mip_count, Some(1));
        assert!(tex.streamed().is_none());
    }

    #[test]
    fn class_lookup() {
        let info = ObjectInfo { class_id: 213, ..Default::default() };
        assert_eq!(info.class(), ClassID::Sprite);
    }
}
