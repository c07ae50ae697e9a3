mod sprite;
mod texture2d;

pub use sprite::{PackingRotation, Sprite, SpriteRenderData};
pub use texture2d::{StreamingInfo, Texture2D};

use num_enum::{FromPrimitive, IntoPrimitive};
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum ClassID {
    Object = 0,
    GameObject = 1,
    Component = 2,
    Transform = 4,
    Camera = 20,
    Material = 21,
    MeshRenderer = 23,
    Texture = 27,
    Texture2D = 28,
    MeshFilter = 33,
    Mesh = 43,
    Shader = 48,
    TextAsset = 49,
    AnimationClip = 74,
    AudioClip = 83,
    RenderTexture = 84,
    Cubemap = 89,
    Animator = 95,
    MonoBehaviour = 114,
    MonoScript = 115,
    Font = 128,
    AssetBundle = 142,
    ResourceManager = 147,
    PreloadData = 150,
    Texture2DArray = 187,
    SpriteRenderer = 212,
    Sprite = 213,
    Canvas = 223,
    RectTransform = 224,
    SpriteAtlas = 687078895,
    #[num_enum(catch_all)]
    Unknown(i32),
}

impl ClassID {
    /// Whether objects of this class carry a decodable image.
    pub fn is_image(&self) -> bool {
        matches!(self, ClassID::Texture2D | ClassID::Sprite)
    }

    pub fn name(&self) -> String {
        match self {
            ClassID::Unknown(id) => format!("ClassID({id})"),
            other => format!("{other:?}"),
        }
    }
}

/// Object reference within a serialized file; `file_id` 0 is the file itself.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PPtr {
    #[serde(rename = "m_FileID")]
    pub file_id: i64,
    #[serde(rename = "m_PathID")]
    pub path_id: i64,
}

impl PPtr {
    pub fn is_null(&self) -> bool {
        self.path_id == 0
    }
}

/// Raw bytes of a `TypelessData` node, also accepting a plain byte array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypelessData(pub Vec<u8>);

impl<'de> Deserialize<'de> for TypelessData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = TypelessData;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("typeless data")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(TypelessData(v.to_vec()))
            }

            fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(TypelessData(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(b) = seq.next_element::<u8>()? {
                    out.push(b);
                }
                Ok(TypelessData(out))
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}
