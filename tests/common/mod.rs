//! In-memory Unity files for the integration tests.
#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use unity_texswap::asset::{SerializedFile, SerializedType};
use unity_texswap::bundle::{ArchiveFlags, BundleFile, BundleNode};
use unity_texswap::reader::ByteOrder;
use unity_texswap::texture::TextureFormat;
use unity_texswap::typetree::{write_value, TypeTree, TypeTreeNode, Value};
use unity_texswap::writer::Writer;
use unity_texswap::ClassID;

const ALIGN: i32 = 0x4000;

fn string(level: u8, name: &str, nodes: &mut Vec<TypeTreeNode>) {
    nodes.push(TypeTreeNode::new(level, "string", name, -1, 0x8000));
    nodes.push(TypeTreeNode::new(level + 1, "Array", "Array", -1, ALIGN | 1));
    nodes.push(TypeTreeNode::new(level + 2, "int", "size", 4, 1));
    nodes.push(TypeTreeNode::new(level + 2, "char", "data", 1, 1));
}

fn node(level: u8, type_: &str, name: &str, size: i32) -> TypeTreeNode {
    TypeTreeNode::new(level, type_, name, size, 0)
}

fn rectf(level: u8, name: &str, nodes: &mut Vec<TypeTreeNode>) {
    nodes.push(node(level, "Rectf", name, 16));
    for field in ["x", "y", "width", "height"] {
        nodes.push(node(level + 1, "float", field, 4));
    }
}

fn vector2f(level: u8, name: &str, nodes: &mut Vec<TypeTreeNode>) {
    nodes.push(node(level, "Vector2f", name, 8));
    nodes.push(node(level + 1, "float", "x", 4));
    nodes.push(node(level + 1, "float", "y", 4));
}

fn pptr(level: u8, name: &str, nodes: &mut Vec<TypeTreeNode>) {
    nodes.push(node(level, "PPtr<Texture2D>", name, 12));
    nodes.push(node(level + 1, "int", "m_FileID", 4));
    nodes.push(node(level + 1, "SInt64", "m_PathID", 8));
}

/// Texture2D layout of the 2019.4 editor.
pub fn texture_tree() -> TypeTree {
    let mut n = vec![node(0, "Texture2D", "Base", -1)];
    string(1, "m_Name", &mut n);
    n.push(node(1, "int", "m_ForcedFallbackFormat", 4));
    n.push(TypeTreeNode::new(1, "bool", "m_DownscaleFallback", 1, ALIGN));
    n.push(node(1, "int", "m_Width", 4));
    n.push(node(1, "int", "m_Height", 4));
    n.push(node(1, "int", "m_CompleteImageSize", 4));
    n.push(node(1, "int", "m_TextureFormat", 4));
    n.push(node(1, "int", "m_MipCount", 4));
    n.push(node(1, "bool", "m_IsReadable", 1));
    n.push(TypeTreeNode::new(1, "bool", "m_StreamingMipmaps", 1, ALIGN));
    n.push(node(1, "int", "m_StreamingMipmapsPriority", 4));
    n.push(node(1, "int", "m_ImageCount", 4));
    n.push(node(1, "int", "m_TextureDimension", 4));
    n.push(node(1, "GLTextureSettings", "m_TextureSettings", 24));
    n.push(node(2, "int", "m_FilterMode", 4));
    n.push(node(2, "int", "m_Aniso", 4));
    n.push(node(2, "float", "m_MipBias", 4));
    n.push(node(2, "int", "m_WrapU", 4));
    n.push(node(2, "int", "m_WrapV", 4));
    n.push(node(2, "int", "m_WrapW", 4));
    n.push(node(1, "int", "m_LightmapFormat", 4));
    n.push(node(1, "int", "m_ColorSpace", 4));
    n.push(TypeTreeNode::new(1, "TypelessData", "image data", -1, ALIGN));
    n.push(node(2, "int", "size", 4));
    n.push(node(2, "UInt8", "data", 1));
    n.push(node(1, "StreamingInfo", "m_StreamData", -1));
    n.push(node(2, "unsigned int", "offset", 4));
    n.push(node(2, "unsigned int", "size", 4));
    string(2, "path", &mut n);
    TypeTree::from_nodes(n)
}

pub fn sprite_tree() -> TypeTree {
    let mut n = vec![node(0, "Sprite", "Base", -1)];
    string(1, "m_Name", &mut n);
    rectf(1, "m_Rect", &mut n);
    vector2f(1, "m_Offset", &mut n);
    n.push(node(1, "float", "m_PixelsToUnits", 4));
    n.push(node(1, "SpriteRenderData", "m_RD", -1));
    pptr(2, "texture", &mut n);
    pptr(2, "alphaTexture", &mut n);
    rectf(2, "textureRect", &mut n);
    vector2f(2, "textureRectOffset", &mut n);
    n.push(node(2, "unsigned int", "settingsRaw", 4));
    TypeTree::from_nodes(n)
}

pub fn text_asset_tree() -> TypeTree {
    let mut n = vec![node(0, "TextAsset", "Base", -1)];
    string(1, "m_Name", &mut n);
    string(1, "m_Script", &mut n);
    TypeTree::from_nodes(n)
}

fn field(name: &str, value: Value) -> (String, Value) {
    (name.to_string(), value)
}

fn stream_info(offset: u32, size: u32, path: &str) -> Value {
    Value::Class(vec![
        field("offset", Value::UInt32(offset)),
        field("size", Value::UInt32(size)),
        field("path", Value::String(path.to_string())),
    ])
}

pub fn texture_value(name: &str, width: u32, height: u32, format: TextureFormat, data: Vec<u8>, stream: (u32, u32, &str)) -> Value {
    Value::Class(vec![
        field("m_Name", Value::String(name.to_string())),
        field("m_ForcedFallbackFormat", Value::SInt32(4)),
        field("m_DownscaleFallback", Value::Bool(false)),
        field("m_Width", Value::SInt32(width as i32)),
        field("m_Height", Value::SInt32(height as i32)),
        field("m_CompleteImageSize", Value::SInt32(data.len().max(stream.1 as usize) as i32)),
        field("m_TextureFormat", Value::SInt32(format.into())),
        field("m_MipCount", Value::SInt32(3)),
        field("m_IsReadable", Value::Bool(true)),
        field("m_StreamingMipmaps", Value::Bool(false)),
        field("m_StreamingMipmapsPriority", Value::SInt32(0)),
        field("m_ImageCount", Value::SInt32(1)),
        field("m_TextureDimension", Value::SInt32(2)),
        field(
            "m_TextureSettings",
            Value::Class(vec![
                field("m_FilterMode", Value::SInt32(1)),
                field("m_Aniso", Value::SInt32(2)),
                field("m_MipBias", Value::Float(0.5)),
                field("m_WrapU", Value::SInt32(1)),
                field("m_WrapV", Value::SInt32(1)),
                field("m_WrapW", Value::SInt32(0)),
            ]),
        ),
        field("m_LightmapFormat", Value::SInt32(0)),
        field("m_ColorSpace", Value::SInt32(1)),
        field("image data", Value::TypelessData(data)),
        field("m_StreamData", stream_info(stream.0, stream.1, stream.2)),
    ])
}

fn rect_value(x: f32, y: f32, width: f32, height: f32) -> Value {
    Value::Class(vec![
        field("x", Value::Float(x)),
        field("y", Value::Float(y)),
        field("width", Value::Float(width)),
        field("height", Value::Float(height)),
    ])
}

fn vector_value(x: f32, y: f32) -> Value {
    Value::Class(vec![field("x", Value::Float(x)), field("y", Value::Float(y))])
}

fn pptr_value(file_id: i32, path_id: i64) -> Value {
    Value::Class(vec![field("m_FileID", Value::SInt32(file_id)), field("m_PathID", Value::SInt64(path_id))])
}

/// Sprite cut from `texture` at `rect` (x, y from the bottom left).
pub fn sprite_value(name: &str, texture: i64, rect: (f32, f32, f32, f32), settings_raw: u32) -> Value {
    let (x, y, w, h) = rect;
    Value::Class(vec![
        field("m_Name", Value::String(name.to_string())),
        field("m_Rect", rect_value(x, y, w, h)),
        field("m_Offset", vector_value(0.0, 0.0)),
        field("m_PixelsToUnits", Value::Float(100.0)),
        field(
            "m_RD",
            Value::Class(vec![
                field("texture", pptr_value(0, texture)),
                field("alphaTexture", pptr_value(0, 0)),
                field("textureRect", rect_value(x, y, w, h)),
                field("textureRectOffset", vector_value(0.0, 0.0)),
                field("settingsRaw", Value::UInt32(settings_raw)),
            ]),
        ),
    ])
}

pub fn text_value(name: &str, script: &str) -> Value {
    Value::Class(vec![
        field("m_Name", Value::String(name.to_string())),
        field("m_Script", Value::String(script.to_string())),
    ])
}

/// Builds a serialized file holding textures, sprites and text assets.
pub struct Fixture {
    pub file: SerializedFile,
    texture: i32,
    sprite: i32,
    text: i32,
}

impl Fixture {
    pub fn new(version: u32) -> Self {
        let mut file = SerializedFile::new(version, "2019.4.1f1", 19);
        let texture = file.add_type(SerializedType::new(ClassID::Texture2D, texture_tree()));
        let sprite = file.add_type(SerializedType::new(ClassID::Sprite, sprite_tree()));
        let text = file.add_type(SerializedType::new(ClassID::TextAsset, text_asset_tree()));
        Self { file, texture, sprite, text }
    }

    fn add(&mut self, path_id: i64, type_id: i32, value: &Value) -> &mut Self {
        let tree = self.file.types[type_id as usize].type_tree.clone().unwrap_or_default();
        let mut w = Writer::new(ByteOrder::Little);
        write_value(&tree.nodes, value, &mut w).expect("fixture value matches its tree");
        self.file.add_object(path_id, type_id, w.into_inner()).expect("fixture type exists");
        self
    }

    pub fn texture(&mut self, path_id: i64, value: &Value) -> &mut Self {
        self.add(path_id, self.texture, value)
    }

    pub fn sprite(&mut self, path_id: i64, value: &Value) -> &mut Self {
        self.add(path_id, self.sprite, value)
    }

    pub fn text(&mut self, path_id: i64, value: &Value) -> &mut Self {
        self.add(path_id, self.text, value)
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.file.save().expect("fixture saves")
    }

    /// The file wrapped in a UnityFS bundle, with optional extra nodes.
    pub fn bundle(&self, extra: Vec<(&str, Vec<u8>)>) -> Vec<u8> {
        let mut nodes = vec![BundleNode { path: "CAB-fixture".to_string(), flags: 4, data: self.bytes().into() }];
        for (path, data) in extra {
            nodes.push(BundleNode { path: path.to_string(), flags: 0, data: data.into() });
        }
        let bundle = BundleFile {
            version: 7,
            unity_version: "5.x.x".to_string(),
            unity_revision: "2019.4.1f1".to_string(),
            flags: ArchiveFlags::BLOCK_INFO_NEED_PADDING_AT_START,
            hash: [0; 16],
            nodes,
        };
        bundle.save().expect("bundle saves")
    }
}

/// Opaque image with a distinct colour per quadrant.
pub fn quadrants(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| match (x < width / 2, y < height / 2) {
        (true, true) => Rgba([255, 0, 0, 255]),
        (false, true) => Rgba([0, 255, 0, 255]),
        (true, false) => Rgba([0, 0, 255, 255]),
        (false, false) => Rgba([255, 255, 255, 255]),
    })
}

/// Raw RGBA32 payload (bottom-up rows) of a top-down image.
pub fn rgba32(image: &RgbaImage) -> Vec<u8> {
    image::imageops::flip_vertical(image).into_raw()
}

pub fn solid(width: u32, height: u32, colour: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(colour))
}
