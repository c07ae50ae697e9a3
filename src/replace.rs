//! Extracting and replacing the pixels of Texture2D and Sprite objects.
use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::classes::{ClassID, Sprite, Texture2D};
use crate::env::{Env, Object, ObjectHandle};
use crate::error::{UnityError, UnityResult};
use crate::object::from_value;
use crate::texture::{decode, encode, TextureFormat};
use crate::typetree::Value;

/// Outcome of a successful [`replace_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceReport {
    pub class: ClassID,
    pub name: String,
    /// Size of the image the object showed before the replacement.
    pub original_size: (u32, u32),
    /// Size of the image that was passed in.
    pub replacement_size: (u32, u32),
    pub format: TextureFormat,
    /// The original format had no encoder and RGBA32 was written instead.
    pub fallback: bool,
}

/// Decodes the top mip level of a texture.
pub fn decode_texture(env: &Env, texture: &Texture2D) -> UnityResult<RgbaImage> {
    let (width, height) = texture.size();
    let data = env.texture_data(texture)?;
    decode(texture.format()?, &data, width, height)
}

/// Decoded image of a Texture2D, or of a Sprite cut out of its atlas.
pub fn extract_image(object: &Object) -> UnityResult<RgbaImage> {
    match object.class() {
        ClassID::Texture2D => decode_texture(object.env(), &object.read()?),
        ClassID::Sprite => {
            let sprite: Sprite = object.read()?;
            let atlas = atlas_of(object, &sprite)?;
            let atlas = decode_texture(object.env(), &atlas.read()?)?;
            Ok(sprite.crop(&atlas))
        }
        class => Err(UnityError::NotATexture { path_id: object.path_id(), class }),
    }
}

fn atlas_of<'a>(object: &Object<'a>, sprite: &Sprite) -> UnityResult<Object<'a>> {
    if sprite.rd.texture.is_null() {
        return Err(UnityError::MissingField("m_RD.texture".to_string()));
    }
    object.resolve(sprite.rd.texture.file_id, sprite.rd.texture.path_id)
}

fn fit(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    log::info!("resizing replacement from {:?} to {width}x{height}", image.dimensions());
    imageops::resize(image, width, height, FilterType::CatmullRom)
}

/// Replaces the image of the object with `path_id`.
///
/// The replacement is resized to the object's current size. Textures keep
/// their format when it can be encoded, otherwise they become RGBA32.
/// Sprites are pasted into their atlas texture, which is rewritten.
pub fn replace_image(env: &mut Env, path_id: i64, image: &RgbaImage) -> UnityResult<ReplaceReport> {
    let object = env.find_object(path_id).ok_or(UnityError::ObjectNotFound(path_id))?;
    let class = object.class();
    let replacement_size = image.dimensions();
    log::info!("replacing {class:?} {path_id} with a {}x{} image", replacement_size.0, replacement_size.1);

    match class {
        ClassID::Texture2D => {
            let value = object.read_value()?;
            let texture: Texture2D = from_value(&value)?;
            let original_size = texture.size();
            let pixels = fit(image, original_size.0, original_size.1);
            let handle = object.handle();
            let (format, fallback) = write_texture(env, handle, value, &texture, &pixels)?;
            Ok(ReplaceReport { class, name: texture.name, original_size, replacement_size, format, fallback })
        }
        ClassID::Sprite => {
            let sprite: Sprite = object.read()?;
            let atlas = atlas_of(&object, &sprite)?;
            let value = atlas.read_value()?;
            let texture: Texture2D = from_value(&value)?;
            let mut pixels = decode_texture(env, &texture)?;
            let original_size = sprite.image_size(pixels.width(), pixels.height());
            sprite.paste(&mut pixels, &fit(image, original_size.0, original_size.1));
            let handle = atlas.handle();
            let (format, fallback) = write_texture(env, handle, value, &texture, &pixels)?;
            Ok(ReplaceReport { class, name: sprite.name, original_size, replacement_size, format, fallback })
        }
        class => Err(UnityError::NotATexture { path_id, class }),
    }
}

/// Encodes `pixels` into the texture and stores it inline.
fn write_texture(
    env: &mut Env,
    handle: ObjectHandle,
    mut value: Value,
    texture: &Texture2D,
    pixels: &RgbaImage,
) -> UnityResult<(TextureFormat, bool)> {
    let encoded = texture.format().and_then(|format| Ok((format, encode(format, pixels)?)));
    let (format, data, fallback) = match encoded {
        Ok((format, data)) => (format, data, false),
        Err(e) => {
            log::warn!("cannot encode {} in format {}: {e}, writing RGBA32", texture.name, texture.texture_format);
            (TextureFormat::RGBA32, encode(TextureFormat::RGBA32, pixels)?, true)
        }
    };

    value.set_int("m_TextureFormat", i32::from(format) as i64);
    value.set_int("m_CompleteImageSize", data.len() as i64);
    value.set_int("m_MipCount", 1);
    value.set("m_MipMap", Value::Bool(false));
    value.set_int("m_ImageCount", 1);
    if let Some(stream) = value.get_mut("m_StreamData") {
        stream.set_int("offset", 0);
        stream.set_int("size", 0);
        stream.set("path", Value::String(String::new()));
    }
    let image_data = match value.get("image data") {
        Some(Value::Array(_)) => Value::Array(data.into_iter().map(Value::UInt8).collect()),
        _ => Value::TypelessData(data),
    };
    if !value.set("image data", image_data) {
        return Err(UnityError::MissingField("image data".to_string()));
    }

    env.write_value(handle, &value)?;
    Ok((format, fallback))
}
