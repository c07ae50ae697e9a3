pub mod asset;
pub mod bundle;
pub mod classes;
pub mod config;
mod env;
pub mod error;
pub mod handler;
pub mod math;
pub mod object;
pub mod reader;
pub mod replace;
pub mod texture;
pub mod typetree;
pub mod web;
pub mod workspace;
pub mod writer;

pub use crate::classes::{ClassID, Sprite, Texture2D};
pub use crate::env::{Env, Object, ObjectHandle};
pub use crate::error::UnityError;
pub use crate::error::UnityResult;
