mod common;

use common::{quadrants, rgba32, sprite_value, text_value, texture_value, Fixture};
use unity_texswap::classes::Texture2D;
use unity_texswap::replace::extract_image;
use unity_texswap::texture::TextureFormat;
use unity_texswap::{ClassID, Env};

fn fixture(version: u32) -> Fixture {
    let atlas = quadrants(8, 8);
    let mut fixture = Fixture::new(version);
    fixture
        .texture(10, &texture_value("atlas", 8, 8, TextureFormat::RGBA32, rgba32(&atlas), (0, 0, "")))
        .sprite(11, &sprite_value("corner", 10, (4.0, 4.0, 4.0, 4.0), 0))
        .text(12, &text_value("readme", "hello"));
    fixture
}

#[test]
fn test_load_texture2d() {
    for version in [15, 17, 21, 22] {
        let mut env = Env::new();
        env.load_from_slice(&fixture(version).bytes()).expect("Load failure");
        assert_eq!(env.objects().count(), 3);

        let mut textures = 0;
        for obj in env.objects() {
            if obj.class() != ClassID::Texture2D {
                continue;
            }
            textures += 1;
            let s: Texture2D = obj.read().expect("Read Failure");
            assert_eq!(s.name, "atlas");
            assert_eq!(s.format().unwrap(), TextureFormat::RGBA32);
            let image = extract_image(&obj).expect("Decode Failure");
            assert_eq!(image, quadrants(8, 8));

            let json = serde_json::to_value(obj.read_value().unwrap()).expect("Serialize Failure");
            assert_eq!(json["m_Width"], 8);
            assert_eq!(json["m_TextureSettings"]["m_FilterMode"], 1);
            assert_eq!(json["m_StreamData"]["path"], "");
        }
        assert_eq!(textures, 1, "version {version}");
    }
}

#[test]
fn test_load_sprite() {
    let mut env = Env::new();
    env.load_from_slice(&fixture(22).bytes()).unwrap();
    let sprite = env.find_object(11).unwrap();
    assert_eq!(sprite.class(), ClassID::Sprite);
    assert_eq!(sprite.name().as_deref(), Some("corner"));
    // top right quadrant of the atlas
    let image = extract_image(&sprite).unwrap();
    assert_eq!(image.dimensions(), (4, 4));
    assert!(image.pixels().all(|p| p.0 == [0, 255, 0, 255]));
}

#[test]
fn test_load_from_bundle() {
    let bundle = fixture(22).bundle(vec![("CAB-fixture.resS", vec![1, 2, 3])]);
    let mut env = Env::new();
    env.load_from_slice(&bundle).unwrap();
    assert!(env.is_bundle());
    assert_eq!(env.files().len(), 1);
    assert!(extract_image(&env.find_object(10).unwrap()).is_ok());
}

#[test]
fn test_streamed_texture() {
    let atlas = quadrants(4, 4);
    let mut payload = vec![0xAA; 16];
    payload.extend(rgba32(&atlas));
    let mut fixture = Fixture::new(22);
    fixture.texture(
        1,
        &texture_value("streamed", 4, 4, TextureFormat::RGBA32, vec![], (16, 64, "archive:/CAB-fixture/CAB-fixture.resS")),
    );

    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("level0.assets");
    std::fs::write(&assets, fixture.bytes()).unwrap();
    // the named resource is missing, so `<file>.resS` is used
    std::fs::write(dir.path().join("level0.assets.resS"), &payload).unwrap();

    let mut env = Env::new();
    env.load_file(&assets).unwrap();
    let image = extract_image(&env.find_object(1).unwrap()).unwrap();
    assert_eq!(image, atlas);

    // bundles carry the resource as a node
    let mut env = Env::new();
    env.load_from_slice(&fixture.bundle(vec![("CAB-fixture.resS", payload)])).unwrap();
    assert_eq!(extract_image(&env.find_object(1).unwrap()).unwrap(), atlas);
}
