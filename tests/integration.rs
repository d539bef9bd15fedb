// Whole-tag and whole-file fixtures exercising the public `decode` entry point end to end,
// complementing the per-module unit tests under `src/`.

use std::io::Write;

use swf_tree::header::Compression;
use swf_tree::tags::{Tag, TagBody};
use swf_tree::{decode, DecoderOptions};

/// Encodes one tag record: a short-form header, or a long-form header plus a 32-bit length, and
/// the payload itself.
fn tag_bytes(code: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();

    if payload.len() < 0x3f {
        let header: u16 = (code << 6) | payload.len() as u16;
        bytes.extend_from_slice(&header.to_le_bytes());
    }
    else {
        let header: u16 = (code << 6) | 0x3f;
        bytes.extend_from_slice(&header.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    }

    bytes.extend_from_slice(payload);
    bytes
}

const END_TAG: [u8; 2] = [0x00, 0x00];

/// Assembles an uncompressed `FWS` file: an all-zero RECT, a fixed FrameRate/FrameCount, the
/// given tag stream, and a terminating End tag.
fn uncompressed_movie(tag_stream: &[u8]) -> Vec<u8> {
    let mut body = vec![0x01, 0x00, 0x00, 0x00]; // RECT, nbits=0
    body.extend_from_slice(&[0x00, 0x0c]); // FrameRate
    body.extend_from_slice(&[0x0a, 0x00]); // FrameCount = 10
    body.extend_from_slice(tag_stream);
    body.extend_from_slice(&END_TAG);

    let mut bytes = b"FWS".to_vec();
    bytes.push(10);
    bytes.extend_from_slice(&(8 + body.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&body);
    bytes
}

fn tag_names(tags: &[Tag]) -> Vec<&'static str> {
    tags.iter()
        .map(|t| match t {
            Tag::Known(body) => match body.as_ref() {
                TagBody::ShowFrame => "ShowFrame",
                TagBody::SetBackgroundColor(_) => "SetBackgroundColor",
                TagBody::DefineSprite(_) => "DefineSprite",
                TagBody::FileAttributes(_) => "FileAttributes",
                TagBody::Metadata(_) => "Metadata",
                _ => "Other",
            },
            Tag::Unknown { .. } => "Unknown",
            Tag::Failing { .. } => "Failing",
        })
        .collect()
}

#[test]
fn decodes_a_multi_tag_movie_in_order() {
    let nested_show_frame = tag_bytes(1, &[]);
    let mut nested_stream = nested_show_frame;
    nested_stream.extend_from_slice(&END_TAG);

    let mut sprite_payload = vec![0x07, 0x00, 0x01, 0x00]; // CharacterId=7, FrameCount=1
    sprite_payload.extend_from_slice(&nested_stream);

    let mut tag_stream = Vec::new();
    tag_stream.extend_from_slice(&tag_bytes(77, b"<xml/>\0")); // Metadata
    tag_stream.extend_from_slice(&tag_bytes(9, &[0x11, 0x22, 0x33])); // SetBackgroundColor
    tag_stream.extend_from_slice(&tag_bytes(39, &sprite_payload)); // DefineSprite
    tag_stream.extend_from_slice(&tag_bytes(1, &[])); // ShowFrame

    let bytes = uncompressed_movie(&tag_stream);
    let movie = decode(&bytes, DecoderOptions::default()).unwrap();

    assert_eq!(movie.header.compression, Compression::None);
    assert_eq!(movie.header.frame_count, 10);
    assert_eq!(
        tag_names(&movie.tags),
        vec!["Metadata", "SetBackgroundColor", "DefineSprite", "ShowFrame"],
    );

    match &movie.tags[2] {
        Tag::Known(body) => match body.as_ref() {
            TagBody::DefineSprite(sprite) => {
                assert_eq!(sprite.character_id, 7);
                assert_eq!(tag_names(&sprite.control_tags), vec!["ShowFrame"]);
            }
            other => panic!("expected DefineSprite, got {:?}", other),
        },
        other => panic!("expected Known, got {:?}", other),
    }
}

#[test]
fn nested_sprite_control_tags_match_a_top_level_parse_of_the_same_stream() {
    let mut inner_stream = Vec::new();
    inner_stream.extend_from_slice(&tag_bytes(9, &[0xaa, 0xbb, 0xcc]));
    inner_stream.extend_from_slice(&tag_bytes(1, &[]));

    let mut nested_stream = inner_stream.clone();
    nested_stream.extend_from_slice(&END_TAG);

    let mut sprite_payload = vec![0x01, 0x00, 0x01, 0x00];
    sprite_payload.extend_from_slice(&nested_stream);

    let top_level_tag_stream = tag_bytes(39, &sprite_payload);
    let top_level_bytes = uncompressed_movie(&top_level_tag_stream);
    let movie = decode(&top_level_bytes, DecoderOptions::default()).unwrap();

    let sprite = match &movie.tags[0] {
        Tag::Known(body) => match body.as_ref() {
            TagBody::DefineSprite(sprite) => sprite.clone(),
            other => panic!("expected DefineSprite, got {:?}", other),
        },
        other => panic!("expected Known, got {:?}", other),
    };

    let mut inner_as_top_level = inner_stream.clone();
    inner_as_top_level.extend_from_slice(&END_TAG);
    let flat_movie_bytes = uncompressed_movie(&inner_as_top_level);
    let flat_movie = decode(&flat_movie_bytes, DecoderOptions::default()).unwrap();

    assert_eq!(tag_names(&sprite.control_tags), tag_names(&flat_movie.tags));
}

#[test]
fn compressed_and_uncompressed_bodies_decode_to_the_same_tag_sequence() {
    let mut tag_stream = Vec::new();
    tag_stream.extend_from_slice(&tag_bytes(9, &[0x01, 0x02, 0x03]));
    tag_stream.extend_from_slice(&tag_bytes(1, &[]));

    let fws_bytes = uncompressed_movie(&tag_stream);
    let fws_body = fws_bytes[8..].to_vec();

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&fws_body).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut cws_bytes = b"CWS".to_vec();
    cws_bytes.push(10);
    cws_bytes.extend_from_slice(&(8 + fws_body.len() as u32).to_le_bytes());
    cws_bytes.extend_from_slice(&compressed);

    let uncompressed_movie_result = decode(&fws_bytes, DecoderOptions::default()).unwrap();
    let compressed_movie_result = decode(&cws_bytes, DecoderOptions::default()).unwrap();

    assert_eq!(compressed_movie_result.header.compression, Compression::Zlib);
    assert_eq!(compressed_movie_result.header.file_length as usize, fws_body.len() + 8);
    assert_eq!(
        tag_names(&compressed_movie_result.tags),
        tag_names(&uncompressed_movie_result.tags),
    );
}

#[test]
fn unknown_tag_code_in_an_otherwise_valid_file_is_preserved_as_raw_bytes() {
    let mut tag_stream = Vec::new();
    tag_stream.extend_from_slice(&tag_bytes(63, &[0xde, 0xad])); // type code 63 is unassigned
    tag_stream.extend_from_slice(&tag_bytes(1, &[]));

    let bytes = uncompressed_movie(&tag_stream);
    let movie = decode(&bytes, DecoderOptions::default()).unwrap();

    match &movie.tags[0] {
        Tag::Unknown { code, name, raw } => {
            assert_eq!(*code, 63);
            assert!(name.is_none());
            assert_eq!(raw, &[0xde, 0xad]);
        }
        other => panic!("expected Unknown, got {:?}", other),
    }
}

#[test]
fn unknown_alert_option_turns_an_unrecognized_tag_into_an_error() {
    let tag_stream = tag_bytes(63, &[0xde, 0xad]);
    let bytes = uncompressed_movie(&tag_stream);

    let options = DecoderOptions { unknown_alert: true };
    assert!(decode(&bytes, options).is_err());
}
