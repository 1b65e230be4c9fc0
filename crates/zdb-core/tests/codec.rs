//! Tests for the binary debug-info format

mod common;

use zdb_core::debug_data::VERSION;
use zdb_core::varint::{write_signed, write_string, write_unsigned};
use zdb_core::{DebugData, DebugDataBuilder, IndexConfig, Pc, ScopeTag, ZdbError};

#[test]
fn test_roundtrip_preserves_everything()
{
    let game = common::game();
    let bytes = game.data.encode();
    let decoded = DebugData::decode(&bytes).unwrap();

    assert_eq!(decoded, game.data);
    assert_eq!(decoded.source_files()[0].path, "main.zs");
    assert_eq!(decoded.get_scope(game.boss).unwrap().inheritance, Some(game.enemy));
    assert_eq!(decoded.get_scope(game.file).unwrap().imports, vec![game.game]);
    assert_eq!(decoded.line_table(), game.data.line_table());
    assert_eq!(decoded.encode(), bytes);
}

#[test]
fn test_empty_store_roundtrip()
{
    let data = DebugDataBuilder::new().build().unwrap();
    let decoded = DebugData::decode(&data.encode()).unwrap();

    assert_eq!(decoded.scopes().len(), 1);
    assert_eq!(decoded.scopes()[0].tag, ScopeTag::Root);
    assert!(decoded.source_files().is_empty());
    assert_eq!(decoded.resolve_location(Pc::new(0)), None);
}

#[test]
fn test_every_truncation_fails()
{
    let bytes = common::game().data.encode();
    for len in 0..bytes.len() {
        let result = DebugData::decode(&bytes[..len]);
        assert!(
            matches!(result, Err(ZdbError::Truncated { .. })),
            "prefix of {len} bytes decoded as {result:?}"
        );
    }
}

#[test]
fn test_unsupported_version()
{
    let mut bytes = common::game().data.encode();
    bytes[0] = 7;
    match DebugData::decode(&bytes) {
        Err(ZdbError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, 7);
            assert_eq!(expected, VERSION);
        }
        other => panic!("Expected UnsupportedVersion, got {other:?}"),
    }
}

/// Header with no files, no line program, and no types.
fn empty_prefix() -> Vec<u8>
{
    let mut buf = Vec::new();
    write_unsigned(&mut buf, VERSION);
    write_unsigned(&mut buf, 0);
    write_unsigned(&mut buf, 0);
    write_unsigned(&mut buf, 0);
    buf
}

#[test]
fn test_unknown_scope_tag_is_malformed()
{
    let mut buf = empty_prefix();
    write_unsigned(&mut buf, 1);
    write_unsigned(&mut buf, 0); // tag 0 is not a scope kind
    write_unsigned(&mut buf, 0);
    write_signed(&mut buf, -1);

    assert!(matches!(DebugData::decode(&buf), Err(ZdbError::Malformed(_))));
}

#[test]
fn test_out_of_range_parent_is_malformed()
{
    let mut buf = empty_prefix();
    write_unsigned(&mut buf, 2);
    // root
    write_unsigned(&mut buf, ScopeTag::Root.wire());
    write_unsigned(&mut buf, 0);
    write_signed(&mut buf, -1);
    write_unsigned(&mut buf, 0);
    write_string(&mut buf, "");
    write_unsigned(&mut buf, 0);
    // namespace whose parent does not exist
    write_unsigned(&mut buf, ScopeTag::Namespace.wire());
    write_unsigned(&mut buf, 0);
    write_signed(&mut buf, 9);
    write_unsigned(&mut buf, 0);
    write_string(&mut buf, "lost");
    write_unsigned(&mut buf, 0);
    // no symbols
    write_unsigned(&mut buf, 0);

    let err = DebugData::decode(&buf).unwrap_err();
    assert!(matches!(err, ZdbError::Malformed(_)));
    assert!(err.to_string().contains("parent"));
}

#[test]
fn test_decode_with_config()
{
    let bytes = common::game().data.encode();

    let data = DebugData::decode_with_config(&bytes, IndexConfig::with_checkpoint_stride(7).unwrap()).unwrap();
    assert_eq!(data.config().checkpoint_stride, 7);

    let zero = IndexConfig { checkpoint_stride: 0 };
    assert!(matches!(
        DebugData::decode_with_config(&bytes, zero),
        Err(ZdbError::InvalidConfig(_))
    ));
}
