//! Tests for pc to source line mapping

mod common;

use zdb_core::{DebugData, DebugDataBuilder, DebugScope, IndexConfig, Pc, ScopeId, ScopeTag, SourceLocation};

/// `simple(10), extended(15, +3), simple(1)`: rows at pc 0 (line 1), 10 (line 2), 25 (line 5).
fn three_rows(config: IndexConfig) -> DebugData
{
    let mut builder = DebugDataBuilder::with_config(config);
    builder.add_source_file("main.zs", "");
    builder.simple_step(10).extended_step(15, 3).simple_step(1);
    builder.build().unwrap()
}

#[test]
fn test_resolve_location_between_rows()
{
    let data = three_rows(IndexConfig::default());
    assert_eq!(data.resolve_location(Pc::new(0)), Some(SourceLocation::new(0, 1)));
    assert_eq!(data.resolve_location(Pc::new(5)), Some(SourceLocation::new(0, 1)));
    assert_eq!(data.resolve_location(Pc::new(12)), Some(SourceLocation::new(0, 2)));
    assert_eq!(data.resolve_location(Pc::new(25)), Some(SourceLocation::new(0, 5)));
    assert_eq!(data.resolve_location(Pc::new(999)), Some(SourceLocation::new(0, 5)));
}

#[test]
fn test_line_table_rows()
{
    let data = three_rows(IndexConfig::default());
    let rows: Vec<(u32, i32)> = data.line_table().iter().map(|row| (row.pc.value(), row.line)).collect();
    assert_eq!(rows, vec![(0, 1), (10, 2), (25, 5)]);
}

#[test]
fn test_empty_line_program()
{
    let mut builder = DebugDataBuilder::new();
    builder.add_source_file("main.zs", "");
    let data = builder.build().unwrap();

    assert!(data.line_table().is_empty());
    assert_eq!(data.resolve_location(Pc::new(0)), None);
    assert_eq!(data.resolve_location_source_file(Pc::new(0)), None);
}

#[test]
fn test_program_without_rows()
{
    let mut builder = DebugDataBuilder::new();
    builder.add_source_file("main.zs", "");
    // Zero-length steps move the line but never emit a row.
    builder.set_file(0).extended_step(0, 4).simple_step(0);
    let data = builder.build().unwrap();

    assert!(!data.line_program().is_empty());
    assert!(data.line_table().is_empty());
    assert_eq!(data.resolve_location(Pc::new(3)), None);
}

#[test]
fn test_prologue_end_emits_zero_length_row()
{
    let mut builder = DebugDataBuilder::new();
    builder.add_source_file("main.zs", "");
    builder.simple_step(6).prologue_end().extended_step(0, 2).simple_step(3);
    let data = builder.build().unwrap();

    let rows: Vec<(u32, i32, bool)> = data
        .line_table()
        .iter()
        .map(|row| (row.pc.value(), row.line, row.is_prologue_end))
        .collect();
    assert_eq!(rows, vec![(0, 1, false), (6, 2, true), (6, 4, false)]);
    assert_eq!(data.resolve_location(Pc::new(7)), Some(SourceLocation::new(0, 4)));
}

#[test]
fn test_incremental_matches_full_table_for_every_stride()
{
    let mut builder = DebugDataBuilder::new();
    builder.add_source_file("a.zs", "");
    builder.add_source_file("b.zs", "");
    for i in 0..200u32 {
        if i % 37 == 0 {
            builder.set_file(i / 37 % 2);
        }
        if i % 11 == 0 {
            builder.extended_step(i % 13 + 1, -2);
        } else {
            builder.simple_step(u8::try_from(i % 5).unwrap());
        }
    }
    let bytes = builder.build().unwrap().encode();

    for stride in [1, 3, 16, 100, 10_000] {
        let data = DebugData::decode_with_config(&bytes, IndexConfig::with_checkpoint_stride(stride).unwrap()).unwrap();
        let last = data.line_table().last().unwrap().pc.value();
        for pc in 0..=last + 5 {
            let expected = data
                .resolve_location_source_file(Pc::new(pc))
                .map(|(file, line)| (data.source_file_index(&file.path).unwrap(), line));
            let actual = data.resolve_location(Pc::new(pc)).map(|loc| (loc.file_index, loc.line));
            assert_eq!(actual, expected, "pc {pc} with stride {stride}");
        }
    }
}

#[test]
fn test_repeated_lookups_hit_same_answer()
{
    let data = three_rows(IndexConfig::with_checkpoint_stride(4).unwrap());
    // 1024 apart: same cache slot, different pcs.
    let near = data.resolve_location(Pc::new(12));
    let far = data.resolve_location(Pc::new(12 + 1024));
    assert_eq!(near, Some(SourceLocation::new(0, 2)));
    assert_eq!(far, Some(SourceLocation::new(0, 5)));
    assert_eq!(data.resolve_location(Pc::new(12)), near);
}

#[test]
fn test_breakpoint_pcs_pick_nearest_following_line()
{
    let game = common::game();
    let data = &game.data;

    assert_eq!(data.resolve_all_pcs_from_source_location(0, 2), vec![Pc::new(10)]);
    // Nothing on line 0; the closest line at or after it is line 1.
    assert_eq!(data.resolve_all_pcs_from_source_location(0, 0), vec![Pc::new(0)]);
    assert!(data.resolve_all_pcs_from_source_location(0, 99).is_empty());
    assert!(data.resolve_all_pcs_from_source_location(7, 1).is_empty());
}

#[test]
fn test_breakpoint_pcs_one_per_function()
{
    let mut builder = DebugDataBuilder::new();
    builder.add_source_file("tmpl.zs", "");
    let file = builder.add_scope(DebugScope::new(ScopeTag::File, ScopeId::ROOT).named("tmpl.zs"));
    let first = builder.add_scope(
        DebugScope::new(ScopeTag::Function, file)
            .named("id")
            .with_range(0, 10),
    );
    builder.add_scope(
        DebugScope::new(ScopeTag::Function, file)
            .named("id")
            .with_range(20, 30),
    );
    // Two instantiations of the same template body: lines 1..=2 twice, plus
    // a second row for line 2 inside the first copy.
    builder
        .simple_step(4)
        .extended_step(4, 0)
        .extended_step(12, -1)
        .simple_step(4)
        .simple_step(4);
    let data = builder.build().unwrap();

    assert_eq!(data.resolve_all_pcs_from_source_location(0, 2), vec![Pc::new(4), Pc::new(24)]);
    assert_eq!(data.resolve_function_scope(Pc::new(4)), Some(first));
}

#[test]
fn test_find_function_prologue_end()
{
    let game = common::game();
    // The prologue marker flags the row at pc 0.
    assert_eq!(game.data.find_function_prologue_end(game.run), Some(Pc::new(0)));
    // No marker inside `add`: falls back to its start.
    assert_eq!(game.data.find_function_prologue_end(game.add), Some(Pc::new(60)));
    // An id past the end of the scope table.
    let foreign = ScopeId(u32::try_from(game.data.scopes().len()).unwrap());
    assert_eq!(game.data.find_function_prologue_end(foreign), None);
}

#[test]
fn test_resolve_location_source_file()
{
    let game = common::game();
    let (file, line) = game.data.resolve_location_source_file(Pc::new(45)).unwrap();
    assert_eq!(file.path, "main.zs");
    assert_eq!(line, 4);
}
