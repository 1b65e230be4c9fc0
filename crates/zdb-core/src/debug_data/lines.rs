//! # Line Program
//!
//! The line program is a byte-coded stream that maps program counters to
//! source lines. Decoding keeps a `(pc, line, file)` state and emits a row
//! whenever a step advances the pc or a prologue-end marker is pending.
//!
//! | Byte        | Operation                                            |
//! |-------------|------------------------------------------------------|
//! | `0x00-0xEF` | simple step: `pc += byte`, `line += 1`               |
//! | `0xF0`      | set file: uvarint file index                         |
//! | `0xF1`      | extended step: uvarint `d_pc`, svarint `d_line`      |
//! | `0xF2`      | prologue end: flags the next emitted row             |
//!
//! Two lookup strategies share that decoder:
//!
//! - [`DebugData::line_table`] materializes every row once, for batch and
//!   reverse queries.
//! - [`DebugData::resolve_location`] replays only the slice of the stream after
//!   the nearest checkpoint, and memoizes results in a 1024-slot direct-mapped
//!   cache. This is the per-instruction path used while stepping.
//!
//! Both strategies return the same answer for every pc.

use tracing::{trace, warn};

use super::model::{ScopeId, SourceFile};
use super::DebugData;
use crate::error::{malformed, ZdbResult};
use crate::types::{Pc, SourceLocation};
use crate::varint::{write_signed, write_unsigned, ByteReader};

/// Largest byte value that encodes a simple step.
pub const OP_SIMPLE_STEP_MAX: u8 = 0xEF;
pub const OP_SET_FILE: u8 = 0xF0;
pub const OP_EXTENDED_STEP: u8 = 0xF1;
pub const OP_PROLOGUE_END: u8 = 0xF2;

/// Number of slots in the `resolve_location` cache. Must be a power of two.
const LOCATION_CACHE_SLOTS: usize = 1024;

/// One row of the materialized line table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugLine
{
    pub pc: Pc,
    pub file_index: u32,
    pub line: i32,
    /// First instruction after the function prologue.
    pub is_prologue_end: bool,
}

impl DebugLine
{
    #[must_use]
    pub fn location(&self) -> SourceLocation
    {
        SourceLocation::new(self.file_index, self.line)
    }
}

/// Appends line-program operations to a byte buffer.
///
/// This is the compiler-side counterpart of the decoder; the
/// [`DebugDataBuilder`](super::DebugDataBuilder) uses it for its line ops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineProgramWriter
{
    bytes: Vec<u8>,
}

impl LineProgramWriter
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Switch subsequent rows to source file `file_index`.
    pub fn append_set_file(&mut self, file_index: u32) -> &mut Self
    {
        self.bytes.push(OP_SET_FILE);
        write_unsigned(&mut self.bytes, file_index);
        self
    }

    /// Advance by `d_pc` instructions and one line.
    ///
    /// `d_pc` must not exceed [`OP_SIMPLE_STEP_MAX`]; larger values are written
    /// as an extended step instead.
    pub fn append_simple_step(&mut self, d_pc: u8) -> &mut Self
    {
        if d_pc > OP_SIMPLE_STEP_MAX {
            return self.append_extended_step(u32::from(d_pc), 1);
        }
        self.bytes.push(d_pc);
        self
    }

    /// Advance by arbitrary pc and line deltas.
    pub fn append_extended_step(&mut self, d_pc: u32, d_line: i32) -> &mut Self
    {
        self.bytes.push(OP_EXTENDED_STEP);
        write_unsigned(&mut self.bytes, d_pc);
        write_signed(&mut self.bytes, d_line);
        self
    }

    /// Flag the next emitted row as the end of a function prologue.
    pub fn append_prologue_end(&mut self) -> &mut Self
    {
        self.bytes.push(OP_PROLOGUE_END);
        self
    }

    /// Pick the shortest encoding for a `(d_pc, d_line)` step.
    pub fn append_step(&mut self, d_pc: u32, d_line: i32) -> &mut Self
    {
        match u8::try_from(d_pc) {
            Ok(small) if d_line == 1 && small <= OP_SIMPLE_STEP_MAX => self.append_simple_step(small),
            _ => self.append_extended_step(d_pc, d_line),
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8]
    {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8>
    {
        self.bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOp
{
    SetFile(u32),
    Step
    {
        d_pc: u32, d_line: i32
    },
    PrologueEnd,
}

fn read_op(reader: &mut ByteReader<'_>) -> ZdbResult<LineOp>
{
    let offset = reader.position();
    match reader.read_u8()? {
        OP_SET_FILE => Ok(LineOp::SetFile(reader.read_unsigned()?)),
        OP_EXTENDED_STEP => {
            let d_pc = reader.read_unsigned()?;
            let d_line = reader.read_signed()?;
            Ok(LineOp::Step { d_pc, d_line })
        }
        OP_PROLOGUE_END => Ok(LineOp::PrologueEnd),
        byte if byte <= OP_SIMPLE_STEP_MAX => Ok(LineOp::Step {
            d_pc: u32::from(byte),
            d_line: 1,
        }),
        byte => Err(malformed!("unknown line program opcode {byte:#04x} at offset {offset}")),
    }
}

/// Decoder state between two operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineState
{
    pc: u32,
    line: i32,
    file: u32,
    prologue_pending: bool,
}

impl LineState
{
    const INITIAL: Self = Self {
        pc: 0,
        line: 1,
        file: 0,
        prologue_pending: false,
    };

    /// Apply one operation, returning the row it emits, if any.
    fn apply(&mut self, op: LineOp) -> Option<DebugLine>
    {
        match op {
            LineOp::SetFile(file) => {
                self.file = file;
                None
            }
            LineOp::PrologueEnd => {
                self.prologue_pending = true;
                None
            }
            LineOp::Step { d_pc, d_line } => {
                let row = (d_pc > 0 || self.prologue_pending).then_some(DebugLine {
                    pc: Pc::new(self.pc),
                    file_index: self.file,
                    line: self.line,
                    is_prologue_end: self.prologue_pending,
                });
                if row.is_some() {
                    self.prologue_pending = false;
                }
                self.pc = self.pc.wrapping_add(d_pc);
                self.line = self.line.wrapping_add(d_line);
                row
            }
        }
    }
}

/// Saved decoder position for resuming a scan part way through the stream.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint
{
    /// Byte offset of the next operation.
    cursor: usize,
    state: LineState,
    /// Last row emitted before `cursor`.
    last_row: Option<DebugLine>,
}

#[derive(Debug, Clone, Copy)]
struct CacheSlot
{
    pc: Pc,
    location: Option<SourceLocation>,
}

/// Direct-mapped memo of `resolve_location` results keyed by `pc & (SLOTS - 1)`.
#[derive(Debug)]
pub(crate) struct LocationCache
{
    slots: Vec<Option<CacheSlot>>,
}

impl LocationCache
{
    pub(crate) fn new() -> Self
    {
        Self {
            slots: vec![None; LOCATION_CACHE_SLOTS],
        }
    }

    fn slot(pc: Pc) -> usize
    {
        pc.value() as usize & (LOCATION_CACHE_SLOTS - 1)
    }

    fn get(&self, pc: Pc) -> Option<Option<SourceLocation>>
    {
        self.slots[Self::slot(pc)]
            .filter(|slot| slot.pc == pc)
            .map(|slot| slot.location)
    }

    fn insert(&mut self, pc: Pc, location: Option<SourceLocation>)
    {
        self.slots[Self::slot(pc)] = Some(CacheSlot { pc, location });
    }
}

impl DebugData
{
    /// Every row of the line program in ascending pc order.
    ///
    /// Decoded on first call and cached. A corrupt stream is decoded up to the
    /// first bad operation.
    pub fn line_table(&self) -> &[DebugLine]
    {
        self.line_table.get_or_init(|| {
            let mut rows = Vec::with_capacity(self.line_program.len() / 2);
            let mut reader = ByteReader::new(&self.line_program);
            let mut state = LineState::INITIAL;
            while !reader.is_at_end() {
                let op = match read_op(&mut reader) {
                    Ok(op) => op,
                    Err(err) => {
                        warn!(error = %err, "line program truncated while building line table");
                        break;
                    }
                };
                if let Some(row) = state.apply(op) {
                    rows.push(row);
                }
            }
            trace!(rows = rows.len(), "built line table");
            rows
        })
    }

    pub(crate) fn checkpoints(&self) -> &[Checkpoint]
    {
        self.checkpoints.get_or_init(|| {
            let stride = u64::from(self.config.checkpoint_stride.max(1));
            let mut checkpoints = vec![Checkpoint {
                cursor: 0,
                state: LineState::INITIAL,
                last_row: None,
            }];
            let mut next_checkpoint_pc = stride;

            let mut reader = ByteReader::new(&self.line_program);
            let mut state = LineState::INITIAL;
            let mut last_row = None;
            while !reader.is_at_end() {
                if u64::from(state.pc) >= next_checkpoint_pc {
                    checkpoints.push(Checkpoint {
                        cursor: reader.position(),
                        state,
                        last_row,
                    });
                    next_checkpoint_pc = (u64::from(state.pc) / stride + 1) * stride;
                }

                let Ok(op) = read_op(&mut reader) else {
                    warn!(offset = reader.position(), "line program truncated while building checkpoints");
                    break;
                };
                if let Some(row) = state.apply(op) {
                    last_row = Some(row);
                }
            }
            trace!(checkpoints = checkpoints.len(), stride, "built line program checkpoints");
            checkpoints
        })
    }

    /// Source location covering `pc`, via the checkpointed incremental scan.
    ///
    /// Returns the row with the greatest pc not above `pc`, so a pc past the end
    /// of the program maps to the last row. Returns `None` for an empty line
    /// program or a pc before the first row.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use zdb_core::{DebugDataBuilder, Pc};
    ///
    /// let mut builder = DebugDataBuilder::new();
    /// builder.add_source_file("main.zs", "");
    /// builder.simple_step(10).extended_step(15, 3).simple_step(1);
    /// let data = builder.build()?;
    ///
    /// assert_eq!(data.resolve_location(Pc::new(12)).map(|loc| loc.line), Some(2));
    /// assert_eq!(data.resolve_location(Pc::new(999)).map(|loc| loc.line), Some(5));
    /// # Ok::<(), zdb_core::ZdbError>(())
    /// ```
    pub fn resolve_location(&self, pc: Pc) -> Option<SourceLocation>
    {
        if self.line_program.is_empty() {
            return None;
        }

        if let Ok(cache) = self.location_cache.lock() {
            if let Some(cached) = cache.get(pc) {
                return cached;
            }
        }

        let location = self.scan_location(pc);

        // A poisoned cache only costs the memoization.
        if let Ok(mut cache) = self.location_cache.lock() {
            cache.insert(pc, location);
        }
        location
    }

    fn scan_location(&self, pc: Pc) -> Option<SourceLocation>
    {
        let checkpoints = self.checkpoints();
        let after = checkpoints.partition_point(|checkpoint| checkpoint.state.pc <= pc.value());
        let checkpoint = checkpoints[after.saturating_sub(1)];

        let mut reader = ByteReader::at(&self.line_program, checkpoint.cursor);
        let mut state = checkpoint.state;
        let mut best = checkpoint.last_row;

        while !reader.is_at_end() && state.pc <= pc.value() {
            let Ok(op) = read_op(&mut reader) else {
                warn!(pc = %pc, "line program truncated while resolving location");
                break;
            };
            if let Some(row) = state.apply(op) {
                if row.pc > pc {
                    break;
                }
                best = Some(row);
            }
        }

        best.map(|row| row.location())
    }

    /// Source file and line covering `pc`, via the materialized line table.
    ///
    /// Returns `None` if `pc` precedes the first row or the row names a file
    /// index outside the source file list.
    pub fn resolve_location_source_file(&self, pc: Pc) -> Option<(&SourceFile, i32)>
    {
        let table = self.line_table();
        let after = table.partition_point(|row| row.pc <= pc);
        let row = table.get(after.checked_sub(1)?)?;
        let file = self.source_files.get(row.file_index as usize)?;
        Some((file, row.line))
    }

    /// Every pc where a breakpoint on `file_index:line` should be placed.
    ///
    /// Considers rows of that file at or after `line` and keeps those with the
    /// smallest line distance. Rows are then de-duplicated by enclosing
    /// function scope, so a templated function contributes one pc per
    /// instantiation.
    pub fn resolve_all_pcs_from_source_location(&self, file_index: u32, line: i32) -> Vec<Pc>
    {
        if file_index as usize >= self.source_files.len() {
            return Vec::new();
        }

        let mut best_delta = i64::MAX;
        let mut candidates = Vec::new();
        for row in self.line_table() {
            if row.file_index != file_index || row.line < line {
                continue;
            }
            let delta = i64::from(row.line) - i64::from(line);
            if delta < best_delta {
                best_delta = delta;
                candidates.clear();
                candidates.push(row.pc);
            } else if delta == best_delta {
                candidates.push(row.pc);
            }
        }

        let mut seen_functions: Vec<Option<ScopeId>> = Vec::new();
        candidates
            .into_iter()
            .filter(|pc| {
                let function = self.resolve_function_scope(*pc);
                if seen_functions.contains(&function) {
                    false
                } else {
                    seen_functions.push(function);
                    true
                }
            })
            .collect()
    }

    /// First prologue-end row inside `function`'s range, or its start pc.
    ///
    /// `None` if `function` is not a scope of this store.
    #[must_use]
    pub fn find_function_prologue_end(&self, function: ScopeId) -> Option<Pc>
    {
        let scope = self.get_scope(function)?;
        let table = self.line_table();
        let start = table.partition_point(|row| row.pc < scope.start_pc);
        let body = table[start..]
            .iter()
            .take_while(|row| row.pc < scope.end_pc)
            .find(|row| row.is_prologue_end)
            .map_or(scope.start_pc, |row| row.pc);
        Some(body)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<DebugLine>
    {
        let mut reader = ByteReader::new(bytes);
        let mut state = LineState::INITIAL;
        let mut rows = Vec::new();
        while !reader.is_at_end() {
            if let Some(row) = state.apply(read_op(&mut reader).unwrap()) {
                rows.push(row);
            }
        }
        rows
    }

    #[test]
    fn test_writer_opcodes()
    {
        let mut writer = LineProgramWriter::new();
        writer
            .append_set_file(2)
            .append_simple_step(5)
            .append_prologue_end()
            .append_extended_step(300, -4);
        assert_eq!(writer.as_bytes(), &[0xF0, 2, 5, 0xF2, 0xF1, 0xAC, 0x02, 7]);
    }

    #[test]
    fn test_large_simple_step_becomes_extended()
    {
        let mut writer = LineProgramWriter::new();
        writer.append_simple_step(0xF5);
        assert_eq!(writer.as_bytes()[0], OP_EXTENDED_STEP);
    }

    #[test]
    fn test_zero_step_emits_no_row()
    {
        let mut writer = LineProgramWriter::new();
        writer.append_simple_step(0).append_simple_step(3);
        let rows = decode_all(writer.as_bytes());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 2);
    }

    #[test]
    fn test_prologue_marks_next_row()
    {
        let mut writer = LineProgramWriter::new();
        writer
            .append_simple_step(4)
            .append_prologue_end()
            .append_extended_step(0, 0)
            .append_simple_step(2);
        let rows = decode_all(writer.as_bytes());
        assert_eq!(rows.len(), 3);
        assert!(!rows[0].is_prologue_end);
        assert!(rows[1].is_prologue_end);
        assert_eq!(rows[1].pc, Pc::new(4));
        assert!(!rows[2].is_prologue_end);
        assert_eq!(rows[2].pc, Pc::new(4));
    }

    #[test]
    fn test_unknown_opcode_is_malformed()
    {
        let mut reader = ByteReader::new(&[0xF7]);
        assert!(read_op(&mut reader).is_err());
    }

    #[test]
    fn test_cache_slots_are_direct_mapped()
    {
        let mut cache = LocationCache::new();
        cache.insert(Pc::new(5), Some(SourceLocation::new(0, 9)));
        assert_eq!(cache.get(Pc::new(5)), Some(Some(SourceLocation::new(0, 9))));
        cache.insert(Pc::new(5 + 1024), None);
        assert_eq!(cache.get(Pc::new(5)), None);
        assert_eq!(cache.get(Pc::new(5 + 1024)), Some(None));
    }
}
