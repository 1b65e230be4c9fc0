//! # Binary Encoding
//!
//! Byte layout of a serialized store, in order:
//!
//! 1. Format version (uvarint), currently [`VERSION`]
//! 2. Source files: count, then per file the path and contents as
//!    length-prefixed bytes
//! 3. Line program: byte length, then the raw opcode stream
//! 4. Types: count, then per entry `tag` (uvarint) and `extra` (svarint)
//! 5. Scopes: count, then per scope `tag`, `flags`, `parent` (svarint, -1 for
//!    the root); `inheritance` (svarint) for classes only; import count and
//!    indices; `start_pc` and `end_pc` for functions and blocks only; `name` and
//!    `type_id` for everything except blocks
//! 6. Symbols: count, then per symbol `scope` (svarint), `offset` (svarint),
//!    `type_id`, `flags`, `storage`, `declaration_line`, `name`
//!
//! Decoding is all-or-nothing: any short read, unknown tag, or failed
//! validation returns an error and no store.

use tracing::{debug, warn};

use super::model::{
    DebugScope, DebugSymbol, DebugType, ScopeFlags, ScopeId, ScopeTag, SourceFile, SymbolFlags, SymbolStorage, TypeId,
};
use super::{validate, DebugData, VERSION};
use crate::config::IndexConfig;
use crate::error::{malformed, ZdbError, ZdbResult};
use crate::types::Pc;
use crate::varint::{write_len, write_signed, write_string, write_unsigned, ByteReader};

impl DebugData
{
    /// Decode a serialized store with the default [`IndexConfig`].
    ///
    /// ## Errors
    ///
    /// - `Truncated` if the buffer ends before a field is complete
    /// - `UnsupportedVersion` if the header version is not [`VERSION`]
    /// - `Malformed` for unknown tags or broken cross references
    ///
    /// ## Example
    ///
    /// ```rust
    /// use zdb_core::{DebugData, ZdbError};
    ///
    /// assert!(matches!(DebugData::decode(&[]), Err(ZdbError::Truncated { .. })));
    /// assert!(matches!(DebugData::decode(&[2]), Err(ZdbError::UnsupportedVersion { found: 2, .. })));
    /// ```
    pub fn decode(bytes: &[u8]) -> ZdbResult<Self>
    {
        Self::decode_with_config(bytes, IndexConfig::default())
    }

    /// Decode a serialized store, tuning its lazy indices with `config`.
    ///
    /// ## Errors
    ///
    /// Same as [`DebugData::decode`], plus `InvalidConfig` if `config` is rejected.
    pub fn decode_with_config(bytes: &[u8], config: IndexConfig) -> ZdbResult<Self>
    {
        config.validate()?;
        let mut reader = ByteReader::new(bytes);

        let version = reader.read_unsigned()?;
        if version != VERSION {
            return Err(ZdbError::UnsupportedVersion {
                found: version,
                expected: VERSION,
            });
        }

        let source_files = read_source_files(&mut reader)?;
        let line_program_len = reader.read_len()?;
        let line_program = reader.read_bytes(line_program_len)?.to_vec();
        let types = read_types(&mut reader)?;
        let scopes = read_scopes(&mut reader)?;
        let symbols = read_symbols(&mut reader)?;

        if !reader.is_at_end() {
            warn!(
                trailing = reader.remaining(),
                "ignoring trailing bytes after the symbol table"
            );
        }

        validate::validate(&types, &scopes, &symbols)?;

        debug!(
            files = source_files.len(),
            line_program_bytes = line_program.len(),
            types = types.len(),
            scopes = scopes.len(),
            symbols = symbols.len(),
            "decoded debug data"
        );

        Ok(Self::from_parts(source_files, line_program, types, scopes, symbols, config))
    }

    /// Serialize the store.
    ///
    /// `DebugData::decode(&data.encode())` always yields a store equal to `data`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8>
    {
        let mut buf = Vec::with_capacity(self.line_program.len() + 64);
        write_unsigned(&mut buf, VERSION);

        write_len(&mut buf, self.source_files.len());
        for file in &self.source_files {
            write_string(&mut buf, &file.path);
            write_string(&mut buf, &file.contents);
        }

        write_len(&mut buf, self.line_program.len());
        buf.extend_from_slice(&self.line_program);

        write_len(&mut buf, self.types.len());
        for ty in &self.types {
            write_unsigned(&mut buf, ty.tag());
            write_signed(&mut buf, ty.extra());
        }

        write_len(&mut buf, self.scopes.len());
        for scope in &self.scopes {
            encode_scope(&mut buf, scope);
        }

        write_len(&mut buf, self.symbols.len());
        for symbol in &self.symbols {
            write_signed(&mut buf, index_to_wire(symbol.scope));
            write_signed(&mut buf, symbol.offset);
            write_unsigned(&mut buf, symbol.type_id.0);
            write_unsigned(&mut buf, symbol.flags.bits());
            write_unsigned(&mut buf, symbol.storage.wire());
            write_unsigned(&mut buf, symbol.declaration_line);
            write_string(&mut buf, &symbol.name);
        }

        buf
    }
}

fn encode_scope(buf: &mut Vec<u8>, scope: &DebugScope)
{
    write_unsigned(buf, scope.tag.wire());
    write_unsigned(buf, scope.flags.bits());
    write_signed(buf, scope.parent.map_or(-1, index_to_wire));

    if scope.tag == ScopeTag::Class {
        write_signed(buf, scope.inheritance.map_or(-1, index_to_wire));
    }

    write_len(buf, scope.imports.len());
    for import in &scope.imports {
        write_unsigned(buf, import.0);
    }

    if scope.tag.has_code_range() {
        write_unsigned(buf, scope.start_pc.value());
        write_unsigned(buf, scope.end_pc.value());
    }

    if scope.tag != ScopeTag::Block {
        write_string(buf, &scope.name);
        write_unsigned(buf, scope.type_id.0);
    }
}

fn index_to_wire(id: ScopeId) -> i32
{
    // Scope tables larger than i32::MAX cannot be produced by the decoder.
    i32::try_from(id.0).unwrap_or(i32::MAX)
}

/// Read a signed scope reference where -1 means "none".
fn read_optional_scope(reader: &mut ByteReader<'_>, what: &str) -> ZdbResult<Option<ScopeId>>
{
    match reader.read_signed()? {
        -1 => Ok(None),
        value => u32::try_from(value)
            .map(|index| Some(ScopeId(index)))
            .map_err(|_| malformed!("negative {what} index {value}")),
    }
}

/// Clamp a declared element count to what the remaining bytes could hold.
fn capacity_hint(reader: &ByteReader<'_>, count: usize) -> usize
{
    count.min(reader.remaining())
}

fn read_source_files(reader: &mut ByteReader<'_>) -> ZdbResult<Vec<SourceFile>>
{
    let count = reader.read_len()?;
    let mut files = Vec::with_capacity(capacity_hint(reader, count));
    for _ in 0..count {
        let path = reader.read_string()?;
        let contents = reader.read_string()?;
        files.push(SourceFile { path, contents });
    }
    Ok(files)
}

fn read_types(reader: &mut ByteReader<'_>) -> ZdbResult<Vec<DebugType>>
{
    let count = reader.read_len()?;
    let mut types = Vec::with_capacity(capacity_hint(reader, count));
    for _ in 0..count {
        let tag = reader.read_unsigned()?;
        let extra = reader.read_signed()?;
        types.push(DebugType::from_wire(tag, extra)?);
    }
    Ok(types)
}

fn read_scopes(reader: &mut ByteReader<'_>) -> ZdbResult<Vec<DebugScope>>
{
    let count = reader.read_len()?;
    let mut scopes = Vec::with_capacity(capacity_hint(reader, count));
    for _ in 0..count {
        let tag = ScopeTag::try_from(reader.read_unsigned()?)?;
        let flags = ScopeFlags::from_bits_retain(reader.read_unsigned()?);
        let parent = read_optional_scope(reader, "parent")?;
        let inheritance = if tag == ScopeTag::Class {
            read_optional_scope(reader, "inheritance")?
        } else {
            None
        };

        let import_count = reader.read_len()?;
        if import_count > reader.remaining() {
            return Err(ZdbError::Truncated {
                offset: reader.position(),
                needed: import_count,
            });
        }
        let mut imports = Vec::with_capacity(import_count);
        for _ in 0..import_count {
            imports.push(ScopeId(reader.read_unsigned()?));
        }

        let (start_pc, end_pc) = if tag.has_code_range() {
            (Pc::new(reader.read_unsigned()?), Pc::new(reader.read_unsigned()?))
        } else {
            (Pc::ZERO, Pc::ZERO)
        };

        let (name, type_id) = if tag == ScopeTag::Block {
            (String::new(), TypeId::VOID)
        } else {
            let name = reader.read_string()?;
            (name, TypeId(reader.read_unsigned()?))
        };

        scopes.push(DebugScope {
            tag,
            flags,
            parent,
            inheritance,
            imports,
            start_pc,
            end_pc,
            name,
            type_id,
        });
    }
    Ok(scopes)
}

fn read_symbols(reader: &mut ByteReader<'_>) -> ZdbResult<Vec<DebugSymbol>>
{
    let count = reader.read_len()?;
    let mut symbols = Vec::with_capacity(capacity_hint(reader, count));
    for _ in 0..count {
        let scope_index = reader.read_signed()?;
        let scope = u32::try_from(scope_index).map_err(|_| malformed!("symbol has negative scope index {scope_index}"))?;
        let offset = reader.read_signed()?;
        let type_id = TypeId(reader.read_unsigned()?);
        let flags = SymbolFlags::from_bits_retain(reader.read_unsigned()?);
        let storage = SymbolStorage::try_from(reader.read_unsigned()?)?;
        let declaration_line = reader.read_unsigned()?;
        let name = reader.read_string()?;
        symbols.push(DebugSymbol {
            scope: ScopeId(scope),
            offset,
            type_id,
            flags,
            storage,
            declaration_line,
            name,
        });
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_minimal_encoding_bytes()
    {
        let data = DebugData::from_parts(
            Vec::new(),
            Vec::new(),
            Vec::new(),
            vec![DebugScope::root()],
            Vec::new(),
            IndexConfig::default(),
        );
        // version, 0 files, 0 line bytes, 0 types, 1 scope {tag 1, flags 0, parent -1 (zigzag 1),
        // 0 imports, name "", type 0}, 0 symbols
        assert_eq!(data.encode(), vec![1, 0, 0, 0, 1, 1, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_import_count_checked_against_remaining()
    {
        // Root scope claiming 100 imports with 2 bytes left.
        let bytes = [1, 0, 0, 0, 1, 1, 0, 1, 100, 0, 0];
        assert!(matches!(DebugData::decode(&bytes), Err(ZdbError::Truncated { .. })));
    }
}
