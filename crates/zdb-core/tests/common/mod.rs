//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;

use zdb_core::eval::{DebugValue, SandboxError, VmInterface};
use zdb_core::{
    DebugData, DebugDataBuilder, DebugScope, DebugSymbol, DebugType, Pc, ScopeId, ScopeTag, SymbolFlags, SymbolId,
    SymbolStorage, TypeId,
};

/// A small program with a namespace, a class hierarchy, enums, overloads, and
/// a function with a nested block.
///
/// ```text
/// main.zs (imports game)
///   void run()            [0, 50]   x, count, label, foe, MAX, flags, color, items, ally, champion
///     { }                 [10, 40]  x (shadows)
///   int add(int a, int b) [60, 80]
///   int f(int n)          [200, 210]
///   int f(int n, ...int[] rest) [210, 220]
///   int g(int v) / int g(long v)
/// game
///   lives (global 3)
///   class Enemy           hp, name, tags, target, armor
///     Enemy(int hp)       constructor
///     void heal(int amount)  this in register 7
///   class Boss : Enemy    rage
///     long enrage()       this on the stack
///   enum Color            RED, GREEN, BLUE
///   bitflags Flags        A, B, C
/// ```
pub struct Game
{
    pub data: DebugData,

    pub file: ScopeId,
    pub game: ScopeId,
    pub enemy: ScopeId,
    pub boss: ScopeId,
    pub ctor: ScopeId,
    pub heal: ScopeId,
    pub enrage: ScopeId,
    pub color: ScopeId,
    pub flags: ScopeId,
    pub run: ScopeId,
    pub block: ScopeId,
    pub add: ScopeId,
    pub f_fixed: ScopeId,
    pub f_vararg: ScopeId,
    pub g_int: ScopeId,
    pub g_long: ScopeId,

    pub t_string: TypeId,
    pub t_enemy: TypeId,
    pub t_boss: TypeId,
    pub t_ints: TypeId,
    pub t_const_int: TypeId,
    pub t_color: TypeId,
    pub t_flags: TypeId,

    pub lives: SymbolId,
    pub run_x: SymbolId,
    pub block_x: SymbolId,
    pub hp: SymbolId,
}

// Stack slots of `run`.
pub const X: i32 = 0;
pub const COUNT: i32 = 1;
pub const LABEL: i32 = 2;
pub const FOE: i32 = 3;
pub const FLAGS_VAR: i32 = 4;
pub const COLOR_VAR: i32 = 5;
pub const ITEMS: i32 = 6;
pub const BLOCK_X: i32 = 7;
pub const ALLY: i32 = 8;
pub const CHAMPION: i32 = 9;

/// Register `heal` binds `this` to.
pub const THIS_REGISTER: i32 = 7;

pub fn game() -> Game
{
    let mut b = DebugDataBuilder::new();
    b.add_source_file("main.zs", "void run()\n{\n  int x = 1;\n}\n");
    b.add_source_file("enemy.zs", "");

    let file = b.add_scope(DebugScope::new(ScopeTag::File, ScopeId::ROOT).named("main.zs"));
    let game = b.add_scope(DebugScope::new(ScopeTag::Namespace, ScopeId::ROOT).named("game"));
    b.scope_mut(file).unwrap().imports.push(game);

    let enemy = b.add_scope(DebugScope::new(ScopeTag::Class, game).named("Enemy"));
    let boss = b.add_scope(DebugScope::new(ScopeTag::Class, game).named("Boss").inherits(enemy));
    let color = b.add_scope(DebugScope::new(ScopeTag::Enum, game).named("Color").with_type(TypeId::INT));
    let flags = b.add_scope(DebugScope::new(ScopeTag::Enum, game).named("Flags").with_type(TypeId::LONG));

    let t_string = b.add_type(DebugType::Array(TypeId::CHAR32));
    let t_enemy = b.add_type(DebugType::Class(enemy));
    let t_boss = b.add_type(DebugType::Class(boss));
    let t_ints = b.add_type(DebugType::Array(TypeId::INT));
    let t_const_int = b.add_type(DebugType::Const(TypeId::INT));
    let t_color = b.add_type(DebugType::Enum(color));
    let t_flags = b.add_type(DebugType::Bitflags(flags));

    let ctor = b.add_scope(
        DebugScope::new(ScopeTag::Function, enemy)
            .named("Enemy")
            .with_type(t_enemy)
            .with_range(90, 99),
    );
    let heal = b.add_scope(DebugScope::new(ScopeTag::Function, enemy).named("heal").with_range(100, 120));
    let enrage = b.add_scope(
        DebugScope::new(ScopeTag::Function, boss)
            .named("enrage")
            .with_type(TypeId::LONG)
            .with_range(130, 140),
    );

    let run = b.add_scope(DebugScope::new(ScopeTag::Function, file).named("run").with_range(0, 50));
    let block = b.add_scope(DebugScope::new(ScopeTag::Block, run).with_range(10, 40));
    let add = b.add_scope(
        DebugScope::new(ScopeTag::Function, file)
            .named("add")
            .with_type(TypeId::INT)
            .with_range(60, 80),
    );
    let f_fixed = b.add_scope(
        DebugScope::new(ScopeTag::Function, file)
            .named("f")
            .with_type(TypeId::INT)
            .with_range(200, 210),
    );
    let f_vararg = b.add_scope(
        DebugScope::new(ScopeTag::Function, file)
            .named("f")
            .with_type(TypeId::INT)
            .with_range(210, 220),
    );
    let g_int = b.add_scope(
        DebugScope::new(ScopeTag::Function, file)
            .named("g")
            .with_type(TypeId::INT)
            .with_range(230, 240),
    );
    let g_long = b.add_scope(
        DebugScope::new(ScopeTag::Function, file)
            .named("g")
            .with_type(TypeId::INT)
            .with_range(240, 250),
    );

    let lives = b.add_symbol(DebugSymbol::new(game, "lives", TypeId::INT, SymbolStorage::Global, 3));

    let hp = b.add_symbol(DebugSymbol::new(enemy, "hp", TypeId::INT, SymbolStorage::Class, 0).declared_at(2));
    b.add_symbol(DebugSymbol::new(enemy, "name", t_string, SymbolStorage::Class, 1));
    b.add_symbol(DebugSymbol::new(enemy, "tags", t_ints, SymbolStorage::Class, 2));
    b.add_symbol(DebugSymbol::new(enemy, "target", t_enemy, SymbolStorage::Class, 3));
    b.add_symbol(DebugSymbol::new(enemy, "armor", t_const_int, SymbolStorage::Class, 4));
    b.add_symbol(DebugSymbol::new(boss, "rage", TypeId::INT, SymbolStorage::Class, 5));

    b.add_symbol(DebugSymbol::new(ctor, "hp", TypeId::INT, SymbolStorage::Stack, 0));
    b.add_symbol(
        DebugSymbol::new(heal, "this", t_enemy, SymbolStorage::Register, THIS_REGISTER).with_flags(SymbolFlags::HIDDEN),
    );
    b.add_symbol(DebugSymbol::new(heal, "amount", TypeId::INT, SymbolStorage::Stack, 0));
    b.add_symbol(DebugSymbol::new(enrage, "this", t_boss, SymbolStorage::Stack, 0).with_flags(SymbolFlags::HIDDEN));

    for (name, value) in [("RED", 0), ("GREEN", 10_000), ("BLUE", 20_000)] {
        b.add_symbol(DebugSymbol::new(color, name, t_color, SymbolStorage::Constant, value));
    }
    for (name, value) in [("A", 1), ("B", 2), ("C", 4)] {
        b.add_symbol(DebugSymbol::new(flags, name, t_flags, SymbolStorage::Constant, value));
    }

    let run_x = b.add_symbol(DebugSymbol::new(run, "x", TypeId::INT, SymbolStorage::Stack, X).declared_at(3));
    b.add_symbol(DebugSymbol::new(run, "count", TypeId::LONG, SymbolStorage::Stack, COUNT));
    b.add_symbol(DebugSymbol::new(run, "label", t_string, SymbolStorage::Stack, LABEL));
    b.add_symbol(DebugSymbol::new(run, "foe", t_enemy, SymbolStorage::Stack, FOE));
    b.add_symbol(DebugSymbol::new(run, "MAX", t_const_int, SymbolStorage::Constant, 50_000));
    b.add_symbol(DebugSymbol::new(run, "flags", t_flags, SymbolStorage::Stack, FLAGS_VAR));
    b.add_symbol(DebugSymbol::new(run, "color", t_color, SymbolStorage::Stack, COLOR_VAR));
    b.add_symbol(DebugSymbol::new(run, "items", t_ints, SymbolStorage::Stack, ITEMS));
    b.add_symbol(DebugSymbol::new(run, "ally", t_enemy, SymbolStorage::Stack, ALLY));
    b.add_symbol(DebugSymbol::new(run, "champion", t_boss, SymbolStorage::Stack, CHAMPION));
    let block_x = b.add_symbol(DebugSymbol::new(block, "x", TypeId::INT, SymbolStorage::Stack, BLOCK_X));

    b.add_symbol(DebugSymbol::new(add, "a", TypeId::INT, SymbolStorage::Stack, 0));
    b.add_symbol(DebugSymbol::new(add, "b", TypeId::INT, SymbolStorage::Stack, 1));
    b.add_symbol(DebugSymbol::new(f_fixed, "n", TypeId::INT, SymbolStorage::Stack, 0));
    b.add_symbol(DebugSymbol::new(f_vararg, "n", TypeId::INT, SymbolStorage::Stack, 0));
    b.add_symbol(DebugSymbol::new(f_vararg, "rest", t_ints, SymbolStorage::Stack, 1).with_flags(SymbolFlags::VARARGS));
    b.add_symbol(DebugSymbol::new(g_int, "v", TypeId::INT, SymbolStorage::Stack, 0));
    b.add_symbol(DebugSymbol::new(g_long, "v", TypeId::LONG, SymbolStorage::Stack, 0));

    // main.zs: lines 1 to 4 over pcs 0..50
    b.set_file(0).prologue_end().simple_step(10).simple_step(10).simple_step(20).simple_step(10);

    Game {
        data: b.build().expect("fixture must validate"),
        file,
        game,
        enemy,
        boss,
        ctor,
        heal,
        enrage,
        color,
        flags,
        run,
        block,
        add,
        f_fixed,
        f_vararg,
        g_int,
        g_long,
        t_string,
        t_enemy,
        t_boss,
        t_ints,
        t_const_int,
        t_color,
        t_flags,
        lives,
        run_x,
        block_x,
        hp,
    }
}

/// One sandboxed call as the VM saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call
{
    pub start_pc: Pc,
    pub this_register: i32,
    pub this_value: i32,
    pub args: Vec<i32>,
}

/// In-memory VM that records every side effect in order.
#[derive(Debug)]
pub struct MockVm
{
    pub stack: HashMap<i32, i32>,
    pub globals: HashMap<i32, i32>,
    pub registers: HashMap<i32, i32>,
    /// Object handle to (field offset to raw value).
    pub objects: HashMap<i32, HashMap<i32, i32>>,
    pub arrays: HashMap<i32, Vec<DebugValue>>,
    pub strings: HashMap<i32, String>,
    pub this_pointer: i32,
    pub string_type: TypeId,
    pub call_result: Result<i32, SandboxError>,
    /// Refuse every object-member write.
    pub reject_writes: bool,

    pub events: Vec<String>,
    pub calls: Vec<Call>,
    pub created_arrays: Vec<(Vec<i32>, TypeId)>,
    next_handle: i32,
}

impl MockVm
{
    pub fn new() -> Self
    {
        Self {
            stack: HashMap::new(),
            globals: HashMap::new(),
            registers: HashMap::new(),
            objects: HashMap::new(),
            arrays: HashMap::new(),
            strings: HashMap::new(),
            this_pointer: 0,
            string_type: TypeId::UNTYPED,
            call_result: Ok(0),
            reject_writes: false,
            events: Vec::new(),
            calls: Vec::new(),
            created_arrays: Vec::new(),
            next_handle: 9000,
        }
    }

    /// Mock wired to the fixture's string type.
    pub fn for_game(game: &Game) -> Self
    {
        Self {
            string_type: game.t_string,
            ..Self::new()
        }
    }

    pub fn object(&mut self, handle: i32, fields: &[(i32, i32)])
    {
        self.objects.insert(handle, fields.iter().copied().collect());
    }

    fn alloc(&mut self) -> i32
    {
        self.next_handle += 1;
        self.next_handle
    }
}

impl VmInterface for MockVm
{
    fn read_stack(&mut self, offset: i32) -> i32
    {
        self.stack.get(&offset).copied().unwrap_or(0)
    }

    fn read_global(&mut self, index: i32) -> i32
    {
        self.globals.get(&index).copied().unwrap_or(0)
    }

    fn read_register(&mut self, register: i32) -> i32
    {
        self.registers.get(&register).copied().unwrap_or(0)
    }

    fn read_object_member(&mut self, object: DebugValue, member: &DebugSymbol) -> Option<DebugValue>
    {
        let fields = self.objects.get(&object.raw)?;
        let raw = fields.get(&member.offset).copied().unwrap_or(0);
        Some(DebugValue::new(raw, member.type_id))
    }

    fn read_array(&mut self, array: DebugValue) -> Option<Vec<DebugValue>>
    {
        self.arrays.get(&array.raw).cloned()
    }

    fn read_array_element(&mut self, array: DebugValue, index: i32) -> Option<DebugValue>
    {
        let elements = self.arrays.get(&array.raw)?;
        elements.get(usize::try_from(index).ok()?).copied()
    }

    fn read_string(&mut self, handle: i32) -> Option<String>
    {
        self.strings.get(&handle).cloned()
    }

    fn write_stack(&mut self, offset: i32, value: i32)
    {
        self.events.push(format!("write stack {offset} = {value}"));
        self.stack.insert(offset, value);
    }

    fn write_global(&mut self, index: i32, value: i32)
    {
        self.events.push(format!("write global {index} = {value}"));
        self.globals.insert(index, value);
    }

    fn write_register(&mut self, register: i32, value: i32)
    {
        self.events.push(format!("write register {register} = {value}"));
        self.registers.insert(register, value);
    }

    fn write_object_member(&mut self, object: DebugValue, member: &DebugSymbol, value: DebugValue) -> bool
    {
        if self.reject_writes {
            return false;
        }
        let Some(fields) = self.objects.get_mut(&object.raw) else {
            return false;
        };
        fields.insert(member.offset, value.raw);
        self.events
            .push(format!("write {}.{} = {}", object.raw, member.name, value.raw));
        true
    }

    fn write_array_element(&mut self, array: DebugValue, index: i32, value: DebugValue) -> bool
    {
        let Some(slot) = self
            .arrays
            .get_mut(&array.raw)
            .and_then(|elements| elements.get_mut(usize::try_from(index).ok()?))
        else {
            return false;
        };
        slot.raw = value.raw;
        self.events.push(format!("write {}[{index}] = {}", array.raw, value.raw));
        true
    }

    fn decrease_object_reference(&mut self, value: DebugValue, _symbol: &DebugSymbol)
    {
        self.events.push(format!("release {}", value.raw));
    }

    fn increase_object_reference(&mut self, value: DebugValue, _symbol: &DebugSymbol)
    {
        self.events.push(format!("retain {}", value.raw));
    }

    fn execute_sandboxed(&mut self, start_pc: Pc, this_register: i32, this_value: i32, args: &[i32]) -> Result<i32, SandboxError>
    {
        self.calls.push(Call {
            start_pc,
            this_register,
            this_value,
            args: args.to_vec(),
        });
        self.call_result.clone()
    }

    fn create_array(&mut self, values: Vec<i32>, array_type: TypeId) -> DebugValue
    {
        let handle = self.alloc();
        let elements = values.iter().map(|raw| DebugValue::new(*raw, TypeId::INT)).collect();
        self.arrays.insert(handle, elements);
        self.created_arrays.push((values, array_type));
        DebugValue::new(handle, array_type)
    }

    fn create_string(&mut self, text: &str) -> DebugValue
    {
        let handle = self.alloc();
        self.strings.insert(handle, text.to_string());
        DebugValue::new(handle, self.string_type)
    }

    fn get_this_pointer(&mut self) -> i32
    {
        self.this_pointer
    }
}
