//! In-memory stand-in for a paused VM.
//!
//! The CLI has no live program to inspect, so `eval` runs against this. Stack
//! slots, globals, and registers read as zero unless seeded from the command
//! line. Literal strings and variadic argument arrays are allocated into a
//! local arena so they can be printed. Objects do not exist and function
//! calls are refused.

use std::collections::HashMap;

use zdb_core::eval::{DebugValue, SandboxError, VmInterface};
use zdb_core::{DebugSymbol, Pc, TypeId};

#[derive(Debug, Clone)]
enum Allocation
{
    Text(String),
    Array(Vec<DebugValue>),
}

/// Where a seeded value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot
{
    Stack(i32),
    Global(i32),
    Register(i32),
}

#[derive(Debug)]
pub struct OfflineVm
{
    slots: HashMap<Slot, i32>,
    heap: Vec<Allocation>,
    string_type: TypeId,
    this_pointer: i32,
}

impl OfflineVm
{
    pub fn new() -> Self
    {
        Self {
            slots: HashMap::new(),
            heap: Vec::new(),
            string_type: TypeId::UNTYPED,
            this_pointer: 0,
        }
    }

    /// Type given to string literals; the `char32[]` entry of the loaded type table.
    pub fn with_string_type(mut self, string_type: TypeId) -> Self
    {
        self.string_type = string_type;
        self
    }

    pub fn seed(&mut self, slot: Slot, raw: i32)
    {
        self.slots.insert(slot, raw);
    }

    fn allocate(&mut self, allocation: Allocation) -> i32
    {
        self.heap.push(allocation);
        i32::try_from(self.heap.len()).unwrap_or(i32::MAX)
    }

    fn lookup(&self, handle: i32) -> Option<&Allocation>
    {
        let index = usize::try_from(handle).ok()?.checked_sub(1)?;
        self.heap.get(index)
    }

    fn lookup_mut(&mut self, handle: i32) -> Option<&mut Allocation>
    {
        let index = usize::try_from(handle).ok()?.checked_sub(1)?;
        self.heap.get_mut(index)
    }
}

impl Default for OfflineVm
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl VmInterface for OfflineVm
{
    fn read_stack(&mut self, offset: i32) -> i32
    {
        self.slots.get(&Slot::Stack(offset)).copied().unwrap_or(0)
    }

    fn read_global(&mut self, index: i32) -> i32
    {
        self.slots.get(&Slot::Global(index)).copied().unwrap_or(0)
    }

    fn read_register(&mut self, register: i32) -> i32
    {
        self.slots.get(&Slot::Register(register)).copied().unwrap_or(0)
    }

    fn read_object_member(&mut self, _object: DebugValue, _member: &DebugSymbol) -> Option<DebugValue>
    {
        None
    }

    fn read_array(&mut self, array: DebugValue) -> Option<Vec<DebugValue>>
    {
        match self.lookup(array.raw)? {
            Allocation::Array(elements) => Some(elements.clone()),
            Allocation::Text(_) => None,
        }
    }

    fn read_array_element(&mut self, array: DebugValue, index: i32) -> Option<DebugValue>
    {
        match self.lookup(array.raw)? {
            Allocation::Array(elements) => elements.get(usize::try_from(index).ok()?).copied(),
            Allocation::Text(_) => None,
        }
    }

    fn read_string(&mut self, handle: i32) -> Option<String>
    {
        match self.lookup(handle)? {
            Allocation::Text(text) => Some(text.clone()),
            Allocation::Array(_) => None,
        }
    }

    fn write_stack(&mut self, offset: i32, value: i32)
    {
        self.seed(Slot::Stack(offset), value);
    }

    fn write_global(&mut self, index: i32, value: i32)
    {
        self.seed(Slot::Global(index), value);
    }

    fn write_register(&mut self, register: i32, value: i32)
    {
        self.seed(Slot::Register(register), value);
    }

    fn write_object_member(&mut self, _object: DebugValue, _member: &DebugSymbol, _value: DebugValue) -> bool
    {
        false
    }

    fn write_array_element(&mut self, array: DebugValue, index: i32, value: DebugValue) -> bool
    {
        let Ok(index) = usize::try_from(index) else {
            return false;
        };
        match self.lookup_mut(array.raw) {
            Some(Allocation::Array(elements)) if index < elements.len() => {
                elements[index] = value;
                true
            }
            _ => false,
        }
    }

    fn decrease_object_reference(&mut self, _value: DebugValue, _symbol: &DebugSymbol) {}

    fn increase_object_reference(&mut self, _value: DebugValue, _symbol: &DebugSymbol) {}

    fn execute_sandboxed(&mut self, start_pc: Pc, _this_register: i32, _this_value: i32, _args: &[i32]) -> Result<i32, SandboxError>
    {
        Err(SandboxError::Failed(format!(
            "cannot call function at pc {start_pc}: no running program"
        )))
    }

    fn create_array(&mut self, values: Vec<i32>, array_type: TypeId) -> DebugValue
    {
        // Element types are not tracked per array; values print as raw words.
        let elements = values.into_iter().map(|raw| DebugValue::new(raw, TypeId::UNTYPED)).collect();
        let handle = self.allocate(Allocation::Array(elements));
        DebugValue::new(handle, array_type)
    }

    fn create_string(&mut self, text: &str) -> DebugValue
    {
        let handle = self.allocate(Allocation::Text(text.to_string()));
        DebugValue::new(handle, self.string_type)
    }

    fn get_this_pointer(&mut self) -> i32
    {
        self.this_pointer
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_seeded_slots_read_back()
    {
        let mut vm = OfflineVm::new();
        vm.seed(Slot::Stack(2), 50_000);
        assert_eq!(vm.read_stack(2), 50_000);
        assert_eq!(vm.read_stack(3), 0);
        assert_eq!(vm.read_global(2), 0);
    }

    #[test]
    fn test_strings_allocate_distinct_handles()
    {
        let mut vm = OfflineVm::new();
        let a = vm.create_string("a");
        let b = vm.create_string("b");
        assert_ne!(a.raw, b.raw);
        assert_eq!(vm.read_string(b.raw).as_deref(), Some("b"));
        assert_eq!(vm.read_string(0), None);
    }

    #[test]
    fn test_calls_are_refused()
    {
        let mut vm = OfflineVm::new();
        assert!(matches!(
            vm.execute_sandboxed(Pc::new(4), 0, 0, &[]),
            Err(SandboxError::Failed(_))
        ));
    }
}
