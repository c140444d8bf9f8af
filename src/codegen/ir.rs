//! Marshaling IR
//!
//! A flat, SSA-style listing of the instructions that move host argument
//! values into their native layout. Every value-producing instruction gets a
//! fresh [`ValueId`]; stores and bindings produce nothing.

use crate::types::{TypeContext, TypeId};
use std::fmt::{self, Write};

/// Value identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Local variable identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local{}", self.0)
    }
}

/// Marshaling operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalOp {
    // === Places ===
    /// Value of a kernel argument slot
    Arg(u32),
    /// Address of a kernel argument slot
    ArgAddress(u32),
    Local(LocalId),
    LocalAddress(LocalId),
    /// Address of field `n` of the structure at the given address
    FieldAddress(ValueId, u32),

    // === Memory ===
    Load(ValueId),
    Store(ValueId, ValueId), // ptr, value

    // === Views ===
    ViewBase(ValueId),
    ViewLength(ValueId),
    ViewStride(ValueId),

    // === Launch ===
    /// Number of threads the kernel is launched with
    KernelLength,
    /// Bind the value behind an address to a native kernel argument slot
    BindArgument(u32, ValueId),
    /// Bind a device buffer address to a native kernel argument slot
    BindBuffer(u32, ValueId),
    /// Hand a packed argument buffer of `size` bytes to the launcher
    SubmitBuffer(ValueId, u32),
}

impl MarshalOp {
    /// Check whether the instruction defines a value
    pub fn has_result(&self) -> bool {
        !matches!(
            self,
            MarshalOp::Store(..)
                | MarshalOp::BindArgument(..)
                | MarshalOp::BindBuffer(..)
                | MarshalOp::SubmitBuffer(..)
        )
    }
}

impl fmt::Display for MarshalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalOp::Arg(slot) => write!(f, "ldarg {}", slot),
            MarshalOp::ArgAddress(slot) => write!(f, "ldarga {}", slot),
            MarshalOp::Local(local) => write!(f, "ldloc {}", local),
            MarshalOp::LocalAddress(local) => write!(f, "ldloca {}", local),
            MarshalOp::FieldAddress(base, field) => write!(f, "ldflda {}, {}", base, field),
            MarshalOp::Load(ptr) => write!(f, "load {}", ptr),
            MarshalOp::Store(ptr, value) => write!(f, "store {}, {}", ptr, value),
            MarshalOp::ViewBase(view) => write!(f, "view.base {}", view),
            MarshalOp::ViewLength(view) => write!(f, "view.length {}", view),
            MarshalOp::ViewStride(view) => write!(f, "view.stride {}", view),
            MarshalOp::KernelLength => write!(f, "kernel.length"),
            MarshalOp::BindArgument(slot, ptr) => write!(f, "bind.arg {}, {}", slot, ptr),
            MarshalOp::BindBuffer(slot, ptr) => write!(f, "bind.buffer {}, {}", slot, ptr),
            MarshalOp::SubmitBuffer(ptr, size) => write!(f, "submit {}, {}", ptr, size),
        }
    }
}

/// A single emitted instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub result: Option<ValueId>,
    pub op: MarshalOp,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.result {
            Some(value) => write!(f, "{} = {}", value, self.op),
            None => write!(f, "{}", self.op),
        }
    }
}

/// Local variable declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDecl {
    pub id: LocalId,
    pub ty: TypeId,
}

/// Emission context for one marshaling pass
///
/// Not thread-safe: one pass owns the emitter exclusively.
#[derive(Debug, Default)]
pub struct Emitter {
    instructions: Vec<Instruction>,
    locals: Vec<LocalDecl>,
    next_value_id: u32,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction, returning its result if it has one
    pub fn emit(&mut self, op: MarshalOp) -> Option<ValueId> {
        let result = op.has_result().then(|| self.fresh_value());
        self.push(result, op);
        result
    }

    fn emit_value(&mut self, op: MarshalOp) -> ValueId {
        debug_assert!(op.has_result());
        let id = self.fresh_value();
        self.push(Some(id), op);
        id
    }

    fn fresh_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value_id);
        self.next_value_id += 1;
        id
    }

    fn push(&mut self, result: Option<ValueId>, op: MarshalOp) {
        tracing::trace!(?result, %op, "emit");
        self.instructions.push(Instruction { result, op });
    }

    pub fn declare_local(&mut self, ty: TypeId) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalDecl { id, ty });
        id
    }

    // === Helpers ===

    pub fn load_argument(&mut self, slot: u32) -> ValueId {
        self.emit_value(MarshalOp::Arg(slot))
    }

    pub fn load_argument_address(&mut self, slot: u32) -> ValueId {
        self.emit_value(MarshalOp::ArgAddress(slot))
    }

    pub fn load_local(&mut self, local: LocalId) -> ValueId {
        self.emit_value(MarshalOp::Local(local))
    }

    pub fn load_local_address(&mut self, local: LocalId) -> ValueId {
        self.emit_value(MarshalOp::LocalAddress(local))
    }

    pub fn field_address(&mut self, base: ValueId, field: u32) -> ValueId {
        self.emit_value(MarshalOp::FieldAddress(base, field))
    }

    pub fn load(&mut self, ptr: ValueId) -> ValueId {
        self.emit_value(MarshalOp::Load(ptr))
    }

    pub fn store(&mut self, ptr: ValueId, value: ValueId) {
        self.emit(MarshalOp::Store(ptr, value));
    }

    pub fn view_base(&mut self, view: ValueId) -> ValueId {
        self.emit_value(MarshalOp::ViewBase(view))
    }

    pub fn view_length(&mut self, view: ValueId) -> ValueId {
        self.emit_value(MarshalOp::ViewLength(view))
    }

    pub fn view_stride(&mut self, view: ValueId) -> ValueId {
        self.emit_value(MarshalOp::ViewStride(view))
    }

    pub fn kernel_length(&mut self) -> ValueId {
        self.emit_value(MarshalOp::KernelLength)
    }

    // === Accessors ===

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn locals(&self) -> &[LocalDecl] {
        &self.locals
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Render locals and instructions as text
    pub fn listing(&self, types: &TypeContext) -> String {
        let mut out = String::new();
        for local in &self.locals {
            // Writing into a String cannot fail
            let _ = writeln!(out, ".local {}: {}", local.id, types.display(local.ty));
        }
        for instr in &self.instructions {
            let _ = writeln!(out, "  {}", instr);
        }
        out
    }
}
