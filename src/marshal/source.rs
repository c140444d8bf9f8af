//! Sources and targets
//!
//! A [`Source`] describes where a value currently lives, a [`Target`] where
//! it has to be written. Nested places wrap a parent place together with a
//! field path; every field on the path emits exactly one field-address
//! instruction. All dispatch is static.

use super::views::ViewParameter;
use crate::codegen::{Emitter, LocalId, ValueId};
use crate::types::{FieldDescriptor, TypeId};

/// A place holding a value during a marshaling pass
pub trait Source {
    /// Declared (unmapped) type of the value
    fn source_type(&self) -> TypeId;

    fn emit_load(&self, emitter: &mut Emitter) -> ValueId;

    fn emit_load_address(&self, emitter: &mut Emitter) -> ValueId;
}

/// A place receiving a value during a marshaling pass
pub trait Target {
    /// Mapped type of the place
    fn target_type(&self) -> TypeId;

    fn emit_load_address(&self, emitter: &mut Emitter) -> ValueId;

    /// Copy the whole value of `source` into this place
    fn emit_store<S: Source>(&self, emitter: &mut Emitter, source: &S) {
        let address = self.emit_load_address(emitter);
        let value = source.emit_load(emitter);
        emitter.store(address, value);
    }
}

/// Kernel argument slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentSource {
    ty: TypeId,
    slot: u32,
}

impl ArgumentSource {
    pub fn new(ty: TypeId, slot: usize) -> Self {
        Self {
            ty,
            slot: slot as u32,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl Source for ArgumentSource {
    fn source_type(&self) -> TypeId {
        self.ty
    }

    fn emit_load(&self, emitter: &mut Emitter) -> ValueId {
        emitter.load_argument(self.slot)
    }

    fn emit_load_address(&self, emitter: &mut Emitter) -> ValueId {
        emitter.load_argument_address(self.slot)
    }
}

/// Local variable holding a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSource {
    ty: TypeId,
    local: LocalId,
}

impl LocalSource {
    pub fn new(ty: TypeId, local: LocalId) -> Self {
        Self { ty, local }
    }

    pub fn local(&self) -> LocalId {
        self.local
    }
}

impl Source for LocalSource {
    fn source_type(&self) -> TypeId {
        self.ty
    }

    fn emit_load(&self, emitter: &mut Emitter) -> ValueId {
        emitter.load_local(self.local)
    }

    fn emit_load_address(&self, emitter: &mut Emitter) -> ValueId {
        emitter.load_local_address(self.local)
    }
}

/// Field (or nested field path) of a value held by a parent source
///
/// With an empty path the wrapper is transparent and behaves exactly like
/// its parent.
#[derive(Debug)]
pub struct StructureSource<'a, P> {
    parent: &'a P,
    path: &'a [u32],
    ty: TypeId,
}

impl<'a, P: Source> StructureSource<'a, P> {
    pub fn new(parent: &'a P, field: &'a FieldDescriptor) -> Self {
        Self {
            parent,
            path: std::slice::from_ref(&field.ordinal),
            ty: field.field_type,
        }
    }

    /// Value reached from `parent` through `path`, which must lead to `ty`
    pub fn nested(parent: &'a P, path: &'a [u32], ty: TypeId) -> Self {
        Self { parent, path, ty }
    }

    pub fn parent(&self) -> &'a P {
        self.parent
    }

    pub fn path(&self) -> &[u32] {
        self.path
    }
}

impl<P: Source> Source for StructureSource<'_, P> {
    fn source_type(&self) -> TypeId {
        self.ty
    }

    fn emit_load(&self, emitter: &mut Emitter) -> ValueId {
        if self.path.is_empty() {
            return self.parent.emit_load(emitter);
        }
        let address = self.emit_load_address(emitter);
        emitter.load(address)
    }

    fn emit_load_address(&self, emitter: &mut Emitter) -> ValueId {
        let mut address = self.parent.emit_load_address(emitter);
        for &ordinal in self.path {
            address = emitter.field_address(address, ordinal);
        }
        address
    }
}

/// View reachable from a parent source through an access chain
#[derive(Debug)]
pub struct ViewSource<'a, P> {
    parent: &'a P,
    view: &'a ViewParameter,
}

impl<'a, P: Source> ViewSource<'a, P> {
    pub fn new(parent: &'a P, view: &'a ViewParameter) -> Self {
        Self { parent, view }
    }

    pub fn view(&self) -> &ViewParameter {
        self.view
    }
}

impl<P: Source> Source for ViewSource<'_, P> {
    fn source_type(&self) -> TypeId {
        self.view.view_type
    }

    fn emit_load(&self, emitter: &mut Emitter) -> ValueId {
        // A top-level view is the argument itself
        if self.view.access_chain.is_root() {
            return self.parent.emit_load(emitter);
        }
        let address = self.emit_load_address(emitter);
        emitter.load(address)
    }

    fn emit_load_address(&self, emitter: &mut Emitter) -> ValueId {
        let mut address = self.parent.emit_load_address(emitter);
        for &ordinal in self.view.access_chain.iter() {
            address = emitter.field_address(address, ordinal);
        }
        address
    }
}

/// Local variable receiving a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTarget {
    ty: TypeId,
    local: LocalId,
}

impl LocalTarget {
    pub fn new(ty: TypeId, local: LocalId) -> Self {
        Self { ty, local }
    }

    pub fn local(&self) -> LocalId {
        self.local
    }

    /// The same local, read back as a source
    pub fn as_source(&self) -> LocalSource {
        LocalSource::new(self.ty, self.local)
    }
}

impl Target for LocalTarget {
    fn target_type(&self) -> TypeId {
        self.ty
    }

    fn emit_load_address(&self, emitter: &mut Emitter) -> ValueId {
        emitter.load_local_address(self.local)
    }
}

/// Field (or nested field path) of a value held by a parent target
#[derive(Debug)]
pub struct StructureTarget<'a, P> {
    parent: &'a P,
    path: &'a [u32],
    ty: TypeId,
}

impl<'a, P: Target> StructureTarget<'a, P> {
    pub fn new(parent: &'a P, field: &'a FieldDescriptor) -> Self {
        Self {
            parent,
            path: std::slice::from_ref(&field.ordinal),
            ty: field.field_type,
        }
    }

    /// Place reached from `parent` through `path`, which must lead to `ty`
    pub fn nested(parent: &'a P, path: &'a [u32], ty: TypeId) -> Self {
        Self { parent, path, ty }
    }

    pub fn parent(&self) -> &'a P {
        self.parent
    }

    pub fn path(&self) -> &[u32] {
        self.path
    }
}

impl<P: Target> Target for StructureTarget<'_, P> {
    fn target_type(&self) -> TypeId {
        self.ty
    }

    fn emit_load_address(&self, emitter: &mut Emitter) -> ValueId {
        let mut address = self.parent.emit_load_address(emitter);
        for &ordinal in self.path {
            address = emitter.field_address(address, ordinal);
        }
        address
    }
}
