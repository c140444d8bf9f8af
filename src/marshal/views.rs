//! View discovery
//!
//! Finds every view reachable from the kernel parameters, including views
//! nested inside structures, and records the field path leading to each.
//! The order of the resulting [`ViewParameter`]s is the view-argument index
//! contract backends bind against.

use crate::signature::{KernelSignature, ParameterSpec};
use crate::types::{StructureDescriptors, TypeId};
use std::fmt;

/// Field ordinals leading from a parameter to a nested value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldAccessChain(Vec<u32>);

impl FieldAccessChain {
    /// The parameter itself
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_ordinals(ordinals: impl Into<Vec<u32>>) -> Self {
        Self(ordinals.into())
    }

    /// This chain extended by one field
    pub fn append(&self, ordinal: u32) -> Self {
        let mut ordinals = Vec::with_capacity(self.0.len() + 1);
        ordinals.extend_from_slice(&self.0);
        ordinals.push(ordinal);
        Self(ordinals)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, u32> {
        self.0.iter()
    }

    pub fn ordinals(&self) -> &[u32] {
        &self.0
    }

    /// Replay the chain starting at `root`, returning the type it reaches
    pub fn resolve<P: StructureDescriptors>(&self, types: &P, root: TypeId) -> Option<TypeId> {
        self.0.iter().try_fold(root, |ty, &ordinal| {
            types.field(ty, ordinal).map(|field| field.field_type)
        })
    }
}

impl fmt::Display for FieldAccessChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, ordinal) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ordinal)?;
        }
        write!(f, "]")
    }
}

/// A statically discovered view occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewParameter {
    pub parameter_index: usize,
    pub access_chain: FieldAccessChain,
    pub view_type: TypeId,
    pub element_type: TypeId,
}

/// Depth-first view finder over structure descriptors
pub struct ViewResolver<'a, P> {
    types: &'a P,
}

impl<'a, P: StructureDescriptors> ViewResolver<'a, P> {
    pub fn new(types: &'a P) -> Self {
        Self { types }
    }

    /// All views of a signature in parameter order, then discovery order
    pub fn resolve(&self, signature: &KernelSignature) -> Vec<ViewParameter> {
        let mut views = Vec::new();
        for param in signature.parameters() {
            self.resolve_parameter(param, &mut views);
        }
        views
    }

    pub fn resolve_parameter(&self, param: &ParameterSpec, views: &mut Vec<ViewParameter>) {
        self.walk(param.index, param.declared_type, FieldAccessChain::root(), views);
    }

    fn walk(
        &self,
        parameter_index: usize,
        ty: TypeId,
        chain: FieldAccessChain,
        views: &mut Vec<ViewParameter>,
    ) {
        if let Some((element_type, _)) = self.types.view_info(ty) {
            views.push(ViewParameter {
                parameter_index,
                access_chain: chain,
                view_type: ty,
                element_type,
            });
            return;
        }
        for field in self.types.fields(ty) {
            self.walk(
                parameter_index,
                field.field_type,
                chain.append(field.ordinal),
                views,
            );
        }
    }
}
