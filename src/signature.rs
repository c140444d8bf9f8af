//! Kernel signatures and entry points

use crate::marshal::views::{ViewParameter, ViewResolver};
use crate::types::{StructureDescriptors, TypeId};

/// One declared kernel parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub index: usize,
    pub name: String,
    pub declared_type: TypeId,
    pub is_by_ref: bool,
}

/// Ordered parameter list of a kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSignature {
    name: String,
    parameters: Vec<ParameterSpec>,
}

impl KernelSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a by-value parameter
    pub fn param(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.push(name, ty, false);
        self
    }

    /// Append a by-reference parameter
    pub fn by_ref_param(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.push(name, ty, true);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, ty: TypeId, is_by_ref: bool) {
        let index = self.parameters.len();
        self.parameters.push(ParameterSpec {
            index,
            name: name.into(),
            declared_type: ty,
            is_by_ref,
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn get(&self, index: usize) -> Option<&ParameterSpec> {
        self.parameters.get(index)
    }

    pub fn is_by_ref(&self, index: usize) -> bool {
        self.parameters.get(index).is_some_and(|p| p.is_by_ref)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// A kernel signature together with its statically discovered views
#[derive(Debug, Clone)]
pub struct EntryPoint {
    signature: KernelSignature,
    view_parameters: Vec<ViewParameter>,
}

impl EntryPoint {
    /// Resolve the views of `signature` once; they are reused by every launch
    pub fn new<P: StructureDescriptors>(signature: KernelSignature, types: &P) -> Self {
        let view_parameters = ViewResolver::new(types).resolve(&signature);
        tracing::debug!(
            kernel = signature.name(),
            params = signature.len(),
            views = view_parameters.len(),
            "resolved entry point"
        );
        Self {
            signature,
            view_parameters,
        }
    }

    pub fn name(&self) -> &str {
        self.signature.name()
    }

    pub fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    /// View parameters ordered by view-argument index
    pub fn view_parameters(&self) -> &[ViewParameter] {
        &self.view_parameters
    }

    pub fn has_views(&self) -> bool {
        !self.view_parameters.is_empty()
    }
}
