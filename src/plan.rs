//! Marshaling plans
//!
//! Runs the marshaler for one entry point with a configured backend and
//! strategy and collects everything a launcher (or a person) needs to know:
//! mapped parameter types, discovered views, argument bindings, the packed
//! buffer size and the emitted listing.

use crate::backends::{
    ArgumentBinder, ArgumentBinding, BackendKind, ClBackend, PtxBackend, PtxLaunchHandler,
};
use crate::codegen::Emitter;
use crate::config::{ConfigError, MarshalConfig, Strategy};
use crate::diagnostics::MarshalError;
use crate::marshal::{ArgumentMapper, Backend};
use crate::signature::EntryPoint;
use crate::types::TypeContext;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum PlanError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Marshal(#[from] MarshalError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedParameter {
    pub index: usize,
    pub name: String,
    pub declared_type: String,
    pub mapped_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedView {
    /// View-argument index
    pub index: usize,
    pub parameter: usize,
    pub access_chain: Vec<u32>,
    pub view_type: String,
    pub element_type: String,
}

/// Result of planning one kernel launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarshalPlan {
    pub kernel: String,
    pub backend: BackendKind,
    pub strategy: Strategy,
    pub parameters: Vec<PlannedParameter>,
    pub views: Vec<PlannedView>,
    /// Packed argument structure of grouped marshaling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument_struct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_size: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<ArgumentBinding>,
    pub listing: Vec<String>,
}

/// Plan the launch of `entry` as described by `config`
pub fn plan(
    types: &mut TypeContext,
    entry: &EntryPoint,
    config: &MarshalConfig,
) -> Result<MarshalPlan, PlanError> {
    match config.backend {
        BackendKind::Ptx => plan_with(types, PtxBackend::new(), entry, config),
        BackendKind::OpenCL => plan_with(types, ClBackend::new(), entry, config),
    }
}

fn plan_with<B: Backend>(
    types: &mut TypeContext,
    backend: B,
    entry: &EntryPoint,
    config: &MarshalConfig,
) -> Result<MarshalPlan, PlanError> {
    config.validate()?;
    let strategy = config.effective_strategy();
    let kernel_length = config.kernel_length_type()?;
    // Only the OpenCL ABI binds view base pointers outside the arguments
    let binds_buffers = config.backend == BackendKind::OpenCL;
    let signature = entry.signature();

    let mut mapper = ArgumentMapper::new(types, backend);
    let mut emitter = Emitter::new();
    let mut binder = ArgumentBinder::new(signature.len());
    let mut argument_struct = None;
    let mut raw_size = None;

    match strategy {
        Strategy::Direct => {
            mapper.map_arguments(&mut emitter, &mut binder, signature)?;
        }
        Strategy::Grouped => {
            let mut handler = match kernel_length {
                Some(prim) => PtxLaunchHandler::new(prim),
                None => PtxLaunchHandler::without_kernel_length(),
            };
            let packed = mapper.map_arguments_struct(&mut emitter, &mut handler, signature)?;
            argument_struct = Some(mapper.types().display(packed.struct_type));
            raw_size = Some(packed.raw_size);
        }
    }
    if binds_buffers {
        mapper.map_views(&mut emitter, &mut binder, entry)?;
    }

    let mut parameters = Vec::with_capacity(signature.len());
    for param in signature.parameters() {
        let mapped = mapper.map_type(param.declared_type)?;
        parameters.push(PlannedParameter {
            index: param.index,
            name: param.name.clone(),
            declared_type: mapper.types().display(param.declared_type),
            mapped_type: mapper.types().display(mapped),
        });
    }

    let types = mapper.types();
    let views = entry
        .view_parameters()
        .iter()
        .enumerate()
        .map(|(index, view)| PlannedView {
            index,
            parameter: view.parameter_index,
            access_chain: view.access_chain.ordinals().to_vec(),
            view_type: types.display(view.view_type),
            element_type: types.display(view.element_type),
        })
        .collect();
    let listing = emitter.listing(types).lines().map(str::to_string).collect();

    tracing::info!(
        kernel = entry.name(),
        backend = %config.backend,
        %strategy,
        instructions = emitter.len(),
        "planned kernel launch"
    );

    Ok(MarshalPlan {
        kernel: entry.name().to_string(),
        backend: config.backend,
        strategy,
        parameters,
        views,
        argument_struct,
        raw_size,
        bindings: binder.into_bindings(),
        listing,
    })
}
