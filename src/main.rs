//! kernarg CLI
//!
//! Main entry point for the `kargc` command.

use clap::{Parser, Subcommand};
use kernarg::backends::BackendKind;
use kernarg::config::{MarshalConfig, Strategy};
use kernarg::types::{StructureDescriptors, TypeKind};
use kernarg::{EntryPoint, Manifest, MarshalPlan};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "kargc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Kernel argument marshaling planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan the argument marshaling of a kernel
    Map {
        /// Kernel manifest
        #[arg(value_name = "FILE")]
        manifest: PathBuf,

        /// Kernel to plan (may be omitted if the manifest has only one)
        #[arg(short, long)]
        kernel: Option<String>,

        /// Target backend
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,

        /// Marshaling strategy
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the layout of every declared type
    Types {
        /// Kernel manifest
        #[arg(value_name = "FILE")]
        manifest: PathBuf,
    },

    /// Show version and backend information
    Info,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum BackendArg {
    /// Packed argument buffer, views as {ptr, length}
    Ptx,
    /// One argument per parameter, view buffers bound separately
    Opencl,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Ptx => BackendKind::Ptx,
            BackendArg::Opencl => BackendKind::OpenCL,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum StrategyArg {
    Direct,
    Grouped,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Direct => Strategy::Direct,
            StrategyArg::Grouped => Strategy::Grouped,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MarshalConfig::load(path)?,
        None => MarshalConfig::default(),
    };

    // Initialize tracing; RUST_LOG wins over the configured filter
    let filter = match (std::env::var_os("RUST_LOG"), &config.log_filter) {
        (None, Some(directives)) => EnvFilter::new(directives),
        _ => EnvFilter::from_default_env(),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Map {
            manifest,
            kernel,
            backend,
            strategy,
            format,
        } => map(&manifest, kernel.as_deref(), backend, strategy, format, config),

        Commands::Types { manifest } => types(&manifest),

        Commands::Info => info(),
    }
}

fn map(
    path: &Path,
    kernel: Option<&str>,
    backend: Option<BackendArg>,
    strategy: Option<StrategyArg>,
    format: OutputFormat,
    mut config: MarshalConfig,
) -> Result<()> {
    if let Some(backend) = backend {
        config = config.with_backend(backend.into());
    }
    if let Some(strategy) = strategy {
        config = config.with_strategy(strategy.into());
    }

    let mut manifest = Manifest::load(path)?;
    let signature = manifest.select_kernel(kernel)?.clone();
    tracing::debug!("Planning {} with {} parameters", signature.name(), signature.len());

    let entry = EntryPoint::new(signature, manifest.types());
    let plan = kernarg::plan(manifest.types_mut(), &entry, &config)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&plan).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Text => print_plan(&plan),
    }
    Ok(())
}

fn print_plan(plan: &MarshalPlan) {
    println!("kernel {} ({}, {})", plan.kernel, plan.backend, plan.strategy);
    println!();
    println!("Parameters:");
    for param in &plan.parameters {
        println!(
            "  {}: {} {} -> {}",
            param.index, param.name, param.declared_type, param.mapped_type
        );
    }

    if !plan.views.is_empty() {
        println!();
        println!("Views:");
        for view in &plan.views {
            println!(
                "  #{}: param {} {:?} {} of {}",
                view.index, view.parameter, view.access_chain, view.view_type, view.element_type
            );
        }
    }

    if let (Some(name), Some(size)) = (&plan.argument_struct, plan.raw_size) {
        println!();
        println!("Argument buffer: {} ({} bytes)", name, size);
    }

    if !plan.bindings.is_empty() {
        println!();
        println!("Bindings:");
        for binding in &plan.bindings {
            println!(
                "  slot {}: {:?} of param {}",
                binding.slot, binding.kind, binding.parameter
            );
        }
    }

    println!();
    println!("Listing:");
    for line in &plan.listing {
        println!("{}", line);
    }
}

fn types(path: &Path) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let types = manifest.types();

    for (name, ty) in manifest.named_types() {
        match types.kind(ty) {
            TypeKind::Struct(def) => {
                println!("struct {} (size {}, align {})", name, def.size, def.align);
                for field in types.fields(ty) {
                    println!(
                        "  @{:<4} {}: {}",
                        field.offset,
                        field.name,
                        types.type_name(field.field_type)
                    );
                }
            }
            TypeKind::Enum { underlying, .. } => println!("enum {}: {}", name, underlying),
            TypeKind::Class { .. } => println!("class {}", name),
            TypeKind::Delegate { .. } => println!("delegate {}", name),
            _ => println!("{}: {}", name, types.type_name(ty)),
        }
    }

    for kernel in manifest.kernels() {
        let params: Vec<String> = kernel
            .parameters()
            .iter()
            .map(|p| {
                let by_ref = if p.is_by_ref { "ref " } else { "" };
                format!("{}: {}{}", p.name, by_ref, types.type_name(p.declared_type))
            })
            .collect();
        println!("kernel {}({})", kernel.name(), params.join(", "));
    }

    Ok(())
}

fn info() -> Result<()> {
    println!("kernarg kernel argument marshaler");
    println!("Version: {}", kernarg::VERSION);
    println!();
    println!("Backends:");
    for backend in BackendKind::ALL {
        println!("  - {} (default strategy: {})", backend, Strategy::default_for(backend));
    }

    Ok(())
}
