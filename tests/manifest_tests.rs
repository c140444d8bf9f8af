//! End-to-end tests: manifest → entry point → marshaling plan

use kernarg::backends::BackendKind;
use kernarg::config::{MarshalConfig, Strategy};
use kernarg::manifest::ManifestError;
use kernarg::plan::PlanError;
use kernarg::{EntryPoint, Manifest, MarshalError, plan};
use pretty_assertions::assert_eq;

const PARTICLES: &str = r#"
[[types]]
kind = "enum"
name = "Boundary"
underlying = "u8"

[[types]]
kind = "struct"
name = "Point3"
fields = [
    { name = "x", type = "f32" },
    { name = "y", type = "f32" },
    { name = "z", type = "f32" },
]

[[types]]
kind = "struct"
name = "Particles"
fields = [
    { name = "positions", type = "View<Point3>" },
    { name = "masses", type = "StridedView<f32>" },
    { name = "boundary", type = "Boundary" },
]

[[types]]
kind = "class"
name = "Logger"

[[kernels]]
name = "integrate"
params = [
    { name = "n", type = "i32" },
    { name = "particles", type = "Particles" },
    { name = "gravity", type = "Point3" },
]

[[kernels]]
name = "log"
params = [
    { name = "logger", type = "Logger" },
]

[[kernels]]
name = "accumulate"
params = [
    { name = "total", type = "f64", by_ref = true },
]
"#;

fn entry(manifest: &Manifest, kernel: &str) -> EntryPoint {
    let signature = manifest.kernel(kernel).unwrap().clone();
    EntryPoint::new(signature, manifest.types())
}

#[test]
fn test_manifest_declaration_order() {
    let manifest = Manifest::parse(PARTICLES).unwrap();
    let names: Vec<&str> = manifest.named_types().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["Boundary", "Point3", "Particles", "Logger"]);
    let kernels: Vec<&str> = manifest.kernels().map(|k| k.name()).collect();
    assert_eq!(kernels, vec!["integrate", "log", "accumulate"]);
    assert!(matches!(
        manifest.select_kernel(None),
        Err(ManifestError::UnknownKernel { .. })
    ));
}

#[test]
fn test_ptx_plan() {
    let mut manifest = Manifest::parse(PARTICLES).unwrap();
    let entry = entry(&manifest, "integrate");
    let plan = plan(manifest.types_mut(), &entry, &MarshalConfig::default()).unwrap();

    assert_eq!(plan.backend, BackendKind::Ptx);
    assert_eq!(plan.strategy, Strategy::Grouped);
    let mapped: Vec<&str> = plan
        .parameters
        .iter()
        .map(|p| p.mapped_type.as_str())
        .collect();
    assert_eq!(mapped, vec!["i32", "Particles$Mapped", "Point3"]);

    let chains: Vec<Vec<u32>> = plan.views.iter().map(|v| v.access_chain.clone()).collect();
    assert_eq!(chains, vec![vec![0], vec![1]]);
    assert_eq!(plan.views[1].view_type, "StridedView<f32>");

    // kernel_length@0, n@4, particles@8 (16 + 24 + 1 → 48), gravity@56
    assert_eq!(plan.raw_size, Some(68));
}

#[test]
fn test_opencl_plan_json() {
    let mut manifest = Manifest::parse(PARTICLES).unwrap();
    let entry = entry(&manifest, "integrate");
    let config = MarshalConfig::parse("backend = \"opencl\"").unwrap();
    let plan = plan(manifest.types_mut(), &entry, &config).unwrap();

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["backend"], "opencl");
    assert_eq!(json["strategy"], "direct");
    assert!(json.get("raw_size").is_none());
    assert_eq!(json["parameters"][1]["mapped_type"], "Particles$Mapped");

    let bindings = json["bindings"].as_array().unwrap();
    let kinds: Vec<(u64, &str)> = bindings
        .iter()
        .map(|b| (b["slot"].as_u64().unwrap(), b["kind"].as_str().unwrap()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (0, "argument"),
            (1, "argument"),
            (2, "argument"),
            (3, "buffer"),
            (4, "buffer"),
        ]
    );
}

#[test]
fn test_reference_parameter_fails_plan() {
    let mut manifest = Manifest::parse(PARTICLES).unwrap();
    let entry = entry(&manifest, "log");
    let err = plan(manifest.types_mut(), &entry, &MarshalConfig::default()).unwrap_err();
    match err {
        PlanError::Marshal(err) => {
            assert_eq!(err.parameter_index(), Some(0));
            assert!(matches!(
                err.root_cause(),
                MarshalError::UnsupportedParameterKind { .. }
            ));
        }
        other => panic!("expected a marshal error, got {:?}", other),
    }
}

#[test]
fn test_by_ref_flag_from_manifest() {
    let mut manifest = Manifest::parse(PARTICLES).unwrap();
    let entry = entry(&manifest, "accumulate");
    assert!(entry.signature().is_by_ref(0));
    let config = MarshalConfig::default().with_strategy(Strategy::Direct);
    assert!(plan(manifest.types_mut(), &entry, &config).is_err());
}

#[test]
fn test_invalid_manifest_reports_type_expression() {
    let err = Manifest::parse(
        r#"
[[kernels]]
name = "k"
params = [{ name = "v", type = "vec4<Point>" }]
"#,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid type expression in parameter `v` of kernel `k`"
    );
}
