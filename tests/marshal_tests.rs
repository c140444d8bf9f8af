//! Integration tests for parameter marshaling
//!
//! Covers grouped and direct marshaling across both backends, the packed
//! size law and fail-fast validation.

use kernarg::backends::{ArgumentBinder, BindingKind, ClBackend, PtxBackend, PtxLaunchHandler};
use kernarg::codegen::{Emitter, MarshalOp};
use kernarg::marshal::{ArgumentMapper, KERNEL_LENGTH_FIELD};
use kernarg::types::{
    PrimitiveType, StructBuilder, StructureDescriptors, TypeContext, TypeId, UnsupportedKind,
};
use kernarg::{KernelSignature, MarshalError};
use proptest::prelude::*;

struct Fixture {
    types: TypeContext,
    i32_ty: TypeId,
    f32_view: TypeId,
    point3: TypeId,
}

fn fixture() -> Fixture {
    let mut types = TypeContext::new();
    let i32_ty = types.primitive(PrimitiveType::I32);
    let f32_ty = types.primitive(PrimitiveType::F32);
    let f32_view = types.view(f32_ty);
    let point3 = StructBuilder::new("Point3")
        .field("x", f32_ty)
        .field("y", f32_ty)
        .field("z", f32_ty)
        .build(&mut types);
    Fixture {
        types,
        i32_ty,
        f32_view,
        point3,
    }
}

// ============================================================================
// Grouped marshaling
// ============================================================================

mod grouped_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_saxpy_argument_struct() {
        let Fixture {
            mut types,
            i32_ty,
            f32_view,
            point3,
        } = fixture();
        let signature = KernelSignature::new("saxpy")
            .param("n", i32_ty)
            .param("data", f32_view)
            .param("origin", point3);

        let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
        let mut emitter = Emitter::new();
        let packed = mapper
            .map_arguments_struct(&mut emitter, &mut PtxLaunchHandler::default(), &signature)
            .unwrap();

        let types = mapper.types();
        let names: Vec<&str> = types
            .fields(packed.struct_type)
            .iter()
            .map(|f| &*f.name)
            .collect();
        assert_eq!(names, vec![KERNEL_LENGTH_FIELD, "param0", "param1", "param2"]);
        let offsets: Vec<u32> = types
            .fields(packed.struct_type)
            .iter()
            .map(|f| f.offset)
            .collect();
        assert_eq!(offsets, vec![0, 4, 8, 24]);
        assert_eq!(packed.raw_size, 36);
        assert_eq!(types.size_of(packed.struct_type), 40);

        insta::assert_snapshot!(emitter.listing(types).trim_end(), @r"
.local local0: saxpy$Arguments
  %0 = ldloca local0
  %1 = ldflda %0, 0
  %2 = kernel.length
  store %1, %2
  %3 = ldloca local0
  %4 = ldflda %3, 1
  %5 = ldarg 0
  store %4, %5
  %6 = ldarg 1
  %7 = view.base %6
  %8 = ldloca local0
  %9 = ldflda %8, 2
  %10 = ldflda %9, 0
  store %10, %7
  %11 = view.length %6
  %12 = ldloca local0
  %13 = ldflda %12, 2
  %14 = ldflda %13, 1
  store %14, %11
  %15 = ldloca local0
  %16 = ldflda %15, 3
  %17 = ldarg 2
  store %16, %17
  %18 = ldloca local0
  submit %18, 36
");
    }

    #[test]
    fn test_empty_signature_has_zero_raw_size() {
        let mut types = TypeContext::new();
        let signature = KernelSignature::new("noop");
        let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
        let mut emitter = Emitter::new();
        let packed = mapper
            .map_arguments_struct(
                &mut emitter,
                &mut PtxLaunchHandler::without_kernel_length(),
                &signature,
            )
            .unwrap();
        assert_eq!(packed.raw_size, 0);
        assert_eq!(
            emitter.instructions().last().map(|i| &i.op),
            Some(&MarshalOp::SubmitBuffer(kernarg::codegen::ValueId(0), 0))
        );
    }

    #[test]
    fn test_trailing_padding_is_not_transferred() {
        let mut types = TypeContext::new();
        let i64_ty = types.primitive(PrimitiveType::I64);
        let u8_ty = types.primitive(PrimitiveType::U8);
        let signature = KernelSignature::new("k").param("a", i64_ty).param("flag", u8_ty);

        let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
        let mut emitter = Emitter::new();
        let packed = mapper
            .map_arguments_struct(
                &mut emitter,
                &mut PtxLaunchHandler::without_kernel_length(),
                &signature,
            )
            .unwrap();
        assert_eq!(packed.raw_size, 9);
        assert_eq!(mapper.types().size_of(packed.struct_type), 16);
    }

    #[test]
    fn test_wide_kernel_length() {
        let Fixture {
            mut types, i32_ty, ..
        } = fixture();
        let signature = KernelSignature::new("k").param("n", i32_ty);
        let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
        let mut emitter = Emitter::new();
        let packed = mapper
            .map_arguments_struct(
                &mut emitter,
                &mut PtxLaunchHandler::new(PrimitiveType::U64),
                &signature,
            )
            .unwrap();
        // u64 length, then i32 at 8
        assert_eq!(packed.raw_size, 12);
    }

    fn naive_packed_size(prims: &[PrimitiveType]) -> u32 {
        prims.iter().fold(0, |cursor, prim| {
            let size = prim.size_bytes();
            cursor.div_ceil(size) * size + size
        })
    }

    proptest! {
        #[test]
        fn prop_raw_size_is_end_of_last_field(
            indices in proptest::collection::vec(0..PrimitiveType::ALL.len(), 0..16),
        ) {
            let prims: Vec<PrimitiveType> = indices.iter().map(|&i| PrimitiveType::ALL[i]).collect();
            let mut types = TypeContext::new();
            let mut signature = KernelSignature::new("k");
            for (i, &prim) in prims.iter().enumerate() {
                let ty = types.primitive(prim);
                signature.push(format!("p{}", i), ty, false);
            }

            let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
            let mut emitter = Emitter::new();
            let packed = mapper
                .map_arguments_struct(
                    &mut emitter,
                    &mut PtxLaunchHandler::without_kernel_length(),
                    &signature,
                )
                .unwrap();

            let types = mapper.types();
            let fields = types.fields(packed.struct_type);
            prop_assert_eq!(fields.len(), prims.len());
            prop_assert_eq!(packed.raw_size, naive_packed_size(&prims));
            let storage = types.size_of(packed.struct_type);
            prop_assert!(packed.raw_size <= storage);
            prop_assert!(storage - packed.raw_size < types.align_of(packed.struct_type));
        }
    }
}

// ============================================================================
// Direct marshaling
// ============================================================================

mod direct_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_one_local_per_parameter_in_order() {
        let Fixture {
            mut types,
            i32_ty,
            f32_view,
            point3,
        } = fixture();
        let signature = KernelSignature::new("saxpy")
            .param("n", i32_ty)
            .param("data", f32_view)
            .param("origin", point3);

        let mut mapper = ArgumentMapper::new(&mut types, ClBackend::new());
        let mut emitter = Emitter::new();
        let mut binder = ArgumentBinder::new(signature.len());
        mapper
            .map_arguments(&mut emitter, &mut binder, &signature)
            .unwrap();

        let local_types: Vec<String> = emitter
            .locals()
            .iter()
            .map(|l| mapper.types().display(l.ty))
            .collect();
        assert_eq!(local_types, vec!["i32", "View<f32>$Cl", "Point3"]);

        let bound: Vec<(u32, BindingKind, usize)> = binder
            .bindings()
            .iter()
            .map(|b| (b.slot, b.kind, b.parameter))
            .collect();
        assert_eq!(
            bound,
            vec![
                (0, BindingKind::Argument, 0),
                (1, BindingKind::Argument, 1),
                (2, BindingKind::Argument, 2),
            ]
        );
    }

    #[test]
    fn test_enum_is_copied_as_underlying_integer() {
        let mut types = TypeContext::new();
        let u8_ty = types.primitive(PrimitiveType::U8);
        let mode = types.enumeration("Mode", PrimitiveType::U8);
        let signature = KernelSignature::new("k").param("mode", mode);

        let mut mapper = ArgumentMapper::new(&mut types, ClBackend::new());
        let mut emitter = Emitter::new();
        mapper
            .map_arguments(&mut emitter, &mut ArgumentBinder::new(1), &signature)
            .unwrap();

        assert_eq!(emitter.locals()[0].ty, u8_ty);
        let ops: Vec<MarshalOp> = emitter.instructions().iter().map(|i| i.op.clone()).collect();
        assert_eq!(ops[1], MarshalOp::Arg(0));
        assert!(matches!(ops[2], MarshalOp::Store(..)));
    }

    #[test]
    fn test_changed_structure_is_copied_field_by_field() {
        let mut types = TypeContext::new();
        let f32_ty = types.primitive(PrimitiveType::F32);
        let mode = types.enumeration("Mode", PrimitiveType::I32);
        let settings = StructBuilder::new("Settings")
            .field("mode", mode)
            .field("scale", f32_ty)
            .build(&mut types);
        let signature = KernelSignature::new("k").param("settings", settings);

        let mut mapper = ArgumentMapper::new(&mut types, ClBackend::new());
        let mut emitter = Emitter::new();
        mapper
            .map_arguments(&mut emitter, &mut ArgumentBinder::new(1), &signature)
            .unwrap();

        let field_loads = emitter
            .instructions()
            .iter()
            .filter(|i| matches!(i.op, MarshalOp::ArgAddress(0)))
            .count();
        assert_eq!(field_loads, 2);
        assert_eq!(
            mapper.types().display(emitter.locals()[0].ty),
            "Settings$Mapped"
        );
    }
}

// ============================================================================
// Fail-fast validation
// ============================================================================

mod validation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rejections_name_the_parameter() {
        let mut types = TypeContext::new();
        let i32_ty = types.primitive(PrimitiveType::I32);
        let array = types.array(i32_ty);
        let pointer = types.pointer(i32_ty);
        let void = types.void();
        let callback = types.delegate("Callback");

        let cases = [
            (array, UnsupportedKind::Array, "i32[]"),
            (pointer, UnsupportedKind::Pointer, "*i32"),
            (void, UnsupportedKind::Void, "void"),
            (callback, UnsupportedKind::Delegate, "Callback"),
        ];
        for (ty, expected_kind, name) in cases {
            let signature = KernelSignature::new("k").param("ok", i32_ty).param("bad", ty);
            let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
            let mut emitter = Emitter::new();
            let err = mapper
                .map_arguments_struct(&mut emitter, &mut PtxLaunchHandler::default(), &signature)
                .unwrap_err();

            match &err {
                MarshalError::Parameter {
                    index,
                    declared_type,
                    source,
                } => {
                    assert_eq!(*index, 1);
                    assert_eq!(declared_type, name);
                    assert!(matches!(
                        **source,
                        MarshalError::UnsupportedParameterKind { kind, .. } if kind == expected_kind
                    ));
                }
                other => panic!("expected a parameter error, got {:?}", other),
            }
            assert!(emitter.is_empty());
        }
    }

    #[test]
    fn test_nested_reference_is_not_blittable() {
        let mut types = TypeContext::new();
        let f32_ty = types.primitive(PrimitiveType::F32);
        let mesh = types.class("Mesh");
        let inner = StructBuilder::new("Inner").field("mesh", mesh).build(&mut types);
        let outer = StructBuilder::new("Outer")
            .field("scale", f32_ty)
            .field("inner", inner)
            .build(&mut types);
        let signature = KernelSignature::new("k").param("outer", outer);

        let mut mapper = ArgumentMapper::new(&mut types, ClBackend::new());
        let mut emitter = Emitter::new();
        let err = mapper
            .map_arguments(&mut emitter, &mut ArgumentBinder::new(1), &signature)
            .unwrap_err();
        assert_eq!(
            err.root_cause(),
            &MarshalError::NonBlittableType {
                ty: "Mesh".to_string()
            }
        );
        assert_eq!(err.to_string(), "Cannot marshal parameter 0 of type `Outer`");
        assert!(emitter.is_empty());
        assert!(emitter.locals().is_empty());
    }

    #[test]
    fn test_view_elements_must_be_blittable() {
        let mut types = TypeContext::new();
        let i32_ty = types.primitive(PrimitiveType::I32);
        let logger = types.class("Logger");
        let by_ref = types.by_ref(i32_ty);
        let void = types.void();

        let cases = [
            (types.view(logger), "Logger"),
            (types.strided_view(by_ref), "&i32"),
            (types.view(void), "void"),
        ];
        for (view, offending) in cases {
            let signature = KernelSignature::new("k").param("n", i32_ty).param("data", view);
            let mut mapper = ArgumentMapper::new(&mut types, ClBackend::new());
            let mut emitter = Emitter::new();
            let mut binder = ArgumentBinder::new(2);
            let err = mapper
                .map_arguments(&mut emitter, &mut binder, &signature)
                .unwrap_err();
            assert_eq!(err.parameter_index(), Some(1));
            assert_eq!(
                err.root_cause(),
                &MarshalError::NonBlittableType {
                    ty: offending.to_string()
                }
            );
            assert!(emitter.is_empty());
            assert!(binder.bindings().is_empty());

            // Mapping the view type on its own is refused as well
            assert!(mapper.map_type(view).is_err());
        }
    }

    #[test]
    fn test_by_ref_flag_rejects_direct_marshaling() {
        let mut types = TypeContext::new();
        let i32_ty = types.primitive(PrimitiveType::I32);
        let signature = KernelSignature::new("k")
            .param("a", i32_ty)
            .param("b", i32_ty)
            .by_ref_param("c", i32_ty);

        let mut mapper = ArgumentMapper::new(&mut types, ClBackend::new());
        let mut emitter = Emitter::new();
        let mut binder = ArgumentBinder::new(3);
        let err = mapper
            .map_arguments(&mut emitter, &mut binder, &signature)
            .unwrap_err();
        assert_eq!(err.parameter_index(), Some(2));
        assert!(emitter.is_empty());
        assert!(binder.bindings().is_empty());
    }
}
