//! Integration tests for type mapping and layout
//!
//! Tests idempotence, identity reuse, ordinal preservation and the natural
//! layout of synthesized structures.

use kernarg::backends::{ClBackend, PtxBackend};
use kernarg::marshal::{ArgumentMapper, Backend, ClearCacheMode};
use kernarg::types::{
    PrimitiveType, StructBuilder, StructureDescriptors, TypeContext, TypeId, TypeKind,
    parse_type,
};
use proptest::prelude::*;

// ============================================================================
// Mapping rules
// ============================================================================

mod rule_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mapped_name<B: Backend>(backend: B, input: &str) -> String {
        let mut types = TypeContext::new();
        let ty = parse_type(&mut types, input, |_| None).unwrap();
        let mut mapper = ArgumentMapper::new(&mut types, backend);
        let mapped = mapper.map_type(ty).unwrap();
        mapper.types().display(mapped)
    }

    #[test]
    fn test_backend_primitives_are_identity() {
        for input in ["bool", "i8", "u64", "f16", "f64", "vec3<f32>", "native_address"] {
            assert_eq!(mapped_name(PtxBackend::new(), input), input);
        }
    }

    #[test]
    fn test_views_per_backend() {
        assert_eq!(mapped_name(PtxBackend::new(), "View<i32>"), "View<i32>$Ptx");
        assert_eq!(
            mapped_name(PtxBackend::new(), "StridedView<vec4<f32>>"),
            "StridedView<vec4<f32>>$Ptx"
        );
        assert_eq!(mapped_name(ClBackend::new(), "View<i32>"), "View<i32>$Cl");
    }

    #[test]
    fn test_unsupported_type_expressions() {
        for input in ["&i32", "*f32", "f32[]", "void"] {
            let mut types = TypeContext::new();
            let ty = parse_type(&mut types, input, |_| None).unwrap();
            let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
            assert!(mapper.map_type(ty).is_err(), "{} should be rejected", input);
        }
    }
}

// ============================================================================
// Structure mapping
// ============================================================================

mod structure_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_change_propagates_outwards() {
        let mut types = TypeContext::new();
        let f32_ty = types.primitive(PrimitiveType::F32);
        let view = types.view(f32_ty);
        let point = StructBuilder::new("Point")
            .field("x", f32_ty)
            .field("y", f32_ty)
            .build(&mut types);
        let buffer = StructBuilder::new("Buffer")
            .field("origin", point)
            .field("data", view)
            .build(&mut types);
        let scene = StructBuilder::new("Scene")
            .field("buffer", buffer)
            .field("scale", f32_ty)
            .build(&mut types);

        let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
        let mapped_scene = mapper.map_type(scene).unwrap();
        let mapped_point = mapper.map_type(point).unwrap();

        let types = mapper.types();
        assert_eq!(mapped_point, point);
        assert_eq!(types.display(mapped_scene), "Scene$Mapped");

        let mapped_buffer = types.fields(mapped_scene)[0].field_type;
        assert_eq!(types.display(mapped_buffer), "Buffer$Mapped");
        // unchanged field keeps its original type
        assert_eq!(types.fields(mapped_buffer)[0].field_type, point);
        assert_eq!(types.fields(mapped_buffer)[1].offset, 8);
        assert_eq!(types.size_of(mapped_scene), 32);
    }

    #[test]
    fn test_synthesized_fields_know_their_container() {
        let mut types = TypeContext::new();
        let kind = types.enumeration("Kind", PrimitiveType::U8);
        let f64_ty = types.primitive(PrimitiveType::F64);
        let sample = StructBuilder::new("Sample")
            .field("kind", kind)
            .field("value", f64_ty)
            .build(&mut types);

        let mut mapper = ArgumentMapper::new(&mut types, ClBackend::new());
        let mapped = mapper.map_type(sample).unwrap();
        let types = mapper.types();
        for field in types.fields(mapped) {
            assert_eq!(field.containing_type, mapped);
        }
        assert!(matches!(types.kind(mapped), TypeKind::Struct(def) if def.synthesized));
    }

    #[test]
    fn test_clear_cache_keeps_old_types_valid() {
        let mut types = TypeContext::new();
        let mode = types.enumeration("Mode", PrimitiveType::I16);
        let holder = StructBuilder::new("Holder").field("mode", mode).build(&mut types);

        let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
        let first = mapper.map_type(holder).unwrap();
        mapper.clear_cache(ClearCacheMode::Default);
        let second = mapper.map_type(holder).unwrap();

        assert_ne!(first, second);
        let types = mapper.types();
        assert_eq!(types.display(first), types.display(second));
        assert_eq!(types.size_of(first), 2);
    }
}

// ============================================================================
// Properties
// ============================================================================

/// Field kinds used to generate random structures
#[derive(Debug, Clone, Copy)]
enum FieldGen {
    Prim(usize),
    Enum,
    View,
    Nested,
}

fn field_gen() -> impl Strategy<Value = FieldGen> {
    prop_oneof![
        (0..PrimitiveType::ALL.len()).prop_map(FieldGen::Prim),
        Just(FieldGen::Enum),
        Just(FieldGen::View),
        Just(FieldGen::Nested),
    ]
}

fn build_struct(types: &mut TypeContext, gens: &[FieldGen]) -> TypeId {
    let mut builder = StructBuilder::new("Generated");
    for (i, field) in gens.iter().enumerate() {
        let ty = match *field {
            FieldGen::Prim(p) => types.primitive(PrimitiveType::ALL[p]),
            FieldGen::Enum => types.enumeration(format!("E{}", i), PrimitiveType::U32),
            FieldGen::View => {
                let f32_ty = types.primitive(PrimitiveType::F32);
                types.view(f32_ty)
            }
            FieldGen::Nested => {
                let i64_ty = types.primitive(PrimitiveType::I64);
                StructBuilder::new(format!("N{}", i))
                    .field("v", i64_ty)
                    .build(types)
            }
        };
        builder.add_field(format!("f{}", i), ty);
    }
    builder.build(types)
}

proptest! {
    #[test]
    fn prop_mapping_is_idempotent_and_preserves_ordinals(
        gens in proptest::collection::vec(field_gen(), 0..12),
    ) {
        let mut types = TypeContext::new();
        let root = build_struct(&mut types, &gens);
        let needs_mapping = gens.iter().any(|g| matches!(g, FieldGen::Enum | FieldGen::View));

        let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
        let first = mapper.map_type(root).unwrap();
        let count = mapper.types().len();
        let second = mapper.map_type(root).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(mapper.types().len(), count);
        prop_assert_eq!(first == root, !needs_mapping);

        let types = mapper.types();
        let original = types.fields(root);
        let mapped = types.fields(first);
        prop_assert_eq!(original.len(), mapped.len());
        for (a, b) in original.iter().zip(mapped) {
            prop_assert_eq!(a.ordinal, b.ordinal);
            prop_assert_eq!(&a.name, &b.name);
        }
    }

    #[test]
    fn prop_offsets_are_aligned_and_ordered(
        gens in proptest::collection::vec(field_gen(), 1..12),
    ) {
        let mut types = TypeContext::new();
        let root = build_struct(&mut types, &gens);
        let fields = types.fields(root);
        let mut end = 0;
        for field in fields {
            prop_assert_eq!(field.offset % types.align_of(field.field_type), 0);
            prop_assert!(field.offset >= end);
            end = field.offset + types.size_of(field.field_type);
        }
        prop_assert!(end <= types.size_of(root));
        prop_assert_eq!(types.size_of(root) % types.align_of(root), 0);
    }
}
