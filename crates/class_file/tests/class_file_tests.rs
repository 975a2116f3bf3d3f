mod common;

use cfr_class_file::{
    attribute_names::AttributeKind,
    attributes::{AttributeInfo, TARGET_TYPE_ERROR_IN_ATTRIBUTE},
    AccessFlags, ClassFile, ClassFileError, CpInfo, ErrorAction, ErrorCode, ReadFlags,
    ReadOptions, RESULT_FORMAT_ERROR, RESULT_OUT_OF_SPACE,
};

use common::*;

fn with_class_file(f: impl FnOnce(ClassFile)) {
    init_logger();
    f(ClassFile::parse(&my_class(52).build()).unwrap());
}

fn parse(bytes: &[u8], flags: ReadFlags) -> Result<ClassFile, ClassFileError> {
    init_logger();
    ClassFile::parse_with(
        bytes,
        ReadOptions::with_flags(flags),
        &mut cfr_class_file::NoVerification,
    )
}

fn error(bytes: &[u8], flags: ReadFlags) -> (ErrorCode, u32) {
    let failure = parse(bytes, flags).unwrap_err();
    let record = failure.record().unwrap();
    (record.code, record.offset)
}

#[test]
fn test_super_class() {
    with_class_file(|class_file| {
        assert_eq!(
            Some("java/lang/Object"),
            class_file.super_class().unwrap().as_deref()
        )
    });
}

#[test]
fn test_class_name() {
    with_class_file(|class_file| assert_eq!("my/MyClass", class_file.class_name().unwrap()));
}

#[test]
fn test_field_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "myField",
            class_file.field_name(&class_file.fields[0]).unwrap()
        )
    });
}

#[test]
fn test_int_field_type() {
    with_class_file(|class_file| {
        assert_eq!(
            "I",
            class_file.field_descriptor(&class_file.fields[0]).unwrap()
        )
    });
}

#[test]
fn test_field_access_flags() {
    with_class_file(|class_file| {
        assert_eq!(
            AccessFlags::FINAL | AccessFlags::PRIVATE,
            class_file.fields[0].access_flags
        )
    });
}

#[test]
fn test_constructor_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "<init>",
            class_file.method_name(&class_file.methods[0]).unwrap()
        )
    });
}

#[test]
fn test_method_descriptor() {
    with_class_file(|class_file| {
        assert_eq!(
            "(I)F",
            class_file
                .method_descriptor(&class_file.methods[1])
                .unwrap()
        )
    });
}

#[test]
fn test_method_code() {
    with_class_file(|class_file| {
        let code = class_file.methods[1].code().unwrap();
        assert_eq!(vec![0x0b, 0xae], code.code);
        assert!(!class_file.has_jsr());
    });
}

#[test]
fn test_structural_checks_accept_a_well_formed_class() {
    let bytes = my_class(52).build();
    let class_file = parse(&bytes, ReadFlags::STATIC_VERIFICATION).unwrap();
    assert_eq!(2, class_file.methods.len());
    assert_eq!(bytes.len() as u32, class_file.class_file_size);
}

#[test]
fn test_verifier_only_runs_with_static_verification() {
    let bytes = my_class(52).build();
    let mut calls = 0;
    let mut verifier = |_: &mut ClassFile, _: &ReadOptions| -> cfr_class_file::Result<bool> {
        calls += 1;
        Ok(false)
    };

    ClassFile::parse_with(&bytes, ReadOptions::default(), &mut verifier).unwrap();
    ClassFile::parse_with(
        &bytes,
        ReadOptions::with_flags(ReadFlags::STATIC_VERIFICATION),
        &mut verifier,
    )
    .unwrap();
    ClassFile::parse_with(
        &bytes,
        ReadOptions::with_flags(ReadFlags::STATIC_VERIFICATION | ReadFlags::UNSAFE),
        &mut verifier,
    )
    .unwrap();
    assert_eq!(1, calls);
}

#[test]
fn test_method_handle_before_v51() {
    let mut builder = ClassBuilder::class(50, "A");
    let offset = builder.next_entry_offset();
    builder.method_handle(6, 1);

    let bytes = builder.build();
    assert_eq!(
        (ErrorCode::ConstantInvalidBeforeV51, offset),
        error(&bytes, ReadFlags::empty())
    );
}

#[test]
fn test_empty_pool_has_no_valid_this_class() {
    let bytes = ClassBuilder::new(55).build();
    assert_eq!((ErrorCode::BadIndex, 8), error(&bytes, ReadFlags::empty()));
}

#[test]
fn test_duplicate_method() {
    let mut builder = ClassBuilder::class(52, "A");
    for _ in 0..2 {
        let code = builder.code(RETURN, vec![]);
        builder.method(ACC_PUBLIC, "foo", "()V", vec![code]);
    }
    let bytes = builder.build();

    // Structural checks only run with static verification
    let second_method = parse(&bytes, ReadFlags::empty()).unwrap().methods[1].offset;
    assert_eq!(
        (ErrorCode::DuplicateMethod, second_method),
        error(&bytes, ReadFlags::STATIC_VERIFICATION)
    );
}

#[test]
fn test_duplicate_method_offset_ignores_sorting() {
    let mut builder = ClassBuilder::class(52, "A");
    for name in ["bb", "a", "bb", "a"] {
        let code = builder.code(RETURN, vec![]);
        builder.method(ACC_PUBLIC, name, "()V", vec![code]);
    }
    let bytes = builder.build();
    let third_method = parse(&bytes, ReadFlags::empty()).unwrap().methods[2].offset;

    let options = ReadOptions {
        method_sorting_threshold: 0,
        ..ReadOptions::with_flags(ReadFlags::STATIC_VERIFICATION)
    };
    let failure =
        ClassFile::parse_with(&bytes, options, &mut cfr_class_file::NoVerification).unwrap_err();
    let record = failure.record().unwrap();
    assert_eq!(
        (ErrorCode::DuplicateMethod, third_method),
        (record.code, record.offset)
    );
}

#[test]
fn test_methods_are_sorted_past_the_threshold() {
    let mut builder = ClassBuilder::class(52, "A");
    for name in ["bb", "a"] {
        let code = builder.code(RETURN, vec![]);
        builder.method(ACC_PUBLIC, name, "()V", vec![code]);
    }
    let options = ReadOptions {
        method_sorting_threshold: 2,
        ..ReadOptions::with_flags(ReadFlags::STATIC_VERIFICATION)
    };

    let class_file =
        ClassFile::parse_with(&builder.build(), options, &mut cfr_class_file::NoVerification)
            .unwrap();
    let names = class_file
        .methods
        .iter()
        .map(|method| class_file.method_name(method).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(vec!["a", "bb"], names);
}

#[test]
fn test_long_takes_two_slots() {
    let mut builder = ClassBuilder::class(52, "A");
    let index = builder.long(42);
    let after = builder.integer(7);
    assert_eq!(index + 2, after);

    let class_file = parse(&builder.build(), ReadFlags::STATIC_VERIFICATION).unwrap();
    let constant_pool = &class_file.constant_pool;
    assert_eq!(
        Some(&CpInfo::Long {
            high_bytes: 0,
            low_bytes: 42
        }),
        constant_pool.get(index)
    );
    assert_eq!(Some(&CpInfo::Null), constant_pool.get(index + 1));
    assert_eq!(Some(&CpInfo::Integer(7)), constant_pool.get(after));
}

#[test]
fn test_truncated_annotations_are_kept_raw() {
    let mut builder = ClassBuilder::class(52, "A");
    let type_index = builder.utf8("LMy;");
    let name_index = builder.utf8("value");
    let [type_hi, type_lo] = type_index.to_be_bytes();
    let [name_hi, name_lo] = name_index.to_be_bytes();
    // The const_value_index of the only element is missing
    let payload = [0, 1, type_hi, type_lo, 0, 1, name_hi, name_lo, b'I'];
    let attribute = builder.attribute("RuntimeVisibleAnnotations", &payload);
    builder.class_attribute(attribute);

    let class_file = parse(&builder.build(), ReadFlags::empty()).unwrap();
    let attribute = class_file
        .attributes
        .find_by_kind(AttributeKind::RuntimeVisibleAnnotations)
        .unwrap();
    match &attribute.info {
        AttributeInfo::Annotations(annotations) => {
            assert!(!annotations.is_well_formed());
            assert!(annotations.annotations.is_empty());
            assert_eq!(&payload[..], &annotations.raw_data[..]);
        }
        info => panic!("unexpected {:?}", info),
    }
}

#[test]
fn test_truncated_type_annotations_carry_one_marker() {
    let mut builder = ClassBuilder::class(52, "A");
    let type_index = builder.utf8("LMy;");
    let [type_hi, type_lo] = type_index.to_be_bytes();
    // An empty target with no path, then an annotation cut short after its type
    let payload = [0, 1, 0x13, 0, type_hi, type_lo];
    let attribute = builder.attribute("RuntimeVisibleTypeAnnotations", &payload);
    builder.class_attribute(attribute);

    let class_file = parse(&builder.build(), ReadFlags::empty()).unwrap();
    match &class_file.attributes.iter().next().unwrap().info {
        AttributeInfo::TypeAnnotations(annotations) => {
            let mut raw_data = annotations.raw_data.clone();
            assert_eq!(payload.len() + 1, raw_data.len());
            assert_eq!(TARGET_TYPE_ERROR_IN_ATTRIBUTE, raw_data.remove(2));
            assert_eq!(&payload[..], &raw_data[..]);
        }
        info => panic!("unexpected {:?}", info),
    }
}

#[test]
fn test_truncated_parameter_annotations_start_with_zero() {
    let mut builder = ClassBuilder::class(52, "A");
    let payload = [1, 0, 1, 0];
    let attribute = builder.attribute("RuntimeVisibleParameterAnnotations", &payload);
    let code = builder.code(RETURN, vec![]);
    // Last in the method, and the class has no attributes, so the annotation runs
    // into the end of the input
    builder.method(ACC_PUBLIC | ACC_STATIC, "run", "(I)V", vec![code, attribute]);

    let class_file = parse(&builder.build(), ReadFlags::STATIC_VERIFICATION).unwrap();
    let attribute = class_file.methods[0]
        .attributes
        .find_by_kind(AttributeKind::RuntimeVisibleParameterAnnotations)
        .unwrap();
    match &attribute.info {
        AttributeInfo::ParameterAnnotations(annotations) => {
            assert_eq!(0, annotations.number_of_parameters);
            assert_eq!(0, annotations.raw_data[0]);
            assert_eq!(&payload[..], &annotations.raw_data[1..]);
        }
        info => panic!("unexpected {:?}", info),
    }
}

#[test]
fn test_unexpected_eof() {
    let bytes = my_class(52).build();
    let (code, offset) = error(&bytes[..bytes.len() - 3], ReadFlags::empty());
    assert_eq!(ErrorCode::UnexpectedEof, code);
    assert!(offset < bytes.len() as u32);

    // The header is checked as a whole before the magic is read
    assert_eq!(
        (ErrorCode::UnexpectedEof, 0),
        error(&bytes[..9], ReadFlags::empty())
    );
}

#[test]
fn test_expected_eof() {
    let mut bytes = my_class(52).build();
    let length = bytes.len() as u32;
    bytes.push(0);
    assert_eq!(
        (ErrorCode::ExpectedEof, length),
        error(&bytes, ReadFlags::empty())
    );
}

#[test]
fn test_bad_magic() {
    let mut builder = my_class(52);
    builder.magic = 0xCAFEBABF;
    assert_eq!(
        (ErrorCode::Magic, 0),
        error(&builder.build(), ReadFlags::empty())
    );
}

#[test]
fn test_unsupported_versions() {
    let failure = parse(&my_class(44).build(), ReadFlags::empty()).unwrap_err();
    let record = failure.record().unwrap();
    assert_eq!(ErrorCode::MajorVersion, record.code);
    assert_eq!(ErrorAction::UnsupportedClassVersion, record.action);
    assert_eq!(6, record.offset);
    assert_eq!(RESULT_FORMAT_ERROR, failure.result_code());

    let mut preview = my_class(61);
    preview.minor_version = 0xFFFF;
    let bytes = preview.build();
    assert_eq!(
        (ErrorCode::PreviewVersionNotEnabled, 6),
        error(&bytes, ReadFlags::empty())
    );
    assert!(parse(&bytes, ReadFlags::ENABLE_PREVIEW).is_ok());
}

#[test]
fn test_basic_check_only_stops_after_the_version() {
    let mut bytes = my_class(52).build();
    bytes.truncate(8);
    bytes.extend_from_slice(&[0xff; 4]);

    let class_file = parse(&bytes, ReadFlags::BASIC_CHECK_ONLY).unwrap();
    assert_eq!(52, class_file.major_version);
    assert_eq!(0, class_file.constant_pool.count());
}

#[test]
fn test_debug_attributes_are_stripped() {
    let mut builder = ClassBuilder::class(52, "A");
    let lines = builder.attribute("LineNumberTable", &[0, 1, 0, 0, 0, 7]);
    let code = builder.code(RETURN, vec![lines]);
    builder.method(ACC_PUBLIC, "run", "()V", vec![code]);
    let bytes = builder.build();

    let class_file = parse(&bytes, ReadFlags::empty()).unwrap();
    let line_numbers = &class_file.methods[0].code().unwrap().attributes.0[0];
    assert_eq!(AttributeKind::LineNumberTable, line_numbers.kind);

    let class_file = parse(&bytes, ReadFlags::STRIP_DEBUG_ATTRIBUTES).unwrap();
    let line_numbers = &class_file.methods[0].code().unwrap().attributes.0[0];
    assert_eq!(AttributeKind::StrippedLineNumberTable, line_numbers.kind);
    assert!(matches!(line_numbers.info, AttributeInfo::Skipped));
}

#[test]
fn test_synthetic_attribute_sets_the_flag() {
    let mut builder = ClassBuilder::class(52, "A");
    let synthetic = builder.attribute("Synthetic", &[]);
    builder.field(ACC_PRIVATE, "x", "I", vec![synthetic]);

    let class_file = parse(&builder.build(), ReadFlags::STATIC_VERIFICATION).unwrap();
    assert!(class_file.fields[0]
        .access_flags
        .contains(AccessFlags::SYNTHETIC));
}

#[test]
fn test_attribute_length_mismatch() {
    let mut builder = ClassBuilder::class(52, "A");
    let source = builder.utf8("A.java");
    let attribute = builder.attribute_with_length("SourceFile", 4, &source.to_be_bytes());
    let attribute_length = attribute.len();
    builder.class_attribute(attribute);
    let bytes = builder.build();
    let attribute_offset = (bytes.len() - attribute_length) as u32;
    assert_eq!(
        (ErrorCode::LengthTooSmall, attribute_offset + 2),
        error(&bytes, ReadFlags::empty())
    );

    let mut builder = ClassBuilder::class(52, "A");
    let source = builder.utf8("A.java");
    let attribute = builder.attribute_with_length("SourceFile", 1, &source.to_be_bytes());
    let attribute_length = attribute.len();
    builder.class_attribute(attribute);
    let bytes = builder.build();
    let attribute_offset = (bytes.len() - attribute_length) as u32;
    assert_eq!(
        (ErrorCode::LengthTooBig, attribute_offset + 2),
        error(&bytes, ReadFlags::empty())
    );
}

#[test]
fn test_hidden_class_is_renamed() {
    let builder = my_class(52);
    let bytes = builder.build();
    let options = ReadOptions {
        anonymous: true,
        ..ReadOptions::default()
    };

    let class_file =
        ClassFile::parse_with(&bytes, options, &mut cfr_class_file::NoVerification).unwrap();
    assert_eq!(
        "my/MyClass/0000000000000000",
        class_file.class_name().unwrap()
    );
    assert_eq!(builder.pool_count() + 1, class_file.constant_pool.count());
    assert_eq!(bytes.len() as u32 + 17, class_file.class_file_size);
}

#[test]
fn test_hidden_class_needs_room_for_its_extra_slot() {
    let options = ReadOptions {
        anonymous: true,
        ..ReadOptions::default()
    };
    let mut builder = my_class(52);
    while builder.pool_count() < u16::MAX - 1 {
        builder.integer(0);
    }

    let class_file = ClassFile::parse_with(
        &builder.build(),
        options.clone(),
        &mut cfr_class_file::NoVerification,
    )
    .unwrap();
    assert_eq!(u16::MAX, class_file.constant_pool.count());
    assert!(class_file.constant_pool.iter().count() > 0);

    builder.integer(0);
    assert_eq!(u16::MAX, builder.pool_count());
    let failure = ClassFile::parse_with(
        &builder.build(),
        options,
        &mut cfr_class_file::NoVerification,
    )
    .unwrap_err();
    let record = failure.record().unwrap();
    assert_eq!((ErrorCode::ConstantPoolFull, 8), (record.code, record.offset));
}

#[test]
fn test_out_of_space() {
    let options = ReadOptions {
        segment_size: 8,
        ..ReadOptions::default()
    };
    let failure = ClassFile::parse_with(
        &my_class(52).build(),
        options,
        &mut cfr_class_file::NoVerification,
    )
    .unwrap_err();
    assert!(matches!(failure, ClassFileError::OutOfSpace { .. }));
    assert_eq!(RESULT_OUT_OF_SPACE, failure.result_code());
    assert!(failure.record().is_none());
}

fn class_with_jsr(major_version: u16) -> Vec<u8> {
    let mut builder = ClassBuilder::class(major_version, "J");
    // jsr +3; return
    let code = builder.code(&[0xa8, 0x00, 0x03, 0xb1], vec![]);
    builder.method(ACC_PUBLIC | ACC_STATIC, "run", "()V", vec![code]);
    builder.build()
}

#[test]
fn test_jsr_in_new_class_is_a_verify_error() {
    let failure = parse(&class_with_jsr(52), ReadFlags::empty()).unwrap_err();
    let record = failure.record().unwrap();
    assert_eq!(ErrorCode::FoundJsrInClassVersion51, record.code);
    assert_eq!(ErrorAction::Verify, record.action);

    assert!(parse(&class_with_jsr(50), ReadFlags::empty()).is_ok());
    assert_eq!(
        ErrorCode::FoundJsrInClassVersion51,
        error(&class_with_jsr(50), ReadFlags::NO_FALLBACK).0
    );
}

#[test]
fn test_jsrs_are_tagged_or_inlined() {
    let left = parse(&class_with_jsr(52), ReadFlags::LEAVE_JSRS).unwrap();
    assert!(left.has_jsr());
    assert!(left.methods[0].has_jsr());

    let inlined = parse(&class_with_jsr(49), ReadFlags::empty()).unwrap();
    assert!(!inlined.has_jsr());
    assert!(!inlined.methods[0].has_jsr());
}
