use crate::{
    class_file::{ClassFile, FieldInfo, MethodInfo},
    constant_pool::{
        CONSTANT_DOUBLE, CONSTANT_FLOAT, CONSTANT_INTEGER, CONSTANT_LONG, CONSTANT_STRING,
        CONSTANT_UTF8,
    },
    error::ErrorCode,
    options::{ReadFlags, ReadOptions},
    AccessFlags, ClassFileError, ConstantPool, Result,
};

use super::{
    attributes::{check_attributes, Scope},
    expect_tag,
};

const CLINIT: &[u8] = b"<clinit>";
const INIT: &[u8] = b"<init>";
const MAX_CODE_LENGTH: usize = 65535;

pub(super) fn check_fields(class_file: &ClassFile, options: &ReadOptions) -> Result<()> {
    let is_interface = class_file.access_flags.contains(AccessFlags::INTERFACE);
    class_file.fields.iter().try_for_each(|field| {
        check_field(
            field,
            &class_file.constant_pool,
            class_file.major_version,
            is_interface,
            options,
        )
    })
}

fn check_field(
    field: &FieldInfo,
    constant_pool: &ConstantPool,
    major_version: u16,
    is_interface: bool,
    options: &ReadOptions,
) -> Result<()> {
    let mut flags = field.access_flags & AccessFlags::FIELD_MASK;
    if major_version < 49 {
        flags.remove(AccessFlags::FIELD_JDK5);
    }

    let code = if is_interface
        && (!AccessFlags::INTERFACE_FIELD_MASK.contains(flags)
            || !flags.contains(AccessFlags::INTERFACE_FIELD_REQUIRED))
    {
        Some(ErrorCode::InterfaceField)
    } else if flags.has_visibility_conflict() {
        Some(ErrorCode::AccessConflictField)
    } else if flags.contains(AccessFlags::FINAL | AccessFlags::VOLATILE) {
        Some(ErrorCode::FinalVolatileField)
    } else {
        None
    };
    if let Some(code) = code {
        return Err(ClassFileError::format(code, field.offset));
    }

    expect_tag(
        constant_pool,
        field.name_index,
        CONSTANT_UTF8,
        ErrorCode::BadNameIndex,
        field.offset + 2,
    )?;
    expect_tag(
        constant_pool,
        field.descriptor_index,
        CONSTANT_UTF8,
        ErrorCode::BadDescriptorIndex,
        field.offset + 4,
    )?;

    check_attributes(constant_pool, &field.attributes, Scope::Member, options)?;

    // Only static final fields take their initial value from ConstantValue
    if let Some(value_index) = field.constant_value() {
        if field
            .access_flags
            .contains(AccessFlags::STATIC | AccessFlags::FINAL)
            && !constant_suits_descriptor(
                constant_pool.utf8_bytes(field.descriptor_index),
                constant_pool.tag(value_index),
            )
        {
            return Err(ClassFileError::format(
                ErrorCode::IncompatibleConstantValue,
                field.offset + 4,
            ));
        }
    }

    Ok(())
}

/// Whether a constant with pool tag `tag` can initialize a field of type
/// `descriptor`.
fn constant_suits_descriptor(descriptor: &[u8], tag: u8) -> bool {
    let expected = match descriptor.first() {
        Some(b'B' | b'C' | b'I' | b'S' | b'Z') => CONSTANT_INTEGER,
        Some(b'J') => CONSTANT_LONG,
        Some(b'F') => CONSTANT_FLOAT,
        Some(b'D') => CONSTANT_DOUBLE,
        Some(b'L') => {
            return tag == CONSTANT_STRING && descriptor == b"Ljava/lang/String;";
        }
        _ => return false,
    };
    tag == expected
}

pub(super) fn check_methods(class_file: &mut ClassFile, options: &ReadOptions) -> Result<()> {
    let is_interface = class_file.access_flags.contains(AccessFlags::INTERFACE);
    let major_version = class_file.major_version;
    let constant_pool = &class_file.constant_pool;

    class_file.methods.iter_mut().try_for_each(|method| {
        check_method_flags(method, constant_pool, major_version, is_interface, options)?;
        check_method(method, constant_pool, options)
    })
}

/// Checks the access flags of `method`. `<clinit>` is exempt from the usual rules
/// and has its flags settled here instead.
fn check_method_flags(
    method: &mut MethodInfo,
    constant_pool: &ConstantPool,
    major_version: u16,
    is_interface: bool,
    options: &ReadOptions,
) -> Result<()> {
    let name = constant_pool.utf8(method.name_index).map(|n| &n.bytes[..]);
    let host_is_java9 = options.host_is_java9_or_later();
    let xfuture = options.has(ReadFlags::XFUTURE);
    let offset = method.offset;
    let fail = |code| Err(ClassFileError::format(code, offset));

    let mut flags = method.access_flags & AccessFlags::METHOD_MASK;
    if major_version < 49 {
        flags.remove(AccessFlags::METHOD_JDK5);
    }
    if major_version < 46 && !xfuture {
        flags.remove(AccessFlags::STRICT);
    }

    if name == Some(CLINIT) {
        if major_version < 51 {
            method.access_flags.insert(AccessFlags::STATIC);
        } else if host_is_java9 && !method.access_flags.contains(AccessFlags::STATIC) {
            return fail(ErrorCode::ClinitNotStatic);
        }
        method.access_flags &= AccessFlags::CLINIT_MASK;
        return Ok(());
    }

    if name == Some(INIT) {
        if !AccessFlags::INIT_MASK.contains(flags) {
            return fail(ErrorCode::InitMethod);
        }
        if host_is_java9 && is_interface {
            return fail(ErrorCode::InitInInterface);
        }
    }

    if is_interface {
        return if interface_method_flags_are_legal(flags, major_version, xfuture) {
            Ok(())
        } else {
            fail(ErrorCode::InterfaceMethod)
        };
    }

    if flags.contains(AccessFlags::ABSTRACT) && !AccessFlags::ABSTRACT_METHOD_MASK.contains(flags) {
        return fail(ErrorCode::AbstractMethod);
    }
    if flags.has_visibility_conflict() {
        return fail(ErrorCode::AccessConflictMethod);
    }

    Ok(())
}

fn interface_method_flags_are_legal(flags: AccessFlags, major_version: u16, xfuture: bool) -> bool {
    if major_version < 52 {
        let mut mask = AccessFlags::INTERFACE_METHOD_MASK;
        // Tolerated in older interfaces unless running strict
        if !xfuture {
            mask |= AccessFlags::STRICT | AccessFlags::SYNCHRONIZED;
        }
        return mask.contains(flags) && flags.contains(AccessFlags::INTERFACE_METHOD_REQUIRED);
    }

    let illegal = AccessFlags::PROTECTED
        | AccessFlags::FINAL
        | AccessFlags::NATIVE
        | AccessFlags::SYNCHRONIZED;
    let visibility = flags & (AccessFlags::PUBLIC | AccessFlags::PRIVATE);

    !flags.intersects(illegal)
        && visibility.bits().count_ones() == 1
        && (!flags.contains(AccessFlags::ABSTRACT)
            || AccessFlags::ABSTRACT_METHOD_MASK.contains(flags))
}

fn check_method(
    method: &MethodInfo,
    constant_pool: &ConstantPool,
    options: &ReadOptions,
) -> Result<()> {
    expect_tag(
        constant_pool,
        method.name_index,
        CONSTANT_UTF8,
        ErrorCode::BadNameIndex,
        method.offset + 2,
    )?;
    expect_tag(
        constant_pool,
        method.descriptor_index,
        CONSTANT_UTF8,
        ErrorCode::BadDescriptorIndex,
        method.offset + 4,
    )?;

    check_attributes(constant_pool, &method.attributes, Scope::Member, options)?;

    if let Some(code) = method.code() {
        let error = if code.code.len() > MAX_CODE_LENGTH {
            Some(ErrorCode::CodeArrayTooLarge)
        } else if method
            .access_flags
            .intersects(AccessFlags::NATIVE | AccessFlags::ABSTRACT)
        {
            Some(ErrorCode::CodeForAbstractOrNative)
        } else {
            None
        };
        if let Some(error) = error {
            return Err(ClassFileError::format(error, method.offset + 4));
        }
    }

    Ok(())
}
