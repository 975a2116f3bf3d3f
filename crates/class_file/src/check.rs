//! Structural checks over a class file that has been read completely.

use log::trace;

use crate::{
    class_file::ClassFile,
    constant_pool::CONSTANT_CLASS,
    error::ErrorCode,
    options::{ReadFlags, ReadOptions},
    AccessFlags, ClassFileError, ConstantPool, Result,
};

mod attributes;
mod descriptors;
mod duplicates;
mod members;
mod pool;

use attributes::Scope;

const JAVA_LANG_OBJECT: &[u8] = b"java/lang/Object";
/// Minor version marking a class file that uses preview features.
const PREVIEW_MINOR_VERSION: u16 = 0xFFFF;
/// First major version whose minor version is reserved for the preview marker.
const PREVIEW_MAJOR_VERSION: u16 = 56;

/// Accepts majors 45 up to the host ceiling. Failures are reported at the version
/// fields.
pub(crate) fn check_class_version(major: u16, minor: u16, options: &ReadOptions) -> Result<()> {
    let ceiling = options.max_major_version;
    if major < 45 || major > ceiling {
        return Err(ClassFileError::unsupported_version(
            ErrorCode::MajorVersion,
            6,
        ));
    }
    if minor == 0 {
        return Ok(());
    }

    if major < PREVIEW_MAJOR_VERSION {
        return if major < ceiling {
            Ok(())
        } else {
            Err(ClassFileError::unsupported_version(
                ErrorCode::MinorVersion,
                6,
            ))
        };
    }

    if minor != PREVIEW_MINOR_VERSION {
        return Err(ClassFileError::unsupported_version(
            ErrorCode::MinorVersion,
            6,
        ));
    }
    if options.has(ReadFlags::ANY_PREVIEW_VERSION)
        || (options.has(ReadFlags::ENABLE_PREVIEW) && major == ceiling)
    {
        Ok(())
    } else {
        Err(ClassFileError::unsupported_version(
            ErrorCode::PreviewVersionNotEnabled,
            6,
        ))
    }
}

/// Runs every structural check on `class_file`, stopping at the first failure.
///
/// Besides checking, this settles the flags of `<clinit>` methods.
pub(crate) fn check_class(class_file: &mut ClassFile, options: &ReadOptions) -> Result<()> {
    let max_bootstrap_index =
        pool::check_pool(&class_file.constant_pool, class_file.major_version)?;
    check_class_flags(class_file, options)?;
    check_super_types(class_file)?;

    members::check_fields(class_file, options)?;
    members::check_methods(class_file, options)?;

    let threshold = options.duplicate_hash_threshold;
    duplicates::check_duplicate_members(
        &class_file.fields,
        &class_file.constant_pool,
        threshold,
        ErrorCode::DuplicateField,
    )?;
    duplicates::check_duplicate_members(
        &class_file.methods,
        &class_file.constant_pool,
        threshold,
        ErrorCode::DuplicateMethod,
    )?;

    trace!("Checking class attributes");
    attributes::check_attributes(
        &class_file.constant_pool,
        &class_file.attributes,
        Scope::Class {
            max_bootstrap_index,
        },
        options,
    )
}

fn check_class_flags(class_file: &ClassFile, options: &ReadOptions) -> Result<()> {
    let mask = if options.host_is_java9_or_later() {
        AccessFlags::CLASS_MASK_9
    } else {
        AccessFlags::CLASS_MASK
    };
    let mut flags = class_file.access_flags & mask;
    if class_file.major_version < 49 {
        flags.remove(AccessFlags::CLASS_JDK5);
        // Older compilers set ACC_SUPER on interfaces
        if flags.contains(AccessFlags::INTERFACE) {
            flags.remove(AccessFlags::SUPER);
        }
    }

    let offset = class_file.end_of_constant_pool;
    let code = if flags.contains(AccessFlags::ANNOTATION) && !flags.contains(AccessFlags::INTERFACE)
    {
        ErrorCode::AnnotationNotInterface
    } else if flags.contains(AccessFlags::FINAL | AccessFlags::ABSTRACT) {
        ErrorCode::FinalAbstractClass
    } else if flags.contains(AccessFlags::INTERFACE)
        && !AccessFlags::INTERFACE_CLASS_MASK.contains(flags)
    {
        ErrorCode::InterfaceFlags
    } else {
        return Ok(());
    };

    Err(ClassFileError::format(code, offset))
}

fn check_super_types(class_file: &ClassFile) -> Result<()> {
    let constant_pool = &class_file.constant_pool;
    let offset = class_file.end_of_constant_pool;

    expect_tag(
        constant_pool,
        class_file.this_class,
        CONSTANT_CLASS,
        ErrorCode::NotClass,
        offset + 2,
    )?;

    if class_file.super_class == 0 {
        if !names_java_lang_object(constant_pool, class_file.this_class) {
            return Err(ClassFileError::format(ErrorCode::NullSuper, offset + 4));
        }
    } else {
        expect_tag(
            constant_pool,
            class_file.super_class,
            CONSTANT_CLASS,
            ErrorCode::SuperNotClass,
            offset + 4,
        )?;
    }

    for (i, &interface) in class_file.interfaces.iter().enumerate() {
        let interface_offset = offset + 8 + 2 * i as u32;
        expect_tag(
            constant_pool,
            interface,
            CONSTANT_CLASS,
            ErrorCode::InterfaceNotClass,
            interface_offset,
        )?;

        let name = constant_pool.class_name(interface).map(|n| &n.bytes);
        let duplicate = class_file.interfaces[..i]
            .iter()
            .any(|&other| constant_pool.class_name(other).map(|n| &n.bytes) == name);
        if duplicate {
            return Err(ClassFileError::format(
                ErrorCode::DuplicateInterface,
                interface_offset,
            ));
        }
    }

    if class_file.access_flags.contains(AccessFlags::INTERFACE)
        && !names_java_lang_object(constant_pool, class_file.super_class)
    {
        return Err(ClassFileError::format(
            ErrorCode::InterfaceSuperNotObject,
            offset + 4,
        ));
    }

    Ok(())
}

fn names_java_lang_object(constant_pool: &ConstantPool, class_index: u16) -> bool {
    constant_pool
        .class_name(class_index)
        .map_or(false, |name| name.bytes == JAVA_LANG_OBJECT)
}

/// Indices 1 up to, but excluding, the pool count are usable.
fn is_valid_index(constant_pool: &ConstantPool, index: u16) -> bool {
    index != 0 && index < constant_pool.count()
}

/// Fails with [`ErrorCode::BadIndex`] unless `index` is usable, and with `wrong_tag`
/// unless the entry carries `tag`.
fn expect_tag(
    constant_pool: &ConstantPool,
    index: u16,
    tag: u8,
    wrong_tag: ErrorCode,
    offset: u32,
) -> Result<()> {
    if !is_valid_index(constant_pool, index) {
        return Err(ClassFileError::format(ErrorCode::BadIndex, offset));
    }
    if constant_pool.tag(index) != tag {
        return Err(ClassFileError::format(wrong_tag, offset));
    }
    Ok(())
}

/// Like [`expect_tag`] but index 0 stands for "none".
fn expect_optional_tag(
    constant_pool: &ConstantPool,
    index: u16,
    tag: u8,
    wrong_tag: ErrorCode,
    offset: u32,
) -> Result<()> {
    if index == 0 {
        Ok(())
    } else {
        expect_tag(constant_pool, index, tag, wrong_tag, offset)
    }
}
