use crate::{
    constant_pool::*,
    error::ErrorCode,
    ClassFileError, ConstantPool, Result,
};

use super::expect_tag;

const REF_GET_FIELD: u8 = 1;
const REF_PUT_STATIC: u8 = 4;
const REF_INVOKE_VIRTUAL: u8 = 5;
const REF_INVOKE_STATIC: u8 = 6;
const REF_INVOKE_SPECIAL: u8 = 7;
const REF_NEW_INVOKE_SPECIAL: u8 = 8;
const REF_INVOKE_INTERFACE: u8 = 9;

/// Checks every reference held by the pool entries and returns the largest
/// bootstrap method index used by a Dynamic or InvokeDynamic entry.
pub(super) fn check_pool(constant_pool: &ConstantPool, major_version: u16) -> Result<Option<u16>> {
    let mut max_bootstrap_index = None;

    for entry in constant_pool {
        let offset = entry.offset;
        let expect =
            |index, tag, wrong_tag| expect_tag(constant_pool, index, tag, wrong_tag, offset);

        match &entry.info {
            CpInfo::Null
            | CpInfo::Utf8(_)
            | CpInfo::Integer(_)
            | CpInfo::Float(_)
            | CpInfo::Long { .. }
            | CpInfo::Double { .. } => {}
            CpInfo::Class(ClassInfo { name_index }) => {
                expect(*name_index, CONSTANT_UTF8, ErrorCode::BadNameIndex)?
            }
            CpInfo::String { string_index } => {
                expect(*string_index, CONSTANT_UTF8, ErrorCode::BadStringIndex)?
            }
            CpInfo::FieldRef(info) | CpInfo::MethodRef(info) | CpInfo::InterfaceMethodRef(info) => {
                expect(info.class_index, CONSTANT_CLASS, ErrorCode::BadClassIndex)?;
                expect(
                    info.name_and_type_index,
                    CONSTANT_NAME_AND_TYPE,
                    ErrorCode::BadNameAndTypeIndex,
                )?;
            }
            CpInfo::NameAndType(info) => {
                expect(info.name_index, CONSTANT_UTF8, ErrorCode::BadNameIndex)?;
                expect(
                    info.descriptor_index,
                    CONSTANT_UTF8,
                    ErrorCode::BadDescriptorIndex,
                )?;
            }
            CpInfo::MethodType(info) => {
                expect(
                    info.descriptor_index,
                    CONSTANT_UTF8,
                    ErrorCode::BadDescriptorIndex,
                )?;
            }
            CpInfo::MethodHandle(info) => {
                check_method_handle(constant_pool, info, major_version, offset)?
            }
            CpInfo::Dynamic(info) | CpInfo::InvokeDynamic(info) => {
                max_bootstrap_index =
                    max_bootstrap_index.max(Some(info.bootstrap_method_attr_index));
                expect(
                    info.name_and_type_index,
                    CONSTANT_NAME_AND_TYPE,
                    ErrorCode::BadNameAndTypeIndex,
                )?;
            }
            CpInfo::Module { name_index } | CpInfo::Package { name_index } => {
                expect(*name_index, CONSTANT_UTF8, ErrorCode::BadNameIndex)?
            }
        }
    }

    Ok(max_bootstrap_index)
}

/// The reference kind has to suit the tag of the referenced member.
fn check_method_handle(
    constant_pool: &ConstantPool,
    info: &MethodHandleInfo,
    major_version: u16,
    offset: u32,
) -> Result<()> {
    let index = info.reference_index;
    if !super::is_valid_index(constant_pool, index) {
        return Err(ClassFileError::format(ErrorCode::BadIndex, offset));
    }

    let kind = info.reference_kind;
    let kind_matches = match constant_pool.tag(index) {
        CONSTANT_FIELD_REF => (REF_GET_FIELD..=REF_PUT_STATIC).contains(&kind),
        CONSTANT_METHOD_REF => (REF_INVOKE_VIRTUAL..=REF_NEW_INVOKE_SPECIAL).contains(&kind),
        CONSTANT_INTERFACE_METHOD_REF => {
            kind == REF_INVOKE_INTERFACE
                || (major_version >= 52
                    && (kind == REF_INVOKE_STATIC || kind == REF_INVOKE_SPECIAL))
        }
        _ => return Err(ClassFileError::format(ErrorCode::BadMethodHandleRef, offset)),
    };

    if kind_matches {
        Ok(())
    } else {
        Err(ClassFileError::format(ErrorCode::BadIndex, offset))
    }
}
