use std::cmp::Ordering;

use log::{debug, trace};

use crate::{
    attribute_names::AttributeKind,
    class_file::{FieldInfo, Member, MethodInfo},
    error::ErrorCode,
    AccessFlags, ClassFileError, ConstantPool, Result,
};

use super::Parser;

impl<'a> Parser<'a> {
    pub(super) fn parse_fields(&mut self, constant_pool: &ConstantPool) -> Result<Vec<FieldInfo>> {
        let fields_count = self.read_u16()? as usize;
        debug!("Reading {} fields", fields_count);
        self.arena.allocate_array::<FieldInfo>(fields_count)?;

        (0..fields_count)
            .map(|_| self.parse_field_info(constant_pool))
            .collect()
    }

    pub(super) fn parse_methods(
        &mut self,
        constant_pool: &ConstantPool,
    ) -> Result<Vec<MethodInfo>> {
        let methods_count = self.read_u16()? as usize;
        debug!("Reading {} methods", methods_count);
        self.arena.allocate_array::<MethodInfo>(methods_count)?;

        (0..methods_count)
            .map(|_| self.parse_method_info(constant_pool))
            .collect()
    }

    fn parse_field_info(&mut self, constant_pool: &ConstantPool) -> Result<FieldInfo> {
        let mut field = self.parse_member(constant_pool, AccessFlags::FIELD_MASK)?;

        for (i, attribute) in field.attributes.iter().enumerate() {
            if attribute.kind == AttributeKind::ConstantValue
                && field.constant_value_attribute.replace(i).is_some()
            {
                return Err(ClassFileError::format(
                    ErrorCode::TwoConstantValueAttributes,
                    attribute.offset,
                ));
            }
        }

        Ok(field)
    }

    fn parse_method_info(&mut self, constant_pool: &ConstantPool) -> Result<MethodInfo> {
        let mut method = self.parse_member(constant_pool, AccessFlags::METHOD_MASK)?;

        for (i, attribute) in method.attributes.iter().enumerate() {
            let (slot, duplicate) = match attribute.kind {
                AttributeKind::Code => (&mut method.code_attribute, ErrorCode::TwoCodeAttributes),
                AttributeKind::Exceptions => (
                    &mut method.exceptions_attribute,
                    ErrorCode::TwoExceptionsAttributes,
                ),
                AttributeKind::MethodParameters => (
                    &mut method.method_parameters_attribute,
                    ErrorCode::TwoMethodParametersAttributes,
                ),
                _ => continue,
            };
            if slot.replace(i).is_some() {
                return Err(ClassFileError::format(duplicate, attribute.offset));
            }
        }

        Ok(method)
    }

    fn parse_member(&mut self, constant_pool: &ConstantPool, mask: AccessFlags) -> Result<Member> {
        let offset = self.position();
        self.ensure(8)?;
        let mut access_flags = AccessFlags::from_bits_truncate(self.read_u16()?) & mask;
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        let (attributes, synthetic) = self.parse_attribute_list(constant_pool)?;
        if synthetic {
            access_flags.insert(AccessFlags::SYNTHETIC);
        }

        Ok(Member {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
            offset,
            ..Member::default()
        })
    }
}

/// Orders methods by name length, descriptor length, name bytes and then descriptor
/// bytes.
pub(super) fn sort_methods(methods: &mut [MethodInfo], constant_pool: &ConstantPool) {
    trace!("Sorting {} methods", methods.len());
    methods.sort_unstable_by(|a, b| compare_methods(a, b, constant_pool));
}

fn compare_methods(a: &MethodInfo, b: &MethodInfo, constant_pool: &ConstantPool) -> Ordering {
    let a_name = constant_pool.utf8_bytes(a.name_index);
    let b_name = constant_pool.utf8_bytes(b.name_index);
    let a_descriptor = constant_pool.utf8_bytes(a.descriptor_index);
    let b_descriptor = constant_pool.utf8_bytes(b.descriptor_index);

    a_name
        .len()
        .cmp(&b_name.len())
        .then(a_descriptor.len().cmp(&b_descriptor.len()))
        .then_with(|| a_name.cmp(b_name))
        .then_with(|| a_descriptor.cmp(b_descriptor))
}
