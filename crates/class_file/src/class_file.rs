use std::borrow::Cow;

use bitflags::bitflags;

use crate::{
    attributes::{AttributeInfo, Attributes, CodeAttribute},
    constant_pool::ClassInfo,
    matches_cp_info,
    options::ReadOptions,
    parser::Parser,
    verifier::StaticVerifier,
    AccessFlags, ConstantPool, Result,
};

bitflags! {
    /// Properties discovered while reading that the class file does not spell out
    /// as access flags.
    #[derive(Default)]
    pub struct ClassFlags: u32 {
        const HAS_JSR = 0x0001;
        const IS_RECORD = 0x0002;
        const IS_SEALED = 0x0004;
    }
}

bitflags! {
    #[derive(Default)]
    pub struct MemberFlags: u16 {
        const HAS_JSR = 0x0001;
    }
}

#[derive(Debug, Default)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Attributes,
    pub class_flags: ClassFlags,
    /// Size of the input, grown by rewrites such as hidden class renaming.
    pub class_file_size: u32,
    /// Offset just past the constant pool.
    pub end_of_constant_pool: u32,
}
impl ClassFile {
    /// Reads `bytes` with the default options and no static verification.
    pub fn parse(bytes: &[u8]) -> Result<ClassFile> {
        Parser::new(bytes, ReadOptions::default()).parse()
    }

    pub fn parse_with(
        bytes: &[u8],
        options: ReadOptions,
        verifier: &mut dyn StaticVerifier,
    ) -> Result<ClassFile> {
        Parser::new(bytes, options).parse_with(verifier)
    }

    pub fn super_class(&self) -> Result<Option<Cow<'_, str>>> {
        // Zero only for java/lang/Object
        if self.super_class == 0 {
            return Ok(None);
        }

        Ok(Some(self.class_name_at(self.super_class)?))
    }

    pub fn class_name(&self) -> Result<Cow<'_, str>> {
        self.class_name_at(self.this_class)
    }

    pub fn interface_names(&self) -> Result<Vec<Cow<'_, str>>> {
        self.interfaces
            .iter()
            .map(|&index| self.class_name_at(index))
            .collect()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Result<Cow<'_, str>> {
        self.member_utf8(field.name_index)
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Result<Cow<'_, str>> {
        self.member_utf8(field.descriptor_index)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<Cow<'_, str>> {
        self.member_utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<Cow<'_, str>> {
        self.member_utf8(method.descriptor_index)
    }

    pub fn has_jsr(&self) -> bool {
        self.class_flags.contains(ClassFlags::HAS_JSR)
    }

    fn class_name_at(&self, index: u16) -> Result<Cow<'_, str>> {
        let ClassInfo { name_index } = matches_cp_info!(self.constant_pool, index, Class)?;

        Ok(matches_cp_info!(self.constant_pool, *name_index, Utf8)?.as_str())
    }

    fn member_utf8(&self, index: u16) -> Result<Cow<'_, str>> {
        Ok(matches_cp_info!(self.constant_pool, index, Utf8)?.as_str())
    }
}

/// A field or a method.
#[derive(Debug, Default)]
pub struct Member {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
    /// Offset of the member header in the class file.
    pub offset: u32,
    pub flags: MemberFlags,
    pub(crate) code_attribute: Option<usize>,
    pub(crate) exceptions_attribute: Option<usize>,
    pub(crate) method_parameters_attribute: Option<usize>,
    pub(crate) constant_value_attribute: Option<usize>,
}
pub type FieldInfo = Member;
pub type MethodInfo = Member;

impl Member {
    pub fn code(&self) -> Option<&CodeAttribute> {
        match &self.attributes.0.get(self.code_attribute?)?.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        }
    }

    pub(crate) fn code_mut(&mut self) -> Option<&mut CodeAttribute> {
        match &mut self.attributes.0.get_mut(self.code_attribute?)?.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn exceptions(&self) -> Option<&[u16]> {
        match &self.attributes.0.get(self.exceptions_attribute?)?.info {
            AttributeInfo::Exceptions {
                exception_index_table,
            } => Some(exception_index_table),
            _ => None,
        }
    }

    pub fn method_parameters(&self) -> Option<&[crate::attributes::MethodParameter]> {
        match &self.attributes.0.get(self.method_parameters_attribute?)?.info {
            AttributeInfo::MethodParameters(parameters) => Some(parameters),
            _ => None,
        }
    }

    /// Pool index held by the ConstantValue attribute.
    pub fn constant_value(&self) -> Option<u16> {
        match self.attributes.0.get(self.constant_value_attribute?)?.info {
            AttributeInfo::ConstantValue {
                constant_value_index,
            } => Some(constant_value_index),
            _ => None,
        }
    }

    pub fn has_jsr(&self) -> bool {
        self.flags.contains(MemberFlags::HAS_JSR)
    }
}
