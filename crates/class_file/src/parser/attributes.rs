// https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7

use bitflags::bitflags;
use log::trace;

use crate::{
    attribute_names::{classify, AttributeKind},
    attributes::{
        Attribute, AttributeInfo, Attributes, BootstrapMethod, CodeAttribute,
        ExceptionTableEntry, InnerClass, LineNumber, LocalVariable, MethodParameter,
        RecordComponent,
    },
    constant_pool::CpInfo,
    error::ErrorCode,
    options::ReadFlags,
    ClassFileError, ConstantPool, Result,
};

use super::Parser;

bitflags! {
    /// Attributes already read from the current list that may appear only once.
    struct Seen: u16 {
        const SOURCE_FILE = 0x0001;
        const SOURCE_DEBUG_EXTENSION = 0x0002;
        const BOOTSTRAP_METHODS = 0x0004;
        const ANNOTATION_DEFAULT = 0x0008;
        const VISIBLE_ANNOTATIONS = 0x0010;
        const INVISIBLE_ANNOTATIONS = 0x0020;
        const VISIBLE_PARAMETER_ANNOTATIONS = 0x0040;
        const INVISIBLE_PARAMETER_ANNOTATIONS = 0x0080;
        const VISIBLE_TYPE_ANNOTATIONS = 0x0100;
        const INVISIBLE_TYPE_ANNOTATIONS = 0x0200;
        const NEST = 0x0400;
        const RECORD = 0x0800;
        const PERMITTED_SUBCLASSES = 0x1000;
        const LOADABLE_DESCRIPTORS = 0x2000;
    }
}

fn single_occurrence(kind: AttributeKind) -> Option<(Seen, ErrorCode)> {
    use AttributeKind::*;

    Some(match kind {
        SourceFile => (Seen::SOURCE_FILE, ErrorCode::MultipleSourceFile),
        SourceDebugExtension => (
            Seen::SOURCE_DEBUG_EXTENSION,
            ErrorCode::MultipleSourceDebugExtension,
        ),
        BootstrapMethods => (Seen::BOOTSTRAP_METHODS, ErrorCode::MultipleBootstrapMethods),
        AnnotationDefault => (Seen::ANNOTATION_DEFAULT, ErrorCode::MultipleAnnotationDefault),
        RuntimeVisibleAnnotations => (Seen::VISIBLE_ANNOTATIONS, ErrorCode::MultipleAnnotations),
        RuntimeInvisibleAnnotations => {
            (Seen::INVISIBLE_ANNOTATIONS, ErrorCode::MultipleAnnotations)
        }
        RuntimeVisibleParameterAnnotations => (
            Seen::VISIBLE_PARAMETER_ANNOTATIONS,
            ErrorCode::MultipleParameterAnnotations,
        ),
        RuntimeInvisibleParameterAnnotations => (
            Seen::INVISIBLE_PARAMETER_ANNOTATIONS,
            ErrorCode::MultipleParameterAnnotations,
        ),
        RuntimeVisibleTypeAnnotations => (
            Seen::VISIBLE_TYPE_ANNOTATIONS,
            ErrorCode::MultipleTypeAnnotations,
        ),
        RuntimeInvisibleTypeAnnotations => (
            Seen::INVISIBLE_TYPE_ANNOTATIONS,
            ErrorCode::MultipleTypeAnnotations,
        ),
        NestHost | NestMembers => (Seen::NEST, ErrorCode::MultipleNestAttributes),
        Record => (Seen::RECORD, ErrorCode::MultipleRecord),
        PermittedSubclasses => (
            Seen::PERMITTED_SUBCLASSES,
            ErrorCode::MultiplePermittedSubclasses,
        ),
        LoadableDescriptors => (
            Seen::LOADABLE_DESCRIPTORS,
            ErrorCode::MultipleLoadableDescriptors,
        ),
        _ => return None,
    })
}

impl<'a> Parser<'a> {
    /// Reads an `attributes_count` and that many attributes. The flag tells whether
    /// a Synthetic attribute was among them.
    pub(super) fn parse_attribute_list(
        &mut self,
        constant_pool: &ConstantPool,
    ) -> Result<(Attributes, bool)> {
        let attributes_count = self.read_u16()? as usize;
        self.arena.allocate_array::<Attribute>(attributes_count)?;

        let mut seen = Seen::empty();
        let mut synthetic = false;
        let mut attributes = Vec::with_capacity(attributes_count);
        for _ in 0..attributes_count {
            let attribute = self.parse_attribute(constant_pool, &mut seen)?;
            synthetic |= attribute.kind == AttributeKind::Synthetic;
            attributes.push(attribute);
        }

        Ok((Attributes(attributes), synthetic))
    }

    fn parse_attribute(&mut self, constant_pool: &ConstantPool, seen: &mut Seen) -> Result<Attribute> {
        let offset = self.position();
        self.ensure(6)?;
        let name_index = self.read_u16()?;
        let length = self.read_u32()?;

        let name = match constant_pool.get(name_index) {
            _ if name_index == 0 => None,
            None => None,
            Some(CpInfo::Utf8(name)) => Some(name),
            Some(_) => {
                return Err(ClassFileError::format(
                    ErrorCode::BadAttributeName,
                    offset,
                ))
            }
        }
        .ok_or_else(|| ClassFileError::format(ErrorCode::BadIndex, offset))?;

        let kind = classify(
            &name.bytes,
            self.options.has(ReadFlags::STRIP_DEBUG_ATTRIBUTES),
        );
        if let Some((flag, duplicate)) = single_occurrence(kind) {
            if seen.contains(flag) {
                return Err(ClassFileError::format(duplicate, offset));
            }
            seen.insert(flag);
        }

        let start = self.position();
        let info = self.parse_attribute_info(constant_pool, kind, start, length)?;

        let end = u64::from(start) + u64::from(length);
        let position = u64::from(self.position());
        if position != end {
            let code = if position < end {
                ErrorCode::LengthTooSmall
            } else {
                ErrorCode::LengthTooBig
            };
            return Err(ClassFileError::format(code, offset + 2));
        }

        Ok(Attribute {
            kind,
            name_index,
            length,
            offset,
            info,
        })
    }

    fn parse_attribute_info(
        &mut self,
        constant_pool: &ConstantPool,
        kind: AttributeKind,
        start: u32,
        length: u32,
    ) -> Result<AttributeInfo> {
        use AttributeKind as K;

        let retain_invisible = self
            .options
            .has(ReadFlags::RETAIN_RUNTIME_INVISIBLE_ATTRIBUTES);

        Ok(match kind {
            K::SourceFile => AttributeInfo::SourceFile {
                source_file_index: self.read_u16()?,
            },
            K::Signature => AttributeInfo::Signature {
                signature_index: self.read_u16()?,
            },
            K::ConstantValue => AttributeInfo::ConstantValue {
                constant_value_index: self.read_u16()?,
            },
            K::Code => AttributeInfo::Code(self.parse_code_attribute(constant_pool)?),
            K::Exceptions => AttributeInfo::Exceptions {
                exception_index_table: self.parse_u16_table()?,
            },
            K::LineNumberTable => {
                let count = self.read_u16()? as usize;
                self.ensure(count * 4)?;
                self.arena.allocate_array::<LineNumber>(count)?;
                let line_numbers = (0..count)
                    .map(|_| {
                        Ok(LineNumber {
                            start_pc: self.read_u16()?,
                            line_number: self.read_u16()?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                AttributeInfo::LineNumberTable(line_numbers)
            }
            K::LocalVariableTable => {
                AttributeInfo::LocalVariableTable(self.parse_local_variables()?)
            }
            K::LocalVariableTypeTable => {
                AttributeInfo::LocalVariableTypeTable(self.parse_local_variables()?)
            }
            K::InnerClasses => {
                let count = self.read_u16()? as usize;
                self.ensure(count * 8)?;
                self.arena.allocate_array::<InnerClass>(count)?;
                let classes = (0..count)
                    .map(|_| {
                        Ok(InnerClass {
                            inner_class_info_index: self.read_u16()?,
                            outer_class_info_index: self.read_u16()?,
                            inner_name_index: self.read_u16()?,
                            inner_class_access_flags: self.read_u16()?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                AttributeInfo::InnerClasses(classes)
            }
            K::EnclosingMethod => {
                self.ensure(4)?;
                AttributeInfo::EnclosingMethod {
                    class_index: self.read_u16()?,
                    method_index: self.read_u16()?,
                }
            }
            K::Synthetic => {
                self.skip(length as usize)?;
                AttributeInfo::Synthetic
            }
            K::Deprecated => {
                self.skip(length as usize)?;
                AttributeInfo::Deprecated
            }
            K::StackMapTable => {
                let number_of_entries = self.read_u16()?;
                let entries_length = if length > 1 { length as usize - 2 } else { 0 };
                self.arena.allocate(entries_length)?;
                AttributeInfo::StackMapTable {
                    number_of_entries,
                    entries: self.read_bytes(entries_length)?.to_vec(),
                }
            }
            K::RuntimeVisibleAnnotations => {
                AttributeInfo::Annotations(self.parse_annotations_attribute(start, length)?)
            }
            K::RuntimeVisibleParameterAnnotations => AttributeInfo::ParameterAnnotations(
                self.parse_parameter_annotations_attribute(start, length)?,
            ),
            K::RuntimeVisibleTypeAnnotations => AttributeInfo::TypeAnnotations(
                self.parse_type_annotations_attribute(start, length)?,
            ),
            K::RuntimeInvisibleAnnotations if retain_invisible => {
                AttributeInfo::Annotations(self.parse_annotations_attribute(start, length)?)
            }
            K::RuntimeInvisibleParameterAnnotations if retain_invisible => {
                AttributeInfo::ParameterAnnotations(
                    self.parse_parameter_annotations_attribute(start, length)?,
                )
            }
            K::RuntimeInvisibleTypeAnnotations if retain_invisible => {
                AttributeInfo::TypeAnnotations(
                    self.parse_type_annotations_attribute(start, length)?,
                )
            }
            K::RuntimeInvisibleAnnotations
            | K::RuntimeInvisibleParameterAnnotations
            | K::RuntimeInvisibleTypeAnnotations => {
                self.skip(length as usize)?;
                AttributeInfo::Skipped
            }
            K::AnnotationDefault => AttributeInfo::AnnotationDefault(self.parse_element_value()?),
            K::BootstrapMethods => {
                let count = self.read_u16()? as usize;
                self.arena.allocate_array::<BootstrapMethod>(count)?;
                let methods = (0..count)
                    .map(|_| {
                        self.ensure(4)?;
                        let bootstrap_method_ref = self.read_u16()?;
                        Ok(BootstrapMethod {
                            bootstrap_method_ref,
                            bootstrap_arguments: self.parse_u16_table()?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                AttributeInfo::BootstrapMethods(methods)
            }
            K::MethodParameters => {
                let count = self.read_u8()? as usize;
                self.ensure(count * 4)?;
                self.arena.allocate_array::<MethodParameter>(count)?;
                let parameters = (0..count)
                    .map(|_| {
                        Ok(MethodParameter {
                            name_index: self.read_u16()?,
                            access_flags: self.read_u16()?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                AttributeInfo::MethodParameters(parameters)
            }
            K::NestHost => AttributeInfo::NestHost {
                host_class_index: self.read_u16()?,
            },
            K::NestMembers => AttributeInfo::NestMembers {
                classes: self.parse_u16_table()?,
            },
            K::PermittedSubclasses => AttributeInfo::PermittedSubclasses {
                classes: self.parse_u16_table()?,
            },
            K::LoadableDescriptors => AttributeInfo::LoadableDescriptors {
                descriptors: self.parse_u16_table()?,
            },
            K::Record => {
                let count = self.read_u16()? as usize;
                self.arena.allocate_array::<RecordComponent>(count)?;
                let components = (0..count)
                    .map(|_| {
                        self.ensure(6)?;
                        let name_index = self.read_u16()?;
                        let descriptor_index = self.read_u16()?;
                        let (attributes, _) = self.parse_attribute_list(constant_pool)?;
                        Ok(RecordComponent {
                            name_index,
                            descriptor_index,
                            attributes,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                AttributeInfo::Record(components)
            }
            K::StrippedUnknown
            | K::StrippedLineNumberTable
            | K::StrippedLocalVariableTable
            | K::StrippedLocalVariableTypeTable
            | K::StrippedSourceDebugExtension
            | K::StrippedInnerClasses => {
                trace!("Stripping {:?} at {}", kind, start);
                self.skip(length as usize)?;
                AttributeInfo::Skipped
            }
            K::Unknown
            | K::SourceDebugExtension
            | K::StackMap
            | K::Module
            | K::ModulePackages
            | K::ModuleMainClass => {
                self.arena.allocate(length as usize)?;
                AttributeInfo::Raw(self.read_bytes(length as usize)?.to_vec())
            }
        })
    }

    fn parse_code_attribute(&mut self, constant_pool: &ConstantPool) -> Result<CodeAttribute> {
        self.ensure(8)?;
        let max_stack = self.read_u16()?;
        let max_locals = self.read_u16()?;
        let code_length = self.read_u32()? as usize;
        self.ensure(code_length)?;
        self.arena.allocate(code_length)?;
        let code = self.read_bytes(code_length)?.to_vec();

        let exception_table_length = self.read_u16()? as usize;
        self.ensure(exception_table_length * 8)?;
        self.arena
            .allocate_array::<ExceptionTableEntry>(exception_table_length)?;
        let exception_table = (0..exception_table_length)
            .map(|_| self.parse_exception_table_entry())
            .collect::<Result<Vec<_>>>()?;

        // Synthetic means nothing inside Code
        let (attributes, _) = self.parse_attribute_list(constant_pool)?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    fn parse_exception_table_entry(&mut self) -> Result<ExceptionTableEntry> {
        let start_pc = self.read_u16()?;
        let end_pc = self.read_u16()?;
        let handler_pc = self.read_u16()?;
        let catch_type = self.read_u16()?;

        Ok(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        })
    }

    fn parse_local_variables(&mut self) -> Result<Vec<LocalVariable>> {
        let count = self.read_u16()? as usize;
        self.ensure(count * 10)?;
        self.arena.allocate_array::<LocalVariable>(count)?;

        (0..count)
            .map(|_| {
                Ok(LocalVariable {
                    start_pc: self.read_u16()?,
                    length: self.read_u16()?,
                    name_index: self.read_u16()?,
                    descriptor_index: self.read_u16()?,
                    index: self.read_u16()?,
                })
            })
            .collect()
    }

    /// A u16 count followed by that many u16 values.
    fn parse_u16_table(&mut self) -> Result<Vec<u16>> {
        let count = self.read_u16()? as usize;
        self.arena.allocate_array::<u16>(count)?;
        self.read_u16_vec(count)
    }
}
