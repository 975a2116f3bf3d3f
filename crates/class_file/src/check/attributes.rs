use std::collections::{HashMap, HashSet};

use log::trace;

use crate::{
    attributes::{Attribute, AttributeInfo, Attributes, CodeAttribute, InnerClass, LocalVariable},
    constant_pool::*,
    error::ErrorCode,
    options::{ReadFlags, ReadOptions},
    ClassFileError, ConstantPool, Result,
};

use super::{descriptors, expect_optional_tag, expect_tag, is_valid_index};

/// Where an attribute list is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Scope {
    /// The class itself. `max_bootstrap_index` is the largest bootstrap method index
    /// used by the constant pool.
    Class { max_bootstrap_index: Option<u16> },
    Member,
    Code { code_length: u32 },
    RecordComponent,
}
impl Scope {
    /// The range that code offsets are checked against.
    fn code_length(self) -> u32 {
        match self {
            Scope::Code { code_length } => code_length,
            _ => u32::MAX,
        }
    }
}

/// Checks the references held by each attribute of one list, recursing into Code
/// attributes and record components.
pub(super) fn check_attributes(
    constant_pool: &ConstantPool,
    attributes: &Attributes,
    scope: Scope,
    options: &ReadOptions,
) -> Result<()> {
    let mut checker = AttributeChecker {
        constant_pool,
        options,
        scope,
        seen_inner_classes: false,
        seen_enclosing_method: false,
        seen_stack_map: false,
        seen_bootstrap_methods: false,
    };
    attributes
        .iter()
        .try_for_each(|attribute| checker.check(attribute))?;

    if let Scope::Class {
        max_bootstrap_index: Some(_),
    } = scope
    {
        if !checker.seen_bootstrap_methods {
            return Err(ClassFileError::format(ErrorCode::BootstrapMethodTable, 0));
        }
    }

    Ok(())
}

struct AttributeChecker<'a> {
    constant_pool: &'a ConstantPool,
    options: &'a ReadOptions,
    scope: Scope,
    seen_inner_classes: bool,
    seen_enclosing_method: bool,
    seen_stack_map: bool,
    seen_bootstrap_methods: bool,
}

impl AttributeChecker<'_> {
    fn check(&mut self, attribute: &Attribute) -> Result<()> {
        let offset = attribute.offset;
        let fail = |code| Err(ClassFileError::format(code, offset));

        match &attribute.info {
            AttributeInfo::SourceFile { source_file_index } => {
                self.expect(*source_file_index, CONSTANT_UTF8, ErrorCode::SourceFileIndex, offset)
            }
            AttributeInfo::Signature { signature_index } => {
                self.expect(*signature_index, CONSTANT_UTF8, ErrorCode::SignatureIndex, offset)
            }
            AttributeInfo::ConstantValue {
                constant_value_index,
            } => {
                if !is_valid_index(self.constant_pool, *constant_value_index) {
                    return fail(ErrorCode::BadIndex);
                }
                match self.constant_pool.tag(*constant_value_index) {
                    CONSTANT_INTEGER | CONSTANT_FLOAT | CONSTANT_LONG | CONSTANT_DOUBLE
                    | CONSTANT_STRING => Ok(()),
                    _ => fail(ErrorCode::ConstantValueIndex),
                }
            }
            AttributeInfo::Code(code) => self.check_code(code, offset),
            AttributeInfo::Exceptions {
                exception_index_table,
            } => exception_index_table.iter().try_for_each(|&index| {
                self.expect(index, CONSTANT_CLASS, ErrorCode::ExceptionNotClass, offset)
            }),
            AttributeInfo::LineNumberTable(lines) => {
                let code_length = self.scope.code_length();
                if lines.iter().any(|line| u32::from(line.start_pc) >= code_length) {
                    fail(ErrorCode::LineNumberPc)
                } else {
                    Ok(())
                }
            }
            AttributeInfo::LocalVariableTable(variables) => variables
                .iter()
                .try_for_each(|variable| self.check_local_variable(variable, true, offset)),
            AttributeInfo::LocalVariableTypeTable(variables) => variables
                .iter()
                .try_for_each(|variable| self.check_local_variable(variable, false, offset)),
            AttributeInfo::InnerClasses(classes) => {
                if self.seen_inner_classes {
                    return fail(ErrorCode::MultipleInnerClasses);
                }
                self.seen_inner_classes = true;
                self.check_inner_classes(classes, offset)
            }
            AttributeInfo::EnclosingMethod {
                class_index,
                method_index,
            } => {
                if self.seen_enclosing_method {
                    return fail(ErrorCode::MultipleEnclosingMethod);
                }
                self.seen_enclosing_method = true;
                self.expect(
                    *class_index,
                    CONSTANT_CLASS,
                    ErrorCode::EnclosingMethodClass,
                    offset,
                )?;
                expect_optional_tag(
                    self.constant_pool,
                    *method_index,
                    CONSTANT_NAME_AND_TYPE,
                    ErrorCode::EnclosingMethodMethod,
                    offset,
                )
            }
            AttributeInfo::BootstrapMethods(methods) => {
                self.seen_bootstrap_methods = true;
                if let Scope::Class {
                    max_bootstrap_index: Some(max),
                } = self.scope
                {
                    if usize::from(max) >= methods.len() {
                        return fail(ErrorCode::BootstrapMethodTable);
                    }
                }
                methods.iter().try_for_each(|method| {
                    self.expect(
                        method.bootstrap_method_ref,
                        CONSTANT_METHOD_HANDLE,
                        ErrorCode::BootstrapMethodHandle,
                        offset,
                    )
                })
            }
            AttributeInfo::StackMapTable { .. } => {
                if !matches!(self.scope, Scope::Code { .. }) {
                    return fail(ErrorCode::StackMapOutsideCode);
                }
                if self.seen_stack_map {
                    return fail(ErrorCode::MultipleStackMap);
                }
                self.seen_stack_map = true;
                Ok(())
            }
            AttributeInfo::NestHost { host_class_index } => {
                self.expect(*host_class_index, CONSTANT_CLASS, ErrorCode::NestHostClass, offset)
            }
            AttributeInfo::NestMembers { classes } => classes.iter().try_for_each(|&index| {
                self.expect(index, CONSTANT_CLASS, ErrorCode::NestMemberClass, offset)
            }),
            AttributeInfo::PermittedSubclasses { classes } => {
                classes.iter().try_for_each(|&index| {
                    self.expect(index, CONSTANT_CLASS, ErrorCode::PermittedSubclassClass, offset)
                })
            }
            AttributeInfo::Record(components) => components.iter().try_for_each(|component| {
                self.expect(
                    component.name_index,
                    CONSTANT_UTF8,
                    ErrorCode::RecordComponentName,
                    offset,
                )?;
                self.expect(
                    component.descriptor_index,
                    CONSTANT_UTF8,
                    ErrorCode::RecordComponentDescriptor,
                    offset,
                )?;
                check_attributes(
                    self.constant_pool,
                    &component.attributes,
                    Scope::RecordComponent,
                    self.options,
                )
            }),
            AttributeInfo::LoadableDescriptors { descriptors } => {
                descriptors.iter().try_for_each(|&index| {
                    self.expect(index, CONSTANT_UTF8, ErrorCode::LoadableDescriptor, offset)
                })
            }
            AttributeInfo::Synthetic
            | AttributeInfo::Deprecated
            | AttributeInfo::Annotations(_)
            | AttributeInfo::ParameterAnnotations(_)
            | AttributeInfo::TypeAnnotations(_)
            | AttributeInfo::AnnotationDefault(_)
            | AttributeInfo::MethodParameters(_)
            | AttributeInfo::Skipped
            | AttributeInfo::Raw(_) => Ok(()),
        }
    }

    fn expect(&self, index: u16, tag: u8, wrong_tag: ErrorCode, offset: u32) -> Result<()> {
        expect_tag(self.constant_pool, index, tag, wrong_tag, offset)
    }

    fn check_code(&self, code: &CodeAttribute, offset: u32) -> Result<()> {
        if code.code.is_empty() {
            return Err(ClassFileError::format(ErrorCode::CodeArrayEmpty, offset));
        }
        for entry in &code.exception_table {
            expect_optional_tag(
                self.constant_pool,
                entry.catch_type,
                CONSTANT_CLASS,
                ErrorCode::CatchNotClass,
                offset,
            )?;
        }

        check_attributes(
            self.constant_pool,
            &code.attributes,
            Scope::Code {
                code_length: code.code.len() as u32,
            },
            self.options,
        )
    }

    /// A row of a LocalVariableTable, or of a LocalVariableTypeTable when
    /// `is_descriptor` is false.
    fn check_local_variable(
        &self,
        variable: &LocalVariable,
        is_descriptor: bool,
        offset: u32,
    ) -> Result<()> {
        let fail = |code| Err(ClassFileError::format(code, offset));
        let code_length = u64::from(self.scope.code_length());
        let start_pc = u64::from(variable.start_pc);
        if start_pc > code_length {
            return fail(ErrorCode::LocalVariableStart);
        }
        if start_pc + u64::from(variable.length) > code_length {
            return fail(ErrorCode::LocalVariableLength);
        }

        self.expect(
            variable.name_index,
            CONSTANT_UTF8,
            ErrorCode::LocalVariableNameIndex,
            offset,
        )?;
        if self.options.has(ReadFlags::XFUTURE)
            && !descriptors::is_valid_unqualified_name(
                self.constant_pool.utf8_bytes(variable.name_index),
            )
        {
            return fail(ErrorCode::LocalVariableName);
        }

        self.expect(
            variable.descriptor_index,
            CONSTANT_UTF8,
            ErrorCode::LocalVariableDescriptorIndex,
            offset,
        )?;
        if is_descriptor
            && !descriptors::is_valid_field_descriptor(
                self.constant_pool.utf8_bytes(variable.descriptor_index),
            )
        {
            return fail(ErrorCode::LocalVariableDescriptor);
        }

        Ok(())
    }

    fn check_inner_classes(&self, classes: &[InnerClass], offset: u32) -> Result<()> {
        for class in classes {
            self.expect(
                class.inner_class_info_index,
                CONSTANT_CLASS,
                ErrorCode::InnerClassNotClass,
                offset,
            )?;
            expect_optional_tag(
                self.constant_pool,
                class.outer_class_info_index,
                CONSTANT_CLASS,
                ErrorCode::OuterClassNotClass,
                offset,
            )?;
            expect_optional_tag(
                self.constant_pool,
                class.inner_name_index,
                CONSTANT_UTF8,
                ErrorCode::InnerClassNameIndex,
                offset,
            )?;
        }

        if has_inner_class_cycle(classes) {
            trace!("InnerClasses cycle at {}", offset);
            return Err(ClassFileError::format(ErrorCode::InnerClassCycle, offset));
        }

        let mut seen = HashSet::with_capacity(classes.len());
        if !classes
            .iter()
            .all(|class| seen.insert(class.inner_class_info_index))
        {
            return Err(ClassFileError::format(ErrorCode::DuplicateInnerClass, offset));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnPath,
    Done,
}

/// Follows each row's outer class through the row naming it as an inner class and
/// reports whether some walk comes back to a row already on its path. Each row is
/// walked at most once.
fn has_inner_class_cycle(classes: &[InnerClass]) -> bool {
    let mut row_of_inner = HashMap::with_capacity(classes.len());
    for (row, class) in classes.iter().enumerate() {
        row_of_inner.entry(class.inner_class_info_index).or_insert(row);
    }

    let mut state = vec![Visit::Unvisited; classes.len()];
    let mut path = Vec::new();
    for start in 0..classes.len() {
        let mut next = Some(start);
        while let Some(row) = next {
            match state[row] {
                Visit::OnPath => return true,
                Visit::Done => break,
                Visit::Unvisited => {}
            }
            state[row] = Visit::OnPath;
            path.push(row);

            let outer = classes[row].outer_class_info_index;
            next = match row_of_inner.get(&outer) {
                Some(&inner_row) if outer != 0 => Some(inner_row),
                _ => None,
            };
        }
        for row in path.drain(..) {
            state[row] = Visit::Done;
        }
    }
    false
}
