use std::fmt;

use crate::{attribute_names::AttributeKind, ConstantPool};

/// Marker stored as the first target type of a type annotation fallback buffer.
pub const TARGET_TYPE_ERROR_IN_ATTRIBUTE: u8 = 0xFF;

pub struct Attribute {
    pub kind: AttributeKind,
    pub name_index: u16,
    pub length: u32,
    /// Offset of the attribute header in the class file.
    pub offset: u32,
    pub info: AttributeInfo,
}
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Attribute");
        s.field("kind", &self.kind)
            .field("name_index", &self.name_index)
            .field("length", &self.length)
            .field("offset", &self.offset);
        match &self.info {
            AttributeInfo::Raw(bytes) => s.field("info", &format!("({} bytes)", bytes.len())),
            info => s.field("info", info),
        };
        s.finish()
    }
}

#[derive(Debug)]
pub enum AttributeInfo {
    SourceFile { source_file_index: u16 },
    Signature { signature_index: u16 },
    ConstantValue { constant_value_index: u16 },
    Code(CodeAttribute),
    Exceptions { exception_index_table: Vec<u16> },
    LineNumberTable(Vec<LineNumber>),
    LocalVariableTable(Vec<LocalVariable>),
    LocalVariableTypeTable(Vec<LocalVariable>),
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod { class_index: u16, method_index: u16 },
    Synthetic,
    Deprecated,
    StackMapTable { number_of_entries: u16, entries: Vec<u8> },
    Annotations(AnnotationsAttribute),
    ParameterAnnotations(ParameterAnnotationsAttribute),
    TypeAnnotations(TypeAnnotationsAttribute),
    AnnotationDefault(ElementValue),
    BootstrapMethods(Vec<BootstrapMethod>),
    MethodParameters(Vec<MethodParameter>),
    NestHost { host_class_index: u16 },
    NestMembers { classes: Vec<u16> },
    Record(Vec<RecordComponent>),
    PermittedSubclasses { classes: Vec<u16> },
    LoadableDescriptors { descriptors: Vec<u16> },
    /// Length-tagged placeholder, the bytes were skipped.
    Skipped,
    /// Bytes kept verbatim.
    Raw(Vec<u8>),
}

#[derive(Debug, Default)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn find_by_kind(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.0.iter().find(|a| a.kind == kind)
    }

    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0
            .iter()
            .find(|a| constant_pool.utf8_bytes(a.name_index) == name.as_bytes())
    }

    pub fn code_attribute(&self) -> Option<&CodeAttribute> {
        self.0.iter().find_map(|a| match &a.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Debug)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

/// Row of a LocalVariableTable, or of a LocalVariableTypeTable in which case the
/// descriptor is a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class_info_index: u16,
    pub outer_class_info_index: u16,
    pub inner_name_index: u16,
    pub inner_class_access_flags: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    pub bootstrap_method_ref: u16,
    pub bootstrap_arguments: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameter {
    pub name_index: u16,
    pub access_flags: u16,
}

#[derive(Debug)]
pub struct RecordComponent {
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub type_index: u16,
    pub element_value_pairs: Vec<ElementValuePair>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementValuePair {
    pub element_name_index: u16,
    pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    /// `B C D F I J S Z s`
    Const { tag: u8, const_value_index: u16 },
    Enum {
        type_name_index: u16,
        const_name_index: u16,
    },
    Class { class_info_index: u16 },
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

/// RuntimeVisibleAnnotations / RuntimeInvisibleAnnotations.
///
/// When the payload could not be decoded `raw_data` holds a verbatim copy of it and
/// `annotations` is empty. An empty `raw_data` marks a well formed attribute.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnnotationsAttribute {
    pub annotations: Vec<Annotation>,
    pub raw_data: Vec<u8>,
}
impl AnnotationsAttribute {
    pub fn is_well_formed(&self) -> bool {
        self.raw_data.is_empty()
    }

    pub fn raw_data_length(&self) -> u32 {
        self.raw_data.len() as u32
    }
}

/// RuntimeVisibleParameterAnnotations / RuntimeInvisibleParameterAnnotations.
///
/// The fallback buffer always starts with a zero parameter count: one is inserted
/// in front of the original bytes unless they already begin with zero.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParameterAnnotationsAttribute {
    pub number_of_parameters: u8,
    pub parameter_annotations: Vec<Vec<Annotation>>,
    pub raw_data: Vec<u8>,
}
impl ParameterAnnotationsAttribute {
    pub fn is_well_formed(&self) -> bool {
        self.raw_data.is_empty()
    }

    pub fn raw_data_length(&self) -> u32 {
        self.raw_data.len() as u32
    }
}

/// RuntimeVisibleTypeAnnotations / RuntimeInvisibleTypeAnnotations.
///
/// The fallback buffer keeps the two count bytes and then carries
/// [`TARGET_TYPE_ERROR_IN_ATTRIBUTE`] as the first target type.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TypeAnnotationsAttribute {
    pub type_annotations: Vec<TypeAnnotation>,
    pub raw_data: Vec<u8>,
}
impl TypeAnnotationsAttribute {
    pub fn is_well_formed(&self) -> bool {
        self.raw_data.is_empty()
    }

    pub fn raw_data_length(&self) -> u32 {
        self.raw_data.len() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub target_type: u8,
    pub target_info: TargetInfo,
    pub type_path: Vec<TypePathEntry>,
    pub annotation: Annotation,
}

// https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.20.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetInfo {
    TypeParameter {
        type_parameter_index: u8,
    },
    Supertype {
        supertype_index: u16,
    },
    TypeParameterBound {
        type_parameter_index: u8,
        bound_index: u8,
    },
    Empty,
    FormalParameter {
        formal_parameter_index: u8,
    },
    Throws {
        throws_type_index: u16,
    },
    LocalVar(Vec<LocalVarTarget>),
    Catch {
        exception_table_index: u16,
    },
    Offset {
        offset: u16,
    },
    TypeArgument {
        offset: u16,
        type_argument_index: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVarTarget {
    pub start_pc: u16,
    pub length: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePathEntry {
    pub type_path_kind: u8,
    pub type_argument_index: u8,
}
