use std::fmt;

use thiserror::Error;

use crate::constant_pool;

/// Returned when the reader succeeds.
pub const RESULT_OK: i32 = 0;
/// Returned when the input was rejected, an [`ErrorRecord`] describes why.
pub const RESULT_FORMAT_ERROR: i32 = -1;
/// Returned when the output segment is too small; retry with a larger one.
pub const RESULT_OUT_OF_SPACE: i32 = -2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("{0}")]
    Format(ErrorRecord),
    #[error("Insufficient output space: {requested} bytes requested, {remaining} available")]
    OutOfSpace { requested: usize, remaining: usize },
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::CpInfo),
}
impl ClassFileError {
    pub fn result_code(&self) -> i32 {
        match self {
            ClassFileError::OutOfSpace { .. } => RESULT_OUT_OF_SPACE,
            _ => RESULT_FORMAT_ERROR,
        }
    }

    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            ClassFileError::Format(record) => Some(record),
            _ => None,
        }
    }

    pub(crate) fn format(code: ErrorCode, offset: u32) -> Self {
        ClassFileError::Format(ErrorRecord::new(code, ErrorAction::ClassFormat, offset))
    }

    pub(crate) fn unsupported_version(code: ErrorCode, offset: u32) -> Self {
        ClassFileError::Format(ErrorRecord::new(
            code,
            ErrorAction::UnsupportedClassVersion,
            offset,
        ))
    }

    pub(crate) fn verify(code: ErrorCode, offset: u32) -> Self {
        ClassFileError::Format(ErrorRecord::new(code, ErrorAction::Verify, offset))
    }

    /// Errors that the annotation readers may downgrade to a raw fallback.
    pub(crate) fn is_recoverable(&self) -> bool {
        matches!(self, ClassFileError::Format(_))
    }
}
impl From<ErrorRecord> for ClassFileError {
    fn from(record: ErrorRecord) -> Self {
        ClassFileError::Format(record)
    }
}

/// The single error produced by a failed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRecord {
    pub code: ErrorCode,
    pub action: ErrorAction,
    pub offset: u32,
}
impl ErrorRecord {
    pub fn new(code: ErrorCode, action: ErrorAction, offset: u32) -> Self {
        Self {
            code,
            action,
            offset,
        }
    }
}
impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (offset={})", self.action, self.code, self.offset)
    }
}

/// What the caller is expected to throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    ClassFormat,
    UnsupportedClassVersion,
    Verify,
    NoClassDefFound,
}
impl fmt::Display for ErrorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorAction::ClassFormat => "ClassFormatError",
            ErrorAction::UnsupportedClassVersion => "UnsupportedClassVersionError",
            ErrorAction::Verify => "VerifyError",
            ErrorAction::NoClassDefFound => "NoClassDefFoundError",
        })
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Framing
    #[error("invalid magic number")]
    Magic,
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("expected end of file")]
    ExpectedEof,
    #[error("constant pool is empty")]
    ConstantPoolEmpty,
    #[error("constant pool has no room for the hidden class slot")]
    ConstantPoolFull,
    #[error("unsupported major version")]
    MajorVersion,
    #[error("unsupported minor version")]
    MinorVersion,
    #[error("preview features are not enabled for this class version")]
    PreviewVersionNotEnabled,

    // Constant pool
    #[error("unknown constant pool tag")]
    UnknownConstant,
    #[error("constant pool entry not valid before class version 51")]
    ConstantInvalidBeforeV51,
    #[error("constant pool entry not valid before class version 53")]
    ConstantInvalidBeforeV53,
    #[error("constant pool entry not valid before class version 55")]
    ConstantInvalidBeforeV55,
    #[error("Module entry outside a module descriptor")]
    ConstantModuleOutsideModule,
    #[error("Package entry outside a module descriptor")]
    ConstantPackageOutsideModule,
    #[error("invalid modified UTF-8")]
    BadUtf8,
    #[error("constant pool index out of range")]
    BadIndex,
    #[error("name index does not refer to a Utf8 entry")]
    BadNameIndex,
    #[error("string index does not refer to a Utf8 entry")]
    BadStringIndex,
    #[error("class index does not refer to a Class entry")]
    BadClassIndex,
    #[error("name and type index does not refer to a NameAndType entry")]
    BadNameAndTypeIndex,
    #[error("descriptor index does not refer to a Utf8 entry")]
    BadDescriptorIndex,
    #[error("method handle reference kind does not match its target")]
    BadMethodHandleRef,

    // Class
    #[error("interface is not abstract")]
    InterfaceNotAbstract,
    #[error("module descriptors cannot be loaded as classes")]
    ModuleIsInvalidClass,
    #[error("annotation type is not an interface")]
    AnnotationNotInterface,
    #[error("class is both final and abstract")]
    FinalAbstractClass,
    #[error("illegal interface modifiers")]
    InterfaceFlags,
    #[error("this_class does not refer to a Class entry")]
    NotClass,
    #[error("super_class is zero for a class other than java/lang/Object")]
    NullSuper,
    #[error("super_class does not refer to a Class entry")]
    SuperNotClass,
    #[error("interface does not refer to a Class entry")]
    InterfaceNotClass,
    #[error("duplicate interface")]
    DuplicateInterface,
    #[error("superclass of an interface must be java/lang/Object")]
    InterfaceSuperNotObject,

    // Members
    #[error("illegal interface field modifiers")]
    InterfaceField,
    #[error("conflicting field access modifiers")]
    AccessConflictField,
    #[error("field is both final and volatile")]
    FinalVolatileField,
    #[error("constant value is incompatible with the field type")]
    IncompatibleConstantValue,
    #[error("duplicate field")]
    DuplicateField,
    #[error("<clinit> is not static")]
    ClinitNotStatic,
    #[error("illegal <init> modifiers")]
    InitMethod,
    #[error("<init> is not allowed in an interface")]
    InitInInterface,
    #[error("illegal interface method modifiers")]
    InterfaceMethod,
    #[error("illegal abstract method modifiers")]
    AbstractMethod,
    #[error("conflicting method access modifiers")]
    AccessConflictMethod,
    #[error("code array longer than 65535 bytes")]
    CodeArrayTooLarge,
    #[error("abstract or native method has a Code attribute")]
    CodeForAbstractOrNative,
    #[error("duplicate method")]
    DuplicateMethod,
    #[error("method has two Code attributes")]
    TwoCodeAttributes,
    #[error("method has two Exceptions attributes")]
    TwoExceptionsAttributes,
    #[error("method has two MethodParameters attributes")]
    TwoMethodParametersAttributes,
    #[error("field has two ConstantValue attributes")]
    TwoConstantValueAttributes,

    // Attribute framing
    #[error("attribute name does not refer to a Utf8 entry")]
    BadAttributeName,
    #[error("attribute consumed fewer bytes than its declared length")]
    LengthTooSmall,
    #[error("attribute consumed more bytes than its declared length")]
    LengthTooBig,
    #[error("multiple SourceFile attributes")]
    MultipleSourceFile,
    #[error("multiple SourceDebugExtension attributes")]
    MultipleSourceDebugExtension,
    #[error("multiple BootstrapMethods attributes")]
    MultipleBootstrapMethods,
    #[error("multiple AnnotationDefault attributes")]
    MultipleAnnotationDefault,
    #[error("multiple annotation attributes of the same kind")]
    MultipleAnnotations,
    #[error("multiple parameter annotation attributes of the same kind")]
    MultipleParameterAnnotations,
    #[error("multiple type annotation attributes of the same kind")]
    MultipleTypeAnnotations,
    #[error("multiple NestHost or NestMembers attributes")]
    MultipleNestAttributes,
    #[error("multiple Record attributes")]
    MultipleRecord,
    #[error("multiple PermittedSubclasses attributes")]
    MultiplePermittedSubclasses,
    #[error("multiple LoadableDescriptors attributes")]
    MultipleLoadableDescriptors,
    #[error("malformed annotation element")]
    InvalidAnnotation,
    #[error("unknown type annotation target type")]
    InvalidTypeAnnotationTarget,

    // Attribute contents
    #[error("SourceFile does not refer to a Utf8 entry")]
    SourceFileIndex,
    #[error("Signature does not refer to a Utf8 entry")]
    SignatureIndex,
    #[error("ConstantValue does not refer to a constant")]
    ConstantValueIndex,
    #[error("Code attribute has an empty code array")]
    CodeArrayEmpty,
    #[error("exception handler catch type is not a Class entry")]
    CatchNotClass,
    #[error("Exceptions entry is not a Class entry")]
    ExceptionNotClass,
    #[error("line number start_pc outside the code array")]
    LineNumberPc,
    #[error("local variable start_pc outside the code array")]
    LocalVariableStart,
    #[error("local variable range outside the code array")]
    LocalVariableLength,
    #[error("local variable name does not refer to a Utf8 entry")]
    LocalVariableNameIndex,
    #[error("invalid local variable name")]
    LocalVariableName,
    #[error("local variable descriptor does not refer to a Utf8 entry")]
    LocalVariableDescriptorIndex,
    #[error("invalid local variable descriptor")]
    LocalVariableDescriptor,
    #[error("multiple InnerClasses attributes")]
    MultipleInnerClasses,
    #[error("inner class entry is not a Class entry")]
    InnerClassNotClass,
    #[error("outer class entry is not a Class entry")]
    OuterClassNotClass,
    #[error("inner class name does not refer to a Utf8 entry")]
    InnerClassNameIndex,
    #[error("duplicate InnerClasses entry")]
    DuplicateInnerClass,
    #[error("cycle in the InnerClasses inner/outer relation")]
    InnerClassCycle,
    #[error("multiple EnclosingMethod attributes")]
    MultipleEnclosingMethod,
    #[error("EnclosingMethod class is not a Class entry")]
    EnclosingMethodClass,
    #[error("EnclosingMethod method is not a NameAndType entry")]
    EnclosingMethodMethod,
    #[error("BootstrapMethods attribute absent or too small")]
    BootstrapMethodTable,
    #[error("bootstrap method does not refer to a MethodHandle entry")]
    BootstrapMethodHandle,
    #[error("StackMapTable outside a Code attribute")]
    StackMapOutsideCode,
    #[error("multiple StackMapTable attributes")]
    MultipleStackMap,
    #[error("NestHost does not refer to a Class entry")]
    NestHostClass,
    #[error("NestMembers entry does not refer to a Class entry")]
    NestMemberClass,
    #[error("PermittedSubclasses entry does not refer to a Class entry")]
    PermittedSubclassClass,
    #[error("record component name does not refer to a Utf8 entry")]
    RecordComponentName,
    #[error("record component descriptor does not refer to a Utf8 entry")]
    RecordComponentDescriptor,
    #[error("LoadableDescriptors entry does not refer to a Utf8 entry")]
    LoadableDescriptor,

    // Bytecode
    #[error("jsr/ret in a class of version 51 or later")]
    FoundJsrInClassVersion51,
}
