/// Kind of an attribute, as decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Unknown,
    StrippedUnknown,
    SourceFile,
    Signature,
    ConstantValue,
    Code,
    Exceptions,
    LineNumberTable,
    StrippedLineNumberTable,
    LocalVariableTable,
    StrippedLocalVariableTable,
    LocalVariableTypeTable,
    StrippedLocalVariableTypeTable,
    SourceDebugExtension,
    StrippedSourceDebugExtension,
    InnerClasses,
    StrippedInnerClasses,
    EnclosingMethod,
    Synthetic,
    Deprecated,
    StackMap,
    StackMapTable,
    RuntimeVisibleAnnotations,
    RuntimeInvisibleAnnotations,
    RuntimeVisibleParameterAnnotations,
    RuntimeInvisibleParameterAnnotations,
    RuntimeVisibleTypeAnnotations,
    RuntimeInvisibleTypeAnnotations,
    AnnotationDefault,
    BootstrapMethods,
    MethodParameters,
    NestHost,
    NestMembers,
    Record,
    PermittedSubclasses,
    Module,
    ModulePackages,
    ModuleMainClass,
    LoadableDescriptors,
}
impl AttributeKind {
    pub fn is_stripped(self) -> bool {
        matches!(
            self,
            AttributeKind::StrippedUnknown
                | AttributeKind::StrippedLineNumberTable
                | AttributeKind::StrippedLocalVariableTable
                | AttributeKind::StrippedLocalVariableTypeTable
                | AttributeKind::StrippedSourceDebugExtension
                | AttributeKind::StrippedInnerClasses
        )
    }
}

struct KnownAttribute {
    name: &'static [u8],
    kind: AttributeKind,
    stripped_kind: AttributeKind,
}

macro_rules! known {
    ($name:literal, $kind:ident) => {
        known!($name, $kind, $kind)
    };
    ($name:literal, $kind:ident, $stripped:ident) => {
        KnownAttribute {
            name: $name,
            kind: AttributeKind::$kind,
            stripped_kind: AttributeKind::$stripped,
        }
    };
}

// Sorted by name, looked up with a binary search.
static KNOWN_ATTRIBUTES: [KnownAttribute; 32] = [
    known!(b"AnnotationDefault", AnnotationDefault),
    known!(b"BootstrapMethods", BootstrapMethods),
    known!(b"Code", Code),
    known!(b"ConstantValue", ConstantValue),
    known!(b"Deprecated", Deprecated),
    known!(b"EnclosingMethod", EnclosingMethod),
    known!(b"Exceptions", Exceptions),
    known!(b"InnerClasses", InnerClasses, StrippedInnerClasses),
    known!(b"LineNumberTable", LineNumberTable, StrippedLineNumberTable),
    known!(b"LoadableDescriptors", LoadableDescriptors),
    known!(b"LocalVariableTable", LocalVariableTable, StrippedLocalVariableTable),
    known!(
        b"LocalVariableTypeTable",
        LocalVariableTypeTable,
        StrippedLocalVariableTypeTable
    ),
    known!(b"MethodParameters", MethodParameters),
    known!(b"Module", Module),
    known!(b"ModuleMainClass", ModuleMainClass),
    known!(b"ModulePackages", ModulePackages),
    known!(b"NestHost", NestHost),
    known!(b"NestMembers", NestMembers),
    known!(b"PermittedSubclasses", PermittedSubclasses),
    known!(b"Record", Record),
    known!(b"RuntimeInvisibleAnnotations", RuntimeInvisibleAnnotations),
    known!(
        b"RuntimeInvisibleParameterAnnotations",
        RuntimeInvisibleParameterAnnotations
    ),
    known!(
        b"RuntimeInvisibleTypeAnnotations",
        RuntimeInvisibleTypeAnnotations
    ),
    known!(b"RuntimeVisibleAnnotations", RuntimeVisibleAnnotations),
    known!(
        b"RuntimeVisibleParameterAnnotations",
        RuntimeVisibleParameterAnnotations
    ),
    known!(b"RuntimeVisibleTypeAnnotations", RuntimeVisibleTypeAnnotations),
    known!(b"Signature", Signature),
    known!(
        b"SourceDebugExtension",
        SourceDebugExtension,
        StrippedSourceDebugExtension
    ),
    known!(b"SourceFile", SourceFile),
    known!(b"StackMap", StackMap),
    known!(b"StackMapTable", StackMapTable),
    known!(b"Synthetic", Synthetic),
];

/// Classifies an attribute name, honouring debug stripping.
pub fn classify(name: &[u8], strip_debug: bool) -> AttributeKind {
    let found = KNOWN_ATTRIBUTES.binary_search_by(|known| known.name.cmp(name));

    match (found, strip_debug) {
        (Ok(i), false) => KNOWN_ATTRIBUTES[i].kind,
        (Ok(i), true) => KNOWN_ATTRIBUTES[i].stripped_kind,
        (Err(_), false) => AttributeKind::Unknown,
        (Err(_), true) => AttributeKind::StrippedUnknown,
    }
}

#[cfg(test)]
mod classify_tests {
    use super::*;

    #[test]
    fn it_should_keep_the_table_sorted() {
        assert!(KNOWN_ATTRIBUTES
            .windows(2)
            .all(|w| w[0].name < w[1].name));
    }

    #[test]
    fn it_should_find_every_known_name() {
        for known in KNOWN_ATTRIBUTES.iter() {
            assert_eq!(classify(known.name, false), known.kind);
            assert_eq!(classify(known.name, true), known.stripped_kind);
        }
    }

    #[test]
    fn it_should_map_debug_attributes_to_their_stripped_kind() {
        assert_eq!(
            classify(b"LineNumberTable", true),
            AttributeKind::StrippedLineNumberTable
        );
        assert_eq!(
            classify(b"LineNumberTable", false),
            AttributeKind::LineNumberTable
        );
        assert_eq!(classify(b"Code", true), AttributeKind::Code);
    }

    #[test]
    fn it_should_default_to_unknown() {
        assert_eq!(classify(b"Codes", false), AttributeKind::Unknown);
        assert_eq!(classify(b"", true), AttributeKind::StrippedUnknown);
    }
}
