use bitflags::bitflags;

bitflags! {
    /// Access and property flags shared by classes, fields and methods. Several bits
    /// carry a different meaning depending on where they appear.
    #[derive(Default)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const BRIDGE = 0x0040;
        const TRANSIENT = 0x0080;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;

        const VISIBILITY = Self::PUBLIC.bits | Self::PRIVATE.bits | Self::PROTECTED.bits;
    }
}

// Masks applied to the raw flag words.
impl AccessFlags {
    pub const CLASS_MASK: AccessFlags = AccessFlags::from_bits_truncate(0x7631);
    pub const CLASS_MASK_9: AccessFlags = AccessFlags::from_bits_truncate(0xF631);
    pub const CLASS_JDK5: AccessFlags = AccessFlags::from_bits_truncate(0x7000);
    pub const INTERFACE_CLASS_MASK: AccessFlags = AccessFlags::from_bits_truncate(0x3601);

    pub const FIELD_MASK: AccessFlags = AccessFlags::from_bits_truncate(0x50DF);
    pub const FIELD_JDK5: AccessFlags = AccessFlags::from_bits_truncate(0x5000);
    pub const INTERFACE_FIELD_MASK: AccessFlags = AccessFlags::from_bits_truncate(0x1019);
    pub const INTERFACE_FIELD_REQUIRED: AccessFlags = AccessFlags::from_bits_truncate(0x0019);

    pub const METHOD_MASK: AccessFlags = AccessFlags::from_bits_truncate(0x1DFF);
    pub const METHOD_JDK5: AccessFlags = AccessFlags::from_bits_truncate(0x10C0);
    pub const CLINIT_MASK: AccessFlags = AccessFlags::from_bits_truncate(0x0808);
    pub const INIT_MASK: AccessFlags = AccessFlags::from_bits_truncate(0x1887);
    pub const INTERFACE_METHOD_MASK: AccessFlags = AccessFlags::from_bits_truncate(0x14C1);
    pub const INTERFACE_METHOD_REQUIRED: AccessFlags = AccessFlags::from_bits_truncate(0x0401);
    pub const ABSTRACT_METHOD_MASK: AccessFlags = AccessFlags::from_bits_truncate(0x14C5);

    /// True when more than one of public/private/protected is set.
    pub fn has_visibility_conflict(self) -> bool {
        (self & AccessFlags::VISIBILITY).bits().count_ones() > 1
    }
}
