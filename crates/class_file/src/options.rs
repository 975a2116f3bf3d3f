use bitflags::bitflags;

bitflags! {
    pub struct ReadFlags: u32 {
        /// Replace debug attributes with placeholders instead of decoding them.
        const STRIP_DEBUG_ATTRIBUTES = 0x0001;
        /// Run the structural checks and hand the result to the static verifier.
        const STATIC_VERIFICATION = 0x0002;
        const RETAIN_RUNTIME_INVISIBLE_ATTRIBUTES = 0x0004;
        /// Stop once the class version has been accepted.
        const BASIC_CHECK_ONLY = 0x0008;
        /// Stricter handling of flags that older class files were allowed to misuse.
        const XFUTURE = 0x0010;
        const LEAVE_JSRS = 0x0020;
        const ANY_PREVIEW_VERSION = 0x0040;
        const ENABLE_PREVIEW = 0x0080;
        /// Marks classes defined through unsafe/dynamic definition paths. Static
        /// verification is skipped for them.
        const UNSAFE = 0x0100;
        /// Refuse the legacy verifier fallback for version 50 classes.
        const NO_FALLBACK = 0x0200;
    }
}

pub const DEFAULT_MAX_MAJOR_VERSION: u16 = 61;
pub const DEFAULT_SEGMENT_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_DUPLICATE_HASH_THRESHOLD: usize = 30;

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub flags: ReadFlags,
    /// Highest class file major version the host accepts.
    pub max_major_version: u16,
    /// Capacity in bytes of the output segment.
    pub segment_size: usize,
    /// Methods are sorted by name and signature once a class has at least this many.
    pub method_sorting_threshold: usize,
    /// Member count from which duplicates are found by hashing instead of pairwise.
    pub duplicate_hash_threshold: usize,
    /// Read the class as a hidden/anonymous class.
    pub anonymous: bool,
}
impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            flags: ReadFlags::empty(),
            max_major_version: DEFAULT_MAX_MAJOR_VERSION,
            segment_size: DEFAULT_SEGMENT_SIZE,
            method_sorting_threshold: usize::MAX,
            duplicate_hash_threshold: DEFAULT_DUPLICATE_HASH_THRESHOLD,
            anonymous: false,
        }
    }
}
impl ReadOptions {
    pub fn with_flags(flags: ReadFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    pub fn has(&self, flag: ReadFlags) -> bool {
        self.flags.contains(flag)
    }

    pub(crate) fn host_is_java9_or_later(&self) -> bool {
        self.max_major_version >= 53
    }
}
