// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

mod access_flags;
mod arena;
pub mod attribute_names;
pub mod attributes;
pub mod bytecode;
mod check;
mod class_file;
#[macro_use]
pub mod constant_pool;
mod error;
pub mod mutf8;
mod options;
mod parser;
mod verifier;

pub use self::class_file::{ClassFile, ClassFlags, FieldInfo, Member, MemberFlags, MethodInfo};
pub use access_flags::AccessFlags;
pub use constant_pool::{ConstantPool, CpInfo};
pub use error::{
    ClassFileError, ErrorAction, ErrorCode, ErrorRecord, RESULT_FORMAT_ERROR, RESULT_OK,
    RESULT_OUT_OF_SPACE,
};
pub use options::{
    ReadFlags, ReadOptions, DEFAULT_DUPLICATE_HASH_THRESHOLD, DEFAULT_MAX_MAJOR_VERSION,
    DEFAULT_SEGMENT_SIZE,
};
pub use parser::Parser;
pub use verifier::{NoVerification, StaticVerifier};

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;
