use std::{io::Cursor, mem};

use byteorder::{BigEndian, ReadBytesExt};
use log::debug;

use crate::{
    arena::Arena,
    attribute_names::AttributeKind,
    bytecode, check,
    class_file::{ClassFile, ClassFlags, MemberFlags},
    constant_pool::{ClassInfo, CpInfo},
    error::{ErrorAction, ErrorCode, ErrorRecord},
    options::{ReadFlags, ReadOptions},
    verifier::{NoVerification, StaticVerifier},
    AccessFlags, ClassFileError, Result,
};

mod annotations;
mod attributes;
mod constant_pool;
mod members;

type Endian = BigEndian;

const MAGIC: u32 = 0xCAFEBABE;
/// Appended to the name of a hidden class.
const HIDDEN_CLASS_NAME_SUFFIX: &[u8] = b"/0000000000000000";

pub struct Parser<'a> {
    r: Cursor<&'a [u8]>,
    options: ReadOptions,
    arena: Arena,
    major_version: u16,
    constant_pool_count: u16,
}

impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8], options: ReadOptions) -> Self {
        let arena = Arena::new(options.segment_size);
        Self {
            r: Cursor::new(buf),
            options,
            arena,
            major_version: 0,
            constant_pool_count: 0,
        }
    }

    pub fn parse(self) -> Result<ClassFile> {
        self.parse_with(&mut NoVerification)
    }

    pub fn parse_with(mut self, verifier: &mut dyn StaticVerifier) -> Result<ClassFile> {
        self.arena.allocate(mem::size_of::<ClassFile>())?;
        let mut class_file = ClassFile::default();

        self.ensure(10)?;
        class_file.magic = self.parse_magic_identifier()?;
        let (major, minor) = self.parse_version()?;
        class_file.major_version = major;
        class_file.minor_version = minor;
        self.major_version = major;

        check::check_class_version(major, minor, &self.options)?;
        if self.options.has(ReadFlags::BASIC_CHECK_ONLY) {
            return Ok(class_file);
        }

        class_file.constant_pool = self.parse_constant_pool()?;
        if self.options.anonymous && !class_file.constant_pool.reserve_hidden_slot() {
            return Err(ClassFileError::format(ErrorCode::ConstantPoolFull, 8));
        }
        class_file.end_of_constant_pool = self.position();

        self.ensure(8)?;
        class_file.access_flags = self.parse_class_access_flags()?;
        check_module_constants(&class_file)?;

        class_file.this_class = self.read_u16()?;
        if class_file.this_class == 0 || class_file.this_class >= self.constant_pool_count {
            return Err(ClassFileError::format(ErrorCode::BadIndex, 8));
        }

        let mut size_growth = 0;
        if self.options.anonymous {
            size_growth += self.rename_hidden_class(&mut class_file)?;
        }

        class_file.super_class = self.read_u16()?;
        let interfaces_count = self.read_u16()? as usize;
        self.arena.allocate_array::<u16>(interfaces_count)?;
        class_file.interfaces = self.read_u16_vec(interfaces_count)?;

        class_file.fields = self.parse_fields(&class_file.constant_pool)?;
        class_file.methods = self.parse_methods(&class_file.constant_pool)?;

        debug!("Reading class attributes");
        let (attributes, synthetic) = self.parse_attribute_list(&class_file.constant_pool)?;
        class_file.attributes = attributes;
        if synthetic {
            class_file.access_flags.insert(AccessFlags::SYNTHETIC);
        }
        if class_file.attributes.find_by_kind(AttributeKind::Record).is_some() {
            class_file.class_flags.insert(ClassFlags::IS_RECORD);
        }
        if class_file
            .attributes
            .find_by_kind(AttributeKind::PermittedSubclasses)
            .is_some()
        {
            class_file.class_flags.insert(ClassFlags::IS_SEALED);
        }

        if self.remaining() != 0 {
            return Err(ClassFileError::format(
                ErrorCode::ExpectedEof,
                self.position(),
            ));
        }
        class_file.class_file_size = self.len() as u32 + size_growth;

        let verify = self.options.has(ReadFlags::STATIC_VERIFICATION)
            && !self.options.has(ReadFlags::UNSAFE);
        if verify {
            debug!("Checking class structure");
            check::check_class(&mut class_file, &self.options)?;
        }
        // Duplicate members are reported in file order, so sort after checking
        if class_file.methods.len() >= self.options.method_sorting_threshold {
            members::sort_methods(&mut class_file.methods, &class_file.constant_pool);
        }

        let has_ret = if verify {
            debug!("Verifying bytecode");
            verifier.verify(&mut class_file, &self.options)?
        } else {
            bytecode::scan_for_jsrs(&mut class_file)
        };

        self.inline_jsrs(&mut class_file, verifier, has_ret)?;

        if self.options.anonymous {
            class_file.constant_pool.count_hidden_slot();
        }

        debug!(
            "Read {} bytes using {} bytes of the output segment",
            self.len(),
            self.arena.used()
        );
        Ok(class_file)
    }

    fn parse_magic_identifier(&mut self) -> Result<u32> {
        match self.read_u32()? {
            MAGIC => Ok(MAGIC),
            _ => Err(ClassFileError::format(ErrorCode::Magic, 0)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;
        Ok((major, minor))
    }

    fn parse_class_access_flags(&mut self) -> Result<AccessFlags> {
        let host_is_java9 = self.options.host_is_java9_or_later();
        let mask = if host_is_java9 {
            AccessFlags::CLASS_MASK_9
        } else {
            AccessFlags::CLASS_MASK
        };
        let mut flags = AccessFlags::from_bits_truncate(self.read_u16()?) & mask;
        let flags_offset = self.position() - 2;

        if flags.contains(AccessFlags::INTERFACE) && !flags.contains(AccessFlags::ABSTRACT) {
            if self.options.has(ReadFlags::XFUTURE) {
                return Err(ClassFileError::format(
                    ErrorCode::InterfaceNotAbstract,
                    flags_offset,
                ));
            }
            flags.insert(AccessFlags::ABSTRACT);
        }

        if host_is_java9 && flags.contains(AccessFlags::MODULE) {
            return Err(ErrorRecord::new(
                ErrorCode::ModuleIsInvalidClass,
                ErrorAction::NoClassDefFound,
                flags_offset,
            )
            .into());
        }

        Ok(flags)
    }

    fn rename_hidden_class(&mut self, class_file: &mut ClassFile) -> Result<u32> {
        let constant_pool = &mut class_file.constant_pool;
        let name_index = match constant_pool.get(class_file.this_class) {
            Some(CpInfo::Class(ClassInfo { name_index })) => *name_index,
            _ => return Ok(0),
        };
        let name = match constant_pool.utf8(name_index) {
            Some(utf8) => utf8.bytes.clone(),
            None => return Ok(0),
        };
        self.arena.allocate(HIDDEN_CLASS_NAME_SUFFIX.len())?;

        // Every other Class entry naming this class now shares the renamed entry
        for index in 1..constant_pool.count() {
            let redirect = match constant_pool.get(index) {
                Some(CpInfo::Class(ClassInfo { name_index: other })) => {
                    *other != name_index && constant_pool.utf8_bytes(*other) == &name[..]
                }
                _ => false,
            };
            if redirect {
                if let Some(CpInfo::Class(info)) = constant_pool.get_mut(index) {
                    info.name_index = name_index;
                }
            }
        }

        if let Some(CpInfo::Utf8(utf8)) = constant_pool.get_mut(name_index) {
            utf8.bytes.extend_from_slice(HIDDEN_CLASS_NAME_SUFFIX);
        }
        debug!("Renamed hidden class {}", String::from_utf8_lossy(&name));

        Ok(HIDDEN_CLASS_NAME_SUFFIX.len() as u32)
    }

    fn inline_jsrs(
        &mut self,
        class_file: &mut ClassFile,
        verifier: &mut dyn StaticVerifier,
        has_ret: bool,
    ) -> Result<()> {
        if !class_file.has_jsr() || self.options.has(ReadFlags::LEAVE_JSRS) {
            return Ok(());
        }

        let major = class_file.major_version;
        if major >= 51 || (major == 50 && self.options.has(ReadFlags::NO_FALLBACK)) {
            return Err(ClassFileError::verify(
                ErrorCode::FoundJsrInClassVersion51,
                0,
            ));
        }

        for index in 0..class_file.methods.len() {
            if !class_file.methods[index].has_jsr() {
                continue;
            }
            debug!("Inlining subroutines of method {}", index);

            let before = code_length(class_file, index);
            verifier.inline_jsrs(class_file, index, has_ret)?;
            let after = code_length(class_file, index);
            self.arena.allocate(after.saturating_sub(before) as usize)?;
            class_file.class_file_size += after.saturating_sub(before);

            class_file.methods[index].flags.remove(MemberFlags::HAS_JSR);
        }
        class_file.class_flags.remove(ClassFlags::HAS_JSR);

        Ok(())
    }

    fn position(&self) -> u32 {
        self.r.position() as u32
    }

    fn len(&self) -> usize {
        self.r.get_ref().len()
    }

    fn remaining(&self) -> usize {
        self.len().saturating_sub(self.r.position() as usize)
    }

    fn seek(&mut self, position: u32) {
        self.r.set_position(position as u64);
    }

    /// Fails unless `n` more bytes can be read.
    fn ensure(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            Err(ClassFileError::format(
                ErrorCode::UnexpectedEof,
                self.position(),
            ))
        } else {
            Ok(())
        }
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let offset = self.position();
        self.r
            .read_u32::<Endian>()
            .map_err(|_| ClassFileError::format(ErrorCode::UnexpectedEof, offset))
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let offset = self.position();
        self.r
            .read_u16::<Endian>()
            .map_err(|_| ClassFileError::format(ErrorCode::UnexpectedEof, offset))
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let offset = self.position();
        self.r
            .read_u8()
            .map_err(|_| ClassFileError::format(ErrorCode::UnexpectedEof, offset))
    }

    fn read_u16_vec(&mut self, count: usize) -> Result<Vec<u16>> {
        self.ensure(count * 2)?;
        let offset = self.position();
        let mut values = vec![0u16; count];
        self.r
            .read_u16_into::<Endian>(&mut values)
            .map_err(|_| ClassFileError::format(ErrorCode::UnexpectedEof, offset))?;
        Ok(values)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let buf: &'a [u8] = *self.r.get_ref();
        let start = self.r.position() as usize;
        self.r.set_position((start + n) as u64);
        Ok(&buf[start..start + n])
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }
}

/// Module and Package constants only make sense inside a module descriptor.
fn check_module_constants(class_file: &ClassFile) -> Result<()> {
    if class_file.access_flags.contains(AccessFlags::MODULE) {
        return Ok(());
    }

    let misplaced = class_file
        .constant_pool
        .iter()
        .find_map(|(_, entry)| match entry.info {
            CpInfo::Module { .. } => Some((ErrorCode::ConstantModuleOutsideModule, entry.offset)),
            CpInfo::Package { .. } => Some((ErrorCode::ConstantPackageOutsideModule, entry.offset)),
            _ => None,
        });

    match misplaced {
        Some((code, offset)) => Err(ClassFileError::format(code, offset)),
        None => Ok(()),
    }
}

fn code_length(class_file: &ClassFile, method_index: usize) -> u32 {
    class_file.methods[method_index]
        .code()
        .map_or(0, |code| code.code.len() as u32)
}

#[cfg(test)]
mod parse_magic_identifier_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_the_correct_identifier() {
        assert!(Parser::new(&[0xca, 0xfe, 0xba, 0xbe], ReadOptions::default())
            .parse_magic_identifier()
            .is_ok());
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        assert_eq!(
            Parser::new(&[0xca, 0xfe, 0xba], ReadOptions::default())
                .parse_magic_identifier()
                .unwrap_err()
                .record()
                .map(|r| r.code),
            Some(ErrorCode::UnexpectedEof)
        );
    }

    #[test]
    fn it_should_fail_if_the_magic_identifier_is_incorrect() {
        assert_eq!(
            Parser::new(&[0xca, 0xfe, 0xba, 0xbf], ReadOptions::default())
                .parse_magic_identifier(),
            Err(ClassFileError::format(ErrorCode::Magic, 0))
        );
    }
}
