use log::debug;

use crate::{
    constant_pool::*,
    error::ErrorCode,
    mutf8, ClassFileError, ConstantPool, Result,
};

use super::Parser;

impl<'a> Parser<'a> {
    pub(super) fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let count = self.read_u16()?;
        if count < 1 {
            return Err(ClassFileError::format(ErrorCode::ConstantPoolEmpty, 8));
        }
        self.constant_pool_count = count;
        debug!("Reading {} constant pool slots", count);
        self.arena.allocate_array::<CpEntry>(count as usize)?;

        let mut entries = Vec::with_capacity(count as usize);
        entries.push(CpEntry {
            offset: 0,
            info: CpInfo::Null,
        });
        let mut chains = CpChains::with_count(count);

        while entries.len() < count as usize {
            let index = entries.len() as u16;
            let offset = self.position();
            let info = self.parse_cp_info(offset)?;

            match info {
                CpInfo::Utf8(_) => chains.link_utf8(index),
                CpInfo::NameAndType(_) => chains.link_name_and_type(index),
                _ => {}
            }

            let wide = info.is_wide();
            entries.push(CpEntry { offset, info });
            if wide {
                // The second slot must still be within the pool
                if index + 1 >= count {
                    return Err(ClassFileError::format(ErrorCode::BadIndex, offset));
                }
                entries.push(CpEntry {
                    offset: 0,
                    info: CpInfo::Null,
                });
            }
        }

        Ok(ConstantPool::new(entries, chains))
    }

    fn parse_cp_info(&mut self, offset: u32) -> Result<CpInfo> {
        let tag = self.read_u8()?;

        Ok(match tag {
            CONSTANT_UTF8 => self.parse_utf8(offset)?,
            CONSTANT_INTEGER => CpInfo::Integer(self.read_u32()?),
            CONSTANT_FLOAT => CpInfo::Float(self.read_u32()?),
            CONSTANT_LONG => {
                let (high_bytes, low_bytes) = self.parse_wide_bytes()?;
                CpInfo::Long {
                    high_bytes,
                    low_bytes,
                }
            }
            CONSTANT_DOUBLE => {
                let (high_bytes, low_bytes) = self.parse_wide_bytes()?;
                CpInfo::Double {
                    high_bytes,
                    low_bytes,
                }
            }
            CONSTANT_CLASS => CpInfo::Class(ClassInfo {
                name_index: self.read_u16()?,
            }),
            CONSTANT_STRING => CpInfo::String {
                string_index: self.read_u16()?,
            },
            CONSTANT_FIELD_REF => CpInfo::FieldRef(self.parse_ref_info()?),
            CONSTANT_METHOD_REF => CpInfo::MethodRef(self.parse_ref_info()?),
            CONSTANT_INTERFACE_METHOD_REF => CpInfo::InterfaceMethodRef(self.parse_ref_info()?),
            CONSTANT_NAME_AND_TYPE => {
                self.ensure(4)?;
                CpInfo::NameAndType(NameAndTypeInfo {
                    name_index: self.read_u16()?,
                    descriptor_index: self.read_u16()?,
                })
            }
            CONSTANT_METHOD_HANDLE => {
                self.require_major_version(51, ErrorCode::ConstantInvalidBeforeV51, offset)?;
                self.ensure(3)?;
                CpInfo::MethodHandle(MethodHandleInfo {
                    reference_kind: self.read_u8()?,
                    reference_index: self.read_u16()?,
                })
            }
            CONSTANT_METHOD_TYPE => {
                self.require_major_version(51, ErrorCode::ConstantInvalidBeforeV51, offset)?;
                CpInfo::MethodType(MethodTypeInfo {
                    descriptor_index: self.read_u16()?,
                })
            }
            CONSTANT_DYNAMIC => {
                self.require_major_version(55, ErrorCode::ConstantInvalidBeforeV55, offset)?;
                CpInfo::Dynamic(self.parse_dynamic_info()?)
            }
            CONSTANT_INVOKE_DYNAMIC => {
                self.require_major_version(51, ErrorCode::ConstantInvalidBeforeV51, offset)?;
                CpInfo::InvokeDynamic(self.parse_dynamic_info()?)
            }
            CONSTANT_MODULE => {
                self.require_major_version(53, ErrorCode::ConstantInvalidBeforeV53, offset)?;
                CpInfo::Module {
                    name_index: self.read_u16()?,
                }
            }
            CONSTANT_PACKAGE => {
                self.require_major_version(53, ErrorCode::ConstantInvalidBeforeV53, offset)?;
                CpInfo::Package {
                    name_index: self.read_u16()?,
                }
            }
            _ => return Err(ClassFileError::format(ErrorCode::UnknownConstant, offset)),
        })
    }

    fn require_major_version(&self, major: u16, code: ErrorCode, offset: u32) -> Result<()> {
        if self.major_version < major {
            Err(ClassFileError::format(code, offset))
        } else {
            Ok(())
        }
    }

    fn parse_utf8(&mut self, offset: u32) -> Result<CpInfo> {
        let length = self.read_u16()? as usize;
        // Worst case plus a terminator, given back once the canonical length is known
        self.arena.allocate(length + 1)?;
        let raw = self.read_bytes(length)?;

        let (bytes, flags) = mutf8::canonicalize(raw)
            .ok_or_else(|| ClassFileError::format(ErrorCode::BadUtf8, offset))?;
        self.arena
            .shrink_last_allocation(length.saturating_sub(bytes.len()));

        Ok(CpInfo::Utf8(Utf8Info { bytes, flags }))
    }

    fn parse_wide_bytes(&mut self) -> Result<(u32, u32)> {
        self.ensure(8)?;
        let high_bytes = self.read_u32()?;
        let low_bytes = self.read_u32()?;
        Ok((high_bytes, low_bytes))
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        self.ensure(4)?;
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    fn parse_dynamic_info(&mut self) -> Result<DynamicInfo> {
        self.ensure(4)?;
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }
}

#[cfg(test)]
mod parse_constant_pool_tests {
    use std::mem;

    use super::*;
    use crate::ReadOptions;

    fn parser(bytes: &[u8], major_version: u16) -> Parser<'_> {
        let mut parser = Parser::new(bytes, ReadOptions::default());
        parser.major_version = major_version;
        parser
    }

    #[test]
    fn it_should_read_entries_and_link_the_chains() {
        let bytes = [
            0, 5, // count
            1, 0, 1, b'A', // #1 Utf8 "A"
            12, 0, 1, 0, 3, // #2 NameAndType
            1, 0, 2, b'(', b')', // #3 Utf8 "()"
            7, 0, 1, // #4 Class
        ];
        let pool = parser(&bytes, 50).parse_constant_pool().unwrap();

        assert_eq!(pool.count(), 5);
        assert_eq!(pool.utf8_bytes(3), b"()");
        assert_eq!(pool.class_name(4).unwrap().as_str(), "A");
        assert_eq!(pool.utf8_indices().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(pool.first_name_and_type_index(), 2);
        assert_eq!(pool.entry(2).unwrap().offset, 6);
    }

    #[test]
    fn it_should_give_longs_two_slots() {
        let bytes = [0, 4, 5, 0, 0, 0, 1, 0, 0, 0, 2, 3, 0, 0, 0, 7];
        let pool = parser(&bytes, 50).parse_constant_pool().unwrap();

        assert_eq!(
            pool.get(1),
            Some(&CpInfo::Long {
                high_bytes: 1,
                low_bytes: 2
            })
        );
        assert_eq!(pool.get(2), Some(&CpInfo::Null));
        assert_eq!(pool.get(3), Some(&CpInfo::Integer(7)));
        assert_eq!(pool.get(4), None);
    }

    #[test]
    fn it_should_reject_a_double_in_the_last_slot() {
        let bytes = [0, 2, 6, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            parser(&bytes, 50).parse_constant_pool().unwrap_err(),
            ClassFileError::format(ErrorCode::BadIndex, 2)
        );
    }

    #[test]
    fn it_should_gate_method_handles_on_the_class_version() {
        let bytes = [0, 3, 1, 0, 0, 15, 6, 0, 1];
        assert_eq!(
            parser(&bytes, 50).parse_constant_pool().unwrap_err(),
            ClassFileError::format(ErrorCode::ConstantInvalidBeforeV51, 5)
        );
        assert!(parser(&bytes, 51).parse_constant_pool().is_ok());
    }

    #[test]
    fn it_should_gate_dynamic_and_module_constants() {
        let dynamic = [0, 2, 17, 0, 0, 0, 1];
        assert_eq!(
            parser(&dynamic, 54).parse_constant_pool().unwrap_err(),
            ClassFileError::format(ErrorCode::ConstantInvalidBeforeV55, 2)
        );

        let package = [0, 2, 20, 0, 1];
        assert_eq!(
            parser(&package, 52).parse_constant_pool().unwrap_err(),
            ClassFileError::format(ErrorCode::ConstantInvalidBeforeV53, 2)
        );
        assert!(parser(&package, 53).parse_constant_pool().is_ok());
    }

    #[test]
    fn it_should_reject_unknown_tags_and_bad_utf8() {
        assert_eq!(
            parser(&[0, 2, 2, 0, 0], 50).parse_constant_pool().unwrap_err(),
            ClassFileError::format(ErrorCode::UnknownConstant, 2)
        );
        assert_eq!(
            parser(&[0, 2, 1, 0, 1, 0x80], 50).parse_constant_pool().unwrap_err(),
            ClassFileError::format(ErrorCode::BadUtf8, 2)
        );
    }

    #[test]
    fn it_should_reject_an_empty_pool() {
        assert_eq!(
            parser(&[0, 0], 50).parse_constant_pool().unwrap_err(),
            ClassFileError::format(ErrorCode::ConstantPoolEmpty, 8)
        );
    }

    #[test]
    fn it_should_give_back_the_space_saved_by_canonicalizing() {
        // "A" spelled as an overlong two byte sequence
        let bytes = [0, 2, 1, 0, 2, 0xc1, 0x81];
        let mut parser = parser(&bytes, 50);
        parser.parse_constant_pool().unwrap();

        assert_eq!(parser.arena.used(), 2 * mem::size_of::<CpEntry>() + 2);
    }
}
