use std::borrow::Cow;

use crate::mutf8::Utf8Flags;

pub const CONSTANT_NULL: u8 = 0;
pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELD_REF: u8 = 9;
pub const CONSTANT_METHOD_REF: u8 = 10;
pub const CONSTANT_INTERFACE_METHOD_REF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
pub const CONSTANT_METHOD_HANDLE: u8 = 15;
pub const CONSTANT_METHOD_TYPE: u8 = 16;
pub const CONSTANT_DYNAMIC: u8 = 17;
pub const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
pub const CONSTANT_MODULE: u8 = 19;
pub const CONSTANT_PACKAGE: u8 = 20;

/// The constant pool, indexed from 1. Slot 0 and the slot following every Long or
/// Double hold [`CpInfo::Null`].
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<CpEntry>,
    count: u16,
    chains: CpChains,
}
impl ConstantPool {
    pub(crate) fn new(entries: Vec<CpEntry>, chains: CpChains) -> Self {
        let count = entries.len() as u16;
        Self {
            entries,
            count,
            chains,
        }
    }

    /// The `constant_pool_count`, i.e. one more than the highest usable index.
    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn get(&self, index: u16) -> Option<&CpInfo> {
        self.entry(index).map(|e| &e.info)
    }

    pub fn entry(&self, index: u16) -> Option<&CpEntry> {
        if index < self.count {
            self.entries.get(index as usize)
        } else {
            None
        }
    }

    /// Tag of the entry at `index`, the null tag when out of range.
    pub fn tag(&self, index: u16) -> u8 {
        self.get(index).map_or(CONSTANT_NULL, CpInfo::tag)
    }

    pub fn utf8(&self, index: u16) -> Option<&Utf8Info> {
        match self.get(index)? {
            CpInfo::Utf8(utf8) => Some(utf8),
            _ => None,
        }
    }

    /// Bytes of the Utf8 entry at `index`, empty when there is none.
    pub fn utf8_bytes(&self, index: u16) -> &[u8] {
        self.utf8(index).map_or(&[], |u| &u.bytes)
    }

    /// Name of the Class entry at `index`.
    pub fn class_name(&self, index: u16) -> Option<&Utf8Info> {
        match self.get(index)? {
            CpInfo::Class(ClassInfo { name_index }) => self.utf8(*name_index),
            _ => None,
        }
    }

    pub fn utf8_indices(&self) -> ChainIter<'_> {
        ChainIter {
            next: &self.chains.next,
            current: self.chains.first_utf8,
        }
    }

    pub fn name_and_type_indices(&self) -> ChainIter<'_> {
        ChainIter {
            next: &self.chains.next,
            current: self.chains.first_name_and_type,
        }
    }

    pub fn first_utf8_index(&self) -> u16 {
        self.chains.first_utf8
    }

    pub fn last_utf8_index(&self) -> u16 {
        self.chains.last_utf8
    }

    pub fn first_name_and_type_index(&self) -> u16 {
        self.chains.first_name_and_type
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpEntry)> {
        self.entries
            .iter()
            .take(self.count as usize)
            .enumerate()
            .map(|(i, e)| (i as u16, e))
    }

    pub(crate) fn get_mut(&mut self, index: u16) -> Option<&mut CpInfo> {
        if index < self.count {
            self.entries.get_mut(index as usize).map(|e| &mut e.info)
        } else {
            None
        }
    }

    /// Adds a null slot past the declared entries without counting it. Returns false
    /// when the count could not grow to cover it.
    pub(crate) fn reserve_hidden_slot(&mut self) -> bool {
        if self.entries.len() >= usize::from(u16::MAX) {
            return false;
        }
        self.entries.push(CpEntry {
            offset: 0,
            info: CpInfo::Null,
        });
        true
    }

    pub(crate) fn count_hidden_slot(&mut self) {
        self.count = self.entries.len() as u16;
    }
}
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = &'a CpEntry;
    type IntoIter = std::slice::Iter<'a, CpEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries[..self.count as usize].iter()
    }
}

/// Links from each Utf8 entry to the next one, and likewise for NameAndType entries.
/// Index 0 terminates a chain.
#[derive(Debug, Default)]
pub(crate) struct CpChains {
    pub(crate) next: Vec<u16>,
    pub(crate) first_utf8: u16,
    pub(crate) last_utf8: u16,
    pub(crate) first_name_and_type: u16,
    pub(crate) last_name_and_type: u16,
}
impl CpChains {
    pub(crate) fn with_count(count: u16) -> Self {
        Self {
            next: vec![0; count as usize],
            ..Self::default()
        }
    }

    pub(crate) fn link_utf8(&mut self, index: u16) {
        if self.first_utf8 == 0 {
            self.first_utf8 = index;
        } else {
            self.next[self.last_utf8 as usize] = index;
        }
        self.last_utf8 = index;
    }

    pub(crate) fn link_name_and_type(&mut self, index: u16) {
        if self.first_name_and_type == 0 {
            self.first_name_and_type = index;
        } else {
            self.next[self.last_name_and_type as usize] = index;
        }
        self.last_name_and_type = index;
    }
}

pub struct ChainIter<'a> {
    next: &'a [u16],
    current: u16,
}
impl Iterator for ChainIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.current == 0 {
            return None;
        }
        let index = self.current;
        self.current = self.next.get(index as usize).copied().unwrap_or(0);
        Some(index)
    }
}

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.get($index) {
            Some(crate::constant_pool::CpInfo::$i(n)) => Ok(n),
            c => Err(crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($i),
                c.cloned().unwrap_or(crate::constant_pool::CpInfo::Null),
            )),
        }
    };
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CpEntry {
    /// Offset of the tag byte in the class file.
    pub offset: u32,
    pub info: CpInfo,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CpInfo {
    Null,
    Utf8(Utf8Info),
    Integer(u32),
    Float(u32),
    Long { high_bytes: u32, low_bytes: u32 },
    Double { high_bytes: u32, low_bytes: u32 },
    Class(ClassInfo),
    String { string_index: u16 },
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module { name_index: u16 },
    Package { name_index: u16 },
}
impl CpInfo {
    pub fn tag(&self) -> u8 {
        match self {
            CpInfo::Null => CONSTANT_NULL,
            CpInfo::Utf8(_) => CONSTANT_UTF8,
            CpInfo::Integer(_) => CONSTANT_INTEGER,
            CpInfo::Float(_) => CONSTANT_FLOAT,
            CpInfo::Long { .. } => CONSTANT_LONG,
            CpInfo::Double { .. } => CONSTANT_DOUBLE,
            CpInfo::Class(_) => CONSTANT_CLASS,
            CpInfo::String { .. } => CONSTANT_STRING,
            CpInfo::FieldRef(_) => CONSTANT_FIELD_REF,
            CpInfo::MethodRef(_) => CONSTANT_METHOD_REF,
            CpInfo::InterfaceMethodRef(_) => CONSTANT_INTERFACE_METHOD_REF,
            CpInfo::NameAndType(_) => CONSTANT_NAME_AND_TYPE,
            CpInfo::MethodHandle(_) => CONSTANT_METHOD_HANDLE,
            CpInfo::MethodType(_) => CONSTANT_METHOD_TYPE,
            CpInfo::Dynamic(_) => CONSTANT_DYNAMIC,
            CpInfo::InvokeDynamic(_) => CONSTANT_INVOKE_DYNAMIC,
            CpInfo::Module { .. } => CONSTANT_MODULE,
            CpInfo::Package { .. } => CONSTANT_PACKAGE,
        }
    }

    /// Long and Double take up two slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, CpInfo::Long { .. } | CpInfo::Double { .. })
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Utf8Info {
    /// Canonical modified UTF-8 bytes.
    pub bytes: Vec<u8>,
    pub flags: Utf8Flags,
}
impl Utf8Info {
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}
impl PartialEq<[u8]> for Utf8Info {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes == other
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ClassInfo {
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}
