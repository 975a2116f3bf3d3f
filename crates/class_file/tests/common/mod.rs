// In-memory class file builder shared by the integration tests

#![allow(dead_code)]

pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_ABSTRACT: u16 = 0x0400;

/// `return`
pub const RETURN: &[u8] = &[0xb1];

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

/// Constant pool entries are appended as they are asked for, so indices are
/// handed out in call order starting at 1.
pub struct ClassBuilder {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pool: Vec<u8>,
    pool_count: u16,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

impl ClassBuilder {
    pub fn new(major_version: u16) -> Self {
        Self {
            magic: 0xCAFEBABE,
            minor_version: 0,
            major_version,
            pool: Vec::new(),
            pool_count: 1,
            access_flags: ACC_PUBLIC | ACC_SUPER,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// A public class `name` extending java/lang/Object.
    pub fn class(major_version: u16, name: &str) -> Self {
        let mut builder = Self::new(major_version);
        builder.this_class = builder.class_entry(name);
        builder.super_class = builder.class_entry(JAVA_LANG_OBJECT);
        builder
    }

    pub fn pool_count(&self) -> u16 {
        self.pool_count
    }

    /// File offset of the tag byte of the next pool entry.
    pub fn next_entry_offset(&self) -> u32 {
        10 + self.pool.len() as u32
    }

    pub fn raw_entry(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.pool_count;
        self.pool.extend_from_slice(bytes);
        self.pool_count += slots;
        index
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
        self.raw_entry(&bytes, 1)
    }

    pub fn class_entry(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        let mut bytes = vec![7];
        bytes.extend_from_slice(&name_index.to_be_bytes());
        self.raw_entry(&bytes, 1)
    }

    pub fn integer(&mut self, value: u32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.raw_entry(&bytes, 1)
    }

    pub fn long(&mut self, value: u64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.raw_entry(&bytes, 2)
    }

    pub fn method_handle(&mut self, reference_kind: u8, reference_index: u16) -> u16 {
        let mut bytes = vec![15, reference_kind];
        bytes.extend_from_slice(&reference_index.to_be_bytes());
        self.raw_entry(&bytes, 1)
    }

    pub fn field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) {
        let member = self.member(access_flags, name, descriptor, attributes);
        self.fields.push(member);
    }

    pub fn method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) {
        let member = self.member(access_flags, name, descriptor, attributes);
        self.methods.push(member);
    }

    fn member(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) -> Vec<u8> {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&access_flags.to_be_bytes());
        bytes.extend_from_slice(&name_index.to_be_bytes());
        bytes.extend_from_slice(&descriptor_index.to_be_bytes());
        push_list(&mut bytes, &attributes);
        bytes
    }

    pub fn class_attribute(&mut self, attribute: Vec<u8>) {
        self.attributes.push(attribute);
    }

    /// An attribute whose declared length matches `payload`.
    pub fn attribute(&mut self, name: &str, payload: &[u8]) -> Vec<u8> {
        self.attribute_with_length(name, payload.len() as u32, payload)
    }

    pub fn attribute_with_length(&mut self, name: &str, length: u32, payload: &[u8]) -> Vec<u8> {
        let name_index = self.utf8(name);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&name_index.to_be_bytes());
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    /// A Code attribute without handlers.
    pub fn code(&mut self, code: &[u8], attributes: Vec<Vec<u8>>) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u16.to_be_bytes());
        payload.extend_from_slice(&2u16.to_be_bytes());
        payload.extend_from_slice(&(code.len() as u32).to_be_bytes());
        payload.extend_from_slice(code);
        payload.extend_from_slice(&0u16.to_be_bytes());
        push_list(&mut payload, &attributes);
        self.attribute("Code", &payload)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.magic.to_be_bytes());
        bytes.extend_from_slice(&self.minor_version.to_be_bytes());
        bytes.extend_from_slice(&self.major_version.to_be_bytes());
        bytes.extend_from_slice(&self.pool_count.to_be_bytes());
        bytes.extend_from_slice(&self.pool);
        bytes.extend_from_slice(&self.access_flags.to_be_bytes());
        bytes.extend_from_slice(&self.this_class.to_be_bytes());
        bytes.extend_from_slice(&self.super_class.to_be_bytes());
        bytes.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            bytes.extend_from_slice(&interface.to_be_bytes());
        }
        push_list(&mut bytes, &self.fields);
        push_list(&mut bytes, &self.methods);
        push_list(&mut bytes, &self.attributes);
        bytes
    }
}

fn push_list(bytes: &mut Vec<u8>, items: &[Vec<u8>]) {
    bytes.extend_from_slice(&(items.len() as u16).to_be_bytes());
    for item in items {
        bytes.extend_from_slice(item);
    }
}

/// `my/MyClass` with an int field, a constructor and an `add(I)F` method.
pub fn my_class(major_version: u16) -> ClassBuilder {
    let mut builder = ClassBuilder::class(major_version, "my/MyClass");
    builder.field(ACC_PRIVATE | ACC_FINAL, "myField", "I", vec![]);
    let code = builder.code(RETURN, vec![]);
    builder.method(ACC_PUBLIC, "<init>", "()V", vec![code]);
    let code = builder.code(&[0x0b, 0xae], vec![]);
    builder.method(ACC_PUBLIC, "add", "(I)F", vec![code]);
    builder
}
