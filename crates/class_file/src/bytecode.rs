// https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-6.html

use byteorder::{BigEndian, ByteOrder};

use crate::class_file::{ClassFile, ClassFlags, MemberFlags};

pub const IINC: u8 = 0x84;
pub const JSR: u8 = 0xa8;
pub const RET: u8 = 0xa9;
pub const TABLESWITCH: u8 = 0xaa;
pub const LOOKUPSWITCH: u8 = 0xab;
pub const WIDE: u8 = 0xc4;
pub const JSR_W: u8 = 0xc9;

// Total length of each fixed size instruction. Zero marks the switches and wide,
// which are measured from their operands.
#[rustfmt::skip]
static INSTRUCTION_LENGTHS: [u8; 0xca] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x00
    2, 3, 2, 3, 3, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, // 0x10
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x20
    1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, // 0x30
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x40
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x50
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x60
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x70
    1, 1, 1, 1, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x80
    1, 1, 1, 1, 1, 1, 1, 1, 1, 3, 3, 3, 3, 3, 3, 3, // 0x90
    3, 3, 3, 3, 3, 3, 3, 3, 3, 2, 0, 0, 1, 1, 1, 1, // 0xa0
    1, 1, 3, 3, 3, 3, 3, 3, 3, 5, 5, 3, 2, 3, 1, 1, // 0xb0
    3, 3, 1, 1, 0, 4, 3, 3, 5, 5,                   // 0xc0
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JsrScan {
    /// `jsr`, `jsr_w` or `ret` was found.
    pub has_jsr: bool,
    pub has_ret: bool,
}

/// Tags every method whose code uses `jsr`, `jsr_w` or `ret`, and the class when any
/// method was tagged. Returns whether a `ret` was seen.
pub fn scan_for_jsrs(class_file: &mut ClassFile) -> bool {
    let mut has_ret = false;
    let mut class_has_jsr = false;

    for method in class_file.methods.iter_mut() {
        let scan = match method.code() {
            Some(code) => scan_code(&code.code),
            None => continue,
        };

        if scan.has_jsr {
            method.flags.insert(MemberFlags::HAS_JSR);
            class_has_jsr = true;
        }
        has_ret |= scan.has_ret;
    }

    if class_has_jsr {
        class_file.class_flags.insert(ClassFlags::HAS_JSR);
    }
    has_ret
}

/// Walks one code array. An unknown opcode or a truncated instruction ends the walk.
pub fn scan_code(code: &[u8]) -> JsrScan {
    let mut scan = JsrScan::default();
    let mut pc = 0;

    while let Some(&opcode) = code.get(pc) {
        let length = match opcode {
            JSR | JSR_W => {
                scan.has_jsr = true;
                INSTRUCTION_LENGTHS[opcode as usize] as usize
            }
            RET => {
                scan.has_jsr = true;
                scan.has_ret = true;
                INSTRUCTION_LENGTHS[opcode as usize] as usize
            }
            WIDE => match code.get(pc + 1) {
                Some(&IINC) => 6,
                Some(&RET) => {
                    scan.has_jsr = true;
                    scan.has_ret = true;
                    4
                }
                Some(_) => 4,
                None => break,
            },
            TABLESWITCH | LOOKUPSWITCH => match switch_length(code, pc, opcode) {
                Some(length) => length,
                None => break,
            },
            _ => match INSTRUCTION_LENGTHS.get(opcode as usize) {
                Some(&length) => length as usize,
                None => break,
            },
        };

        pc = pc.saturating_add(length);
    }

    scan
}

fn switch_length(code: &[u8], pc: usize, opcode: u8) -> Option<usize> {
    // Operands start on the next four byte boundary
    let operands = pc + 4 - (pc & 3);
    let low = read_i32(code, operands + 4)?;

    let length = if opcode == TABLESWITCH {
        let high = read_i32(code, operands + 8)?;
        let count = (i64::from(high) - i64::from(low) + 1).max(0) as usize;
        count.saturating_mul(4).saturating_add(12)
    } else {
        (low.max(0) as usize).saturating_mul(8).saturating_add(8)
    };

    Some((operands - pc).saturating_add(length))
}

fn read_i32(code: &[u8], at: usize) -> Option<i32> {
    code.get(at..at + 4).map(BigEndian::read_i32)
}

#[cfg(test)]
mod scan_code_tests {
    use super::*;

    #[test]
    fn it_should_find_nothing_in_straight_line_code() {
        // iconst_0, istore_1, iinc 1 1, return
        assert_eq!(
            scan_code(&[0x03, 0x3c, 0x84, 0x01, 0x01, 0xb1]),
            JsrScan::default()
        );
    }

    #[test]
    fn it_should_see_jsr_and_ret() {
        // jsr +4, return, astore_1, ret 1
        let scan = scan_code(&[0xa8, 0x00, 0x04, 0xb1, 0x4c, 0xa9, 0x01]);
        assert!(scan.has_jsr);
        assert!(scan.has_ret);

        let scan = scan_code(&[0xc9, 0x00, 0x00, 0x00, 0x05, 0xb1]);
        assert!(scan.has_jsr);
        assert!(!scan.has_ret);
    }

    #[test]
    fn it_should_see_a_wide_ret() {
        // wide ret 0x0100
        let scan = scan_code(&[0xc4, 0xa9, 0x01, 0x00]);
        assert!(scan.has_ret);
    }

    #[test]
    fn it_should_skip_over_wide_iinc() {
        // wide iinc 0x0001 0xa8a8, return
        let scan = scan_code(&[0xc4, 0x84, 0x00, 0x01, 0xa8, 0xa8, 0xb1]);
        assert!(!scan.has_jsr);
    }

    #[test]
    fn it_should_skip_over_a_tableswitch() {
        let mut code = vec![0x00, 0xaa, 0x00, 0x00];
        // default, low = 0, high = 1
        code.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        // two jump offsets that happen to contain jsr bytes
        code.extend_from_slice(&[0xa8, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8]);
        code.push(0xb1);

        assert_eq!(switch_length(&code, 1, TABLESWITCH), Some(23));
        assert!(!scan_code(&code).has_jsr);
    }

    #[test]
    fn it_should_skip_over_a_lookupswitch() {
        let mut code = vec![0xab, 0x00, 0x00, 0x00];
        // default, npairs = 1, one (match, offset) pair
        code.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1]);
        code.extend_from_slice(&[0xa9, 0xa9, 0xa9, 0xa9, 0, 0, 0, 0]);
        code.push(0xa9);
        code.push(0x01);

        let scan = scan_code(&code);
        assert!(scan.has_ret);
        assert_eq!(switch_length(&code, 0, LOOKUPSWITCH), Some(20));
    }

    #[test]
    fn it_should_stop_at_an_unknown_opcode() {
        assert_eq!(scan_code(&[0xfe, 0xa8, 0x00, 0x00]), JsrScan::default());
    }
}
