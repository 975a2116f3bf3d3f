// https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4.7

use bitflags::bitflags;

bitflags! {
    #[derive(Default)]
    pub struct Utf8Flags: u8 {
        /// An overlong encoding was shortened.
        const CANONICALIZED = 0x01;
        /// Contains an encoded NUL (`C0 80`).
        const ENCODED_NUL = 0x02;
        /// Contains surrogate code units, i.e. six-byte supplementary characters.
        const SURROGATES = 0x04;
    }
}

/// Validates modified UTF-8 and rewrites overlong two and three byte sequences to
/// their shortest form. NUL always stays encoded as `C0 80`.
///
/// Returns `None` when the bytes are not modified UTF-8.
pub fn canonicalize(bytes: &[u8]) -> Option<(Vec<u8>, Utf8Flags)> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut flags = Utf8Flags::empty();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0 => return None,
            0x01..=0x7f => {
                out.push(b);
                i += 1;
            }
            0xc0..=0xdf => {
                let b2 = continuation(bytes, i + 1)?;
                let c = (u32::from(b & 0x1f) << 6) | u32::from(b2 & 0x3f);
                push_canonical(&mut out, &mut flags, c, 2);
                i += 2;
            }
            0xe0..=0xef => {
                let b2 = continuation(bytes, i + 1)?;
                let b3 = continuation(bytes, i + 2)?;
                let c = (u32::from(b & 0x0f) << 12)
                    | (u32::from(b2 & 0x3f) << 6)
                    | u32::from(b3 & 0x3f);
                push_canonical(&mut out, &mut flags, c, 3);
                i += 3;
            }
            // Stray continuation bytes and four byte forms
            _ => return None,
        }
    }

    Some((out, flags))
}

fn continuation(bytes: &[u8], i: usize) -> Option<u8> {
    bytes.get(i).copied().filter(|b| b & 0xc0 == 0x80)
}

fn push_canonical(out: &mut Vec<u8>, flags: &mut Utf8Flags, c: u32, encoded_len: usize) {
    let canonical_len = match c {
        0 => {
            flags.insert(Utf8Flags::ENCODED_NUL);
            out.extend_from_slice(&[0xc0, 0x80]);
            2
        }
        0x01..=0x7f => {
            out.push(c as u8);
            1
        }
        0x80..=0x7ff => {
            out.push(0xc0 | (c >> 6) as u8);
            out.push(0x80 | (c & 0x3f) as u8);
            2
        }
        _ => {
            if (0xd800..=0xdfff).contains(&c) {
                flags.insert(Utf8Flags::SURROGATES);
            }
            out.push(0xe0 | (c >> 12) as u8);
            out.push(0x80 | ((c >> 6) & 0x3f) as u8);
            out.push(0x80 | (c & 0x3f) as u8);
            3
        }
    };

    if canonical_len < encoded_len {
        flags.insert(Utf8Flags::CANONICALIZED);
    }
}
