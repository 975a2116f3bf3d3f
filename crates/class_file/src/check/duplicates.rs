use log::trace;

use crate::{class_file::Member, error::ErrorCode, ClassFileError, ConstantPool, Result};

/// Byte to hash mapping, filled once at compile time.
const RANDOM_VALUES: [u8; 256] = random_values();

const fn random_values() -> [u8; 256] {
    let mut values = [0; 256];
    let mut state: u32 = 0x9E37_79B9;
    let mut i = 0;
    while i < 256 {
        // xorshift32
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        values[i] = (state >> 24) as u8;
        i += 1;
    }
    values
}

/// Fails with `duplicate` at the offset of the first member whose name and
/// descriptor match an earlier member.
pub(super) fn check_duplicate_members(
    members: &[Member],
    constant_pool: &ConstantPool,
    hash_threshold: usize,
    duplicate: ErrorCode,
) -> Result<()> {
    let found = if use_hash_table(members.len(), hash_threshold) {
        trace!("Hashing {} members to find duplicates", members.len());
        find_duplicate_hashed(members, constant_pool)
    } else {
        trace!("Comparing {} members pairwise to find duplicates", members.len());
        find_duplicate_pairwise(members, constant_pool)
    };

    match found {
        Some(i) => Err(ClassFileError::format(duplicate, members[i].offset)),
        None => Ok(()),
    }
}

fn use_hash_table(count: usize, hash_threshold: usize) -> bool {
    !cfg!(feature = "quadratic-duplicate-check") && count >= hash_threshold
}

fn same_signature(a: &Member, b: &Member, constant_pool: &ConstantPool) -> bool {
    constant_pool.utf8_bytes(a.name_index) == constant_pool.utf8_bytes(b.name_index)
        && constant_pool.utf8_bytes(a.descriptor_index)
            == constant_pool.utf8_bytes(b.descriptor_index)
}

fn find_duplicate_pairwise(members: &[Member], constant_pool: &ConstantPool) -> Option<usize> {
    (1..members.len()).find(|&i| {
        members[..i]
            .iter()
            .any(|other| same_signature(&members[i], other, constant_pool))
    })
}

/// Open addressing with linear probing over a table at least twice the member count.
fn find_duplicate_hashed(members: &[Member], constant_pool: &ConstantPool) -> Option<usize> {
    let table_size = smallest_prime_at_least(members.len() * 2);
    let mut table: Vec<Option<usize>> = vec![None; table_size];

    for (i, member) in members.iter().enumerate() {
        let hash = member_hash(
            constant_pool.utf8_bytes(member.name_index),
            constant_pool.utf8_bytes(member.descriptor_index),
        );
        let mut slot = hash as usize % table_size;
        while let Some(other) = table[slot] {
            if same_signature(member, &members[other], constant_pool) {
                return Some(i);
            }
            slot = (slot + 1) % table_size;
        }
        table[slot] = Some(i);
    }

    None
}

/// A 24 bit hash over the name and then the descriptor, taking bytes in groups of
/// three.
fn member_hash(name: &[u8], descriptor: &[u8]) -> u32 {
    const SHIFTS: [u32; 3] = [8, 8, 16];

    let mut hash = 0u32;
    for bytes in [name, descriptor] {
        for group in bytes.chunks(3) {
            for (&byte, shift) in group.iter().zip(SHIFTS) {
                hash ^= u32::from(RANDOM_VALUES[byte as usize]) << shift;
            }
        }
    }
    hash
}

fn smallest_prime_at_least(n: usize) -> usize {
    (n.max(2)..)
        .find(|&candidate| is_prime(candidate))
        .unwrap_or(usize::MAX)
}

fn is_prime(n: usize) -> bool {
    n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
}
