const MAX_ARRAY_DIMENSIONS: usize = 255;

/// An unqualified name: not empty and free of `. ; [ /`.
pub(super) fn is_valid_unqualified_name(name: &[u8]) -> bool {
    !name.is_empty() && !name.iter().any(|b| matches!(b, b'.' | b';' | b'[' | b'/'))
}

/// A field descriptor such as `I`, `[[J` or `Ljava/lang/String;`.
pub(super) fn is_valid_field_descriptor(descriptor: &[u8]) -> bool {
    let dimensions = descriptor.iter().take_while(|&&b| b == b'[').count();
    if dimensions > MAX_ARRAY_DIMENSIONS {
        return false;
    }

    match &descriptor[dimensions..] {
        [b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z'] => true,
        [b'L', class_name @ .., b';'] => is_valid_binary_name(class_name),
        _ => false,
    }
}

/// Slash separated unqualified names.
fn is_valid_binary_name(name: &[u8]) -> bool {
    name.split(|&b| b == b'/').all(is_valid_unqualified_name)
}
