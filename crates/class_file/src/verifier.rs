use crate::{bytecode, ClassFile, ReadOptions, Result};

/// The bytecode verifier that runs once the class has passed the structural checks.
///
/// Implementations tag the methods using `jsr`/`ret` (see
/// [`bytecode::scan_for_jsrs`]) and return whether a `ret` was found.
pub trait StaticVerifier {
    fn verify(&mut self, class_file: &mut ClassFile, options: &ReadOptions) -> Result<bool>;

    /// Rewrites the code of `methods[method_index]` without subroutines.
    fn inline_jsrs(
        &mut self,
        _class_file: &mut ClassFile,
        _method_index: usize,
        _has_ret: bool,
    ) -> Result<()> {
        Ok(())
    }
}

impl<F> StaticVerifier for F
where
    F: FnMut(&mut ClassFile, &ReadOptions) -> Result<bool>,
{
    fn verify(&mut self, class_file: &mut ClassFile, options: &ReadOptions) -> Result<bool> {
        self(class_file, options)
    }
}

/// Accepts all bytecode, only tagging subroutine use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVerification;
impl StaticVerifier for NoVerification {
    fn verify(&mut self, class_file: &mut ClassFile, _options: &ReadOptions) -> Result<bool> {
        Ok(bytecode::scan_for_jsrs(class_file))
    }
}
