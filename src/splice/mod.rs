//! @acp:module "Patch Splicer"
//! @acp:summary "Applies all class patches of one file in a single pass"
//! @acp:domain cli
//! @acp:layer service
//!
//! Patch positions refer to the original file. Patches are applied in
//! ascending start order while a running offset tracks how many lines
//! earlier patches added or removed.

use crate::error::{MagicError, Result};
use crate::merge::Patch;
use crate::source::SourceUnit;

/// @acp:summary "Apply non-overlapping patches to a source unit"
///
/// Lines outside every patched range are copied through untouched. With no
/// patches the result equals the input. A patch reaching past the end of the
/// file, or overlapping the previous one, is a structural error and nothing
/// is applied.
pub fn apply_patches(source: &SourceUnit, mut patches: Vec<Patch>) -> Result<SourceUnit> {
    if patches.is_empty() {
        return Ok(source.clone());
    }
    patches.sort_by_key(|p| p.start);

    let mut covered = 0;
    for patch in &patches {
        let end = patch.start + patch.original_len;
        if patch.start < covered || end > source.len() {
            return Err(MagicError::structural(format!(
                "patch for lines {}..{} overlaps another or lies outside a {}-line file",
                patch.start + 1,
                end,
                source.len()
            )));
        }
        covered = end;
    }

    let mut lines = source.lines().to_vec();
    let mut offset: isize = 0;
    for patch in patches {
        let start = (patch.start as isize + offset) as usize;
        offset += patch.delta();
        lines.splice(start..start + patch.original_len, patch.replacement);
    }

    Ok(SourceUnit::from_lines(lines).with_encoding(source.encoding()))
}
