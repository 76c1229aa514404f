use std::path::Path;

use crate::model::NameInfo;

/// Splits a path's basename around its trailing digit run.
///
/// The digit run is the rightmost run of ASCII digits that is followed only by
/// non-digit characters, so `shot12_v2.png` yields `2` and `img009.png` yields
/// `009`. Returns `None` for names without digits, names that are not valid
/// UTF-8, and digit runs too large for a `u64`.
pub fn parse_name(path: &Path) -> Option<NameInfo> {
    let name = path.file_name()?.to_str()?;
    let bytes = name.as_bytes();

    let end = bytes.iter().rposition(u8::is_ascii_digit)? + 1;
    let start = bytes[..end]
        .iter()
        .rposition(|byte| !byte.is_ascii_digit())
        .map_or(0, |index| index + 1);

    // ASCII digits never occur inside a multi-byte UTF-8 sequence, so both
    // offsets are char boundaries.
    let number = &name[start..end];
    let value = number.parse::<u64>().ok()?;

    Some(NameInfo {
        path: path.to_path_buf(),
        container: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        name: name.to_string(),
        number: number.to_string(),
        value,
        digit_count: number.len(),
        prefix: name[..start].to_string(),
        suffix: name[end..].to_string(),
    })
}
