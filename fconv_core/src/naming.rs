//! Output file-name derivation.
//!
//! These rules are the only persisted "format" visible outside the process,
//! so they are deterministic functions of the input name and the target
//! extension.

/// True when `name` ends in `.{extension}`, ignoring ASCII case.
pub fn has_extension(name: &str, extension: &str) -> bool {
    let suffix_len = extension.len() + 1;
    if name.len() < suffix_len || !name.is_char_boundary(name.len() - suffix_len) {
        return false;
    }
    let tail = &name[name.len() - suffix_len..];
    tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(extension)
}

/// Drop the final `.suffix` from `name`. Names without a dot are returned
/// unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    }
}

/// `photo.rgba` + `png` → `photo.png`.
pub fn replace_extension(name: &str, extension: &str) -> String {
    format!("{}.{}", strip_extension(name), extension)
}

/// Series name for a packed archive, derived from the first page's file name.
///
/// A trailing `_0.{page_extension}` page-index marker is removed together with
/// the extension, so `vol1_0.png` becomes `vol1`. Any other name just loses its
/// extension.
pub fn series_name<'a>(first_page: &'a str, page_extension: &str) -> &'a str {
    let marker = format!("_0.{page_extension}");
    match first_page.strip_suffix(marker.as_str()) {
        Some(series) => series,
        None => strip_extension(first_page),
    }
}
