pub mod ini;
pub mod records;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// BepInEx writes some files with a UTF-8 byte-order mark.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}
