//! File names that cannot be written back out by the updater on every target filesystem.

const ILLEGAL_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Why a bare file name was refused, or `None` when it is acceptable.
#[must_use]
pub fn rejection_reason(name: &str) -> Option<&'static str> {
    if name.contains(ILLEGAL_CHARS) {
        return Some("contains one of < > : \" | ? *");
    }
    if RESERVED_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
    {
        return Some("reserved device name");
    }
    None
}

#[must_use]
pub fn is_valid_file_name(name: &str) -> bool {
    rejection_reason(name).is_none()
}
