use std::path::Path;

pub fn column_number_to_name(column: u32) -> String {
    let mut column = column;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

/// Inverse of [`column_number_to_name`]. Accepts upper or lower case letters
/// only; anything else yields `None`.
pub fn column_name_to_number(name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    let mut column: u32 = 0;
    for ch in name.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        column = column.checked_mul(26)?.checked_add(digit)?;
    }
    Some(column)
}

pub fn cell_address(column: u32, row: u32) -> String {
    format!("{}{}", column_number_to_name(column), row)
}

pub fn absolute_address(column: u32, row: u32) -> String {
    format!("${}${}", column_number_to_name(column), row)
}

pub fn path_to_forward_slashes(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw.contains('\\') {
        raw.replace('\\', "/")
    } else {
        raw.into_owned()
    }
}
