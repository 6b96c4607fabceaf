//! Conversions between Excel-style cell references and numeric positions.

/// Largest column number Excel accepts (`XFD`).
pub const MAX_COLUMN: usize = 16_384;

/// Largest row number Excel accepts.
pub const MAX_ROW: usize = 1_048_576;

/// Converts column letters to a 1-based column number (`A` = 1, `Z` = 26, `AA` = 27).
///
/// Letters are case-insensitive. Returns `None` for an empty string, a non-letter
/// character, or a column past `XFD`.
pub fn letters_to_column(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut column = 0usize;
    for character in letters.chars() {
        if !character.is_ascii_alphabetic() {
            return None;
        }
        let digit = (character.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        column = column * 26 + digit;
        if column > MAX_COLUMN {
            return None;
        }
    }
    Some(column)
}

/// Converts a 1-based column number to its letters (`1` = `A`, `28` = `AB`).
pub fn column_to_letters(column: usize) -> String {
    let mut column = column;
    let mut letters = String::new();
    while column > 0 {
        column -= 1;
        letters.insert(0, (b'A' + (column % 26) as u8) as char);
        column /= 26;
    }
    letters
}

/// Parses a cell reference such as `B3` or `$B$3` into a 0-based `(row, col)` index.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|character: char| character.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = letters_to_column(letters)?;
    let row = digits.parse::<usize>().ok().filter(|row| (1..=MAX_ROW).contains(row))?;
    Some((row - 1, col - 1))
}

/// Formats a 0-based `(row, col)` index as a cell reference (`(0, 0)` = `A1`).
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", column_to_letters(col + 1), row + 1)
}
