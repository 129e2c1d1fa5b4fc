//! Line-level encoding of flat records.
//!
//! Fields are joined with [`FIELD_DELIMITER`]. Inside a field the escape character, the
//! delimiter and line breaks are written with a leading [`ESCAPE_CHAR`], so every record
//! occupies exactly one line whatever the text contains.

use crate::constants::{ESCAPE_CHAR, FIELD_DELIMITER};

pub(crate) fn encode_line<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(FIELD_DELIMITER);
        }
        for c in field.as_ref().chars() {
            match c {
                '\n' => {
                    line.push(ESCAPE_CHAR);
                    line.push('n');
                }
                '\r' => {
                    line.push(ESCAPE_CHAR);
                    line.push('r');
                }
                c if c == ESCAPE_CHAR || c == FIELD_DELIMITER => {
                    line.push(ESCAPE_CHAR);
                    line.push(c);
                }
                c => line.push(c),
            }
        }
    }
    line
}

/// Splits one encoded line back into fields.
///
/// # Errors
///
/// Returns a description of the problem for a dangling escape or an unknown escape sequence.
pub(crate) fn decode_line(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        if c == ESCAPE_CHAR {
            match chars.next() {
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(e) if e == ESCAPE_CHAR || e == FIELD_DELIMITER => current.push(e),
                Some(other) => return Err(format!("unknown escape sequence '\\{}'", other)),
                None => return Err("line ends with a dangling escape".into()),
            }
        } else if c == FIELD_DELIMITER {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_joined_with_delimiter() {
        assert_eq!(encode_line(&["a", "b", "", "d"]), "a,b,,d");
        assert_eq!(decode_line("a,b,,d").unwrap(), vec!["a", "b", "", "d"]);
    }

    #[test]
    fn special_characters_survive() {
        let fields = [
            "Follow-up, then rest",
            "line one\nline two\r",
            "back\\slash",
        ];
        let line = encode_line(&fields);

        assert!(!line.contains('\n'));
        assert_eq!(line.matches(',').count(), 3, "one escaped comma plus two delimiters");
        assert_eq!(decode_line(&line).unwrap(), fields);
    }

    #[test]
    fn empty_line_is_one_empty_field() {
        assert_eq!(decode_line("").unwrap(), vec![String::new()]);
    }

    #[test]
    fn rejects_bad_escapes() {
        assert!(decode_line("abc\\").is_err());
        assert!(decode_line("a\\qb").is_err());
    }
}
