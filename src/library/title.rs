//! Folder-name helpers.
//!
//! osu! song folders are conventionally named `"<beatmap id> Artist - Title"`.
//! The helpers here strip the numeric id prefix and recover an artist from
//! the remaining `"Artist - Title"` shape when tags are missing.

/// Strip leading numeric ids and their trailing separators from `s`.
///
/// `"311328 Foo"` becomes `"Foo"`; a string without a leading id is returned
/// unchanged. Stripping is idempotent: applying it to its own output is a
/// no-op.
pub fn strip_leading_numbers(s: &str) -> &str {
    let mut out = s;
    loop {
        let next = strip_once(out);
        if next == out {
            return out;
        }
        out = next;
    }
}

fn strip_once(s: &str) -> &str {
    let trimmed = s.trim_start();
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return s;
    }
    // Digits are ASCII, so the char count is also a byte offset.
    trimmed[digits..].trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '.' | '_' | '-'))
}

/// Recover an artist from an `"Artist - Title"` folder title.
pub fn parse_artist_from_folder(folder_title: &str) -> Option<String> {
    let (artist, title) = folder_title.split_once(" - ")?;
    let artist = artist.trim();
    if artist.is_empty() || title.trim().is_empty() {
        return None;
    }
    Some(artist.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_numeric_id() {
        assert_eq!(strip_leading_numbers("311328 Foo"), "Foo");
        assert_eq!(strip_leading_numbers("123-Foo"), "Foo");
        assert_eq!(strip_leading_numbers("123_Foo"), "Foo");
        assert_eq!(strip_leading_numbers("123. Foo"), "Foo");
        assert_eq!(strip_leading_numbers("  42 Foo"), "Foo");
    }

    #[test]
    fn leaves_unprefixed_titles_alone() {
        assert_eq!(strip_leading_numbers("Foo"), "Foo");
        assert_eq!(strip_leading_numbers(""), "");
        assert_eq!(strip_leading_numbers("Foo 123"), "Foo 123");
    }

    #[test]
    fn stripping_is_idempotent() {
        for s in ["311328 Foo", "Foo", "12 34 Foo", "99", ""] {
            let once = strip_leading_numbers(s);
            assert_eq!(strip_leading_numbers(once), once, "input {s:?}");
        }
    }

    #[test]
    fn parses_artist_from_folder_title() {
        assert_eq!(
            parse_artist_from_folder("Camellia - Exit This Earth's Atomosphere"),
            Some("Camellia".to_string())
        );
        assert_eq!(parse_artist_from_folder("No separator here"), None);
        assert_eq!(parse_artist_from_folder(" - Title"), None);
        assert_eq!(parse_artist_from_folder("Artist - "), None);
    }
}
