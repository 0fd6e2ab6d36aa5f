//! `text/uri-list` codec.
//!
//! One identifier per line. Lines starting with `#` are comments and are
//! skipped when reading; nothing but identifiers is ever written.

use crate::error::{ProtocolError, ProtocolResult};

const LINE_END: &str = "\r\n";

/// Parses uri-list text into identifiers, skipping comments and blank lines.
pub fn parse(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Formats identifiers as uri-list text.
pub fn format<I, S>(uris: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for uri in uris {
        out.push_str(uri.as_ref());
        out.push_str(LINE_END);
    }
    out
}

/// Decodes a uri-list payload.
pub fn decode(bytes: &[u8]) -> ProtocolResult<Vec<String>> {
    let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
    Ok(parse(text))
}

/// Encodes identifiers as a uri-list payload.
pub fn encode<I, S>(uris: I) -> Vec<u8>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    format(uris).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn skips_comments_and_blanks() {
        let text = "# comment\r\nhttp://x/1\r\n\r\n  http://x/2  \n#another\n";
        assert_eq!(parse(text), vec!["http://x/1", "http://x/2"]);
    }

    #[test]
    fn format_has_no_comments() {
        assert_eq!(format(["http://x/1", "http://x/2"]), "http://x/1\r\nhttp://x/2\r\n");
        assert_eq!(format(Vec::<String>::new()), "");
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert!(matches!(
            decode(&[0xff, 0xfe]),
            Err(ProtocolError::InvalidUtf8)
        ));
    }

    proptest! {
        #[test]
        fn parse_inverts_format(uris in prop::collection::vec("[a-z]{1,8}://[a-z0-9/]{1,16}", 0..10)) {
            prop_assert_eq!(parse(&format(&uris)), uris);
        }
    }
}
