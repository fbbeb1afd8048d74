/// Metadata envelope for uploaded content bodies
///
/// A body may open with a fenced `key: value` block:
///
/// ```text
/// ---
/// title: My Story
/// handle: @writer
/// license: CC-BY-4.0
/// ---
/// body text...
/// ```
///
/// The block must start on the first line. Bodies without it carry no
/// metadata; the free text is never scanned for titles or handles.

const FENCE: &str = "---";

/// Metadata parsed from an envelope header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub title: Option<String>,
    pub handle: Option<String>,
    pub license: Option<String>,
}

impl Envelope {
    /// Parse the envelope header of `body`, if any
    ///
    /// Returns the metadata and the text following the closing fence.
    /// An unterminated header is treated as no header at all.
    pub fn parse(body: &str) -> Option<(Envelope, &str)> {
        let mut lines = body.split_inclusive('\n');
        let first = lines.next()?;
        if first.trim_end_matches(['\r', '\n']) != FENCE {
            return None;
        }

        let mut envelope = Envelope::default();
        let mut consumed = first.len();

        for line in lines {
            consumed += line.len();
            let line = line.trim_end_matches(['\r', '\n']);

            if line == FENCE {
                return Some((envelope, &body[consumed..]));
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim().to_ascii_lowercase().as_str() {
                "title" => envelope.title = Some(value.to_string()),
                "handle" => envelope.handle = Some(value.to_string()),
                "license" => envelope.license = Some(value.to_string()),
                _ => {}
            }
        }

        None
    }

    /// Render an envelope header followed by `text`
    pub fn wrap(&self, text: &str) -> String {
        let mut out = String::from(FENCE);
        out.push('\n');
        if let Some(title) = &self.title {
            out.push_str(&format!("title: {}\n", title));
        }
        if let Some(handle) = &self.handle {
            out.push_str(&format!("handle: {}\n", handle));
        }
        if let Some(license) = &self.license {
            out.push_str(&format!("license: {}\n", license));
        }
        out.push_str(FENCE);
        out.push('\n');
        out.push_str(text);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_header() {
        let body = "---\ntitle: My Story\nhandle: @writer\nlicense: CC-BY-4.0\n---\nIt was a dark night.";
        let (envelope, rest) = Envelope::parse(body).unwrap();

        assert_eq!(envelope.title.as_deref(), Some("My Story"));
        assert_eq!(envelope.handle.as_deref(), Some("@writer"));
        assert_eq!(envelope.license.as_deref(), Some("CC-BY-4.0"));
        assert_eq!(rest, "It was a dark night.");
    }

    #[test]
    fn test_no_header() {
        assert!(Envelope::parse("My Story\n\nfollow me @writer").is_none());
        assert!(Envelope::parse("").is_none());
    }

    #[test]
    fn test_unterminated_header_is_ignored() {
        assert!(Envelope::parse("---\ntitle: Half\nno closing fence").is_none());
    }

    #[test]
    fn test_crlf_and_unknown_keys() {
        let body = "---\r\nTitle: Windows\r\nmood: grim\r\n---\r\nbody";
        let (envelope, rest) = Envelope::parse(body).unwrap();

        assert_eq!(envelope.title.as_deref(), Some("Windows"));
        assert_eq!(envelope.handle, None);
        assert_eq!(rest, "body");
    }

    #[test]
    fn test_value_may_contain_colons() {
        let body = "---\ntitle: Part 2: The Return\n---\n";
        let (envelope, _) = Envelope::parse(body).unwrap();
        assert_eq!(envelope.title.as_deref(), Some("Part 2: The Return"));
    }

    #[test]
    fn test_wrap_parses_back() {
        let envelope = Envelope {
            title: Some("Essay".to_string()),
            handle: None,
            license: Some("All Rights Reserved".to_string()),
        };
        let body = envelope.wrap("text");
        let (parsed, rest) = Envelope::parse(&body).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(rest, "text");
    }
}
