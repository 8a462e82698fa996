//! Front-matter header extraction

use serde::Deserialize;

use super::{RenderError, TemplateResult};

const FENCE: &str = "---";

/// Metadata block at the top of a rendered template
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MailHeader {
    pub subject: String,
}

/// Split rendered text into its YAML header and the remaining body.
///
/// The text must open with a `---` line; the header runs until the next
/// `---` line and everything after that line is the body.
pub fn split_front_matter(rendered: &str) -> TemplateResult<(MailHeader, String)> {
    let text = rendered.trim_start_matches('\u{feff}').trim_start();
    let mut lines = text.split_inclusive('\n');

    let header_start = match lines.next() {
        Some(first) if is_fence(first) => first.len(),
        _ => {
            return Err(RenderError::FrontMatter(
                "missing opening '---' line".to_string(),
            ))
        }
    };

    let mut offset = header_start;
    for line in lines {
        if is_fence(line) {
            let yaml = &text[header_start..offset];
            let body = &text[offset + line.len()..];
            let header: MailHeader = serde_yaml::from_str(yaml)
                .map_err(|e| RenderError::FrontMatter(e.to_string()))?;
            return Ok((header, body.to_string()));
        }
        offset += line.len();
    }

    Err(RenderError::FrontMatter(
        "missing closing '---' line".to_string(),
    ))
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == FENCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_header_and_body() {
        let (header, body) =
            split_front_matter("---\nsubject: Hello\n---\nLine one\nLine two\n").unwrap();
        assert_eq!(header.subject, "Hello");
        assert_eq!(body, "Line one\nLine two\n");
    }

    #[test]
    fn test_quoted_subject_and_crlf() {
        let (header, body) =
            split_front_matter("---\r\nsubject: \"Cours : modifié\"\r\n---\r\nBody").unwrap();
        assert_eq!(header.subject, "Cours : modifié");
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_leading_whitespace_is_ignored() {
        let (header, _) = split_front_matter("\n\n---\nsubject: x\n---\n").unwrap();
        assert_eq!(header.subject, "x");
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let (header, body) =
            split_front_matter("---\nsubject: s\npriority: high\n---\nb").unwrap();
        assert_eq!(header.subject, "s");
        assert_eq!(body, "b");
    }

    #[test]
    fn test_missing_opening_fence() {
        let err = split_front_matter("subject: x\n---\nbody").unwrap_err();
        assert!(matches!(err, RenderError::FrontMatter(_)));
    }

    #[test]
    fn test_missing_closing_fence() {
        let err = split_front_matter("---\nsubject: x\nbody").unwrap_err();
        assert!(matches!(err, RenderError::FrontMatter(_)));
    }

    #[test]
    fn test_missing_subject() {
        let err = split_front_matter("---\ntitle: x\n---\nbody").unwrap_err();
        assert!(matches!(err, RenderError::FrontMatter(_)));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = split_front_matter("---\nsubject: [unclosed\n---\nbody").unwrap_err();
        assert!(matches!(err, RenderError::FrontMatter(_)));
    }
}
