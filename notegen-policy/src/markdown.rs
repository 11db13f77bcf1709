//! Minimal markdown heading scanner.
//!
//! Recognises ATX headings (`#` through `######`) and setext headings
//! (`===` / `---` underlines). Lines inside fenced code blocks are skipped.

/// A heading found in rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Heading level, 1 through 6.
    pub level: u8,
    /// Heading text with markers and closing hashes removed.
    pub text: String,
    /// Zero-based line number.
    pub line: usize,
}

/// Returns every heading in `text`, in document order.
#[must_use]
pub fn headings(text: &str) -> Vec<Heading> {
    let mut found = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut previous: Option<(usize, &str)> = None;

    for (line, raw) in text.lines().enumerate() {
        if let Some(marker) = fence_marker(raw) {
            match fence {
                Some((ch, len)) if marker.0 == ch && marker.1 >= len => fence = None,
                Some(_) => {}
                None => fence = Some(marker),
            }
            previous = None;
            continue;
        }
        if fence.is_some() {
            continue;
        }

        if let Some(heading) = atx_heading(raw, line) {
            found.push(heading);
            previous = None;
            continue;
        }

        if let (Some(level), Some((prev_line, prev_text))) = (setext_level(raw), previous) {
            found.push(Heading {
                level,
                text: prev_text.trim().to_owned(),
                line: prev_line,
            });
            previous = None;
            continue;
        }

        previous = paragraph_line(raw).then_some((line, raw));
    }

    found
}

/// Normalises heading text for comparison: lowercase, emphasis and
/// surrounding punctuation stripped, inner whitespace collapsed.
#[must_use]
pub fn normalise_title(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|ch| if matches!(ch, '*' | '_' | '`') { ' ' } else { ch })
        .collect();
    cleaned
        .trim_matches(|ch: char| ch.is_whitespace() || ch.is_ascii_punctuation())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = strip_indent(line)?;
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn atx_heading(line: &str, number: usize) -> Option<Heading> {
    let trimmed = strip_indent(line)?;
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim_end();
    Some(Heading {
        level: u8::try_from(hashes).ok()?,
        text: text.to_owned(),
        line: number,
    })
}

fn setext_level(line: &str) -> Option<u8> {
    let trimmed = strip_indent(line)?.trim_end();
    let ch = trimmed.chars().next()?;
    if !trimmed.chars().all(|c| c == ch) {
        return None;
    }
    match ch {
        '=' => Some(1),
        '-' => Some(2),
        _ => None,
    }
}

fn paragraph_line(line: &str) -> bool {
    let Some(trimmed) = strip_indent(line) else {
        return false;
    };
    !trimmed.trim().is_empty()
        && !trimmed.starts_with(['-', '*', '+', '>', '|'])
        && setext_level(line).is_none()
}

/// Strips up to three spaces of indentation; four or more is a code block.
fn strip_indent(line: &str) -> Option<&str> {
    let spaces = line.chars().take_while(|c| *c == ' ').count();
    (spaces <= 3).then(|| &line[spaces..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(text: &str) -> Vec<u8> {
        headings(text).into_iter().map(|h| h.level).collect()
    }

    #[test]
    fn finds_atx_headings() {
        let found = headings("# Title\n\nintro\n\n## Goals ##\n### Details");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].level, 1);
        assert_eq!(found[1].text, "Goals");
        assert_eq!(found[2].line, 5);
    }

    #[test]
    fn hashes_need_a_space() {
        assert!(levels("#hashtag\n####### seven").is_empty());
    }

    #[test]
    fn setext_underlines_are_headings() {
        assert_eq!(levels("Title\n=====\n\nSection\n---"), [1, 2]);
        assert_eq!(headings("Title\n===")[0].text, "Title");
    }

    #[test]
    fn thematic_break_after_blank_is_not_a_heading() {
        assert!(levels("para\n\n---\n\n- item\n---").is_empty());
    }

    #[test]
    fn fenced_code_is_ignored() {
        let text = "## Real\n```sh\n# comment\n```\n~~~\n# also code\n~~~\n### After";
        assert_eq!(levels(text), [2, 3]);
    }

    #[test]
    fn indented_code_is_not_a_heading() {
        assert!(levels("    # not a heading").is_empty());
    }

    #[test]
    fn titles_normalise() {
        assert_eq!(normalise_title("**Open  Questions**:"), "open questions");
        assert_eq!(normalise_title("KPIs"), "kpis");
    }
}
