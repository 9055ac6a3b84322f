//! Citation-marker annotation.
//!
//! Assistant replies embed markers such as `[1]` that refer to entries in the
//! message's citation list. [`annotate`] splits a run of text into literal
//! fragments and citation references so a renderer can draw the references
//! as interactive badges. Markers without a matching citation stay literal.

use std::sync::LazyLock;

use regex::Regex;

use crate::message::Citation;

static MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());

/// One renderable piece of an annotated text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'a> {
    /// Text copied verbatim from the input.
    Text(&'a str),
    /// A marker that resolved to a citation.
    Reference(&'a Citation),
}

impl<'a> Fragment<'a> {
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Fragment::Text(text) => Some(text),
            Fragment::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&'a Citation> {
        match self {
            Fragment::Reference(citation) => Some(citation),
            Fragment::Text(_) => None,
        }
    }
}

/// Split `text` into literal fragments and citation references.
///
/// When there are no citations or no markers the whole input comes back as a
/// single [`Fragment::Text`]. Literal text around markers is never altered,
/// and concatenating the output (with references written back as `[n]`)
/// reproduces the input.
pub fn annotate<'a>(text: &'a str, citations: &'a [Citation]) -> Vec<Fragment<'a>> {
    if citations.is_empty() {
        return vec![Fragment::Text(text)];
    }

    let mut markers = MARKER.find_iter(text).peekable();
    if markers.peek().is_none() {
        return vec![Fragment::Text(text)];
    }

    let mut fragments = Vec::new();
    let mut cursor = 0;

    for marker in markers {
        if marker.start() > cursor {
            fragments.push(Fragment::Text(&text[cursor..marker.start()]));
        }

        match lookup(marker.as_str(), citations) {
            Some(citation) => fragments.push(Fragment::Reference(citation)),
            None => fragments.push(Fragment::Text(marker.as_str())),
        }

        cursor = marker.end();
    }

    if cursor < text.len() {
        fragments.push(Fragment::Text(&text[cursor..]));
    }

    fragments
}

/// Citations referenced by `text`, in marker order. Repeated markers repeat.
pub fn references<'a>(text: &str, citations: &'a [Citation]) -> Vec<&'a Citation> {
    if citations.is_empty() {
        return Vec::new();
    }
    MARKER
        .find_iter(text)
        .filter_map(|marker| lookup(marker.as_str(), citations))
        .collect()
}

/// Marker numbers in `text` that have no matching citation.
pub fn unresolved_markers(text: &str, citations: &[Citation]) -> Vec<u32> {
    MARKER
        .find_iter(text)
        .filter_map(|marker| marker_number(marker.as_str()))
        .filter(|n| !citations.iter().any(|c| c.number == *n))
        .collect()
}

/// Parse the number out of a `[n]` marker. Overflowing digits yield `None`.
fn marker_number(marker: &str) -> Option<u32> {
    marker
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|digits| digits.parse().ok())
}

fn lookup<'a>(marker: &str, citations: &'a [Citation]) -> Option<&'a Citation> {
    let number = marker_number(marker)?;
    citations.iter().find(|c| c.number == number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cite(number: u32, source: &str, excerpt: &str) -> Citation {
        Citation::new(number, source, excerpt)
    }

    /// Rebuild the source text from fragments, writing references back as markers.
    fn reassemble(fragments: &[Fragment]) -> String {
        fragments
            .iter()
            .map(|f| match f {
                Fragment::Text(t) => t.to_string(),
                Fragment::Reference(c) => format!("[{}]", c.number),
            })
            .collect()
    }

    #[test]
    fn test_mixed_resolved_and_unresolved() {
        let citations = vec![cite(1, "A", "x")];
        let fragments = annotate("See [1] and [2].", &citations);

        assert_eq!(
            fragments,
            vec![
                Fragment::Text("See "),
                Fragment::Reference(&citations[0]),
                Fragment::Text(" and "),
                Fragment::Text("[2]"),
                Fragment::Text("."),
            ]
        );
    }

    #[test]
    fn test_no_markers_returns_input() {
        let citations = vec![cite(1, "A", "x")];
        let text = "  Plain text,\n with   spacing. ";
        assert_eq!(annotate(text, &citations), vec![Fragment::Text(text)]);
    }

    #[test]
    fn test_no_citations_returns_input() {
        let text = "Markers [1] stay put [2]";
        assert_eq!(annotate(text, &[]), vec![Fragment::Text(text)]);
    }

    #[test]
    fn test_empty_text() {
        let citations = vec![cite(1, "A", "x")];
        assert_eq!(annotate("", &citations), vec![Fragment::Text("")]);
    }

    #[test]
    fn test_reference_carries_source_and_excerpt() {
        let citations = vec![cite(3, "Engineering Docs - API", "10k req/hour")];
        let fragments = annotate("Rate limits [3]", &citations);
        let reference = fragments[1].as_reference().unwrap();
        assert_eq!(reference.source, "Engineering Docs - API");
        assert_eq!(reference.excerpt, "10k req/hour");
    }

    #[test]
    fn test_repeated_markers_render_independently() {
        let citations = vec![cite(1, "A", "x")];
        let fragments = annotate("[1][1] again [1]", &citations);
        let refs = fragments.iter().filter(|f| f.as_reference().is_some()).count();
        assert_eq!(refs, 3);
        assert_eq!(fragments[0], Fragment::Reference(&citations[0]));
        assert_eq!(fragments[1], Fragment::Reference(&citations[0]));
    }

    #[test]
    fn test_marker_at_boundaries() {
        let citations = vec![cite(1, "A", "x"), cite(2, "B", "y")];
        let fragments = annotate("[1] middle [2]", &citations);
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[1], Fragment::Text(" middle "));
    }

    #[test]
    fn test_non_marker_brackets_are_literal() {
        let citations = vec![cite(1, "A", "x")];
        let text = "Arrays [a], empty [], spaced [ 1 ], nested [[1]]";
        let fragments = annotate(text, &citations);
        assert_eq!(reassemble(&fragments), text);
        let refs: Vec<_> = fragments.iter().filter_map(|f| f.as_reference()).collect();
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_overflowing_marker_is_literal() {
        let citations = vec![cite(1, "A", "x")];
        let fragments = annotate("Huge [99999999999999999999] ref", &citations);
        assert_eq!(fragments[1], Fragment::Text("[99999999999999999999]"));
    }

    #[test]
    fn test_leading_zeros_match_number() {
        let citations = vec![cite(7, "A", "x")];
        let fragments = annotate("see [007]", &citations);
        assert_eq!(fragments[1], Fragment::Reference(&citations[0]));
    }

    #[test]
    fn test_reassembly_preserves_unicode() {
        let citations = vec![cite(2, "B", "y")];
        let text = "Größe — [2] naïve [9] 日本語";
        assert_eq!(reassemble(&annotate(text, &citations)), text);
    }

    #[test]
    fn test_reannotating_literal_fragments_is_stable() {
        let citations = vec![cite(1, "A", "x")];
        let first = annotate("See [1] and [2].", &citations);

        for fragment in &first {
            if let Some(text) = fragment.as_text() {
                let again = annotate(text, &citations);
                assert!(again.iter().all(|f| f.as_reference().is_none()));
                assert_eq!(reassemble(&again), text);
            }
        }
    }

    #[test]
    fn test_references_in_marker_order() {
        let citations = vec![cite(1, "A", "x"), cite(2, "B", "y")];
        let refs = references("[2] then [1] then [5] then [2]", &citations);
        let numbers: Vec<u32> = refs.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![2, 1, 2]);
    }

    #[test]
    fn test_unresolved_markers() {
        let citations = vec![cite(1, "A", "x")];
        assert_eq!(unresolved_markers("[1] [4] [2]", &citations), vec![4, 2]);
        assert!(unresolved_markers("no markers", &citations).is_empty());
    }
}
