//! Cross-reference markup inside free-text documentation.
//!
//! Four tokens are recognized, each followed by exactly one whitespace
//! character and an identifier:
//!
//! ```text
//! $TYPE_REF      dk.sdu.cloud.Job    →  [`Job`](/docs/reference/dk.sdu.cloud.Job.md)
//! $CALL_REF      jobs.browse         →  [`jobs.browse`](/docs/reference/jobs.browse.md)
//! $TYPE_REF_LINK Job                 →  /docs/reference/<package>.Job.md
//! $CALL_REF_LINK jobs.browse         →  /docs/reference/jobs.browse.md
//! ```
//!
//! Parsing and rewriting are independent of the graph builder; emitters call
//! [`rewrite`] with the package the text was declared in.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ir::simple_name;

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(TYPE_REF_LINK|CALL_REF_LINK|TYPE_REF|CALL_REF)\b").expect("static token pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Type,
    Call,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocNode {
    Text(String),
    Ref {
        kind: RefKind,
        /// Bare URL instead of a rendered link.
        link: bool,
        ident: String,
    },
    /// A token with no identifier after it. Kept as literal text.
    Dangling(String),
}

pub struct LinkContext<'a> {
    /// Package the documentation was declared in, used to qualify bare
    /// type identifiers.
    pub package: Option<&'a str>,
    pub base_url: &'a str,
}

// ————————————————————————————————————————————————————————————————————————————
// PARSING
// ————————————————————————————————————————————————————————————————————————————

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '.'
}

fn push_text(nodes: &mut Vec<DocNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(DocNode::Text(prev)) = nodes.last_mut() {
        prev.push_str(text);
    } else {
        nodes.push(DocNode::Text(text.to_string()));
    }
}

pub fn parse(text: &str) -> Vec<DocNode> {
    let mut nodes = Vec::new();
    let mut cursor = 0;

    while let Some(m) = TOKEN.captures_at(text, cursor) {
        let Some(whole) = m.get(0) else { break };
        let token = &m[1];
        push_text(&mut nodes, &text[cursor..whole.start()]);

        let (kind, link) = match token {
            "TYPE_REF" => (RefKind::Type, false),
            "CALL_REF" => (RefKind::Call, false),
            "TYPE_REF_LINK" => (RefKind::Type, true),
            _ => (RefKind::Call, true),
        };

        let after = &text[whole.end()..];
        let mut chars = after.chars();
        let ident_start = match chars.next() {
            Some(c) if c.is_whitespace() => whole.end() + c.len_utf8(),
            _ => {
                nodes.push(DocNode::Dangling(whole.as_str().to_string()));
                cursor = whole.end();
                continue;
            }
        };

        let rest = &text[ident_start..];
        let len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
        let ident = rest[..len].trim_end_matches('.');
        if ident.is_empty() {
            nodes.push(DocNode::Dangling(whole.as_str().to_string()));
            cursor = whole.end();
            continue;
        }
        nodes.push(DocNode::Ref { kind, link, ident: ident.to_string() });
        cursor = ident_start + ident.len();

        // `$TYPE_REF Job s` reads as a plural: drop the space, keep the suffix.
        let tail = &text[cursor..];
        let mut peek = tail.chars();
        if let (Some(ws), Some(suffix)) = (peek.next(), peek.next()) {
            let ends_word = peek.next().is_none_or(|c| !c.is_alphanumeric());
            if ws.is_whitespace() && matches!(suffix, 's' | 'S' | '.') && ends_word {
                cursor += ws.len_utf8();
            }
        }
    }

    push_text(&mut nodes, &text[cursor..]);
    nodes
}

/// Tokens in `text` that have no identifier.
pub fn dangling(text: &str) -> Vec<String> {
    parse(text)
        .into_iter()
        .filter_map(|node| match node {
            DocNode::Dangling(token) => Some(token),
            _ => None,
        })
        .collect()
}

// ————————————————————————————————————————————————————————————————————————————
// REWRITING
// ————————————————————————————————————————————————————————————————————————————

/// An identifier carries its own package when its first segment starts
/// lowercase.
fn is_qualified(ident: &str) -> bool {
    ident.chars().next().is_some_and(|c| c.is_lowercase())
}

fn qualify(ident: &str, package: &str) -> String {
    if is_qualified(ident) { ident.to_string() } else { format!("{package}.{ident}") }
}

pub fn rewrite(text: &str, cx: &LinkContext<'_>) -> String {
    let base = cx.base_url.trim_end_matches('/');
    let mut out = String::with_capacity(text.len());
    for node in parse(text) {
        match node {
            DocNode::Text(t) => out.push_str(&t),
            DocNode::Dangling(t) => out.push_str(&t),
            DocNode::Ref { kind: RefKind::Type, link: false, ident } => match cx.package {
                None => out.push_str(&format!("`{ident}`")),
                Some(pkg) => out.push_str(&format!(
                    "[`{}`]({base}/{}.md)",
                    simple_name(&ident),
                    qualify(&ident, pkg)
                )),
            },
            DocNode::Ref { kind: RefKind::Type, link: true, ident } => match cx.package {
                None => out.push('#'),
                Some(pkg) => out.push_str(&format!("{base}/{}.md", qualify(&ident, pkg))),
            },
            DocNode::Ref { kind: RefKind::Call, link: false, ident } => {
                out.push_str(&format!("[`{ident}`]({base}/{ident}.md)"))
            }
            DocNode::Ref { kind: RefKind::Call, link: true, ident } => {
                out.push_str(&format!("{base}/{ident}.md"))
            }
        }
    }
    out
}

// ————————————————————————————————————————————————————————————————————————————
// SYNOPSIS / DESCRIPTION
// ————————————————————————————————————————————————————————————————————————————

/// Strip blank leading/trailing lines and the common indentation.
pub fn trim_indent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else { return String::new() };
    let body = &lines[first..=last];

    let indent = body
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    // Counted in chars; whitespace is not always one byte wide.
    fn dedent(line: &str, indent: usize) -> &str {
        line.char_indices().nth(indent).map_or("", |(i, _)| &line[i..])
    }
    body.iter()
        .map(|l| if l.trim().is_empty() { "" } else { dedent(l, indent) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First line is the synopsis, everything after it the description.
pub fn split_doc(text: &str) -> (Option<String>, Option<String>) {
    let normalized = trim_indent(text);
    let (head, tail) = normalized.split_once('\n').unwrap_or((&normalized, ""));
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };
    (non_empty(head), non_empty(tail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cx(package: Option<&'static str>) -> LinkContext<'static> {
        LinkContext { package, base_url: "/docs/reference" }
    }

    #[test]
    fn type_refs_are_qualified_with_the_package() {
        let out = rewrite("A $TYPE_REF Job is a unit of work.", &cx(Some("dk.sdu.cloud.app")));
        assert_eq!(
            out,
            "A [`Job`](/docs/reference/dk.sdu.cloud.app.Job.md) is a unit of work."
        );
    }

    #[test]
    fn qualified_type_refs_keep_their_package() {
        let out = rewrite("See $TYPE_REF dk.sdu.cloud.Product.Storage", &cx(Some("other")));
        assert_eq!(
            out,
            "See [`Product.Storage`](/docs/reference/dk.sdu.cloud.Product.Storage.md)"
        );
    }

    #[test]
    fn plural_suffix_is_glued() {
        let out = rewrite("a container of $TYPE_REF UFile s. More", &cx(Some("fs")));
        assert_eq!(out, "a container of [`UFile`](/docs/reference/fs.UFile.md)s. More");
    }

    #[test]
    fn trailing_dot_ends_the_identifier() {
        let nodes = parse("Calls $CALL_REF jobs.browse.");
        assert_eq!(
            nodes,
            vec![
                DocNode::Text("Calls ".into()),
                DocNode::Ref { kind: RefKind::Call, link: false, ident: "jobs.browse".into() },
                DocNode::Text(".".into()),
            ]
        );
    }

    #[test]
    fn link_forms_render_bare_urls() {
        let out = rewrite(
            "[`type`]($TYPE_REF_LINK UFileStatus) and [x]($CALL_REF_LINK files.browse)",
            &cx(Some("fs")),
        );
        assert_eq!(
            out,
            "[`type`](/docs/reference/fs.UFileStatus.md) and [x](/docs/reference/files.browse.md)"
        );
        assert_eq!(rewrite("($TYPE_REF_LINK X)", &cx(None)), "(#)");
        assert_eq!(rewrite("$TYPE_REF X", &cx(None)), "`X`");
    }

    #[test]
    fn dangling_tokens_stay_literal() {
        assert_eq!(dangling("ends with $TYPE_REF"), vec!["$TYPE_REF".to_string()]);
        assert_eq!(dangling("$CALL_REF: nothing"), vec!["$CALL_REF".to_string()]);
        assert_eq!(rewrite("ends with $TYPE_REF", &cx(Some("p"))), "ends with $TYPE_REF");
        assert!(dangling("$TYPE_REFERENCE is not a token").is_empty());
    }

    #[test]
    fn split_doc_trims_indentation() {
        let (synopsis, description) = split_doc(
            "
            Browses the catalog

            Results are paginated.
              Indented detail.
            ",
        );
        assert_eq!(synopsis.as_deref(), Some("Browses the catalog"));
        assert_eq!(description.as_deref(), Some("Results are paginated.\n  Indented detail."));
        assert_eq!(split_doc("   "), (None, None));
    }

    #[test]
    fn split_doc_handles_wide_whitespace() {
        let (synopsis, description) = split_doc(" Synopsis\n\u{a0}detail");
        assert_eq!(synopsis.as_deref(), Some("Synopsis"));
        assert_eq!(description.as_deref(), Some("detail"));
        assert_eq!(trim_indent("\u{3000}\u{3000}a\n\u{3000} b"), "\u{3000}a\n b");
    }
}
