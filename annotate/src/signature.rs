//! "Suggest type from usages" quick fix: splice an inferred signature into
//! a function definition.

use regex::Regex;
use tycheck_types::{Suggestion, TextRange};

use crate::edit::TextEdit;
use crate::python;

/// Where the annotatable parts of a `def` sit in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionShape {
    /// Offset of the line holding `def`.
    pub start: usize,
    /// Offset just past the `)` closing the parameter list.
    pub params_end: usize,
    /// `-> T`, if the function has a return annotation.
    pub return_annotation: Option<TextRange>,
    /// Parameters in the order the checker reports types for them. An
    /// implicit `self`/`cls` receiver is not included.
    pub params: Vec<ParamShape>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamShape {
    pub name: String,
    /// Offset just past the parameter name.
    pub name_end: usize,
    /// `: T`, colon included, if the parameter is annotated.
    pub annotation: Option<TextRange>,
}

impl FunctionShape {
    /// Locate `def <name>(...)` in `text`. The first definition wins.
    #[must_use]
    pub fn find(text: &str, name: &str) -> Option<Self> {
        let pattern = format!(
            r"(?m)^([ \t]*)(?:async[ \t]+)?def[ \t]+{}[ \t]*\(",
            regex::escape(name)
        );
        let re = Regex::new(&pattern).ok()?;
        let caps = re.captures(text)?;
        let whole = caps.get(0)?;
        let is_method = !caps[1].is_empty();

        let open = whole.end() - 1;
        let close = python::matching_close(text, open)?;
        let params_end = close + 1;

        let mut params: Vec<ParamShape> = python::split_top_level(&text[open + 1..close], open + 1)
            .into_iter()
            .filter_map(|(offset, piece)| parse_param(offset, piece))
            .collect();
        if is_method && params.first().is_some_and(|p| p.name == "self" || p.name == "cls") {
            params.remove(0);
        }

        let header = &text[params_end..];
        let return_annotation = header.trim_start().starts_with("->").then(|| {
            let arrow = params_end + (header.len() - header.trim_start().len());
            let end = python::find_top_level(header, ':')
                .map_or(header.len(), |colon| header[..colon].trim_end().len());
            TextRange::new(arrow, params_end + end)
        });

        Some(Self {
            start: whole.start(),
            params_end,
            return_annotation,
            params,
        })
    }

    /// Whether `offset` lies in the signature, where the fix is offered.
    #[must_use]
    pub fn offers_suggestion(&self, offset: usize) -> bool {
        let end = self
            .return_annotation
            .map_or(self.params_end, |annotation| annotation.end);
        (self.start..=end).contains(&offset)
    }
}

/// `piece` is one comma-separated entry of a parameter list starting at `offset`.
fn parse_param(offset: usize, piece: &str) -> Option<ParamShape> {
    let lead = piece.len() - piece.trim_start().len();
    let body = piece.trim_start();
    let stars = body.len() - body.trim_start_matches('*').len();
    let rest = &body[stars..];
    let name_len = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        // Bare `*` or `/` markers.
        return None;
    }
    let name_end = offset + lead + stars + name_len;

    let after_name = &rest[name_len..];
    let gap = after_name.len() - after_name.trim_start().len();
    let annotation = after_name.trim_start().strip_prefix(':').map(|typed| {
        let colon = name_end + gap;
        let type_len = python::find_top_level(typed, '=')
            .map_or(typed, |eq| &typed[..eq])
            .trim_end()
            .len();
        TextRange::new(colon, colon + 1 + type_len)
    });

    Some(ParamShape {
        name: rest[..name_len].to_string(),
        name_end,
        annotation,
    })
}

/// Edits that write `suggestion` into the function described by `shape`.
///
/// Parameter types replace existing annotations or are inserted after the
/// name. A `None` return type leaves the return annotation as it is.
/// Extra types or extra parameters on either side are ignored.
#[must_use]
pub fn signature_edits(shape: &FunctionShape, suggestion: &Suggestion) -> Vec<TextEdit> {
    let mut edits = Vec::new();

    if let Some(return_type) = suggestion.return_annotation() {
        let text = format!(" -> {return_type}");
        edits.push(match shape.return_annotation {
            Some(existing) => TextEdit::replace(TextRange::new(shape.params_end, existing.end), text),
            None => TextEdit::insert(shape.params_end, text),
        });
    }

    for (param, arg_type) in shape.params.iter().zip(&suggestion.signature.arg_types) {
        let text = format!(": {}", arg_type.trim_start_matches('*'));
        edits.push(match param.annotation {
            Some(existing) => TextEdit::replace(existing, text),
            None => TextEdit::insert(param.name_end, text),
        });
    }
    edits
}
