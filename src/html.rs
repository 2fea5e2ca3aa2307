//! HTML tag-class defaults for the placeholder codec.
//!
//! Grounded on `examples/original_source/src/markdowndiff/html_formatter.py`
//! (`HTMLFormatter.getDefault`), scoped to the tag-class configuration the
//! placeholder codec needs. The CSS-class/tooltip annotation layer
//! (`modifyElement` in that file) is a browser-rendering cosmetic concern
//! named by the specification's "stylesheet shipping" Non-goal and is not
//! ported — see DESIGN.md.

use crate::error::DiffError;
use crate::placeholder::CodecConfig;

/// HTML5 inline elements with no content, rendered as a single placeholder.
pub fn default_single_formatting_tags() -> Vec<String> {
    ["br", "hr", "img"].iter().map(|s| s.to_string()).collect()
}

/// HTML5 inline elements whose identity doesn't depend on attributes.
pub fn default_dual_formatting_tags() -> Vec<String> {
    ["b", "i", "u", "em", "strong", "span", "sub", "sup", "strike", "s", "code", "small"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// HTML5 inline elements discriminated by their full canonical form (the
/// target attribute matters for identity).
pub fn default_complex_formatting_tags() -> Vec<String> {
    ["a", "link"].iter().map(|s| s.to_string()).collect()
}

/// Block-level elements whose text content is treated as rich text.
pub fn default_text_tags() -> Vec<String> {
    ["p", "li", "td", "th", "dd", "dt", "caption", "figcaption", "h1", "h2", "h3", "h4", "h5", "h6"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Build the default HTML codec configuration, eagerly rejecting a tag
/// listed in more than one formatting class rather than discovering the
/// contradiction lazily mid-encode.
pub fn default_html_config() -> Result<CodecConfig, DiffError> {
    build_config(default_text_tags(), default_single_formatting_tags(), default_dual_formatting_tags(), default_complex_formatting_tags())
}

/// Build a codec configuration from explicit tag-class lists, validating
/// that no tag appears in more than one formatting class.
pub fn build_config(
    text_tags: Vec<String>,
    single_formatting_tags: Vec<String>,
    dual_formatting_tags: Vec<String>,
    complex_formatting_tags: Vec<String>,
) -> Result<CodecConfig, DiffError> {
    for tag in single_formatting_tags.iter().chain(dual_formatting_tags.iter()).chain(complex_formatting_tags.iter()) {
        let memberships = [&single_formatting_tags, &dual_formatting_tags, &complex_formatting_tags]
            .iter()
            .filter(|class| class.iter().any(|t| t == tag))
            .count();
        if memberships > 1 {
            return Err(DiffError::ConfigurationError(format!(
                "tag `{tag}` listed in more than one formatting class"
            )));
        }
    }

    Ok(CodecConfig { text_tags, single_formatting_tags, dual_formatting_tags, complex_formatting_tags })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_overlap() {
        default_html_config().unwrap();
    }

    #[test]
    fn overlapping_tag_is_a_configuration_error() {
        let result = build_config(vec![], vec!["b".to_string()], vec!["b".to_string()], vec![]);
        assert!(matches!(result, Err(DiffError::ConfigurationError(_))));
    }
}
