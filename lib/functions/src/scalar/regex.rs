use crate::scalar::boolean;
use crate::scalar::strings::string_literal;
use rdf_delta_model::{Term, ThinError, ThinResult};
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

/// Compiles a pattern of the SPARQL `REGEX` function with the given
/// [flags](https://www.w3.org/TR/xpath-functions-31/#flags).
pub(crate) fn compile_pattern(pattern: &str, flags: Option<&str>) -> ThinResult<Regex> {
    const REGEX_SIZE_LIMIT: usize = 1_000_000;

    let mut pattern = Cow::Borrowed(pattern);
    let flags = flags.unwrap_or_default();
    if flags.contains('q') {
        pattern = regex::escape(&pattern).into();
    }
    let mut regex_builder = RegexBuilder::new(&pattern);
    regex_builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            's' => {
                regex_builder.dot_matches_new_line(true);
            }
            'm' => {
                regex_builder.multi_line(true);
            }
            'i' => {
                regex_builder.case_insensitive(true);
            }
            'x' => {
                regex_builder.ignore_whitespace(true);
            }
            'q' => (),
            _ => return ThinError::expected(),
        }
    }
    regex_builder.build().map_err(|_| ThinError::default())
}

/// [REGEX](https://www.w3.org/TR/sparql11-query/#func-regex) with an already compiled pattern.
pub(crate) fn regex_match(value: &Term, regex: &Regex) -> ThinResult<Term> {
    let value = string_literal(value)?;
    Ok(boolean(regex.is_match(value.value)))
}
