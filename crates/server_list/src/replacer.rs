//! Literal placeholder substitution.

use crate::placeholders::PlaceholderSet;

/// Replaces every `${domain field}` token present in `set` with its value.
///
/// Tokens missing from the set stay verbatim. The template is scanned once from
/// left to right and substituted values are never scanned again, so a value that
/// itself looks like a token is emitted literally.
pub fn replace(template: &str, set: &PlaceholderSet) -> String {
    if set.is_empty() || !template.contains("${") {
        return template.to_string();
    }

    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let candidate = &rest[start..];

        match candidate.find('}') {
            Some(end) => {
                let token = &candidate[..=end];
                if let Some(value) = set.get(token) {
                    output.push_str(&value.to_string());
                    rest = &candidate[end + 1..];
                } else {
                    // Not ours; keep the '$' and resume right after it so an inner
                    // token like "${a ${player name}}" is still found.
                    output.push('$');
                    rest = &candidate[1..];
                }
            }
            None => {
                output.push_str(candidate);
                rest = "";
            }
        }
    }

    output.push_str(rest);
    output
}

/// Replaces placeholders in every line of a template list.
pub fn replace_all<S: AsRef<str>>(lines: &[S], set: &PlaceholderSet) -> Vec<String> {
    lines.iter().map(|line| replace(line.as_ref(), set)).collect()
}
