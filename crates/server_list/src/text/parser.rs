//! Builder that turns templates into styled text.
//!
//! Steps always run in the same order:
//! 1. placeholder replacement with the accumulated replacements
//! 2. the optional text hook, exactly once over the whole text
//! 3. markup parsing, one line at a time
//!
//! ```rust
//! use server_list::placeholders::{PlaceholderSet, ServerContext, PlaceholderSource};
//! use server_list::text::ComponentParser;
//!
//! let server = ServerContext::new(5, 8, None).placeholders();
//! let motd = ComponentParser::text("<green>${server playersOnline}/${server playersMax} online")
//!     .replacements(&server)
//!     .to_plain_string();
//! assert_eq!(motd, "5/8 online");
//! ```

use super::{markup::parse_markup, StyledText};
use crate::error::HookError;
use crate::hook::apply_guarded;
use crate::placeholders::PlaceholderSet;
use crate::replacer;

type TextHookFn<'a> = Box<dyn Fn(&str) -> Result<String, HookError> + 'a>;

pub struct ComponentParser<'a> {
    lines: Vec<String>,
    replacements: PlaceholderSet,
    hook: Option<(String, TextHookFn<'a>)>,
}

impl<'a> ComponentParser<'a> {
    /// Parser for a single template line.
    pub fn text(template: impl Into<String>) -> Self {
        Self {
            lines: vec![template.into()],
            replacements: PlaceholderSet::new(),
            hook: None,
        }
    }

    /// Parser for a list of lines, rendered as one text with line separators.
    pub fn list<S: AsRef<str>>(lines: &[S]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.as_ref().to_string()).collect(),
            replacements: PlaceholderSet::new(),
            hook: None,
        }
    }

    /// Adds replacements. Later calls override earlier ones on collision.
    pub fn replacements(mut self, set: &PlaceholderSet) -> Self {
        self.replacements.overlay(set);
        self
    }

    /// Sets the text hook run after replacement and before markup parsing.
    pub fn modify_text<F>(self, hook: F) -> Self
    where
        F: Fn(&str) -> Result<String, HookError> + 'a,
    {
        self.modify_text_as("modify_text", hook)
    }

    /// Like [`modify_text`](Self::modify_text), naming the hook in failure logs.
    pub fn modify_text_as<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&str) -> Result<String, HookError> + 'a,
    {
        self.hook = Some((name.into(), Box::new(hook)));
        self
    }

    fn prepared_text(&self) -> String {
        let joined = self.lines.join("\n");
        let replaced = replacer::replace(&joined, &self.replacements);
        match &self.hook {
            Some((name, hook)) => apply_guarded(name, |text| hook(text), &replaced),
            None => replaced,
        }
    }

    /// Parses every line independently and joins them with line separators.
    pub fn to_component(&self) -> StyledText {
        let text = self.prepared_text();
        let mut root = StyledText::empty();

        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                root.append(StyledText::newline());
            }
            root.children.extend(parse_markup(line).children);
        }
        root
    }

    /// Flattened plain text with markup removed.
    pub fn to_plain_string(&self) -> String {
        self.to_component().to_plain_string()
    }

    /// `§`-coded legacy text.
    pub fn to_legacy_string(&self) -> String {
        self.to_component().to_legacy_string()
    }
}

impl std::fmt::Display for ComponentParser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholders::{PlaceholderSource, PlayerContext, ServerContext};
    use crate::text::{strip_markup, NamedColor, TextColor};
    use std::cell::Cell;

    fn player() -> PlaceholderSet {
        PlayerContext::new("Steve", 763).placeholders()
    }

    fn server() -> PlaceholderSet {
        ServerContext::new(5, 8, Some("play.example.net".into())).placeholders()
    }

    #[test]
    fn test_text_with_replacements() {
        let out = ComponentParser::text("${server playersOnline}/${server playersMax} online")
            .replacements(&player())
            .replacements(&server())
            .to_plain_string();
        assert_eq!(out, "5/8 online");
    }

    #[test]
    fn test_later_replacements_override() {
        let mut other = PlaceholderSet::new();
        other.insert("${player name}", "Alex");
        let out = ComponentParser::text("${player name}")
            .replacements(&player())
            .replacements(&other)
            .to_string();
        assert_eq!(out, "Alex");
    }

    #[test]
    fn test_two_lines_are_parsed_independently() {
        let component = ComponentParser::list(&["<red>first line", "second &lline"])
            .replacements(&player())
            .to_component();

        assert_eq!(component.to_plain_string(), "first line\nsecond line");
        // the color of line one does not leak into line two
        let second = component
            .children
            .iter()
            .find(|c| c.text == "second ")
            .unwrap();
        assert!(second.style.is_plain());
        assert_eq!(component.children[0].style.color, Some(TextColor::Named(NamedColor::Red)));
    }

    #[test]
    fn test_hook_runs_once_between_replacement_and_parse() {
        let calls = Cell::new(0);
        let out = ComponentParser::list(&["${player name}", "%engine_value%"])
            .replacements(&player())
            .modify_text(|text| {
                calls.set(calls.get() + 1);
                assert!(text.contains("Steve"));
                Ok(text.replace("%engine_value%", "<gold>42"))
            })
            .to_component();

        assert_eq!(calls.get(), 1);
        assert_eq!(out.to_plain_string(), "Steve\n42");
        let last = out.children.last().unwrap();
        assert_eq!(last.style.color, Some(TextColor::Named(NamedColor::Gold)));
    }

    #[test]
    fn test_failing_hook_uses_original_text() {
        let out = ComponentParser::text("Hello ${player name}")
            .replacements(&player())
            .modify_text(|_| Err(HookError::Failed("engine".into(), "offline".into())))
            .to_plain_string();
        assert_eq!(out, "Hello Steve");
    }

    #[test]
    fn test_panicking_hook_uses_original_text() {
        let out = ComponentParser::text("Hello")
            .modify_text(|_| panic!("engine bug"))
            .to_plain_string();
        assert_eq!(out, "Hello");
    }

    #[test]
    fn test_flatten_equals_replace_of_stripped() {
        let set = player().merge(&server());
        let templates = [
            "<gold>Welcome ${player name}</gold> to ${server host}",
            "&aOnline: &l${server playersOnline}&r of ${server playersMax}",
            "<hover:show_text:'x'>${player protocol}</hover> ${player unknown}",
        ];
        for template in templates {
            let parsed = ComponentParser::text(template).replacements(&set).to_plain_string();
            let expected = replacer::replace(&strip_markup(template), &set);
            assert_eq!(parsed, expected, "template: {}", template);
        }
    }

    #[test]
    fn test_legacy_prefix_before_placeholder() {
        let mut set = PlaceholderSet::new();
        set.insert("${player name}", "lucky");

        // the code is formed after replacement
        let joined = ComponentParser::text("&${player name}").replacements(&set).to_component();
        assert_eq!(joined.to_plain_string(), "ucky");
        assert!(joined.children[0].style.bold);

        let escaped = ComponentParser::text("\\&${player name}")
            .replacements(&set)
            .to_plain_string();
        assert_eq!(escaped, "&lucky");
        assert_eq!(escaped, replacer::replace(&strip_markup("\\&${player name}"), &set));
    }

    #[test]
    fn test_legacy_output() {
        let out = ComponentParser::text("<red>${player name}</red> joined")
            .replacements(&player())
            .to_legacy_string();
        assert_eq!(out, "§cSteve§r joined");
    }
}
