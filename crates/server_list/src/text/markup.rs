//! Markup parser for MOTD and player-count templates.
//!
//! Two notations are recognised and may be mixed:
//!
//! - legacy codes prefixed with `&` or `§` (`&c`, `&l`, `&r`, `&#rrggbb`)
//! - bracket tags (`<red>`, `<#ff8800>`, `<bold>`, `<hover:show_text:'...'>`,
//!   `<click:open_url:'...'>`, `<newline>`, `<reset>` and closing `</tag>`)
//!
//! Anything that does not form a valid code or tag is kept as literal text, so
//! parsing never fails and identical input always yields an identical tree.
//! A backslash escapes the next `<`, `&` or `§`.
//!
//! Parsing runs after placeholder replacement, so a `&` written directly before
//! a placeholder combines with the first character of the value: `&${player name}`
//! for `lucky` reads as bold `ucky`. Templates that want a literal `&` there
//! write `\&${player name}`.

use super::{ClickAction, ClickEvent, HoverEvent, NamedColor, Style, StyledText, TextColor};

/// Parses markup into a root node whose children are styled leaves.
pub fn parse_markup(input: &str) -> StyledText {
    let mut parser = MarkupParser::new();
    parser.run(input);
    parser.finish()
}

/// Removes all markup, keeping only the text a reader would see.
pub fn strip_markup(input: &str) -> String {
    parse_markup(input).to_plain_string()
}

struct OpenTag {
    name: &'static str,
    previous: Style,
}

struct MarkupParser {
    root: StyledText,
    buffer: String,
    style: Style,
    open: Vec<OpenTag>,
}

enum Tag {
    Open(&'static str, Style),
    Close(&'static str),
    Reset,
    Newline,
}

impl MarkupParser {
    fn new() -> Self {
        Self {
            root: StyledText::empty(),
            buffer: String::new(),
            style: Style::default(),
            open: Vec::new(),
        }
    }

    fn run(&mut self, input: &str) {
        let chars: Vec<char> = input.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '\\' if matches!(chars.get(i + 1).copied(), Some('<' | '&' | '§')) => {
                    self.buffer.push(chars[i + 1]);
                    i += 2;
                }
                '&' | '§' => {
                    let consumed = self.legacy_code(&chars[i + 1..]);
                    if consumed == 0 {
                        self.buffer.push(c);
                        i += 1;
                    } else {
                        i += 1 + consumed;
                    }
                }
                '<' => match find_tag_end(&chars, i + 1) {
                    Some(end) => {
                        let content: String = chars[i + 1..end].iter().collect();
                        if self.tag(&content) {
                            i = end + 1;
                        } else {
                            self.buffer.push('<');
                            i += 1;
                        }
                    }
                    None => {
                        self.buffer.push('<');
                        i += 1;
                    }
                },
                _ => {
                    self.buffer.push(c);
                    i += 1;
                }
            }
        }
    }

    fn finish(mut self) -> StyledText {
        self.flush();
        self.root
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let text = std::mem::take(&mut self.buffer);
            self.root.append(StyledText::styled(text, self.style.clone()));
        }
    }

    fn set_style(&mut self, style: Style) {
        if style != self.style {
            self.flush();
            self.style = style;
        }
    }

    /// Applies a legacy code and returns how many characters after the prefix it used.
    fn legacy_code(&mut self, rest: &[char]) -> usize {
        let Some(&code) = rest.first() else {
            return 0;
        };

        if code == '#' && rest.len() >= 7 {
            let hex: String = rest[1..7].iter().collect();
            if let Some(color) = TextColor::parse(&format!("#{}", hex)) {
                self.set_style(color_reset(&self.style, color));
                return 7;
            }
            return 0;
        }

        let lower = code.to_ascii_lowercase();
        if let Some(color) = NamedColor::from_code(lower) {
            self.set_style(color_reset(&self.style, TextColor::Named(color)));
            return 1;
        }

        let mut style = self.style.clone();
        match lower {
            'k' => style.obfuscated = true,
            'l' => style.bold = true,
            'm' => style.strikethrough = true,
            'n' => style.underlined = true,
            'o' => style.italic = true,
            'r' => {
                self.open.clear();
                style = Style::default();
            }
            _ => return 0,
        }
        self.set_style(style);
        1
    }

    /// Applies a bracket tag. Returns false when the content is not a known tag.
    fn tag(&mut self, content: &str) -> bool {
        match parse_tag(content, &self.style) {
            Some(Tag::Open(name, style)) => {
                self.open.push(OpenTag {
                    name,
                    previous: self.style.clone(),
                });
                self.set_style(style);
                true
            }
            Some(Tag::Close(name)) => match self.open.iter().rposition(|t| t.name == name) {
                Some(index) => {
                    let previous = self.open[index].previous.clone();
                    self.open.truncate(index);
                    self.set_style(previous);
                    true
                }
                None => false,
            },
            Some(Tag::Reset) => {
                self.open.clear();
                self.set_style(Style::default());
                true
            }
            Some(Tag::Newline) => {
                self.flush();
                self.root.append(StyledText::newline());
                true
            }
            None => false,
        }
    }
}

/// Legacy color codes reset decorations.
fn color_reset(current: &Style, color: TextColor) -> Style {
    Style {
        color: Some(color),
        click: current.click.clone(),
        hover: current.hover.clone(),
        ..Style::default()
    }
}

/// Finds the closing '>' of a tag starting at `start`, skipping quoted sections.
fn find_tag_end(chars: &[char], start: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, &c) in chars[start..].iter().enumerate() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '>' => return Some(start + offset),
                '<' => return None,
                _ => {}
            },
        }
    }
    None
}

/// Splits tag content on ':' outside quotes and strips the quotes.
fn split_arguments(content: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in content.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => quote = Some(c),
                ':' => parts.push(std::mem::take(&mut current)),
                _ => current.push(c),
            },
        }
    }
    parts.push(current);
    parts
}

fn decoration_name(name: &str) -> Option<&'static str> {
    match name {
        "bold" | "b" => Some("bold"),
        "italic" | "i" | "em" => Some("italic"),
        "underlined" | "u" => Some("underlined"),
        "strikethrough" | "st" => Some("strikethrough"),
        "obfuscated" | "obf" => Some("obfuscated"),
        _ => None,
    }
}

fn parse_tag(content: &str, current: &Style) -> Option<Tag> {
    if content.is_empty() {
        return None;
    }

    if let Some(name) = content.strip_prefix('/') {
        return closing_name(&name.to_ascii_lowercase()).map(Tag::Close);
    }

    let args = split_arguments(content);
    let name = args[0].to_ascii_lowercase();
    let mut style = current.clone();

    match name.as_str() {
        "reset" if args.len() == 1 => return Some(Tag::Reset),
        "newline" | "br" if args.len() == 1 => return Some(Tag::Newline),
        "color" | "colour" | "c" => {
            let color = TextColor::parse(args.get(1)?)?;
            style.color = Some(color);
            return Some(Tag::Open("color", style));
        }
        "hover" => {
            if args.len() != 3 || !args[1].eq_ignore_ascii_case("show_text") {
                return None;
            }
            style.hover = Some(HoverEvent::ShowText(Box::new(parse_markup(&args[2]))));
            return Some(Tag::Open("hover", style));
        }
        "click" => {
            if args.len() != 3 {
                return None;
            }
            let action = ClickAction::from_name(&args[1])?;
            style.click = Some(ClickEvent {
                action,
                value: args[2].clone(),
            });
            return Some(Tag::Open("click", style));
        }
        _ => {}
    }

    if args.len() != 1 {
        return None;
    }

    if let Some(decoration) = decoration_name(&name) {
        match decoration {
            "bold" => style.bold = true,
            "italic" => style.italic = true,
            "underlined" => style.underlined = true,
            "strikethrough" => style.strikethrough = true,
            _ => style.obfuscated = true,
        }
        return Some(Tag::Open(decoration, style));
    }

    // `<red>` and `<#ff8800>` are shorthands for `<color:...>`
    let color = TextColor::parse(&name)?;
    style.color = Some(color);
    Some(Tag::Open("color", style))
}

fn closing_name(name: &str) -> Option<&'static str> {
    if let Some(decoration) = decoration_name(name) {
        return Some(decoration);
    }
    match name {
        "hover" => Some("hover"),
        "click" => Some("click"),
        "color" | "colour" | "c" => Some("color"),
        other if other.starts_with("color:") || other.starts_with("colour:") => Some("color"),
        other if TextColor::parse(other).is_some() => Some("color"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(tree: &StyledText) -> Vec<(String, Style)> {
        tree.children
            .iter()
            .map(|c| (c.text.clone(), c.style.clone()))
            .collect()
    }

    fn color(c: NamedColor) -> Option<TextColor> {
        Some(TextColor::Named(c))
    }

    #[test]
    fn test_plain_text_is_single_leaf() {
        let tree = parse_markup("Just text");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.to_plain_string(), "Just text");
        assert!(tree.children[0].style.is_plain());
    }

    #[test]
    fn test_empty_input() {
        let tree = parse_markup("");
        assert!(tree.children.is_empty());
        assert_eq!(tree.to_plain_string(), "");
    }

    #[test]
    fn test_legacy_codes() {
        let tree = parse_markup("&cRed &lBold&r plain");
        let leaves = leaves(&tree);
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].0, "Red ");
        assert_eq!(leaves[0].1.color, color(NamedColor::Red));
        assert_eq!(leaves[1].0, "Bold");
        assert!(leaves[1].1.bold);
        assert_eq!(leaves[1].1.color, color(NamedColor::Red));
        assert_eq!(leaves[2].0, " plain");
        assert!(leaves[2].1.is_plain());
    }

    #[test]
    fn test_legacy_color_resets_decorations() {
        let tree = parse_markup("§l§aGreen");
        let leaves = leaves(&tree);
        assert_eq!(leaves.len(), 1);
        assert!(!leaves[0].1.bold);
        assert_eq!(leaves[0].1.color, color(NamedColor::Green));
    }

    #[test]
    fn test_legacy_hex_and_invalid_codes() {
        let tree = parse_markup("&#ff0000Hex &zNope &");
        assert_eq!(tree.to_plain_string(), "Hex &zNope &");
        assert_eq!(tree.children[0].style.color, Some(TextColor::Rgb(255, 0, 0)));
    }

    #[test]
    fn test_mixed_legacy_prefixes() {
        let tree = parse_markup("&cRed §lBold &Rplain");
        let leaves = leaves(&tree);
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].0, "Red ");
        assert_eq!(leaves[0].1.color, color(NamedColor::Red));
        assert_eq!(leaves[1].0, "Bold ");
        assert!(leaves[1].1.bold);
        assert_eq!(leaves[1].1.color, color(NamedColor::Red));
        assert_eq!(leaves[2].0, "plain");
        assert!(leaves[2].1.is_plain());
    }

    #[test]
    fn test_escaped_legacy_prefixes_are_literal() {
        let tree = parse_markup("\\&lucky and \\§cfine");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.to_plain_string(), "&lucky and §cfine");
        assert!(tree.children[0].style.is_plain());
    }

    #[test]
    fn test_bracket_tags_nest_and_close() {
        let tree = parse_markup("<red>Red <bold>both</bold> red</red> none");
        let leaves = leaves(&tree);
        assert_eq!(leaves.len(), 4);
        assert_eq!(leaves[0].1.color, color(NamedColor::Red));
        assert!(leaves[1].1.bold && leaves[1].1.color == color(NamedColor::Red));
        assert!(!leaves[2].1.bold && leaves[2].1.color == color(NamedColor::Red));
        assert!(leaves[3].1.is_plain());
        assert_eq!(tree.to_plain_string(), "Red both red none");
    }

    #[test]
    fn test_tag_aliases_and_hex() {
        let tree = parse_markup("<b><i><#00ff00>x</#00ff00></i></b><color:gold>y</color>");
        let leaves = leaves(&tree);
        assert!(leaves[0].1.bold && leaves[0].1.italic);
        assert_eq!(leaves[0].1.color, Some(TextColor::Rgb(0, 255, 0)));
        assert_eq!(leaves[1].1.color, color(NamedColor::Gold));
        assert!(!leaves[1].1.bold);
    }

    #[test]
    fn test_decoration_short_aliases() {
        let tree = parse_markup("<u>u</u><st>s</st><obf>o</obf><em>e</em>");
        let leaves = leaves(&tree);
        assert_eq!(leaves.len(), 4);
        assert!(leaves[0].1.underlined && !leaves[0].1.strikethrough);
        assert!(leaves[1].1.strikethrough && !leaves[1].1.underlined);
        assert!(leaves[2].1.obfuscated && !leaves[2].1.strikethrough);
        assert!(leaves[3].1.italic && !leaves[3].1.obfuscated);
        assert_eq!(tree.to_plain_string(), "usoe");
    }

    #[test]
    fn test_colour_spelling_and_short_color_tag() {
        let tree = parse_markup("<colour:dark_aqua>a</colour><c:#010203>b</c>c");
        let leaves = leaves(&tree);
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].1.color, color(NamedColor::DarkAqua));
        assert_eq!(leaves[1].1.color, Some(TextColor::Rgb(1, 2, 3)));
        assert!(leaves[2].1.is_plain());
    }

    #[test]
    fn test_click_actions() {
        let actions = [
            ("copy_to_clipboard", ClickAction::CopyToClipboard),
            ("run_command", ClickAction::RunCommand),
            ("suggest_command", ClickAction::SuggestCommand),
        ];
        for (name, action) in actions {
            let tree = parse_markup(&format!("<click:{}:'/spawn'>go</click>", name));
            let leaves = leaves(&tree);
            assert_eq!(leaves.len(), 1, "action: {}", name);
            let click = leaves[0].1.click.as_ref().unwrap();
            assert_eq!(click.action, action);
            assert_eq!(click.value, "/spawn");
        }
    }

    #[test]
    fn test_unknown_and_malformed_tags_are_literal() {
        assert_eq!(strip_markup("<unknown>text</nope>"), "<unknown>text</nope>");
        assert_eq!(strip_markup("a < b > c"), "a < b > c");
        assert_eq!(strip_markup("1 < 2"), "1 < 2");
        assert_eq!(strip_markup("<red"), "<red");
        assert_eq!(strip_markup("\\<red>literal"), "<red>literal");
    }

    #[test]
    fn test_newline_tag() {
        let tree = parse_markup("one<newline>two<br>three");
        assert_eq!(tree.to_plain_string(), "one\ntwo\nthree");
    }

    #[test]
    fn test_reset_closes_everything() {
        let tree = parse_markup("<red><bold>a<reset>b</bold>");
        let leaves = leaves(&tree);
        assert!(leaves[1].1.is_plain());
        // the dangling close has nothing to close and stays literal
        assert_eq!(tree.to_plain_string(), "ab</bold>");
    }

    #[test]
    fn test_hover_and_click() {
        let tree = parse_markup(
            "<hover:show_text:'<red>Tip: a > b'><click:open_url:'https://example.net'>Site</click></hover>",
        );
        let leaves = leaves(&tree);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].0, "Site");

        let Some(HoverEvent::ShowText(hover)) = &leaves[0].1.hover else {
            panic!("hover missing");
        };
        assert_eq!(hover.to_plain_string(), "Tip: a > b");
        assert_eq!(hover.children[0].style.color, color(NamedColor::Red));

        let click = leaves[0].1.click.as_ref().unwrap();
        assert_eq!(click.action, ClickAction::OpenUrl);
        assert_eq!(click.value, "https://example.net");
    }

    #[test]
    fn test_invalid_click_action_is_literal() {
        assert_eq!(strip_markup("<click:explode:'x'>y"), "<click:explode:'x'>y");
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let input = "<gold>Welcome &l${player name}</gold> <hover:show_text:'hi'>!";
        assert_eq!(parse_markup(input), parse_markup(input));
    }
}
