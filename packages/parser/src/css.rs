//! # CSS helpers
//!
//! Just enough CSS handling for template editing: inline declaration
//! lists, scoping of root selectors, and discovery / substitution of
//! hex-valued custom properties. Not a CSS parser.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Selector that replaces `:root`, `html` and `body` in template styles so
/// the preview never styles the host page
pub const SCOPE_SELECTOR: &str = ".vellum-canvas";

/// Class carried by the canvas element that `SCOPE_SELECTOR` targets
pub const SCOPE_CLASS: &str = "vellum-canvas";

/// A hex-valued custom property found in template styles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorVariable {
    /// Property name including the leading `--`
    pub name: String,
    /// Human label derived from the name
    pub label: String,
    /// Value as declared in the template
    pub default_value: String,
}

fn color_declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(--[A-Za-z0-9_-]+)(\s*:\s*)(#[0-9A-Fa-f]+)(\s*)(;|\}|!|$)")
            .expect("color declaration regex is valid")
    })
}

/// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`
pub fn is_hex_color(value: &str) -> bool {
    value.strip_prefix('#').map_or(false, |digits| {
        matches!(digits.len(), 3 | 4 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// Parse an inline `style` attribute into ordered declarations.
/// Property names are lower-cased; semicolons inside parentheses or quotes
/// do not split.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for chunk in split_top_level(style, ';') {
        let Some((name, value)) = chunk.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        out.push((name, value.to_string()));
    }
    out
}

pub fn serialize_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Split on `separator` outside of parentheses and quotes
pub fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (index, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == separator && depth == 0 => {
                parts.push(&input[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Replace comment bodies with spaces so offsets are preserved
fn blank_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        let len = after.find("*/").map(|end| end + 2).unwrap_or(after.len());
        out.extend(after[..len].chars().map(|c| if c == '\n' { '\n' } else { ' ' }));
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

/// Find hex-valued custom properties in declaration order. The first
/// declaration of a name wins. Named colors and color functions are not
/// discovered.
pub fn discover_color_variables(css: &str) -> Vec<ColorVariable> {
    let css = blank_comments(css);
    let mut seen = Vec::<ColorVariable>::new();
    for caps in color_declaration_regex().captures_iter(&css) {
        let name = &caps[1];
        let value = &caps[3];
        if !is_hex_color(value) || seen.iter().any(|v| v.name == name) {
            continue;
        }
        seen.push(ColorVariable {
            name: name.to_string(),
            label: color_label(name),
            default_value: value.to_string(),
        });
    }
    seen
}

/// Human label for a custom property: `--brand-primary` → `Brand Primary`
pub fn color_label(name: &str) -> String {
    name.trim_start_matches('-')
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite every hex declaration of the given custom properties to the
/// supplied values
pub fn substitute_color_values(css: &str, values: &BTreeMap<String, String>) -> String {
    color_declaration_regex()
        .replace_all(css, |caps: &regex::Captures| {
            let name = &caps[1];
            match values.get(name) {
                Some(value) if is_hex_color(&caps[3]) => {
                    format!("{}{}{}{}{}", name, &caps[2], value, &caps[4], &caps[5])
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Block {
    /// Contains rules (top level, @media, @supports, ...)
    Rules,
    /// Declarations or anything we must not rewrite (@keyframes, @font-face)
    Opaque,
}

const GROUP_AT_RULES: &[&str] = &["@media", "@supports", "@layer", "@container", "@document"];

/// Rewrite `:root`, `html` and `body` selectors to `SCOPE_SELECTOR`
pub fn scope_root_selectors(css: &str) -> String {
    let mut out = String::with_capacity(css.len() + 32);
    let mut stack = vec![Block::Rules];
    let mut segment_start = 0;
    let mut chars = css.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        let in_rules = stack.last() == Some(&Block::Rules);
        match ch {
            '/' if chars.peek().map(|(_, c)| *c) == Some('*') => {
                // comments are copied with the surrounding segment
                let end = css[index..]
                    .find("*/")
                    .map(|e| index + e + 2)
                    .unwrap_or(css.len());
                while chars.peek().map(|(i, _)| *i < end).unwrap_or(false) {
                    chars.next();
                }
            }
            '"' | '\'' => {
                while let Some((_, c)) = chars.next() {
                    if c == '\\' {
                        chars.next();
                    } else if c == ch {
                        break;
                    }
                }
            }
            '{' => {
                let prelude = &css[segment_start..index];
                if in_rules {
                    let head = prelude.trim_start();
                    if head.starts_with('@') {
                        out.push_str(prelude);
                        let grouping = GROUP_AT_RULES
                            .iter()
                            .any(|rule| head.to_ascii_lowercase().starts_with(rule));
                        stack.push(if grouping { Block::Rules } else { Block::Opaque });
                    } else {
                        out.push_str(&rewrite_selector_list(prelude));
                        stack.push(Block::Opaque);
                    }
                } else {
                    out.push_str(prelude);
                    stack.push(Block::Opaque);
                }
                out.push('{');
                segment_start = index + 1;
            }
            '}' => {
                out.push_str(&css[segment_start..=index]);
                segment_start = index + 1;
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            ';' if in_rules => {
                out.push_str(&css[segment_start..=index]);
                segment_start = index + 1;
            }
            _ => {}
        }
    }
    out.push_str(&css[segment_start..]);
    out
}

fn rewrite_selector_list(prelude: &str) -> String {
    split_top_level(prelude, ',')
        .into_iter()
        .map(rewrite_selector)
        .collect::<Vec<_>>()
        .join(",")
}

fn rewrite_selector(selector: &str) -> String {
    let trimmed = selector.trim_start();
    let leading = &selector[..selector.len() - trimmed.len()];
    for root in [":root", "html", "body"] {
        if trimmed.len() < root.len() || !trimmed[..root.len()].eq_ignore_ascii_case(root) {
            continue;
        }
        let rest = &trimmed[root.len()..];
        let continues_ident = rest
            .chars()
            .next()
            .map(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            .unwrap_or(false);
        if !continues_ident {
            return format!("{}{}{}", leading, SCOPE_SELECTOR, rest);
        }
    }
    selector.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declarations() {
        let decls = parse_declarations("Color: red; background: url(a;b.png) ; ;font-size:12px");
        assert_eq!(
            decls,
            vec![
                ("color".to_string(), "red".to_string()),
                ("background".to_string(), "url(a;b.png)".to_string()),
                ("font-size".to_string(), "12px".to_string()),
            ]
        );
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#A1b2C3d4"));
        assert!(!is_hex_color("#12345"));
        assert!(!is_hex_color("#ggg"));
        assert!(!is_hex_color("fff"));
        assert!(!is_hex_color(""));
    }

    #[test]
    fn test_discover_hex_only_first_wins() {
        let css = r#"
            :root { --bg: #ffffff; --fg:#000; --accent: rebeccapurple; --shade: rgb(0,0,0); }
            .dark { --bg: #111111; --alpha: #11223344 }
            /* --ghost: #abcdef; */
            .bad { --odd: #12345; }
        "#;
        let vars = discover_color_variables(css);
        let names: Vec<_> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["--bg", "--fg", "--alpha"]);
        assert_eq!(vars[0].default_value, "#ffffff");
        assert_eq!(vars[1].default_value, "#000");
    }

    #[test]
    fn test_color_label() {
        assert_eq!(color_label("--brand-primary"), "Brand Primary");
        assert_eq!(color_label("--text_muted"), "Text Muted");
        assert_eq!(color_label("--bg"), "Bg");
    }

    #[test]
    fn test_substitute_values() {
        let css = ":root { --fg: #000000; --bg:#fff }";
        let mut values = BTreeMap::new();
        values.insert("--fg".to_string(), "#112233".to_string());
        assert_eq!(
            substitute_color_values(css, &values),
            ":root { --fg: #112233; --bg:#fff }"
        );
    }

    #[test]
    fn test_scope_root_selectors() {
        let css = ":root { --a: #fff; }\nbody, .x > html { margin: 0 }\n.body-copy { color: red }\n@media (min-width: 10px) { body { padding: 1px } }\n@keyframes spin { from { opacity: 0 } }";
        let scoped = scope_root_selectors(css);
        assert_eq!(
            scoped,
            ".vellum-canvas { --a: #fff; }\n.vellum-canvas, .x > html { margin: 0 }\n.body-copy { color: red }\n@media (min-width: 10px) { .vellum-canvas { padding: 1px } }\n@keyframes spin { from { opacity: 0 } }"
        );
    }

    #[test]
    fn test_scope_leaves_declarations_alone() {
        let css = ".a { content: \"body {\"; }";
        assert_eq!(scope_root_selectors(css), css);
    }
}
