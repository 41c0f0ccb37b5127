use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;
use vellum_parser::css::{is_hex_color, substitute_color_values};
use vellum_parser::entities::{escape_attribute, escape_text};
use vellum_parser::{Template, SCOPE_CLASS};

/// Errors that can occur while compiling a template
#[derive(Error, Debug, PartialEq)]
pub enum CompileError {
    #[error("Unknown color variable: {0}")]
    UnknownColorVariable(String),

    #[error("Invalid color value for {name}: {value}")]
    InvalidColor { name: String, value: String },
}

/// Options for template compilation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Pretty print the document shell
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
    /// Script source loaded when the template uses the utility-class dialect
    pub style_engine_src: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
            style_engine_src: "https://cdn.tailwindcss.com".to_string(),
        }
    }
}

struct Context {
    options: CompileOptions,
    depth: usize,
    buffer: String,
}

impl Context {
    fn new(options: CompileOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_line(&mut self, text: &str) {
        if self.options.pretty {
            self.add_indent();
        }
        self.add(text);
        if self.options.pretty {
            self.add("\n");
        }
    }

    /// Multi-line content copied without re-indentation
    fn add_block(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.add(text);
        if self.options.pretty && !text.ends_with('\n') {
            self.add("\n");
        }
    }

    fn add_indent(&mut self) {
        for _ in 0..self.depth {
            self.buffer.push_str(&self.options.indent);
        }
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    fn get_output(self) -> String {
        self.buffer
    }
}

fn validate_colors(template: &Template, colors: &BTreeMap<String, String>) -> Result<(), CompileError> {
    for (name, value) in colors {
        if template.color_variable(name).is_none() {
            return Err(CompileError::UnknownColorVariable(name.clone()));
        }
        if !is_hex_color(value) {
            return Err(CompileError::InvalidColor {
                name: name.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(())
}

/// Compile an edited document to a standalone template.
///
/// `colors` holds the session's current values; variables missing from
/// the map keep their declared default.
pub fn compile_template(
    template: &Template,
    body_markup: &str,
    colors: &BTreeMap<String, String>,
    options: CompileOptions,
) -> Result<String, CompileError> {
    validate_colors(template, colors)?;

    let mut ctx = Context::new(options);

    ctx.add_line("<!DOCTYPE html>");
    ctx.add_line("<html>");
    ctx.indent();

    compile_head(template, colors, &mut ctx);
    compile_body(template, body_markup, &mut ctx);

    ctx.dedent();
    ctx.add_line("</html>");

    let output = ctx.get_output();
    debug!(bytes = output.len(), colors = colors.len(), "Compiled template");
    Ok(output)
}

fn compile_head(template: &Template, colors: &BTreeMap<String, String>, ctx: &mut Context) {
    ctx.add_line("<head>");
    ctx.indent();

    ctx.add_line("<meta charset=\"utf-8\">");
    if let Some(title) = &template.title {
        ctx.add_line(&format!("<title>{}</title>", escape_text(title)));
    }

    for href in &template.stylesheet_links {
        ctx.add_line(&format!(
            "<link rel=\"stylesheet\" href=\"{}\">",
            escape_attribute(href)
        ));
    }

    if template.uses_scoped_style_dialect {
        let src = escape_attribute(&ctx.options.style_engine_src);
        ctx.add_line(&format!("<script src=\"{}\"></script>", src));
    }

    // Scripts keep their source order
    for script in &template.inline_scripts {
        ctx.add_line("<script>");
        ctx.add_block(script);
        ctx.add_line("</script>");
    }

    let style = substitute_color_values(&template.style_text, colors);
    if !style.trim().is_empty() {
        ctx.add_line("<style>");
        ctx.add_block(&style);
        ctx.add_line("</style>");
    }

    ctx.dedent();
    ctx.add_line("</head>");
}

fn body_class(template: &Template) -> String {
    std::iter::once(SCOPE_CLASS)
        .chain(
            template
                .body_class
                .split_whitespace()
                .filter(|class| *class != SCOPE_CLASS),
        )
        .collect::<Vec<_>>()
        .join(" ")
}

fn compile_body(template: &Template, body_markup: &str, ctx: &mut Context) {
    ctx.add_line(&format!(
        "<body class=\"{}\">",
        escape_attribute(&body_class(template))
    ));
    ctx.add_block(body_markup);
    ctx.add_line("</body>");
}

/// File name offered for a saved template, derived from its title
pub fn suggested_file_name(template: &Template) -> String {
    let slug = template
        .title
        .as_deref()
        .unwrap_or("")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "template.html".to_string()
    } else {
        format!("{}.html", slug)
    }
}
