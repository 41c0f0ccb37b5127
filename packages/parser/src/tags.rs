//! Tag tables shared by the tree builder, serializer and the editor's
//! classification pass. All names are lower-case.

/// Elements that never have children or a close tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text (no markup, no entity decoding)
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Block-level elements that implicitly close an open `<p>`
pub const P_CLOSERS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p",
    "pre", "section", "table", "ul",
];

/// Block-level text containers. A `<span>` nested inside one of these is
/// not an editable region of its own.
pub const TEXT_BLOCKS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "td", "th", "button", "blockquote",
    "figcaption", "label", "dt", "dd",
];

pub fn is_void(tag: &str) -> bool {
    contains(VOID_ELEMENTS, tag)
}

pub fn is_raw_text(tag: &str) -> bool {
    contains(RAW_TEXT_ELEMENTS, tag)
}

pub fn closes_paragraph(tag: &str) -> bool {
    contains(P_CLOSERS, tag)
}

pub fn is_text_block(tag: &str) -> bool {
    contains(TEXT_BLOCKS, tag)
}

/// Returns the tags that bound the search for an implicitly closed sibling,
/// e.g. a new `<li>` closes an open `<li>` unless a list boundary is hit first.
pub fn implicit_close_scope(tag: &str) -> Option<(&'static [&'static str], &'static [&'static str])> {
    match tag {
        "li" => Some((&["li"], &["ul", "ol", "menu"])),
        "dt" | "dd" => Some((&["dt", "dd"], &["dl"])),
        "td" | "th" => Some((&["td", "th"], &["tr", "table"])),
        "tr" => Some((&["tr"], &["table", "thead", "tbody", "tfoot"])),
        "option" => Some((&["option"], &["select", "datalist"])),
        "body" => Some((&["head"], &["html"])),
        _ => None,
    }
}

fn contains(table: &[&str], tag: &str) -> bool {
    table.iter().any(|t| t.eq_ignore_ascii_case(tag))
}
