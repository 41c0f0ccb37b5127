use crate::{compile_template, suggested_file_name, CompileError, CompileOptions};
use std::collections::BTreeMap;
use vellum_parser::parse_template;

const SOURCE: &str = r#"<html>
<head>
  <title>Launch Poster</title>
  <link rel="stylesheet" href="https://fonts.example/inter.css">
  <script src="https://cdn.tailwindcss.com"></script>
  <script>tailwind.config = {}</script>
  <style>:root { --bg: #ffffff; --fg: #000000; }</style>
</head>
<body class="p-8">
  <h1>Launch</h1>
</body>
</html>"#;

fn colors(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_compile_standalone_document() {
    let template = parse_template(SOURCE);
    let html = compile_template(
        &template,
        "<h1>Launch day</h1>",
        &colors(&[("--fg", "#112233")]),
        CompileOptions::default(),
    )
    .expect("Failed to compile");

    println!("Generated HTML:\n{}", html);

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Launch Poster</title>"));
    assert!(html.contains("<link rel=\"stylesheet\" href=\"https://fonts.example/inter.css\">"));
    assert!(html.contains("<script src=\"https://cdn.tailwindcss.com\"></script>"));
    assert!(html.contains("--fg: #112233"));
    assert!(html.contains("--bg: #ffffff"));
    assert!(html.contains("<body class=\"vellum-canvas p-8\">"));
    assert!(html.contains("<h1>Launch day</h1>"));
}

#[test]
fn test_compiled_output_parses_back() {
    let template = parse_template(SOURCE);
    let body = "<h1>Launch day</h1>\n<p class=\"lead\">Soon &amp; often</p>";
    let html = compile_template(
        &template,
        body,
        &colors(&[("--fg", "#112233")]),
        CompileOptions::default(),
    )
    .unwrap();

    let reparsed = parse_template(&html);
    assert_eq!(reparsed.body_markup, body);
    assert_eq!(reparsed.body_class, "vellum-canvas p-8");
    assert_eq!(reparsed.title.as_deref(), Some("Launch Poster"));
    assert_eq!(reparsed.inline_scripts, template.inline_scripts);
    assert!(reparsed.uses_scoped_style_dialect);
    let defaults = reparsed.default_colors();
    assert_eq!(defaults.get("--fg").map(String::as_str), Some("#112233"));

    // Saving the reparsed template again does not duplicate the scope class
    let again = compile_template(&reparsed, body, &BTreeMap::new(), CompileOptions::default()).unwrap();
    assert!(again.contains("<body class=\"vellum-canvas p-8\">"));
}

#[test]
fn test_rejects_unknown_or_invalid_colors() {
    let template = parse_template(SOURCE);
    let err = compile_template(&template, "", &colors(&[("--nope", "#fff")]), CompileOptions::default())
        .unwrap_err();
    assert_eq!(err, CompileError::UnknownColorVariable("--nope".to_string()));

    let err = compile_template(&template, "", &colors(&[("--fg", "red")]), CompileOptions::default())
        .unwrap_err();
    assert!(matches!(err, CompileError::InvalidColor { .. }));
}

#[test]
fn test_compact_output() {
    let template = parse_template("<p>Hi</p>");
    let options = CompileOptions {
        pretty: false,
        ..CompileOptions::default()
    };
    let html = compile_template(&template, "<p>Hi</p>", &BTreeMap::new(), options).unwrap();
    assert_eq!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body class=\"vellum-canvas vellum-body\"><p>Hi</p></body></html>"
    );
}

#[test]
fn test_suggested_file_name() {
    let template = parse_template(SOURCE);
    assert_eq!(suggested_file_name(&template), "launch-poster.html");
    assert_eq!(suggested_file_name(&parse_template("")), "template.html");
}
