//! Server-rendered HTML for the namespace and key indexes.
//!
//! Pages are plain HTML with inline CSS, no JS. Every value that came from
//! the backend or the request path goes through [`html_escape`].

/// One key on the key index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRow {
    pub id: usize,
    pub key: String,
    pub value: String,
    /// Rows of the value textarea.
    pub lines: usize,
    /// Rendered without edit controls.
    pub read_only: bool,
}

/// One namespace on the namespace index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceRow {
    pub id: usize,
    pub name: String,
    pub size: u64,
    pub access: bool,
}

const PAGE_CSS: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>
body{font-family:system-ui,-apple-system,sans-serif;margin:0;background:#FAF7F2;color:#2D1F0E}
header{padding:16px 32px;background:#2D1F0E;color:#F5C842;font-weight:700}
header a{color:#F5C842;text-decoration:none}
main{padding:24px 32px}
table{border-collapse:collapse;width:100%;background:#fff;border-radius:8px}
th,td{padding:8px 12px;border-bottom:1px solid #EFE6D8;text-align:left;vertical-align:top}
textarea{width:100%;font-family:ui-monospace,monospace}
form.inline{display:inline}
button{border:0;border-radius:999px;padding:6px 14px;background:#F5C842;cursor:pointer}
button.danger{background:#E74C3C;color:#fff}
.create{margin-bottom:24px}
.muted{color:#8A7B66}
</style>
"#;

/// Escape `&`, `<`, `>`, `"` and `'`.
pub fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn page_shell(title: &str, api_version: &str, content: &str) -> String {
    let mut html = String::with_capacity(4096 + content.len());
    html.push_str(PAGE_CSS);
    html.push_str("<title>");
    html.push_str(&html_escape(title));
    html.push_str(" - KVDB Web</title>\n</head>\n<body>\n<header><a href=\"/");
    html.push_str(&urlencoding::encode(api_version));
    html.push_str("\">KVDB Web</a> <span class=\"muted\">");
    html.push_str(&html_escape(title));
    html.push_str("</span></header>\n<main>\n");
    html.push_str(content);
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn action_button(input: &str, class: &str) -> String {
    let mut s = String::with_capacity(96);
    s.push_str("<button type=\"submit\" name=\"input\" value=\"");
    s.push_str(input);
    s.push('"');
    if !class.is_empty() {
        s.push_str(" class=\"");
        s.push_str(class);
        s.push('"');
    }
    s.push('>');
    s.push_str(input);
    s.push_str("</button>");
    s
}

/// Key index for `namespace`. Forms post back to `/{api_version}/{namespace}`.
pub fn key_index(api_version: &str, namespace: &str, rows: &[KeyRow]) -> String {
    let action = format!(
        "/{}/{}",
        urlencoding::encode(api_version),
        urlencoding::encode(namespace)
    );
    let action = html_escape(&action);

    let mut content = String::with_capacity(1024 + rows.len() * 512);
    content.push_str("<form class=\"create\" method=\"post\" action=\"");
    content.push_str(&action);
    content.push_str("\"><input name=\"key\" placeholder=\"key\" required> ");
    content.push_str("<input name=\"value\" placeholder=\"value\"> ");
    content.push_str(&action_button("Create", ""));
    content.push(' ');
    content.push_str(&action_button("Generate", ""));
    content.push_str("</form>\n");

    content.push_str("<table>\n<thead><tr><th>#</th><th>Key</th><th>Value</th><th></th></tr></thead>\n<tbody>\n");
    for row in rows {
        let key = html_escape(&row.key);
        let value = html_escape(&row.value);

        content.push_str("<tr data-key=\"");
        content.push_str(&key);
        content.push('"');
        if row.read_only {
            content.push_str(" data-read-only=\"true\"");
        }
        content.push_str("><td>");
        content.push_str(&row.id.to_string());
        content.push_str("</td><td>");
        content.push_str(&key);
        content.push_str("</td>");

        if row.read_only {
            content.push_str("<td><textarea rows=\"");
            content.push_str(&row.lines.to_string());
            content.push_str("\" readonly>");
            content.push_str(&value);
            content.push_str("</textarea></td><td class=\"muted\">read-only</td></tr>\n");
            continue;
        }

        content.push_str("<td><form method=\"post\" action=\"");
        content.push_str(&action);
        content.push_str("\"><input type=\"hidden\" name=\"key\" value=\"");
        content.push_str(&key);
        content.push_str("\"><textarea name=\"value\" rows=\"");
        content.push_str(&row.lines.to_string());
        content.push_str("\">");
        content.push_str(&value);
        content.push_str("</textarea>");
        content.push_str(&action_button("Update", ""));
        content.push(' ');
        content.push_str(&action_button("Roll", ""));
        content.push(' ');
        content.push_str(&action_button("Delete", "danger"));
        content.push_str("</form></td><td></td></tr>\n");
    }
    content.push_str("</tbody>\n</table>\n");

    page_shell(namespace, api_version, &content)
}

/// Namespace index. Forms post back to `/{api_version}`.
pub fn namespace_index(api_version: &str, rows: &[NamespaceRow]) -> String {
    let base = format!("/{}", urlencoding::encode(api_version));
    let action = html_escape(&base);

    let mut content = String::with_capacity(1024 + rows.len() * 384);
    content.push_str("<form class=\"create\" method=\"post\" action=\"");
    content.push_str(&action);
    content.push_str("\"><input name=\"key\" placeholder=\"namespace\" required> ");
    content.push_str(&action_button("Create", ""));
    content.push_str("</form>\n");

    content.push_str("<table>\n<thead><tr><th>#</th><th>Namespace</th><th>Keys</th><th>Access</th><th></th></tr></thead>\n<tbody>\n");
    for row in rows {
        let name = html_escape(&row.name);
        let href = html_escape(&format!("{base}/{}", urlencoding::encode(&row.name)));

        content.push_str("<tr data-key=\"");
        content.push_str(&name);
        content.push_str("\"><td>");
        content.push_str(&row.id.to_string());
        content.push_str("</td><td><a href=\"");
        content.push_str(&href);
        content.push_str("\">");
        content.push_str(&name);
        content.push_str("</a></td><td>");
        content.push_str(&row.size.to_string());
        content.push_str("</td><td>");
        content.push_str(if row.access { "yes" } else { "no" });
        content.push_str("</td><td><form class=\"inline\" method=\"post\" action=\"");
        content.push_str(&action);
        content.push_str("\"><input type=\"hidden\" name=\"key\" value=\"");
        content.push_str(&name);
        content.push_str("\">");
        content.push_str(&action_button("Generate", ""));
        content.push(' ');
        content.push_str(&action_button("Roll", ""));
        content.push(' ');
        content.push_str(&action_button("Delete", "danger"));
        content.push_str("</form></td></tr>\n");
    }
    content.push_str("</tbody>\n</table>\n");

    page_shell("Namespaces", api_version, &content)
}
