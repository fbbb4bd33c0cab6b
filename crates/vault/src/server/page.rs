//! The single HTML page served at `/`, plus the escaping helpers it needs.

use std::fmt::Write as _;

/// Render the index page: an upload form and a download link per stored file.
pub fn render_index(files: &[String]) -> String {
    let mut items = String::new();
    for name in files {
        let _ = writeln!(
            items,
            r#"      <li><a href="/download/{}">{}</a></li>"#,
            percent_encode(name),
            html_escape(name),
        );
    }
    if files.is_empty() {
        items.push_str("      <li><em>No files stored yet.</em></li>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>File Vault</title>
  </head>
  <body>
    <h1>Encrypted File Vault</h1>
    <form action="/upload" method="post" enctype="multipart/form-data">
      <input type="file" name="file" required>
      <button type="submit">Upload</button>
    </form>
    <h2>Stored files</h2>
    <ul>
{items}    </ul>
  </body>
</html>
"#
    )
}

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode every byte outside the RFC 3986 unreserved set.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn percent_encodes_reserved_and_utf8() {
        assert_eq!(percent_encode("a b.txt"), "a%20b.txt");
        assert_eq!(percent_encode("résumé"), "r%C3%A9sum%C3%A9");
        assert_eq!(percent_encode("x?y#z"), "x%3Fy%23z");
    }

    #[test]
    fn index_lists_files_with_links() {
        let html = render_index(&["my notes.txt".into(), "<script>".into()]);
        assert!(html.contains(r#"<a href="/download/my%20notes.txt">my notes.txt</a>"#));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"enctype="multipart/form-data""#));
    }

    #[test]
    fn index_without_files() {
        let html = render_index(&[]);
        assert!(html.contains("No files stored yet."));
    }
}
