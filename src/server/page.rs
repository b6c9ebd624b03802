//! HTML pages served by the upload endpoints.
//!
//! Pages are small and static enough that plain `format!` is all the
//! templating they need; every interpolated value goes through [`escape`].

use crate::output::ConversionOutput;
use crate::session::{ListedFile, SessionId};

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape(title),
    )
}

/// Upload form for the batch endpoint.
pub fn batch_form(accept: &str, glyph_count: usize) -> String {
    layout(
        "File Upload",
        &format!(
            r#"    <h2>Upload a font</h2>
    <p>Every one of the {glyph_count} preset glyphs will be traced to SVG.</p>
    <form action="/" method="post" enctype="multipart/form-data">
        <input type="file" name="font" accept="{accept}" required>
        <button type="submit">Convert</button>
    </form>"#,
            accept = escape(accept),
        ),
    )
}

/// Upload form for the single-text endpoint.
pub fn text_form(accept: &str) -> String {
    layout(
        "File Upload",
        &format!(
            r#"    <h2>Upload a font and the text to trace</h2>
    <form action="/upload" method="post" enctype="multipart/form-data">
        <input type="file" name="font" accept="{accept}" required>
        <input type="text" name="text" required>
        <button type="submit">Convert</button>
    </form>"#,
            accept = escape(accept),
        ),
    )
}

/// Success page listing the produced SVGs and the main download link.
pub fn success(output: &ConversionOutput) -> String {
    let session = &output.session;
    let mut body = String::from("    <h2>Upload Successful</h2>\n");

    match &output.archive {
        Some(archive) => {
            body.push_str("    <p>Your SVG files have been created and compressed.</p>\n");
            body.push_str(&format!(
                "    <p><a href=\"{href}\" download>{name}</a></p>\n",
                href = escape(&session.url_for(&archive.name)),
                name = escape(&archive.name),
            ));
            body.push_str("    <ul>\n");
            for artifact in &output.artifacts {
                body.push_str(&format!("        <li>{}</li>\n", escape(&artifact.name)));
            }
            body.push_str("    </ul>\n");
        }
        None => {
            body.push_str("    <p>Your file has been successfully converted. You can download it from the link below:</p>\n");
            body.push_str("    <ul>\n");
            for artifact in &output.artifacts {
                body.push_str(&format!(
                    "        <li><a href=\"{href}\">{name}</a></li>\n",
                    href = escape(&session.url_for(&artifact.name)),
                    name = escape(&artifact.name),
                ));
            }
            body.push_str("    </ul>\n");
        }
    }

    body.push_str(&format!(
        "    <p><a href=\"{}\">Result page</a></p>",
        escape(&session.result_url())
    ));
    layout("Upload Successful", &body)
}

/// Listing of a session directory's current contents.
pub fn result(id: &SessionId, files: &[ListedFile]) -> String {
    let mut body = format!("    <h2>Results for {}</h2>\n", escape(&id.to_string()));
    if files.is_empty() {
        body.push_str("    <p>No files.</p>");
    } else {
        body.push_str("    <ul>\n");
        for f in files {
            body.push_str(&format!(
                "        <li><a href=\"{href}\">{name}</a> ({size} bytes)</li>\n",
                href = escape(&f.url),
                name = escape(&f.name),
                size = f.size,
            ));
        }
        body.push_str("    </ul>");
    }
    layout("Conversion Results", &body)
}
