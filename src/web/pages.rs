//! Server rendered HTML.
use std::fmt::Write;

use crate::handler::ExtractedTexture;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.error {{ color: #b00020; }}
.grid {{ display: flex; flex-wrap: wrap; gap: 1rem; }}
.card {{ border: 1px solid #ccc; padding: .5rem; width: 220px; }}
.card img {{ max-width: 200px; max-height: 200px; image-rendering: pixelated; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape(title),
    )
}

pub fn index(error: Option<&str>) -> String {
    let mut body = String::from("<h1>Unity texture swap</h1>\n");
    if let Some(error) = error {
        let _ = writeln!(body, r#"<p class="error">{}</p>"#, escape(error));
    }
    body.push_str(
        r#"<form action="/upload" method="post" enctype="multipart/form-data">
<p>Select a <code>.assets</code> file and, if it has one, its <code>.resS</code> companion.</p>
<input type="file" name="file" multiple required>
<button type="submit">Upload</button>
</form>"#,
    );
    layout("Unity texture swap", &body)
}

pub fn results(files: &[ExtractedTexture]) -> String {
    let mut body = format!("<h1>{} image(s) found</h1>\n", files.len());
    body.push_str(r#"<p><a href="/download_modified">Download modified file</a> | <a href="/">Upload another</a></p>"#);
    body.push_str("\n<div class=\"grid\">\n");
    for file in files {
        let _ = write!(
            body,
            r#"<div class="card">
<img src="/view/{path}" alt="{name}">
<p><b>{name}</b><br>{type_} &middot; path id {path_id}</p>
<form class="replace" data-path-id="{path_id}">
<input type="file" name="file" accept=".png,.jpg,.jpeg,.gif" required>
<button type="submit">Replace</button>
<span class="status"></span>
</form>
</div>
"#,
            path = escape(&file.path),
            name = escape(&file.name),
            type_ = escape(&file.type_),
            path_id = file.path_id,
        );
    }
    body.push_str("</div>\n");
    body.push_str(
        r#"<script>
for (const form of document.querySelectorAll("form.replace")) {
  form.addEventListener("submit", async (event) => {
    event.preventDefault();
    const data = new FormData(form);
    data.append("path_id", form.dataset.pathId);
    const status = form.querySelector(".status");
    status.textContent = "working...";
    const response = await fetch("/replace_texture", { method: "POST", body: data });
    const result = await response.json();
    status.textContent = result.message;
    if (result.success) {
      const img = form.parentElement.querySelector("img");
      img.src = URL.createObjectURL(form.querySelector("input").files[0]);
    }
  });
}
</script>"#,
    );
    layout("Extracted images", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn results_list_every_file() {
        let files = vec![ExtractedTexture {
            name: "hero<1>".to_string(),
            type_: "Sprite".to_string(),
            path_id: -42,
            path: "hero1.png".to_string(),
        }];
        let html = results(&files);
        assert!(html.contains(r#"src="/view/hero1.png""#));
        assert!(html.contains("hero&lt;1&gt;"));
        assert!(html.contains(r#"data-path-id="-42""#));
        assert!(index(Some("bad <file>")).contains("bad &lt;file&gt;"));
    }
}
