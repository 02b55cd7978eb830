//! HTML pages served to the operator's browser.

use contenthub_core::{ContentKind, Feed, FeedItem};

const STYLE: &str = r#"
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f5f5f5; color: #222; margin: 0; padding: 20px; }
        main { max-width: 760px; margin: 0 auto; }
        h1 { font-size: 22px; }
        h2 { font-size: 16px; color: #555; margin-top: 28px; }
        form.card, .card { background: #fff; border: 1px solid #ddd; border-radius: 8px; padding: 14px; margin-bottom: 12px; }
        textarea { width: 100%; min-height: 70px; box-sizing: border-box; }
        .note { white-space: pre-wrap; word-break: break-word; }
        .media img, .media video { max-width: 100%; display: block; }
        .caption { font-size: 12px; color: #888; margin-top: 6px; }
        .error { color: #b00020; }
        .empty { color: #888; }
        nav { float: right; }
"#;

/// Escapes text for HTML element and attribute contexts.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
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

/// Feed page: upload form, notes section, then media section.
pub fn feed_page(feed: &Feed, base_path: &str, asset_path: impl Fn(&str) -> String) -> String {
    let notes = feed.texts().map(note_card).collect::<Vec<_>>();
    let media = feed
        .media()
        .map(|item| media_card(item, &asset_path(&item.content)))
        .collect::<Vec<_>>();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Content Hub</title>
    <style>{STYLE}</style>
</head>
<body>
<main>
    <nav><a href="{base}/logout">Log out</a></nav>
    <h1>Content Hub</h1>
    <form class="card" action="{base}/upload" method="post" enctype="multipart/form-data">
        <textarea name="text" placeholder="Write a note"></textarea>
        <input type="file" name="file" multiple accept="{accept}">
        <button type="submit">Post</button>
    </form>
    <h2>Notes</h2>
    {notes}
    <h2>Media</h2>
    {media}
</main>
</body>
</html>"#,
        base = escape_html(base_path),
        accept = accept_attribute(),
        notes = section_or_empty(notes, "No notes yet."),
        media = section_or_empty(media, "No media yet."),
    )
}

/// Login form, optionally showing an error line.
pub fn login_page(base_path: &str, error: Option<&str>) -> String {
    let error = error
        .map(|message| format!(r#"<p class="error">{}</p>"#, escape_html(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Content Hub - Login</title>
    <style>{STYLE}</style>
</head>
<body>
<main>
    <h1>Content Hub</h1>
    {error}
    <form class="card" action="{base}/login" method="post">
        <p><input type="text" name="username" placeholder="Username" autocomplete="username"></p>
        <p><input type="password" name="password" placeholder="Password" autocomplete="current-password"></p>
        <button type="submit">Log in</button>
    </form>
</main>
</body>
</html>"#,
        base = escape_html(base_path),
    )
}

fn note_card(item: &FeedItem) -> String {
    let body = escape_html(&item.content);
    match &item.link_target {
        Some(target) => format!(
            r#"<div class="card note"><a href="{}">{}</a></div>"#,
            escape_html(target),
            body
        ),
        None => format!(r#"<div class="card note">{body}</div>"#),
    }
}

fn media_card(item: &FeedItem, src: &str) -> String {
    let src = escape_html(src);
    let name = escape_html(&item.content);
    let mime = escape_html(item.mime_type.as_deref().unwrap_or_default());
    let element = match item.kind {
        ContentKind::Video => format!(
            r#"<video controls preload="metadata"><source src="{src}" type="{mime}"></video>"#
        ),
        _ => format!(r#"<img src="{src}" alt="{name}" loading="lazy">"#),
    };
    format!(r#"<div class="card media">{element}<div class="caption">{name}</div></div>"#)
}

fn section_or_empty(cards: Vec<String>, empty: &str) -> String {
    if cards.is_empty() {
        return format!(r#"<p class="empty">{empty}</p>"#);
    }
    cards.join("\n    ")
}

fn accept_attribute() -> String {
    contenthub_core::supported_extensions()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",")
}
