//! Built-in responses served when neither network nor cache can answer.

use expedition_core::StoredResponse;

use crate::fetch::Destination;

/// Offline page for navigations with nothing cached.
pub const FALLBACK_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Expedition Countdown</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            padding: 20px;
            text-align: center;
            background: linear-gradient(135deg, #1a2980 0%, #26d0ce 100%);
            color: white;
            min-height: 100vh;
            display: flex;
            flex-direction: column;
            justify-content: center;
            align-items: center;
        }
        .offline-card {
            max-width: 500px;
            background: rgba(255, 255, 255, 0.15);
            padding: 30px;
            border-radius: 15px;
            border: 1px solid rgba(255, 255, 255, 0.3);
        }
        h1 { font-size: 24px; margin-bottom: 20px; }
        .offline-message {
            background: rgba(255, 107, 107, 0.8);
            padding: 15px;
            border-radius: 8px;
            margin: 20px 0;
        }
        button {
            background: rgba(76, 175, 80, 0.7);
            color: white;
            border: 1px solid rgba(255, 255, 255, 0.3);
            padding: 12px 24px;
            border-radius: 8px;
            cursor: pointer;
            font-size: 16px;
            margin: 10px;
        }
    </style>
</head>
<body>
    <div class="offline-card">
        <div style="font-size: 3rem">⛵</div>
        <h1>Expedition Countdown</h1>
        <div class="offline-message">
            <p>Offline mode</p>
            <p>The app is running with limited functionality.</p>
        </div>
        <p>Everything should be available again once the connection is back.</p>
        <button onclick="location.reload()">Try again</button>
    </div>
    <script>
        window.addEventListener('online', () => location.reload());
    </script>
</body>
</html>"#;

const IMAGE_STUB: &str = r##"<svg width="100" height="100" xmlns="http://www.w3.org/2000/svg"><rect width="100" height="100" fill="#1a2980"/><text x="50" y="50" text-anchor="middle" dy=".3em" font-family="Arial" font-size="10" fill="white">⛵</text></svg>"##;
const STYLE_STUB: &str = "/* Fallback CSS */";
const SCRIPT_STUB: &str = "// Fallback JS";

pub fn offline_page() -> StoredResponse {
    StoredResponse::new(200, FALLBACK_HTML)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_header("cache-control", "no-cache")
}

/// Placeholder for a static asset that could not be fetched or found.
pub fn asset_stub(destination: Destination) -> StoredResponse {
    match destination {
        Destination::Image => StoredResponse::new(200, IMAGE_STUB).with_header("content-type", "image/svg+xml"),
        Destination::Style => StoredResponse::new(200, STYLE_STUB).with_header("content-type", "text/css"),
        Destination::Script => {
            StoredResponse::new(200, SCRIPT_STUB).with_header("content-type", "application/javascript")
        }
        _ => StoredResponse::new(503, "Service Unavailable").with_header("content-type", "text/plain"),
    }
}

/// Entry stored at install time for a manifest URL that never fetched.
pub fn precache_stub(url: &str) -> StoredResponse {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.ends_with(".js") {
        StoredResponse::new(200, SCRIPT_STUB).with_header("content-type", "application/javascript")
    } else if path.ends_with(".css") {
        StoredResponse::new(200, STYLE_STUB).with_header("content-type", "text/css")
    } else {
        StoredResponse::new(200, FALLBACK_HTML).with_header("content-type", "text/html")
    }
}
