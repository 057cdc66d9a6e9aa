//! Server-rendered HTML pages: landing/sign-in, volume grid and reader.
//!
//! The reader page embeds its initial listing as JSON and drives navigation,
//! prefetching, image fallbacks and incremental page loading in the browser,
//! following the same rules as [`crate::reader::ReaderState`].

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::auth::{signin_redirect, MaybeSession};
use super::handlers::{ApiError, AppState};
use crate::drive::DriveSource;
use crate::library::{PageListing, PageRequest, Volume, VolumeList};
use crate::reader::{CONTROLS_HIDE_DELAY, PREFETCH_RADIUS, PREVIOUS_ZONE};

/// Escape HTML special characters to prevent XSS attacks.
fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// JSON safe to place inside a `<script>` element.
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

const BASE_STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            background: #0f0f0f;
            color: #f5f5f5;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif;
        }
        a { color: inherit; text-decoration: none; }
        header {
            display: flex;
            justify-content: space-between;
            align-items: center;
            padding: 16px 24px;
            border-bottom: 1px solid rgba(255, 255, 255, 0.1);
        }
        header h1 { font-size: 18px; font-weight: 600; letter-spacing: 0.04em; }
        header form button, .button {
            background: rgba(255, 255, 255, 0.1);
            color: #fff;
            border: 1px solid rgba(255, 255, 255, 0.15);
            padding: 8px 14px;
            border-radius: 6px;
            font-size: 13px;
            cursor: pointer;
        }
        .message {
            margin: 48px auto;
            max-width: 480px;
            text-align: center;
            color: rgba(255, 255, 255, 0.7);
        }
        .error { color: #f87171; }
"#;

fn page_shell(title: &str, style: &str, body: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{base}{style}</style>
</head>
<body>
{body}
</body>
</html>"##,
        title = html_escape(title),
        base = BASE_STYLE,
        style = style,
        body = body,
    )
}

fn site_header(email: &str) -> String {
    format!(
        r#"    <header>
        <h1><a href="/comics">INVINCIBLE</a></h1>
        <form method="post" action="/api/auth/signout">
            <span>{email}</span>
            <button type="submit">Sign out</button>
        </form>
    </header>"#,
        email = html_escape(email),
    )
}

// =============================================================================
// Landing page
// =============================================================================

fn sign_in_error_message(code: &str) -> &'static str {
    match code {
        "AccessDenied" => "This Google account is not allowed to use this reader.",
        "OAuthCallback" => "Sign-in could not be completed. Please try again.",
        _ => "Sign-in failed. Please try again.",
    }
}

/// Render the landing page with an optional sign-in error code.
pub fn render_home(error: Option<&str>) -> String {
    let error_html = error
        .filter(|code| !code.is_empty())
        .map(|code| {
            format!(
                r#"<p class="error">{}</p>"#,
                html_escape(sign_in_error_message(code))
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"    <main class="message">
        <h1>INVINCIBLE</h1>
        <p>A private reading room. Sign in to continue.</p>
        {error_html}
        <p><a class="button" href="/api/auth/signin?callbackUrl=%2Fcomics">Sign in with Google</a></p>
    </main>"#,
        error_html = error_html,
    );
    page_shell(
        "Invincible",
        ".message h1 { margin-bottom: 12px; } .message p { margin-bottom: 16px; }",
        &body,
    )
}

/// Render a full-page error.
pub fn render_error(status: StatusCode, message: &str) -> String {
    let body = format!(
        r#"    <main class="message">
        <h1>{code}</h1>
        <p class="error">{message}</p>
        <p><a class="button" href="/comics">Back to the library</a></p>
    </main>"#,
        code = status.as_u16(),
        message = html_escape(message),
    );
    page_shell("Error", "", &body)
}

// =============================================================================
// Library page
// =============================================================================

/// Render the volume grid.
pub fn render_library(list: &VolumeList, email: &str) -> String {
    let cards: Vec<String> = list
        .volumes
        .iter()
        .map(|volume| {
            let title = volume.title();
            let number = title
                .number
                .map(|n| format!(r#"<span class="number">Tome {:02}</span>"#, n))
                .unwrap_or_default();
            format!(
                r#"        <a class="card" href="/comics/{href}">{number}<span class="title">{title}</span></a>"#,
                href = urlencoding::encode(&volume.id),
                number = number,
                title = html_escape(&title.title),
            )
        })
        .collect();

    let grid = if cards.is_empty() {
        r#"    <p class="message">No volumes found.</p>"#.to_string()
    } else {
        format!(
            "    <main class=\"grid\">\n{}\n    </main>",
            cards.join("\n")
        )
    };

    page_shell(
        &list.root_folder.name,
        r#"
        .grid {
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(180px, 1fr));
            gap: 16px;
            padding: 24px;
        }
        .card {
            display: flex;
            flex-direction: column;
            gap: 8px;
            min-height: 120px;
            padding: 16px;
            border-radius: 8px;
            background: rgba(255, 255, 255, 0.05);
            border: 1px solid rgba(255, 255, 255, 0.1);
        }
        .card:hover { background: rgba(255, 255, 255, 0.1); }
        .card .number { font-size: 12px; color: #facc15; font-weight: 600; }
        .card .title { font-size: 15px; }
"#,
        &format!("{}\n{}", site_header(email), grid),
    )
}

// =============================================================================
// Reader page
// =============================================================================

const READER_STYLE: &str = r#"
        body { overflow: hidden; }
        #stage {
            position: fixed;
            inset: 0;
            display: flex;
            align-items: center;
            justify-content: center;
            cursor: pointer;
        }
        #page-image { max-width: 100vw; max-height: 100vh; object-fit: contain; }
        #status {
            position: absolute;
            color: rgba(255, 255, 255, 0.5);
            font-size: 14px;
        }
        #controls {
            position: fixed;
            left: 50%;
            bottom: 16px;
            transform: translateX(-50%);
            display: flex;
            gap: 8px;
            align-items: center;
            background: rgba(0, 0, 0, 0.85);
            padding: 8px 12px;
            border-radius: 8px;
            font-size: 13px;
            transition: opacity 0.3s;
            z-index: 1000;
        }
        #controls.hidden { opacity: 0; pointer-events: none; }
        #controls button, #controls a {
            background: rgba(255, 255, 255, 0.1);
            color: #fff;
            border: none;
            padding: 6px 10px;
            border-radius: 4px;
            cursor: pointer;
        }
"#;

const READER_SCRIPT: &str = r#"
(function () {
    const data = JSON.parse(document.getElementById('reader-data').textContent);
    const PREFETCH_RADIUS = data.prefetchRadius;
    const PREVIOUS_ZONE = data.previousZone;
    const HIDE_DELAY_MS = data.hideDelayMs;

    const stage = document.getElementById('stage');
    const image = document.getElementById('page-image');
    const status = document.getElementById('status');
    const counter = document.getElementById('counter');
    const controls = document.getElementById('controls');
    const fullscreenButton = document.getElementById('fullscreen');

    let files = data.files;
    let pagination = data.pagination;
    let index = 0;
    let currentUrl = null;
    let fallbackAttempts = 0;
    let generation = 0;
    let hovering = false;
    let hideTimer = null;
    const prefetched = new Set();
    const requested = new Set(pagination ? [pagination.currentPage] : []);

    function proxyUrl(id, format) {
        let url = '/api/proxy-image?id=' + encodeURIComponent(id);
        if (format) url += '&format=' + format;
        return url;
    }

    function fallbackUrls(file) {
        const urls = [proxyUrl(file.id, 'view'), proxyUrl(file.id, 'download')];
        if (file.webContentLink) urls.push(file.webContentLink);
        return urls;
    }

    function compareNames(a, b) {
        const order = a.localeCompare(b, undefined, { numeric: true, sensitivity: 'base' });
        if (order !== 0) return order;
        return a < b ? -1 : a > b ? 1 : 0;
    }

    function absolute(url) {
        return new URL(url, window.location.href).href;
    }

    function updateCounter() {
        const total = pagination ? Math.max(pagination.totalFiles, files.length) : files.length;
        counter.textContent = files.length ? (index + 1) + ' / ' + total : '0 / 0';
    }

    function showImage(url) {
        currentUrl = url;
        status.textContent = 'Loading...';
        status.hidden = false;
        image.src = url;
    }

    function loadCurrent() {
        currentUrl = null;
        fallbackAttempts = 0;
        image.removeAttribute('src');
        updateCounter();
        const file = files[index];
        if (!file) {
            status.textContent = 'This volume has no pages.';
            status.hidden = false;
            return;
        }
        prefetched.add(file.id);
        showImage(proxyUrl(file.id));
        prefetch();
        fetchNextPage();
    }

    image.addEventListener('load', function () {
        if (currentUrl && image.src === absolute(currentUrl)) status.hidden = true;
    });

    image.addEventListener('error', function () {
        if (!currentUrl || image.src !== absolute(currentUrl)) return;
        const chain = fallbackUrls(files[index]);
        if (fallbackAttempts < chain.length) {
            const next = chain[fallbackAttempts];
            fallbackAttempts += 1;
            showImage(next);
        } else {
            currentUrl = null;
            image.removeAttribute('src');
            status.textContent = 'This page could not be loaded.';
            status.hidden = false;
        }
    });

    function prefetch() {
        const targets = [];
        for (let d = 1; d <= PREFETCH_RADIUS; d++) targets.push(index + d);
        for (let d = 1; d <= PREFETCH_RADIUS; d++) targets.push(index - d);
        targets.forEach(function (i) {
            const file = files[i];
            if (!file || prefetched.has(file.id)) return;
            prefetched.add(file.id);
            const preload = new Image();
            preload.src = proxyUrl(file.id);
        });
    }

    function fetchNextPage() {
        if (!pagination || !pagination.hasNextPage || pagination.pageSize <= 0) return;
        const start = (pagination.currentPage - 1) * pagination.pageSize;
        const end = Math.min(pagination.currentPage * pagination.pageSize, pagination.totalFiles);
        if (end <= start) return;
        if (index < start + Math.ceil((end - start) * 7 / 10)) return;

        const next = pagination.currentPage + 1;
        if (requested.has(next)) return;
        requested.add(next);

        const tag = generation;
        const url = '/api/comics/' + encodeURIComponent(data.volumeId) +
            '/pages?page=' + next + '&pageSize=' + pagination.pageSize;
        fetch(url, { credentials: 'same-origin' })
            .then(function (response) {
                if (!response.ok) throw new Error('HTTP ' + response.status);
                return response.json();
            })
            .then(function (body) {
                if (tag !== generation) return;
                mergePages(body.files, body.pagination);
            })
            .catch(function (err) { console.error('Failed to load pages', err); });
    }

    function mergePages(incoming, meta) {
        const currentId = files[index] ? files[index].id : null;
        const seen = new Set(files.map(function (f) { return f.id; }));
        incoming.forEach(function (file) {
            if (seen.has(file.id)) return;
            seen.add(file.id);
            files.push(file);
        });
        files.sort(function (a, b) { return compareNames(a.name, b.name); });
        if (currentId) {
            const moved = files.findIndex(function (f) { return f.id === currentId; });
            if (moved >= 0) index = moved;
        }
        pagination = meta;
        updateCounter();
        prefetch();
        fetchNextPage();
    }

    function goTo(target) {
        if (!files.length) return;
        const clamped = Math.max(0, Math.min(target, files.length - 1));
        if (clamped === index) return;
        index = clamped;
        loadCurrent();
    }

    function isFullscreen() {
        return !!(document.fullscreenElement || document.webkitFullscreenElement ||
            document.mozFullScreenElement || document.msFullscreenElement);
    }

    function toggleFullscreen() {
        const el = stage;
        const request = isFullscreen()
            ? (document.exitFullscreen || document.webkitExitFullscreen ||
                document.mozCancelFullScreen || document.msExitFullscreen)
            : (el.requestFullscreen || el.webkitRequestFullscreen ||
                el.mozRequestFullScreen || el.msRequestFullscreen);
        if (!request) return;
        const result = request.call(isFullscreen() ? document : el);
        if (result && result.catch) result.catch(function () {});
    }

    ['fullscreenchange', 'webkitfullscreenchange', 'mozfullscreenchange', 'MSFullscreenChange']
        .forEach(function (name) {
            document.addEventListener(name, function () {
                fullscreenButton.textContent = isFullscreen() ? 'Exit fullscreen' : 'Fullscreen';
            });
        });

    function showControls() {
        controls.classList.remove('hidden');
        clearTimeout(hideTimer);
        hideTimer = hovering ? null : setTimeout(function () {
            controls.classList.add('hidden');
        }, HIDE_DELAY_MS);
    }

    ['mousemove', 'touchstart', 'keydown'].forEach(function (name) {
        document.addEventListener(name, showControls, { passive: true });
    });
    controls.addEventListener('mouseenter', function () { hovering = true; showControls(); });
    controls.addEventListener('mouseleave', function () { hovering = false; showControls(); });
    controls.addEventListener('click', function (e) { e.stopPropagation(); });

    document.getElementById('previous').addEventListener('click', function () { goTo(index - 1); });
    document.getElementById('next').addEventListener('click', function () { goTo(index + 1); });
    fullscreenButton.addEventListener('click', toggleFullscreen);

    document.addEventListener('keydown', function (e) {
        if (e.key === 'ArrowLeft') goTo(index - 1);
        else if (e.key === 'ArrowRight') goTo(index + 1);
    });

    stage.addEventListener('click', function (e) {
        const rect = stage.getBoundingClientRect();
        const ratio = rect.width > 0 ? (e.clientX - rect.left) / rect.width : 1;
        goTo(ratio < PREVIOUS_ZONE ? index - 1 : index + 1);
    });

    window.addEventListener('pagehide', function () {
        generation += 1;
        prefetched.clear();
        clearTimeout(hideTimer);
    });

    loadCurrent();
    showControls();
})();
"#;

/// Render the reader for `volume` with its first window of pages.
pub fn render_reader(volume: &Volume, listing: &PageListing) -> String {
    let data = json!({
        "volumeId": volume.id,
        "files": listing.files,
        "pagination": listing.pagination,
        "prefetchRadius": PREFETCH_RADIUS,
        "previousZone": PREVIOUS_ZONE,
        "hideDelayMs": CONTROLS_HIDE_DELAY.as_millis() as u64,
    });
    let title = volume.title();

    let body = format!(
        r#"    <div id="stage">
        <img id="page-image" alt="">
        <div id="status">Loading...</div>
    </div>
    <div id="controls">
        <a href="/comics">Library</a>
        <span>{title}</span>
        <button id="previous" type="button">&larr;</button>
        <span id="counter"></span>
        <button id="next" type="button">&rarr;</button>
        <button id="fullscreen" type="button">Fullscreen</button>
    </div>
    <script type="application/json" id="reader-data">{data}</script>
    <script>{script}</script>"#,
        title = html_escape(&title.title),
        data = script_json(&data),
        script = READER_SCRIPT,
    );
    page_shell(&volume.name, READER_STYLE, &body)
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct HomeQueryParams {
    pub error: Option<String>,
}

/// `GET /`
///
/// Signed-in users go straight to the library.
pub async fn home_page_handler(
    MaybeSession(session): MaybeSession,
    Query(query): Query<HomeQueryParams>,
) -> Response {
    if session.is_some() && query.error.is_none() {
        return Redirect::to("/comics").into_response();
    }
    Html(render_home(query.error.as_deref())).into_response()
}

fn error_page(err: ApiError) -> Response {
    if err.status.is_server_error() {
        let detail = err.detail.as_deref().unwrap_or(&err.message);
        warn!(status = err.status.as_u16(), "Page failed: {}", detail);
    }
    (err.status, Html(render_error(err.status, &err.message))).into_response()
}

/// `GET /comics`
pub async fn library_page_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    MaybeSession(session): MaybeSession,
) -> Response {
    let Some(session) = session else {
        return signin_redirect("/comics");
    };
    match state.library.volumes(Some(&session.access_token)).await {
        Ok(list) => Html(render_library(&list, &session.email)).into_response(),
        Err(e) => error_page(e.into()),
    }
}

/// `GET /comics/{id}`
pub async fn reader_page_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    MaybeSession(session): MaybeSession,
    Path(volume_id): Path<String>,
) -> Response {
    let Some(session) = session else {
        return signin_redirect(&format!("/comics/{}", volume_id));
    };
    let token = Some(session.access_token.as_str());

    let volume = match state.library.volume(token, &volume_id).await {
        Ok(volume) => volume,
        Err(e) => return error_page(e.into()),
    };
    match state
        .library
        .pages(token, &volume_id, PageRequest::default())
        .await
    {
        Ok(listing) => Html(render_reader(&volume, &listing)).into_response(),
        Err(e) => error_page(e.into()),
    }
}

// =============================================================================
// Tests
// =============================================================================
