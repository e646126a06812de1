//! Site server with live reload
//!
//! Serves the blog straight from the registry: listing and article pages
//! are rendered per request from the current snapshot, assets come off
//! disk. In watch mode, edits to the registry or content swap in a fresh
//! snapshot and connected browsers reload.

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        OriginalUri, State, WebSocketUpgrade,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::fetch::ContentFetcher;
use crate::registry::Registry;
use crate::render::{CodeHighlighter, MarkdownRenderer};
use crate::routes::RouteTable;
use crate::templates::{self, SiteData, TemplateRenderer};
use crate::view::{self, DetailView};
use crate::Site;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Immutable snapshot of the registry and its route table. Requests read
/// whichever snapshot is current; a reload swaps in a whole new one.
pub struct SiteSnapshot {
    pub registry: Registry,
    pub routes: RouteTable,
}

impl SiteSnapshot {
    pub fn load(site: &Site) -> Result<Self> {
        let registry = Registry::load(&site.registry_path(), &site.config.blog_prefix)?;
        let routes = RouteTable::build(&registry)?;
        Ok(Self { registry, routes })
    }
}

/// Server state
struct ServerState {
    site_data: SiteData,
    blog_prefix: String,
    about_source: Option<String>,
    snapshot: RwLock<Arc<SiteSnapshot>>,
    fetcher: ContentFetcher,
    renderer: MarkdownRenderer,
    templates: TemplateRenderer,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

impl ServerState {
    fn render_page(&self, template: &str, context: &tera::Context) -> Response {
        match self.templates.render(template, context) {
            Ok(html) => {
                let html = if self.live_reload {
                    inject_live_reload(&html)
                } else {
                    html
                };
                Html(html).into_response()
            }
            Err(e) => {
                tracing::error!("Template error in {}: {}", template, e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }

    fn not_found(&self, request_path: &str) -> Response {
        let mut context = templates::base_context(&self.site_data);
        context.insert("request_path", request_path);
        match self.templates.render("not_found.html", &context) {
            Ok(html) => {
                let html = if self.live_reload {
                    inject_live_reload(&html)
                } else {
                    html
                };
                (StatusCode::NOT_FOUND, Html(html)).into_response()
            }
            Err(e) => {
                tracing::error!("Template error in not_found.html: {}", e);
                (StatusCode::NOT_FOUND, "Not found").into_response()
            }
        }
    }
}

/// Start the site server
pub async fn start(site: &Site, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    let snapshot = SiteSnapshot::load(site)?;
    tracing::info!("Loaded {} entries from {:?}", snapshot.registry.len(), site.registry_path());

    let prefix = site.config.blog_prefix.trim_end_matches('/').to_string();
    anyhow::ensure!(!prefix.is_empty(), "blog_prefix must not be the site root");
    anyhow::ensure!(prefix.starts_with('/'), "blog_prefix must start with '/'");

    // Create broadcast channel for live reload notifications
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let highlighter = CodeHighlighter::with_options(
        &site.config.highlight.theme,
        site.config.highlight.line_numbers,
    );
    let state = Arc::new(ServerState {
        site_data: SiteData::from_config(&site.config),
        blog_prefix: prefix.clone(),
        about_source: site.config.about_source.clone(),
        snapshot: RwLock::new(Arc::new(snapshot)),
        fetcher: ContentFetcher::new(site.content_dir()),
        renderer: MarkdownRenderer::with_highlighter(highlighter),
        templates: TemplateRenderer::new()?,
        reload_tx: reload_tx.clone(),
        live_reload: watch,
    });

    let app = Router::new()
        .route("/", get(about_handler))
        .route(&prefix, get(listing_handler))
        .route(&format!("{}/", prefix), get(listing_handler))
        .route(&format!("{}/*path", prefix), get(article_handler))
        .route("/style.css", get(stylesheet_handler))
        .route("/__livereload", get(livereload_handler))
        .nest_service("/assets", ServeDir::new(site.assets_dir()))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    // Start file watcher if watch mode is enabled
    if watch {
        let site = site.clone();
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_and_reload(site, state, reload_tx).await {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Watch the registry, content and assets; reload the snapshot and notify
/// browsers on change. A registry that no longer loads keeps the previous
/// snapshot serving.
async fn watch_and_reload(
    site: Site,
    state: Arc<ServerState>,
    reload_tx: broadcast::Sender<()>,
) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Create debouncer to avoid multiple rapid reloads
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    let registry_path = site.registry_path();
    if registry_path.exists() {
        debouncer
            .watcher()
            .watch(&registry_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", registry_path);
    }

    let content_dir = site.content_dir();
    if content_dir.exists() {
        debouncer
            .watcher()
            .watch(&content_dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", content_dir);
    }

    let assets_dir = site.assets_dir();
    if assets_dir.exists() {
        debouncer
            .watcher()
            .watch(&assets_dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", assets_dir);
    }

    // Handle file change events
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                // Filter out irrelevant events (like .git, .DS_Store, etc.)
                let relevant_events: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let path_str = e.path.to_string_lossy();
                        !path_str.contains(".git")
                            && !path_str.contains(".DS_Store")
                            && !path_str.contains("node_modules")
                            && !path_str.ends_with('~')
                    })
                    .collect();

                if relevant_events.is_empty() {
                    continue;
                }

                println!();
                for event in &relevant_events {
                    println!("📝 File changed: {}", event.path.display());
                }

                println!("\n🔄 Reloading...");
                match SiteSnapshot::load(&site) {
                    Ok(snapshot) => {
                        println!("✅ Reloaded {} entries", snapshot.registry.len());
                        *state.snapshot.write().await = Arc::new(snapshot);
                        // Notify all connected clients to reload
                        let _ = reload_tx.send(());
                    }
                    Err(e) => {
                        println!("❌ Reload failed: {}", e);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// About page at the site root; sites without one go straight to the blogs
async fn about_handler(State(state): State<Arc<ServerState>>) -> Response {
    let Some(source) = state.about_source.clone() else {
        return Redirect::temporary(&state.blog_prefix).into_response();
    };
    match state.fetcher.fetch(&source).await {
        Ok(markdown) => {
            let rendered = state.renderer.render(&markdown);
            let mut context = templates::base_context(&state.site_data);
            context.insert("body", &rendered.html);
            state.render_page("about.html", &context)
        }
        Err(e) => {
            tracing::warn!("Failed to load about page from {}: {}", source, e);
            Redirect::temporary(&state.blog_prefix).into_response()
        }
    }
}

/// Blog listing, newest first
async fn listing_handler(State(state): State<Arc<ServerState>>) -> Response {
    let snapshot = state.snapshot.read().await.clone();
    let items = view::listing(&snapshot.registry);
    let mut context = templates::base_context(&state.site_data);
    context.insert("items", &items);
    state.render_page("index.html", &context)
}

/// One article: resolve the path, fetch its content, render it
async fn article_handler(
    State(state): State<Arc<ServerState>>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let snapshot = state.snapshot.read().await.clone();
    let request_path = uri.path();

    let entry = snapshot
        .routes
        .resolve(request_path)
        .and_then(|index| snapshot.registry.get(index));
    let Some(entry) = entry else {
        return state.not_found(request_path);
    };

    let mut view = DetailView::new(entry.clone());
    view.load(&state.fetcher, &state.renderer).await;

    let entry = view.entry();
    let mut context = templates::base_context(&state.site_data);
    context.insert("title", &entry.title);
    context.insert("date", &entry.date.format("%Y-%m-%d").to_string());
    context.insert("path", &entry.path);
    match view.failure() {
        Some(message) => {
            tracing::warn!("Failed to load {}: {}", entry.source, message);
            context.insert("error", message);
            context.insert("body", "");
        }
        None => {
            context.insert("error", &tera::Value::Null);
            context.insert("body", view.body_html());
        }
    }
    state.render_page("article.html", &context)
}

/// Embedded theme stylesheet
async fn stylesheet_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        templates::STYLESHEET,
    )
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            // Wait for reload signal
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            // Handle incoming messages (ping/pong)
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Anything outside the known routes is a 404 page
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    state.not_found(uri.path())
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replace("</body>", LIVE_RELOAD_SCRIPT)
    } else {
        // If no </body> tag, append to end
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_snapshot_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("blogs.yml"),
            "- title: Hello\n  date: \"2025-01-18\"\n  path: /blogs/hello\n  source: hello.md\n",
        )
        .unwrap();
        let site = Site::new(dir.path()).unwrap();

        let snapshot = SiteSnapshot::load(&site).unwrap();
        assert_eq!(snapshot.registry.len(), 1);
        assert_eq!(snapshot.routes.resolve("/blogs/hello"), Some(0));
    }

    #[test]
    fn test_snapshot_load_rejects_duplicate_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("blogs.yml"),
            "- title: A\n  date: \"2025-01-18\"\n  path: /blogs/same\n  source: a.md\n\
             - title: B\n  date: \"2025-01-19\"\n  path: /blogs/same\n  source: b.md\n",
        )
        .unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert!(SiteSnapshot::load(&site).is_err());
    }

    #[test]
    fn test_inject_live_reload() {
        let html = "<html><body><p>hi</p></body></html>";
        let injected = inject_live_reload(html);
        assert!(injected.contains("__livereload"));
        assert!(injected.ends_with("</html>"));

        let fragment = "<p>no body tag</p>";
        assert!(inject_live_reload(fragment).contains("__livereload"));
    }
}
