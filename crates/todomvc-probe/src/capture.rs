//! Report attachments and best-effort capture.
//!
//! Capture is a side channel: a failed screenshot, HTML dump or sink write is
//! logged with `warn!` and dropped. Nothing in this module changes the result
//! of the operation it decorates.

use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// MIME type of screenshots
pub const MIME_PNG: &str = "image/png";
/// MIME type of page dumps
pub const MIME_HTML: &str = "text/html";
/// MIME type of logs and notes
pub const MIME_TEXT: &str = "text/plain";

/// One named report attachment
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown in the report (e.g. `Landscape.png`)
    pub name: String,
    /// MIME type
    pub mime_type: String,
    /// Raw content
    pub body: Vec<u8>,
}

impl Attachment {
    /// Create an attachment
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            body,
        }
    }

    /// PNG image named `{name}.png`
    #[must_use]
    pub fn png(name: &str, body: Vec<u8>) -> Self {
        Self::new(format!("{name}.png"), MIME_PNG, body)
    }

    /// HTML document named `{name}.html`
    #[must_use]
    pub fn html(name: &str, html: String) -> Self {
        Self::new(format!("{name}.html"), MIME_HTML, html.into_bytes())
    }

    /// Plain text named `{name}.txt`
    #[must_use]
    pub fn text(name: &str, text: String) -> Self {
        Self::new(format!("{name}.txt"), MIME_TEXT, text.into_bytes())
    }

    /// Body as UTF-8, if it is
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.body.len())
            .finish()
    }
}

/// Destination for report attachments
pub trait ArtifactSink: Send + Sync + fmt::Debug {
    /// Store one attachment
    fn attach(&self, attachment: Attachment) -> ProbeResult<()>;
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ArtifactSink for NullSink {
    fn attach(&self, _attachment: Attachment) -> ProbeResult<()> {
        Ok(())
    }
}

/// Keeps attachments in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    attachments: Mutex<Vec<Attachment>>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored attachments in arrival order
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// Names of stored attachments in arrival order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.attachments().into_iter().map(|a| a.name).collect()
    }

    /// First attachment with this name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Attachment> {
        self.attachments().into_iter().find(|a| a.name == name)
    }

    /// Drop everything stored so far
    pub fn clear(&self) {
        if let Ok(mut list) = self.attachments.lock() {
            list.clear();
        }
    }
}

impl ArtifactSink for MemorySink {
    fn attach(&self, attachment: Attachment) -> ProbeResult<()> {
        let mut list = self.attachments.lock().map_err(|e| ProbeError::ArtifactError {
            name: attachment.name.clone(),
            message: e.to_string(),
        })?;
        list.push(attachment);
        Ok(())
    }
}

/// Writes each attachment as a file in a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Sink writing into `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for an attachment name. Path separators are replaced and an
    /// existing file gets a numeric suffix instead of being overwritten.
    fn target(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '\0' => '_',
                c => c,
            })
            .collect();
        let first = self.dir.join(&safe);
        if !first.exists() {
            return first;
        }
        let (stem, ext) = match safe.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
            _ => (safe.clone(), String::new()),
        };
        (1..)
            .map(|n| self.dir.join(format!("{stem}-{n}{ext}")))
            .find(|p| !p.exists())
            .unwrap_or(first)
    }
}

impl ArtifactSink for DirectorySink {
    fn attach(&self, attachment: Attachment) -> ProbeResult<()> {
        let err = |e: std::io::Error| ProbeError::ArtifactError {
            name: attachment.name.clone(),
            message: e.to_string(),
        };
        std::fs::create_dir_all(&self.dir).map_err(err)?;
        let path = self.target(&attachment.name);
        std::fs::write(&path, &attachment.body).map_err(err)?;
        debug!(path = %path.display(), "attachment written");
        Ok(())
    }
}

impl Page {
    /// Store an attachment, logging instead of failing
    pub fn attach(&self, attachment: Attachment) {
        let name = attachment.name.clone();
        if let Err(e) = self.sink().attach(attachment) {
            warn!(%name, error = %e, "failed to store attachment");
        }
    }

    /// Full-page screenshot as `{name}.png`
    pub async fn attach_screenshot(&self, name: &str) {
        match self.screenshot(true).await {
            Ok(png) => self.attach(Attachment::png(name, png)),
            Err(e) => warn!(name, error = %e, "failed to take screenshot"),
        }
    }

    /// Page HTML as `{name}.html`
    pub async fn attach_html(&self, name: &str) {
        match self.content().await {
            Ok(html) => self.attach(Attachment::html(name, html)),
            Err(e) => warn!(name, error = %e, "failed to capture page HTML"),
        }
    }

    /// Console output as `{name}.txt`, one message per line
    pub async fn attach_console_logs(&self, name: &str) {
        match self.console_messages().await {
            Ok(messages) => {
                let lines: Vec<String> = messages.iter().map(ToString::to_string).collect();
                self.attach(Attachment::text(name, lines.join("\n")));
            }
            Err(e) => warn!(name, error = %e, "failed to capture console logs"),
        }
    }

    /// Free text as `{name}.txt`
    pub fn attach_text(&self, name: &str, text: impl Into<String>) {
        self.attach(Attachment::text(name, text.into()));
    }

    /// Run `op` and, only if it succeeds and a name is given, attach a
    /// screenshot. The result of `op` is returned as is.
    pub async fn with_screenshot<T, Fut>(&self, name: Option<&str>, op: Fut) -> ProbeResult<T>
    where
        Fut: Future<Output = ProbeResult<T>>,
    {
        let value = op.await?;
        if let Some(name) = name {
            self.attach_screenshot(name).await;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct BrokenSink;

    impl ArtifactSink for BrokenSink {
        fn attach(&self, attachment: Attachment) -> ProbeResult<()> {
            Err(ProbeError::ArtifactError {
                name: attachment.name,
                message: "disk full".to_string(),
            })
        }
    }

    mod attachment_tests {
        use super::*;

        #[test]
        fn test_constructors_add_extension_and_mime() {
            let png = Attachment::png("Landscape", vec![1, 2]);
            assert_eq!(png.name, "Landscape.png");
            assert_eq!(png.mime_type, MIME_PNG);

            let html = Attachment::html("page-html", "<html></html>".to_string());
            assert_eq!(html.name, "page-html.html");
            assert_eq!(html.body_str(), Some("<html></html>"));

            let text = Attachment::text("console-logs", String::new());
            assert_eq!(text.mime_type, MIME_TEXT);
        }

        #[test]
        fn test_debug_hides_body() {
            let a = Attachment::png("x", vec![0; 1024]);
            let debug = format!("{a:?}");
            assert!(debug.contains("len: 1024"));
        }
    }

    mod sink_tests {
        use super::*;

        #[test]
        fn test_memory_sink_keeps_order() {
            let sink = MemorySink::new();
            sink.attach(Attachment::text("a", "1".into())).unwrap();
            sink.attach(Attachment::text("b", "2".into())).unwrap();
            assert_eq!(sink.names(), vec!["a.txt", "b.txt"]);
            assert_eq!(sink.get("b.txt").unwrap().body_str(), Some("2"));
            sink.clear();
            assert!(sink.attachments().is_empty());
        }

        #[test]
        fn test_directory_sink_creates_dir_and_never_overwrites() {
            let tmp = tempfile::tempdir().unwrap();
            let sink = DirectorySink::new(tmp.path().join("artifacts"));
            sink.attach(Attachment::text("note", "first".into())).unwrap();
            sink.attach(Attachment::text("note", "second".into())).unwrap();

            let first = std::fs::read_to_string(sink.dir().join("note.txt")).unwrap();
            let second = std::fs::read_to_string(sink.dir().join("note-1.txt")).unwrap();
            assert_eq!(first, "first");
            assert_eq!(second, "second");
        }

        #[test]
        fn test_directory_sink_sanitizes_names() {
            let tmp = tempfile::tempdir().unwrap();
            let sink = DirectorySink::new(tmp.path());
            sink.attach(Attachment::text("a/b", "x".into())).unwrap();
            assert!(tmp.path().join("a_b.txt").exists());
        }

        #[test]
        fn test_broken_sink_reports_error() {
            let err = BrokenSink
                .attach(Attachment::text("x", String::new()))
                .unwrap_err();
            assert!(err.to_string().contains("disk full"));
        }
    }

    mod page_capture_tests {
        use super::*;
        use crate::config::Timeouts;
        use crate::driver::{ConsoleLevel, ConsoleMessage};
        use crate::sim::SimDriver;
        use std::sync::Arc;

        fn page_with(driver: &Arc<SimDriver>, sink: Arc<dyn ArtifactSink>) -> Page {
            Page::new(driver.clone(), sink, Timeouts::fast())
        }

        #[tokio::test]
        async fn test_attach_helpers_store_named_files() {
            let driver = Arc::new(SimDriver::new());
            let sink = Arc::new(MemorySink::new());
            let page = page_with(&driver, sink.clone());
            driver.push_console(ConsoleMessage::new(ConsoleLevel::Warn, "slow"));

            page.attach_screenshot("shot").await;
            page.attach_html("dom").await;
            page.attach_console_logs("logs").await;
            page.attach_text("note", "hello");

            assert_eq!(sink.names(), vec!["shot.png", "dom.html", "logs.txt", "note.txt"]);
            assert!(sink.get("dom.html").unwrap().body_str().unwrap().contains("todoapp"));
            assert_eq!(sink.get("logs.txt").unwrap().body_str(), Some("[warn] slow"));
        }

        #[tokio::test]
        async fn test_failed_screenshot_is_swallowed() {
            let driver = Arc::new(SimDriver::new());
            driver.fail_screenshots(true);
            let sink = Arc::new(MemorySink::new());
            let page = page_with(&driver, sink.clone());

            page.attach_screenshot("shot").await;
            assert!(sink.names().is_empty());
        }

        #[tokio::test]
        async fn test_broken_sink_is_swallowed() {
            let driver = Arc::new(SimDriver::new());
            let page = page_with(&driver, Arc::new(BrokenSink));
            page.attach_screenshot("shot").await;
            page.attach_text("note", "x");
        }

        #[tokio::test]
        async fn test_with_screenshot_keeps_primary_result() {
            let driver = Arc::new(SimDriver::new());
            driver.fail_screenshots(true);
            let sink = Arc::new(MemorySink::new());
            let page = page_with(&driver, sink.clone());

            let ok = page.with_screenshot(Some("after"), async { Ok(7) }).await;
            assert_eq!(ok.unwrap(), 7);

            driver.fail_screenshots(false);
            let err = page
                .with_screenshot(Some("after"), async {
                    Err::<(), _>(ProbeError::AssertionFailed {
                        message: "nope".into(),
                    })
                })
                .await
                .unwrap_err();
            assert!(err.is_assertion());
            assert!(sink.names().is_empty());

            page.with_screenshot(Some("after"), async { Ok(()) })
                .await
                .unwrap();
            assert_eq!(sink.names(), vec!["after.png"]);

            page.with_screenshot(None, async { Ok(()) }).await.unwrap();
            assert_eq!(sink.names().len(), 1);
        }
    }
}
