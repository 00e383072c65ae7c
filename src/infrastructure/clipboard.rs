use crate::domain::ClipboardError;
use tracing::warn;

/// Host text clipboard.
pub trait ClipboardPort {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
    fn read_text(&mut self) -> Result<String, ClipboardError>;
}

/// System clipboard backed by `arboard`. The handle is opened lazily and
/// reopened after a failure, since some platforms drop it when the owning
/// window server restarts.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the clipboard now, so a missing display is reported up front.
    pub fn open() -> Result<Self, ClipboardError> {
        let mut clipboard = Self::new();
        clipboard.handle()?;
        Ok(clipboard)
    }

    fn handle(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        if self.inner.is_none() {
            let clipboard = arboard::Clipboard::new()
                .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            self.inner = Some(clipboard);
        }
        self.inner
            .as_mut()
            .ok_or_else(|| ClipboardError::Unavailable("clipboard not initialised".to_string()))
    }
}

impl ClipboardPort for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let result = self.handle()?.set_text(text.to_string());
        result.map_err(|e| {
            warn!(error = %e, "clipboard write failed");
            self.inner = None;
            ClipboardError::Access(e.to_string())
        })
    }

    fn read_text(&mut self) -> Result<String, ClipboardError> {
        let result = self.handle()?.get_text();
        match result {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Err(ClipboardError::Empty),
            Err(e) => {
                warn!(error = %e, "clipboard read failed");
                self.inner = None;
                Err(ClipboardError::Access(e.to_string()))
            }
        }
    }
}

/// In-process clipboard, used when no display is available and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        Self { text: Some(text.to_string()) }
    }

    pub fn contents(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl ClipboardPort for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.text = Some(text.to_string());
        Ok(())
    }

    fn read_text(&mut self) -> Result<String, ClipboardError> {
        self.text.clone().ok_or(ClipboardError::Empty)
    }
}
