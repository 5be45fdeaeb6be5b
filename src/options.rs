//! Writer- und Reader-Konfiguration.

/// Writer-Konfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Text direkt vor `end_element` als kombinierten Record (`tag | 1`) schreiben.
    pub combine_text_end_element: bool,
    /// UTF-16 Text-Records verwenden, wenn sie strikt kuerzer sind als UTF-8.
    pub prefer_utf16_text: bool,
    /// Ab dieser Puffergroesse (Bytes) wird in die Senke geschrieben.
    pub flush_threshold: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            combine_text_end_element: true,
            prefer_utf16_text: true,
            flush_threshold: 64 * 1024,
        }
    }
}

impl WriterOptions {
    /// Jeder Record einzeln, kein UTF-16 (einfachster Stream fuer Diagnose).
    pub fn plain() -> Self {
        Self {
            combine_text_end_element: false,
            prefer_utf16_text: false,
            ..Self::default()
        }
    }

    pub fn with_combine_text_end_element(mut self, enabled: bool) -> Self {
        self.combine_text_end_element = enabled;
        self
    }

    pub fn with_prefer_utf16_text(mut self, enabled: bool) -> Self {
        self.prefer_utf16_text = enabled;
        self
    }

    pub fn with_flush_threshold(mut self, bytes: usize) -> Self {
        self.flush_threshold = bytes;
        self
    }
}

/// Reader-Limits.
///
/// Die Standardwerte entsprechen den ueblichen Quotas eines Messaging-Stacks;
/// [`ReaderQuotas::unlimited`] schaltet alle Pruefungen ab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderQuotas {
    /// Maximale Element-Verschachtelung.
    pub max_depth: usize,
    /// Maximale Laenge eines Strings in Bytes.
    pub max_string_content_length: usize,
    /// Maximale Anzahl Elemente eines Array-Records.
    pub max_array_length: usize,
}

impl Default for ReaderQuotas {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_string_content_length: 8192,
            max_array_length: 16384,
        }
    }
}

impl ReaderQuotas {
    /// Keine Limits.
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
            max_string_content_length: usize::MAX,
            max_array_length: usize::MAX,
        }
    }
}
