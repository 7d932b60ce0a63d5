//! Shareable note links.
//!
//! A link is the application origin followed by `/#note/{id}`. Decoding is
//! strict: only a positive decimal id after the prefix is accepted.

use crate::model::note::NoteId;
use url::{Origin, Url};

/// Fragment prefix preceding the decimal note id.
pub const NOTE_FRAGMENT_PREFIX: &str = "#note/";

/// Origin the desktop shell loads the UI from.
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";

/// Encodes and decodes note links for one application origin.
#[derive(Debug, Clone)]
pub struct DeepLinkCodec {
    origin: Origin,
    origin_text: String,
}

impl DeepLinkCodec {
    /// Builds a codec for `origin` (any absolute URL; only its origin is kept).
    pub fn new(origin: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(origin)?;
        let origin = parsed.origin();
        let origin_text = origin.ascii_serialization();
        Ok(Self {
            origin,
            origin_text,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin_text
    }

    /// Absolute link to `id`, e.g. `http://localhost:3000/#note/42`.
    pub fn encode(&self, id: NoteId) -> String {
        format!("{}/{}", self.origin_text, Self::fragment(id))
    }

    /// Fragment for `id`, e.g. `#note/42`.
    pub fn fragment(id: NoteId) -> String {
        format!("{NOTE_FRAGMENT_PREFIX}{id}")
    }

    /// Parses `#note/{id}`; anything but a positive decimal id is `None`.
    pub fn decode_fragment(fragment: &str) -> Option<NoteId> {
        let digits = fragment.strip_prefix(NOTE_FRAGMENT_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<NoteId>().ok().filter(|id| *id > 0)
    }

    /// Resolves a link clicked inside a note.
    ///
    /// Absolute URLs must share this codec's origin. Strings that are not
    /// absolute URLs are decoded as bare fragments.
    pub fn decode_url(&self, raw: &str) -> Option<NoteId> {
        match Url::parse(raw) {
            Ok(parsed) => {
                if parsed.origin() != self.origin {
                    return None;
                }
                let fragment = parsed.fragment()?;
                Self::decode_fragment(&format!("#{fragment}"))
            }
            Err(_) => Self::decode_fragment(raw),
        }
    }
}

impl Default for DeepLinkCodec {
    fn default() -> Self {
        let origin = Url::parse(DEFAULT_APP_ORIGIN)
            .map(|url| url.origin())
            .unwrap_or_else(|_| Origin::new_opaque());
        let origin_text = origin.ascii_serialization();
        Self {
            origin,
            origin_text,
        }
    }
}
