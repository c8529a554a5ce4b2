use crate::models::{BackendKind, StreamDescriptor};

const ADAPTIVE_EXTENSIONS: &[&str] = &[".m3u8"];
const PROGRESSIVE_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".m4v"];
const EMBED_MARKERS: &[&str] = &["embed", "player"];

/// Decide which backend plays a resolved stream.
///
/// First match wins:
/// 1. manifest extension in the URL
/// 2. progressive file extension in the URL
/// 3. server hint naming an adaptive or progressive stream
/// 4. explicit embed flag/hint, or an embed marker in the URL
/// 5. anything else renders as an embed
///
/// Pure and total. Never returns [`BackendKind::Unknown`].
pub fn classify(descriptor: &StreamDescriptor) -> BackendKind {
    let url = descriptor.url.to_lowercase();

    if ADAPTIVE_EXTENSIONS.iter().any(|ext| url.contains(ext)) {
        return BackendKind::AdaptiveBitrate;
    }

    if PROGRESSIVE_EXTENSIONS.iter().any(|ext| url.contains(ext)) {
        return BackendKind::ProgressiveFile;
    }

    match descriptor.backend_kind_hint {
        Some(BackendKind::AdaptiveBitrate) => return BackendKind::AdaptiveBitrate,
        Some(BackendKind::ProgressiveFile) => return BackendKind::ProgressiveFile,
        _ => {}
    }

    if descriptor.is_delegated_embed
        || descriptor.backend_kind_hint == Some(BackendKind::DelegatedEmbed)
        || EMBED_MARKERS.iter().any(|marker| url.contains(marker))
    {
        return BackendKind::DelegatedEmbed;
    }

    BackendKind::Unknown.effective()
}
