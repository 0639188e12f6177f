//! Asset byte sources and the concurrent subject/avatar load.

use std::io::Read;
use std::time::Duration;

use crate::assets::decode::{PreparedImage, decode_image};
use crate::assets::svg::{parse_svg, rasterize_svg};
use crate::fonts::FontLibrary;
use crate::foundation::error::{StoryError, StoryResult};

/// Avatar service endpoint the seed parameter is appended to.
pub const DEFAULT_AVATAR_TEMPLATE: &str = "https://api.dicebear.com/7.x/initials/svg";
/// Timeout applied to each individual fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);
/// Hard cap on a fetched asset body.
const MAX_ASSET_BYTES: usize = 32 * 1024 * 1024;

/// Byte source for story assets. `source` is an `http(s)` URL or a local
/// filesystem path.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, source: &str) -> StoryResult<Vec<u8>>;
}

/// Blocking HTTP fetcher. Non-URL sources fall through to the filesystem so
/// offline configs keep working.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> StoryResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoryError::asset_load(format!("build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl AssetFetcher for HttpFetcher {
    fn fetch(&self, source: &str) -> StoryResult<Vec<u8>> {
        if !is_remote(source) {
            return std::fs::read(source)
                .map_err(|e| StoryError::asset_load(format!("read '{source}': {e}")));
        }
        let resp = self
            .client
            .get(source)
            .send()
            .map_err(|e| StoryError::asset_load(format!("GET {source}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StoryError::asset_load(format!(
                "GET {source}: http status {status}"
            )));
        }
        if let Some(declared) = resp.content_length() {
            if declared > MAX_ASSET_BYTES as u64 {
                return Err(StoryError::asset_load(format!(
                    "asset at {source} declares {declared} bytes (cap {MAX_ASSET_BYTES})"
                )));
            }
        }
        read_capped(resp, MAX_ASSET_BYTES, source)
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Read at most `cap` bytes. The reader is cut off at `cap + 1` bytes, so an
/// oversized or unbounded body is rejected without buffering it whole.
fn read_capped(reader: impl Read, cap: usize, source: &str) -> StoryResult<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .take(cap as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| StoryError::asset_load(format!("read body of {source}: {e}")))?;
    if bytes.len() > cap {
        return Err(StoryError::asset_load(format!(
            "asset at {source} exceeds {cap} bytes"
        )));
    }
    Ok(bytes)
}

/// Build the avatar source from the service template and the user email as
/// seed. The seed lands percent-encoded in the query string. Non-HTTP
/// templates pass through untouched so local fixtures can stand in for the
/// service.
pub fn avatar_url(template: &str, seed: &str) -> StoryResult<String> {
    if !is_remote(template) {
        return Ok(template.to_string());
    }
    let url = url::Url::parse_with_params(template, [("seed", seed)])
        .map_err(|e| StoryError::asset_load(format!("avatar url from '{template}': {e}")))?;
    Ok(url.to_string())
}

/// Both inputs to the paint stage, decoded and premultiplied.
pub struct StoryAssets {
    pub subject: PreparedImage,
    pub avatar: PreparedImage,
}

/// Fetch and decode the subject and avatar in parallel. Either failure is
/// terminal; there is no placeholder fallback and no retry.
#[tracing::instrument(skip_all, fields(subject = subject_src, avatar = avatar_src))]
pub fn load_story_assets(
    fetcher: &dyn AssetFetcher,
    fonts: &FontLibrary,
    subject_src: &str,
    avatar_src: &str,
    avatar_px: u32,
) -> StoryResult<StoryAssets> {
    let (subject, avatar) = rayon::join(
        || load_subject(fetcher, subject_src),
        || load_avatar(fetcher, fonts, avatar_src, avatar_px),
    );
    Ok(StoryAssets {
        subject: subject?,
        avatar: avatar?,
    })
}

fn load_subject(fetcher: &dyn AssetFetcher, source: &str) -> StoryResult<PreparedImage> {
    let bytes = fetcher.fetch(source)?;
    tracing::debug!(len = bytes.len(), "subject bytes fetched");
    decode_image(&bytes)
}

fn load_avatar(
    fetcher: &dyn AssetFetcher,
    fonts: &FontLibrary,
    source: &str,
    avatar_px: u32,
) -> StoryResult<PreparedImage> {
    let bytes = fetcher.fetch(source)?;
    tracing::debug!(len = bytes.len(), "avatar bytes fetched");
    if looks_like_svg(&bytes) {
        let tree = parse_svg(&bytes, fonts)?;
        return rasterize_svg(&tree, avatar_px, avatar_px);
    }
    decode_image(&bytes)
}

/// Raster containers never open with markup; a leading `<` after optional
/// whitespace means SVG.
fn looks_like_svg(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
        == Some(b'<')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_url_percent_encodes_the_seed() {
        let url = avatar_url(DEFAULT_AVATAR_TEMPLATE, "user@example.com").unwrap();
        assert_eq!(
            url,
            "https://api.dicebear.com/7.x/initials/svg?seed=user%40example.com"
        );
    }

    #[test]
    fn avatar_url_passes_local_templates_through() {
        let url = avatar_url("fixtures/avatar.svg", "user@example.com").unwrap();
        assert_eq!(url, "fixtures/avatar.svg");
    }

    #[test]
    fn remote_detection() {
        assert!(is_remote("https://example.com/a.png"));
        assert!(is_remote("http://example.com/a.png"));
        assert!(!is_remote("/var/data/a.png"));
        assert!(!is_remote("relative/a.png"));
    }

    #[test]
    fn svg_sniffing() {
        assert!(looks_like_svg(b"<svg/>"));
        assert!(looks_like_svg(b"  \n\t <?xml version=\"1.0\"?>"));
        assert!(!looks_like_svg(&[0x89, b'P', b'N', b'G']));
        assert!(!looks_like_svg(b""));
    }

    #[test]
    fn read_capped_passes_bodies_at_the_cap() {
        let body = vec![7u8; 8];
        assert_eq!(read_capped(&body[..], 8, "mem://ok").unwrap(), body);
    }

    #[test]
    fn read_capped_rejects_an_unbounded_stream() {
        let err = read_capped(std::io::repeat(0), 8, "mem://endless").unwrap_err();
        assert!(matches!(err, StoryError::AssetLoad(_)));
    }

    #[test]
    fn missing_local_file_maps_to_asset_load() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher
            .fetch("/definitely/not/here/asset.png")
            .unwrap_err();
        assert!(matches!(err, StoryError::AssetLoad(_)));
    }
}
