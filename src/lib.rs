//! storyframe composes story-format images (720x1280) from a video record.
//!
//! The pipeline fetches the subject image and a generated avatar
//! concurrently, solves the cover-fit and foreground rectangles, then paints
//! in a fixed z-order: blurred background, sharp centered foreground,
//! vertical legibility gradient, circular avatar badge, channel label and
//! bottom-anchored wrapped title (each text pass drawn twice, shadow then
//! sharp). The finished canvas is encoded as PNG.
//!
//! Typical use:
//! - deserialize a [`CompositionConfig`] (camelCase JSON),
//! - build a [`StoryComposer`],
//! - call [`StoryComposer::compose`] and write [`RenderedImage::png`].
#![forbid(unsafe_code)]

pub mod assets;
pub mod compose;
pub mod config;
pub mod directory;
pub mod fonts;
mod foundation;
pub mod layout;
pub mod render;
pub mod text;

pub use crate::assets::fetch::{AssetFetcher, HttpFetcher};
pub use crate::compose::{ComposerOpts, StoryBackend, StoryComposer};
pub use crate::config::{CompositionConfig, Video};
pub use crate::directory::{VideoDirectory, YouTubeDirectory};
pub use crate::foundation::core::{Canvas, Rgba8};
pub use crate::foundation::error::{StoryError, StoryResult};
pub use crate::render::encode::RenderedImage;
