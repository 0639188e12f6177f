pub mod decode;
pub mod fetch;
pub mod svg;

pub use decode::PreparedImage;
pub use fetch::StoryAssets;
