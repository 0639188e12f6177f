pub type StoryResult<T> = Result<T, StoryError>;

#[derive(thiserror::Error, Debug)]
pub enum StoryError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("asset load error: {0}")]
    AssetLoad(String),

    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    #[error("render context error: {0}")]
    RenderContext(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    pub fn invalid_asset(msg: impl Into<String>) -> Self {
        Self::InvalidAsset(msg.into())
    }

    pub fn render_context(msg: impl Into<String>) -> Self {
        Self::RenderContext(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            StoryError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            StoryError::asset_load("x")
                .to_string()
                .contains("asset load error:")
        );
        assert!(
            StoryError::invalid_asset("x")
                .to_string()
                .contains("invalid asset:")
        );
        assert!(
            StoryError::render_context("x")
                .to_string()
                .contains("render context error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = StoryError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
