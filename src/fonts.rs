//! Font resolution shared by the text passes and SVG avatar rasterization.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use usvg::fontdb;

use crate::foundation::error::{StoryError, StoryResult};

/// Face bytes plus the collection index the glyph painter needs.
#[derive(Clone)]
pub struct ResolvedFont {
    pub bytes: Arc<Vec<u8>>,
    pub index: u32,
}

/// System font database, optionally extended with one explicit font file
/// that takes priority for label and title drawing. The same database backs
/// `<text>` resolution inside SVG avatars.
pub struct FontLibrary {
    db: Arc<fontdb::Database>,
    extra_font: Option<PathBuf>,
}

impl FontLibrary {
    pub fn new(extra_font: Option<&Path>) -> StoryResult<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(path) = extra_font {
            db.load_font_file(path).map_err(|e| {
                StoryError::render_context(format!(
                    "load font file '{}': {e}",
                    path.display()
                ))
            })?;
        }
        Ok(Self {
            db: Arc::new(db),
            extra_font: extra_font.map(Path::to_path_buf),
        })
    }

    pub(crate) fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    /// The face used for the channel label and title: the explicit font file
    /// when one was given, else a bold sans-serif system face, else any face
    /// at all. Errors only when the database is empty.
    pub fn resolve_bold(&self) -> StoryResult<ResolvedFont> {
        let id = self
            .extra_face()
            .or_else(|| self.query_bold_sans())
            .or_else(|| self.db.faces().next().map(|f| f.id))
            .ok_or_else(|| {
                StoryError::render_context("no usable font face (font database is empty)")
            })?;
        let (bytes, index) = self
            .db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| StoryError::render_context("font face data unavailable"))?;
        Ok(ResolvedFont {
            bytes: Arc::new(bytes),
            index,
        })
    }

    fn extra_face(&self) -> Option<fontdb::ID> {
        let path = self.extra_font.as_deref()?;
        self.db
            .faces()
            .find(|f| match &f.source {
                fontdb::Source::File(p) => p.as_path() == path,
                fontdb::Source::SharedFile(p, _) => p.as_path() == path,
                fontdb::Source::Binary(_) => false,
            })
            .map(|f| f.id)
    }

    fn query_bold_sans(&self) -> Option<fontdb::ID> {
        self.db.query(&fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            weight: fontdb::Weight::BOLD,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        })
    }
}
