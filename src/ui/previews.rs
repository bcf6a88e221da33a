/// Decoded image handles shared by the views
///
/// iced caches decoded pixels per handle id, and every `Handle::from_bytes`
/// call mints a new id. Handles are built once, when images arrive, and
/// cloned into widgets on every redraw.
use std::collections::HashMap;

use iced::widget::image::Handle;
use tracing::warn;

use crate::state::data::{ImageFileError, SavedProject, SourceImage};
use crate::state::session::Session;

#[derive(Default)]
pub struct Previews {
    /// The session's uploaded portrait
    source: Option<Handle>,
    /// Session results and library covers, by image id
    images: HashMap<String, Handle>,
}

impl Previews {
    pub fn source(&self) -> Option<&Handle> {
        self.source.as_ref()
    }

    pub fn image(&self, key: &str) -> Option<&Handle> {
        self.images.get(key)
    }

    /// Rebuild the handle for the uploaded portrait
    pub fn set_source(&mut self, source: Option<&SourceImage>) {
        self.source = source.and_then(|image| decode("source", image.to_bytes()));
    }

    /// Make sure every visible result and library cover has a handle.
    ///
    /// Existing handles are reused; handles nothing shows any more are
    /// dropped.
    pub fn refresh(&mut self, session: &Session, projects: &[SavedProject]) {
        let mut previous = std::mem::take(&mut self.images);

        for image in session.results() {
            self.insert(&mut previous, image.id.clone(), || image.to_bytes());
        }

        for project in projects {
            self.insert(&mut previous, cover_key(project), || match project.cover() {
                Some(image) => image.to_bytes(),
                None => project.source_image.to_bytes(),
            });
        }
    }

    fn insert(
        &mut self,
        previous: &mut HashMap<String, Handle>,
        key: String,
        bytes: impl FnOnce() -> Result<Vec<u8>, ImageFileError>,
    ) {
        if self.images.contains_key(&key) {
            return;
        }

        let handle = match previous.remove(&key) {
            Some(handle) => Some(handle),
            None => decode(&key, bytes()),
        };

        if let Some(handle) = handle {
            self.images.insert(key, handle);
        }
    }
}

/// Cache key of the image shown on a project's library card
pub fn cover_key(project: &SavedProject) -> String {
    match project.cover() {
        Some(image) => image.id.clone(),
        None => format!("project-{}", project.id),
    }
}

fn decode(key: &str, bytes: Result<Vec<u8>, ImageFileError>) -> Option<Handle> {
    match bytes {
        Ok(bytes) => Some(Handle::from_bytes(bytes)),
        Err(e) => {
            warn!(image = %key, error = %e, "Could not decode image payload");
            None
        }
    }
}
