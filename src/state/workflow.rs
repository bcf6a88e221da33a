use std::sync::Arc;

use tracing::{debug, info, warn};

use super::credential::{CredentialError, CredentialHolder};
use super::data::{GeneratedImage, ImageFileError, SavedProject, SourceImage};
use super::features::FeatureAxis;
use super::library::ProjectLibrary;
use super::session::{Event, Session, Step};
use super::storage::{Storage, StorageError};
use crate::gateway::{random_seed, GatewayError, GenerationGateway, GenerationRequest};

/// How a generation answer was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Appended to the results and autosaved as a new project
    Saved,
    /// Appended to the results, but the autosave write failed
    Unsaved,
    /// The gateway reported an error
    Failed,
    /// The answer belonged to a generation that is no longer in flight
    Discarded,
}

/// The workflow controller.
///
/// Owns the one in-progress session, the project library, the API key
/// and the storage they persist to. The UI drives it through these
/// methods and renders `session()`; nothing else mutates the state.
pub struct Workflow {
    storage: Box<dyn Storage>,
    gateway: Arc<dyn GenerationGateway>,
    credential: CredentialHolder,
    library: ProjectLibrary,
    session: Session,
}

impl Workflow {
    /// Load the credential and library from `storage` and start a fresh session
    pub fn new(storage: Box<dyn Storage>, gateway: Arc<dyn GenerationGateway>) -> Self {
        let credential = CredentialHolder::load(storage.as_ref());
        let library = ProjectLibrary::load(storage.as_ref());

        Self {
            storage,
            gateway,
            credential,
            library,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn library(&self) -> &ProjectLibrary {
        &self.library
    }

    pub fn gateway(&self) -> Arc<dyn GenerationGateway> {
        Arc::clone(&self.gateway)
    }

    /// The workflow is reachable only once an API key is committed
    pub fn is_unlocked(&self) -> bool {
        self.credential.is_present()
    }

    pub fn commit_credential(&mut self, value: &str) -> Result<(), CredentialError> {
        self.credential.commit(self.storage.as_ref(), value)
    }

    fn apply(&mut self, event: Event) {
        self.session = std::mem::take(&mut self.session).apply(event);
    }

    // ========== Upload & Features ==========

    pub fn capture_image(&mut self, image: SourceImage) {
        self.apply(Event::ImageCaptured(image));
    }

    pub fn capture_failed(&mut self, error: ImageFileError) {
        warn!(error = %error, "Could not capture image");
        self.apply(Event::ErrorReported(error.to_string()));
    }

    pub fn edit_feature(&mut self, axis: FeatureAxis, value: String) {
        self.apply(Event::FeatureEdited(axis, value));
    }

    // ========== Generation ==========

    /// Start a generation (first attempt, regenerate and retry alike).
    ///
    /// Returns the request to hand to the gateway, or `None` when the
    /// start is refused: no API key, no source image, or a generation
    /// already in flight.
    pub fn begin_generation(&mut self) -> Option<GenerationRequest> {
        let credential = self.credential.get()?.to_string();
        if !self.session.can_generate() {
            return None;
        }

        self.apply(Event::GenerationStarted);

        let ticket = self.session.in_flight()?;
        let source = self.session.source_image()?.clone();
        let seed = random_seed();

        info!(ticket, seed, "Generation started");

        Some(GenerationRequest {
            ticket,
            credential,
            source,
            features: self.session.features().clone(),
            seed,
        })
    }

    /// Apply the gateway's answer for `ticket`.
    ///
    /// A success is appended to the results and saved as a new project.
    /// Answers for a ticket that is no longer in flight are dropped.
    pub fn finish_generation(
        &mut self,
        ticket: u64,
        result: Result<GeneratedImage, GatewayError>,
    ) -> GenerationOutcome {
        if self.session.in_flight() != Some(ticket) {
            debug!(ticket, "Discarding stale generation result");
            return GenerationOutcome::Discarded;
        }

        match result {
            Ok(image) => {
                info!(ticket, image_id = %image.id, "Generation succeeded");
                self.apply(Event::GenerationSucceeded {
                    ticket,
                    image: image.clone(),
                });
                if self.autosave(image) {
                    GenerationOutcome::Saved
                } else {
                    GenerationOutcome::Unsaved
                }
            }
            Err(e) => {
                warn!(ticket, error = %e, "Generation failed");
                self.apply(Event::GenerationFailed {
                    ticket,
                    message: e.to_string(),
                });
                GenerationOutcome::Failed
            }
        }
    }

    /// Run one full generation against the gateway.
    ///
    /// Returns `None` when the start was refused.
    pub async fn generate(&mut self) -> Option<GenerationOutcome> {
        let request = self.begin_generation()?;

        let gateway = self.gateway();
        let result = gateway.generate(&request).await;
        Some(self.finish_generation(request.ticket, result))
    }

    /// Save `image` as its own project; `false` if nothing was written
    fn autosave(&mut self, image: GeneratedImage) -> bool {
        let Some(project) = self.snapshot(vec![image]) else {
            return false;
        };

        match self.library.save(self.storage.as_ref(), project) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Autosave failed");
                self.apply(Event::ErrorReported(format!("Could not save project: {}", e)));
                false
            }
        }
    }

    /// A new project built from the current source and configuration
    fn snapshot(&self, images: Vec<GeneratedImage>) -> Option<SavedProject> {
        let source = self.session.source_image()?.clone();
        let millis = self
            .library
            .free_id_millis(chrono::Utc::now().timestamp_millis());

        Some(SavedProject::new(
            millis.to_string(),
            millis,
            source,
            self.session.features().clone(),
            images,
        ))
    }

    // ========== Results & Editor ==========

    pub fn select_image(&mut self, id: String) {
        self.apply(Event::ImageSelected(id));
    }

    pub fn close_editor(&mut self) {
        self.apply(Event::EditorClosed);
    }

    // ========== Library ==========

    /// Save the current session as a new project.
    ///
    /// Always creates a separate entry, even if the same output was
    /// autosaved already. Returns the new id, or `None` when there is
    /// nothing to save.
    pub fn save_to_library(&mut self) -> Result<Option<String>, StorageError> {
        if !self.session.can_save() {
            return Ok(None);
        }
        let Some(project) = self.snapshot(self.session.results().to_vec()) else {
            return Ok(None);
        };

        let id = project.id.clone();
        self.library.save(self.storage.as_ref(), project)?;
        Ok(Some(id))
    }

    /// Delete a project; unknown ids are a no-op
    pub fn delete_project(&mut self, id: &str) -> Result<bool, StorageError> {
        self.library.delete(self.storage.as_ref(), id)
    }

    pub fn open_library(&mut self) {
        self.apply(Event::LibraryOpened);
    }

    pub fn close_library(&mut self) {
        self.apply(Event::LibraryClosed);
    }

    /// Load a saved project into the session.
    ///
    /// Only accepted while the library is open. Returns `false` when the
    /// load is refused or the id is unknown.
    pub fn load_project(&mut self, id: &str) -> bool {
        if self.session.step() != Step::Library {
            debug!(project_id = %id, "Ignoring load outside the library");
            return false;
        }
        let Some(project) = self.library.get(id).cloned() else {
            return false;
        };

        info!(project_id = %id, "Project loaded");
        self.apply(Event::ProjectLoaded(project));
        true
    }

    pub fn new_project(&mut self) {
        self.apply(Event::NewProject);
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("session", &self.session)
            .field("projects", &self.library.len())
            .field("unlocked", &self.is_unlocked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::GENERIC_FAILURE;
    use crate::state::storage::{MemoryStorage, LIBRARY_KEY};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Gateway that replays scripted outcomes and records requests
    #[derive(Default)]
    struct ScriptedGateway {
        outcomes: Mutex<VecDeque<Result<GeneratedImage, GatewayError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGateway {
        fn with(outcomes: Vec<Result<GeneratedImage, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationGateway for ScriptedGateway {
        async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GatewayError> {
            self.requests.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GatewayError::EmptyResponse))
        }
    }

    /// Accepts every write except the library document
    #[derive(Default)]
    struct LibraryWritesFail {
        inner: MemoryStorage,
    }

    impl Storage for LibraryWritesFail {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == LIBRARY_KEY {
                return Err(StorageError::Poisoned);
            }
            self.inner.set(key, value)
        }
    }

    fn source() -> SourceImage {
        SourceImage {
            base64: "cG9ydHJhaXQ=".to_string(),
            mime_type: "image/jpeg".to_string(),
        }
    }

    fn image(id: &str) -> GeneratedImage {
        GeneratedImage {
            id: id.to_string(),
            base64: "aGVhZHNob3Q=".to_string(),
            mime_type: "image/png".to_string(),
            prompt_used: format!("prompt for {}", id),
        }
    }

    fn unlocked(gateway: Arc<ScriptedGateway>) -> Workflow {
        let mut workflow = Workflow::new(Box::new(MemoryStorage::new()), gateway);
        workflow.commit_credential("test-key").unwrap();
        workflow
    }

    fn ready(gateway: Arc<ScriptedGateway>) -> Workflow {
        let mut workflow = unlocked(gateway);
        workflow.capture_image(source());
        workflow
    }

    #[tokio::test]
    async fn test_success_appends_and_autosaves_once() {
        let gateway = ScriptedGateway::with(vec![Ok(image("a"))]);
        let mut workflow = ready(gateway.clone());
        workflow.edit_feature(FeatureAxis::Attire, "Linen blazer".to_string());

        assert_eq!(workflow.generate().await, Some(GenerationOutcome::Saved));

        let session = workflow.session();
        assert_eq!(session.step(), Step::Generating);
        assert_eq!(session.results(), &[image("a")]);
        assert!(!session.is_generating());

        assert_eq!(workflow.library().len(), 1);
        let saved = &workflow.library().list()[0];
        assert_eq!(saved.source_image, source());
        assert_eq!(saved.features.attire, "Linen blazer");
        assert_eq!(saved.generated_images, vec![image("a")]);
        assert_eq!(saved.id, saved.timestamp.to_string());

        let request = &gateway.requests()[0];
        assert_eq!(request.credential, "test-key");
        assert!(request.seed < crate::gateway::SEED_RANGE);
    }

    #[tokio::test]
    async fn test_failure_never_touches_library_and_retry_recovers() {
        let gateway = ScriptedGateway::with(vec![
            Err(GatewayError::Api {
                status: 403,
                message: "API key not valid.".to_string(),
            }),
            Ok(image("b")),
        ]);
        let mut workflow = ready(gateway.clone());

        assert_eq!(workflow.generate().await, Some(GenerationOutcome::Failed));

        assert!(workflow.library().is_empty());
        assert_eq!(workflow.storage.get(LIBRARY_KEY).unwrap(), None);
        assert_eq!(workflow.session().step(), Step::Generating);
        let message = workflow.session().last_error().unwrap();
        assert!(message.contains("API key not valid."));

        workflow.generate().await;

        assert_eq!(workflow.session().last_error(), None);
        assert_eq!(workflow.library().len(), 1);

        let requests = gateway.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].source, requests[1].source);
        assert_eq!(requests[0].features, requests[1].features);
    }

    #[tokio::test]
    async fn test_empty_failure_message_uses_fallback() {
        let gateway = ScriptedGateway::with(vec![Err(GatewayError::Failed(String::new()))]);
        let mut workflow = ready(gateway);

        workflow.generate().await;

        assert_eq!(workflow.session().last_error(), Some(GENERIC_FAILURE));
    }

    #[tokio::test]
    async fn test_each_success_is_its_own_project() {
        let gateway = ScriptedGateway::with(vec![Ok(image("a")), Ok(image("b"))]);
        let mut workflow = ready(gateway);

        workflow.generate().await;
        workflow.generate().await;

        let library = workflow.library().list();
        assert_eq!(library.len(), 2);
        assert_ne!(library[0].id, library[1].id);
        assert_eq!(library[0].generated_images, vec![image("b")]);
        assert_eq!(library[1].generated_images, vec![image("a")]);
        assert_eq!(workflow.session().results(), &[image("b")]);
    }

    #[tokio::test]
    async fn test_manual_save_creates_separate_entry() {
        let gateway = ScriptedGateway::with(vec![Ok(image("a"))]);
        let mut workflow = ready(gateway);
        workflow.generate().await;

        let id = workflow.save_to_library().unwrap().unwrap();

        let library = workflow.library().list();
        assert_eq!(library.len(), 2);
        assert_eq!(library[0].id, id);
        assert_eq!(library[0].generated_images, library[1].generated_images);
        assert_ne!(library[0].id, library[1].id);
    }

    #[test]
    fn test_manual_save_with_nothing_to_save() {
        let mut workflow = ready(ScriptedGateway::with(vec![]));

        assert_eq!(workflow.save_to_library().unwrap(), None);
        assert!(workflow.library().is_empty());
    }

    #[test]
    fn test_generation_gated_on_credential() {
        let mut workflow = Workflow::new(Box::new(MemoryStorage::new()), ScriptedGateway::with(vec![]));
        workflow.capture_image(source());

        assert!(!workflow.is_unlocked());
        assert!(workflow.begin_generation().is_none());
        assert_eq!(workflow.session().step(), Step::Features);
    }

    #[test]
    fn test_blank_credential_keeps_workflow_locked() {
        let mut workflow = Workflow::new(Box::new(MemoryStorage::new()), ScriptedGateway::with(vec![]));

        assert!(workflow.commit_credential("   ").is_err());
        assert!(!workflow.is_unlocked());
    }

    #[test]
    fn test_generation_refused_without_image() {
        let mut workflow = unlocked(ScriptedGateway::with(vec![]));

        assert!(workflow.begin_generation().is_none());
        assert_eq!(workflow.session().step(), Step::Upload);
    }

    #[test]
    fn test_no_second_generation_while_in_flight() {
        let mut workflow = ready(ScriptedGateway::with(vec![]));

        let first = workflow.begin_generation();
        assert!(first.is_some());
        assert!(workflow.begin_generation().is_none());
    }

    #[test]
    fn test_result_after_new_project_is_discarded() {
        let mut workflow = ready(ScriptedGateway::with(vec![]));
        let request = workflow.begin_generation().unwrap();

        workflow.new_project();
        let outcome = workflow.finish_generation(request.ticket, Ok(image("late")));

        assert_eq!(outcome, GenerationOutcome::Discarded);
        assert!(workflow.library().is_empty());
        assert!(workflow.session().results().is_empty());
        assert_eq!(workflow.session().step(), Step::Upload);
    }

    #[tokio::test]
    async fn test_load_and_delete_from_library() {
        let gateway = ScriptedGateway::with(vec![Ok(image("a"))]);
        let mut workflow = ready(gateway);
        workflow.edit_feature(FeatureAxis::Vibe, "Creative agency".to_string());
        workflow.generate().await;
        let id = workflow.library().list()[0].id.clone();

        workflow.new_project();
        workflow.open_library();
        assert!(workflow.load_project(&id));

        let session = workflow.session();
        assert_eq!(session.step(), Step::Generating);
        assert_eq!(session.features().vibe, "Creative agency");
        assert_eq!(session.results(), &[image("a")]);

        assert!(!workflow.delete_project("missing").unwrap());
        assert!(workflow.delete_project(&id).unwrap());
        assert!(workflow.library().is_empty());
        assert!(!workflow.load_project(&id));
    }

    #[tokio::test]
    async fn test_autosave_failure_keeps_result() {
        let gateway = ScriptedGateway::with(vec![Ok(image("a"))]);
        let mut workflow = Workflow::new(Box::new(LibraryWritesFail::default()), gateway);
        workflow.commit_credential("test-key").unwrap();
        workflow.capture_image(source());

        assert_eq!(workflow.generate().await, Some(GenerationOutcome::Unsaved));

        let session = workflow.session();
        assert_eq!(session.results(), &[image("a")]);
        assert_eq!(session.step(), Step::Generating);
        assert!(!session.is_generating());
        assert!(session
            .last_error()
            .unwrap()
            .starts_with("Could not save project:"));
        assert!(workflow.library().is_empty());
    }

    #[tokio::test]
    async fn test_load_refused_outside_library() {
        let gateway = ScriptedGateway::with(vec![Ok(image("a")), Ok(image("b"))]);
        let mut workflow = ready(gateway);
        workflow.generate().await;
        let id = workflow.library().list()[0].id.clone();
        workflow.generate().await;

        assert!(!workflow.load_project(&id));
        assert_eq!(workflow.session().step(), Step::Generating);
        assert_eq!(workflow.session().results(), &[image("b")]);
    }

    #[tokio::test]
    async fn test_replaced_credential_is_used_for_generation() {
        let gateway = ScriptedGateway::with(vec![Ok(image("a"))]);
        let mut workflow = ready(gateway.clone());

        workflow.commit_credential("corrected-key").unwrap();
        assert!(workflow.commit_credential("  ").is_err());
        workflow.generate().await;

        assert!(workflow.is_unlocked());
        assert_eq!(gateway.requests()[0].credential, "corrected-key");
        assert_eq!(
            workflow.storage.get(crate::state::storage::CREDENTIAL_KEY).unwrap().as_deref(),
            Some("corrected-key")
        );
    }

    #[tokio::test]
    async fn test_library_and_credential_survive_restart() {
        let storage = Box::new(MemoryStorage::new());
        let gateway = ScriptedGateway::with(vec![Ok(image("a"))]);
        let mut workflow = Workflow::new(storage, gateway.clone());
        workflow.commit_credential("persisted-key").unwrap();
        workflow.capture_image(source());
        workflow.generate().await;

        let Workflow { storage, library, .. } = workflow;
        let restarted = Workflow::new(storage, gateway);

        assert!(restarted.is_unlocked());
        assert_eq!(restarted.library(), &library);
        assert_eq!(restarted.session().step(), Step::Upload);
    }
}
