use iced::widget::{column, container, text};
use iced::{Element, Length, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod gateway;
mod state;
mod ui;

use config::Config;
use gateway::{GatewayError, GeminiGateway};
use state::data::{export_image, GeneratedImage, ImageFileError, SourceImage};
use state::features::FeatureAxis;
use state::session::Step;
use state::storage::{MemoryStorage, SqliteStorage, Storage};
use state::workflow::{GenerationOutcome, Workflow};
use ui::previews::Previews;

/// Main application state
struct HeadshotStudio {
    /// Session, library and API key
    workflow: Workflow,
    /// Text typed into the API key field
    credential_input: String,
    /// The API key form is shown over an unlocked workflow
    editing_credential: bool,
    /// Image handles for the current session and library
    previews: Previews,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    CredentialInput(String),
    CommitCredential,
    /// User clicked "API Key" to replace the stored key
    EditCredential,
    CancelCredential,
    /// User clicked "Choose Photo"
    PickImage,
    ImageLoaded(Result<SourceImage, ImageFileError>),
    FeatureEdited(FeatureAxis, String),
    /// Generate, regenerate and retry
    Generate,
    GenerationFinished(u64, Result<GeneratedImage, GatewayError>),
    SelectImage(String),
    CloseEditor,
    SaveToLibrary,
    OpenLibrary,
    CloseLibrary,
    LoadProject(String),
    DeleteProject(String),
    NewProject,
    CopyPrompt(String),
    ExportImage,
    ExportFinished(Result<PathBuf, ImageFileError>),
}

impl HeadshotStudio {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = Config::from_env();

        // Without a database the session still works, it just is not persisted
        let storage: Box<dyn Storage> = match SqliteStorage::open(&config.db_path()) {
            Ok(storage) => Box::new(storage),
            Err(e) => {
                error!(error = %e, path = %config.db_path().display(), "Could not open storage, running in memory");
                Box::new(MemoryStorage::new())
            }
        };

        let gateway = Arc::new(GeminiGateway::new(&config.gateway));
        let workflow = Workflow::new(storage, gateway);

        info!(
            projects = workflow.library().len(),
            unlocked = workflow.is_unlocked(),
            "Headshot Studio initialized"
        );

        (Self::with_workflow(workflow), Task::none())
    }

    fn with_workflow(workflow: Workflow) -> Self {
        let status = format!("Ready. {} projects in library.", workflow.library().len());

        let mut app = HeadshotStudio {
            workflow,
            credential_input: String::new(),
            editing_credential: false,
            previews: Previews::default(),
            status,
        };
        app.refresh_previews(true);
        app
    }

    /// Rebuild image handles after the session or library changed
    fn refresh_previews(&mut self, source_changed: bool) {
        let session = self.workflow.session();
        if source_changed {
            self.previews.set_source(session.source_image());
        }
        self.previews.refresh(session, self.workflow.library().list());
    }

    fn shows_credential_gate(&self) -> bool {
        self.editing_credential || !self.workflow.is_unlocked()
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::CredentialInput(value) => {
                self.credential_input = value;
            }
            Message::CommitCredential => {
                match self.workflow.commit_credential(&self.credential_input) {
                    Ok(()) => {
                        self.credential_input.clear();
                        self.editing_credential = false;
                        self.status = "API key saved.".to_string();
                    }
                    Err(e) => self.status = e.to_string(),
                }
            }
            Message::EditCredential => {
                self.credential_input.clear();
                self.editing_credential = true;
            }
            Message::CancelCredential => {
                self.credential_input.clear();
                self.editing_credential = false;
            }
            Message::PickImage => {
                let file = FileDialog::new()
                    .set_title("Select a Portrait")
                    .add_filter("Images", &["png", "jpg", "jpeg", "webp"])
                    .pick_file();

                if let Some(path) = file {
                    self.status = format!("Loading {}...", path.display());
                    return Task::perform(SourceImage::from_path(path), Message::ImageLoaded);
                }
            }
            Message::ImageLoaded(Ok(image)) => {
                self.workflow.capture_image(image);
                self.refresh_previews(true);
                self.status = "Portrait loaded.".to_string();
            }
            Message::ImageLoaded(Err(e)) => {
                self.status = e.to_string();
                self.workflow.capture_failed(e);
            }
            Message::FeatureEdited(axis, value) => {
                self.workflow.edit_feature(axis, value);
            }
            Message::Generate => {
                if let Some(request) = self.workflow.begin_generation() {
                    self.status = "Generating...".to_string();

                    let gateway = self.workflow.gateway();
                    let ticket = request.ticket;
                    return Task::perform(
                        async move { gateway.generate(&request).await },
                        move |result| Message::GenerationFinished(ticket, result),
                    );
                }
            }
            Message::GenerationFinished(ticket, result) => {
                let status = match self.workflow.finish_generation(ticket, result) {
                    GenerationOutcome::Saved => "Headshot ready and saved to your library.",
                    GenerationOutcome::Unsaved => "Headshot ready, but it could not be saved.",
                    GenerationOutcome::Failed => "Generation did not complete.",
                    GenerationOutcome::Discarded => return Task::none(),
                };
                self.status = status.to_string();
                self.refresh_previews(false);
            }
            Message::SelectImage(id) => {
                self.workflow.select_image(id);
            }
            Message::CloseEditor => {
                self.workflow.close_editor();
            }
            Message::SaveToLibrary => {
                self.status = match self.workflow.save_to_library() {
                    Ok(Some(_)) => "Saved to library.".to_string(),
                    Ok(None) => "Nothing to save yet.".to_string(),
                    Err(e) => {
                        warn!(error = %e, "Manual save failed");
                        format!("Could not save project: {}", e)
                    }
                };
                self.refresh_previews(false);
            }
            Message::OpenLibrary => {
                self.workflow.open_library();
            }
            Message::CloseLibrary => {
                self.workflow.close_library();
            }
            Message::LoadProject(id) => {
                if self.workflow.load_project(&id) {
                    self.refresh_previews(true);
                    self.status = "Project loaded.".to_string();
                }
            }
            Message::DeleteProject(id) => {
                match self.workflow.delete_project(&id) {
                    Ok(true) => self.refresh_previews(false),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(error = %e, project_id = %id, "Delete failed");
                        self.status = format!("Could not delete project: {}", e);
                    }
                }
            }
            Message::NewProject => {
                self.workflow.new_project();
                self.refresh_previews(true);
                self.status = "New project started.".to_string();
            }
            Message::CopyPrompt(prompt) => {
                self.status = "Prompt copied to clipboard.".to_string();
                return iced::clipboard::write(prompt);
            }
            Message::ExportImage => {
                let Some(image) = self.workflow.session().selected().cloned() else {
                    return Task::none();
                };

                let destination = FileDialog::new()
                    .set_title("Export Headshot")
                    .set_file_name(image.file_name())
                    .save_file();

                if let Some(path) = destination {
                    return Task::perform(export_image(image, path), Message::ExportFinished);
                }
            }
            Message::ExportFinished(Ok(path)) => {
                info!(path = %path.display(), "Headshot exported");
                self.status = format!("Exported to {}", path.display());
            }
            Message::ExportFinished(Err(e)) => {
                warn!(error = %e, "Export failed");
                self.status = e.to_string();
            }
        }

        Task::none()
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        if self.shows_credential_gate() {
            let replacing = self.workflow.is_unlocked();
            return column![
                ui::screens::credential_gate(&self.credential_input, replacing),
                text(&self.status).size(14),
            ]
            .padding(40)
            .into();
        }

        let session = self.workflow.session();
        let screen = match session.step() {
            Step::Upload => ui::screens::upload(session),
            Step::Features => ui::screens::features(session, &self.previews),
            Step::Generating => ui::screens::results(session, &self.previews),
            Step::Editor => ui::screens::editor(session, &self.previews),
            Step::Library => ui::screens::library(self.workflow.library().list(), &self.previews),
        };

        let content = column![
            ui::header::header(session.step(), self.workflow.library().len()),
            container(screen).width(Length::Fill).height(Length::Fill),
            text(&self.status).size(14),
        ]
        .spacing(24)
        .padding(32);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Light
    }
}

fn main() -> iced::Result {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "headshot_studio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    iced::application(
        "Headshot Studio",
        HeadshotStudio::update,
        HeadshotStudio::view,
    )
    .theme(HeadshotStudio::theme)
    .centered()
    .run_with(HeadshotStudio::new)
}
