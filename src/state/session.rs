/// Session workflow state machine
///
/// A `Session` is an immutable snapshot of the single in-progress
/// project. `Session::apply` is the whole transition function: it takes
/// a snapshot and an `Event` and returns the next snapshot. Events that
/// are not valid in the current step leave the session unchanged.
///
/// Side effects (persistence, the gateway call) live in `workflow.rs`.

use super::data::{GeneratedImage, SavedProject, SourceImage};
use super::features::{FeatureAxis, FeatureConfiguration};

/// Shown when a generation fails without a usable message
pub const GENERIC_FAILURE: &str = "Generation failed. Please try again.";

/// The screen a session is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Step {
    #[default]
    Upload,
    Features,
    Generating,
    Editor,
    /// Side state outside the ordered progression
    Library,
}

/// How a progress step is drawn relative to the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Active,
    Completed,
    Pending,
}

impl Step {
    /// The ordered progression shown in the step indicator
    pub const PROGRESSION: [Step; 4] = [Step::Upload, Step::Features, Step::Generating, Step::Editor];

    /// 1-based position in the progression; `None` for the library
    pub fn number(self) -> Option<u8> {
        match self {
            Self::Upload => Some(1),
            Self::Features => Some(2),
            Self::Generating => Some(3),
            Self::Editor => Some(4),
            Self::Library => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Upload => "Upload",
            Self::Features => "Style",
            Self::Generating => "Generate",
            Self::Editor => "Refine",
            Self::Library => "Library",
        }
    }

    /// Status of `step` in the indicator while `self` is the current step.
    ///
    /// Everything is pending while the library is open.
    pub fn status_of(self, step: Step) -> StepStatus {
        if self == step {
            return StepStatus::Active;
        }
        match (self.number(), step.number()) {
            (Some(current), Some(other)) if current > other => StepStatus::Completed,
            _ => StepStatus::Pending,
        }
    }
}

/// Everything that can happen to a session
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A portrait was captured on the upload screen
    ImageCaptured(SourceImage),
    /// The user changed one style axis
    FeatureEdited(FeatureAxis, String),
    /// Start (or retry) a generation
    GenerationStarted,
    GenerationSucceeded { ticket: u64, image: GeneratedImage },
    GenerationFailed { ticket: u64, message: String },
    /// A result was picked for the editor
    ImageSelected(String),
    EditorClosed,
    LibraryOpened,
    LibraryClosed,
    /// Rehydrate the session from a saved project
    ProjectLoaded(SavedProject),
    NewProject,
    /// Surface a failure that does not change the step
    ErrorReported(String),
}

/// Snapshot of the in-progress project
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    step: Step,
    /// Where closing the library returns to
    resume_step: Step,
    source_image: Option<SourceImage>,
    features: FeatureConfiguration,
    results: Vec<GeneratedImage>,
    selected: Option<GeneratedImage>,
    /// Ticket of the generation currently awaited
    in_flight: Option<u64>,
    /// Monotonic across resets so stale results never match
    next_ticket: u64,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn source_image(&self) -> Option<&SourceImage> {
        self.source_image.as_ref()
    }

    pub fn features(&self) -> &FeatureConfiguration {
        &self.features
    }

    pub fn results(&self) -> &[GeneratedImage] {
        &self.results
    }

    pub fn selected(&self) -> Option<&GeneratedImage> {
        self.selected.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Ticket of the generation currently awaited
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    /// Whether a generation may start now
    pub fn can_generate(&self) -> bool {
        self.source_image.is_some()
            && !self.is_generating()
            && matches!(self.step, Step::Features | Step::Generating)
    }

    /// Whether "Save to Library" is available
    pub fn can_save(&self) -> bool {
        self.source_image.is_some() && !self.is_generating() && !self.results.is_empty()
    }

    /// Apply one event and return the next snapshot
    pub fn apply(self, event: Event) -> Self {
        match event {
            Event::ImageCaptured(image) if self.step == Step::Upload => Self {
                step: Step::Features,
                source_image: Some(image),
                last_error: None,
                ..self
            },

            Event::FeatureEdited(axis, value) if self.step == Step::Features => {
                let mut features = self.features;
                features.set(axis, value);
                Self { features, ..self }
            }

            Event::GenerationStarted if self.can_generate() => Self {
                step: Step::Generating,
                results: Vec::new(),
                selected: None,
                in_flight: Some(self.next_ticket),
                next_ticket: self.next_ticket + 1,
                last_error: None,
                ..self
            },

            Event::GenerationSucceeded { ticket, image } if self.in_flight == Some(ticket) => {
                let mut results = self.results;
                results.push(image);
                Self {
                    results,
                    in_flight: None,
                    last_error: None,
                    ..self
                }
            }

            Event::GenerationFailed { ticket, message } if self.in_flight == Some(ticket) => {
                let message = if message.trim().is_empty() {
                    GENERIC_FAILURE.to_string()
                } else {
                    message
                };
                Self {
                    in_flight: None,
                    last_error: Some(message),
                    ..self
                }
            }

            Event::ImageSelected(id) if self.step == Step::Generating => {
                let found = self.results.iter().find(|image| image.id == id).cloned();
                match found {
                    Some(image) => Self {
                        step: Step::Editor,
                        selected: Some(image),
                        last_error: None,
                        ..self
                    },
                    None => self,
                }
            }

            Event::EditorClosed if self.step == Step::Editor => Self {
                step: Step::Generating,
                selected: None,
                ..self
            },

            Event::LibraryOpened if self.step != Step::Library => Self {
                step: Step::Library,
                resume_step: self.step,
                last_error: None,
                ..self
            },

            Event::LibraryClosed if self.step == Step::Library => Self {
                step: self.resume_step,
                ..self
            },

            Event::ProjectLoaded(project) if self.step == Step::Library => Self {
                step: Step::Generating,
                source_image: Some(project.source_image),
                features: project.features,
                results: project.generated_images,
                selected: None,
                in_flight: None,
                last_error: None,
                ..self
            },

            Event::NewProject => Self {
                next_ticket: self.next_ticket,
                ..Self::default()
            },

            Event::ErrorReported(message) => Self {
                last_error: Some(message),
                ..self
            },

            _ => self,
        }
    }
}
