/// One view per workflow step
///
/// Each function projects state to widgets and emits `Message`s; none of
/// them hold state of their own.
use iced::widget::image::{Handle, Image};
use iced::widget::{button, column, container, row, scrollable, text, text_input, Column, Row};
use iced::{Alignment, Element, Length};
use iced_aw::Wrap;

use crate::state::data::{GeneratedImage, SavedProject};
use crate::state::session::Session;
use crate::ui::previews::{cover_key, Previews};
use crate::Message;

const RESULT_SIZE: f32 = 360.0;
const THUMBNAIL_SIZE: f32 = 160.0;

/// Render a cached image handle, or a note when the payload did not decode
fn preview<'a>(handle: Option<&Handle>, size: f32) -> Element<'a, Message> {
    match handle {
        Some(handle) => Image::<Handle>::new(handle.clone())
            .width(Length::Fixed(size))
            .height(Length::Fixed(size))
            .into(),
        None => text("Preview unavailable").size(12).into(),
    }
}

fn error_banner<'a>(error: Option<&str>) -> Option<Element<'a, Message>> {
    error.map(|message| text(format!("⚠ {}", message)).size(15).into())
}

/// Shown instead of the workflow until an API key is committed, and
/// again whenever the user replaces the key.
///
/// `replacing` adds a way back to the workflow that keeps the current key.
pub fn credential_gate(input: &str, replacing: bool) -> Element<'_, Message> {
    let ready = !input.trim().is_empty();

    let (title, note) = if replacing {
        ("Replace your API key", "The new key is used for every generation from now on.")
    } else {
        (
            "Connect your API key",
            "Headshot Studio needs a generation API key before you can start.",
        )
    };

    let actions = row![button(if replacing { "Save Key" } else { "Continue" })
        .on_press_maybe(ready.then_some(Message::CommitCredential))
        .padding(10)]
    .push_maybe(replacing.then(|| button("Cancel").on_press(Message::CancelCredential).padding(10)))
    .spacing(12);

    let content = column![
        text(title).size(28),
        text(note).size(15),
        text_input("Paste your API key", input)
            .on_input(Message::CredentialInput)
            .on_submit(Message::CommitCredential)
            .secure(true)
            .padding(10)
            .width(Length::Fixed(420.0)),
        actions,
    ]
    .spacing(16)
    .align_x(Alignment::Center);

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

pub fn upload(session: &Session) -> Element<'_, Message> {
    column![
        text("Upload a portrait").size(28),
        text("A clear, front-facing photo works best. PNG, JPEG or WebP.").size(15),
        button("Choose Photo").on_press(Message::PickImage).padding(10),
    ]
    .push_maybe(error_banner(session.last_error()))
    .spacing(16)
    .into()
}

pub fn features<'a>(session: &'a Session, previews: &Previews) -> Element<'a, Message> {
    let source = session
        .source_image()
        .map(|_| preview(previews.source(), THUMBNAIL_SIZE));

    let fields = session
        .features()
        .entries()
        .fold(Column::new().spacing(10), |fields, (axis, value)| {
            fields.push(
                row![
                    text(axis.label()).width(Length::Fixed(140.0)),
                    text_input(axis.label(), value)
                        .on_input(move |value| Message::FeatureEdited(axis, value))
                        .padding(8),
                ]
                .spacing(12)
                .align_y(Alignment::Center),
            )
        });

    let generate = button("Generate Headshot")
        .on_press_maybe(session.can_generate().then_some(Message::Generate))
        .padding(10);

    column![text("Choose your style").size(28)]
        .push_maybe(source)
        .push(fields)
        .push(generate)
        .spacing(16)
        .into()
}

pub fn results<'a>(session: &'a Session, previews: &Previews) -> Element<'a, Message> {
    let actions = row![
        button("Save to Library")
            .on_press_maybe(session.can_save().then_some(Message::SaveToLibrary))
            .padding(10),
        button(if session.is_generating() { "Generating…" } else { "Regenerate" })
            .on_press_maybe(session.can_generate().then_some(Message::Generate))
            .padding(10),
    ]
    .spacing(12);

    let mut content = column![text("Your AI headshot").size(28), actions].spacing(16);

    if let Some(message) = session.last_error() {
        content = content.push(
            column![
                text(format!("⚠ {}", message)).size(15),
                button("Try Again")
                    .on_press_maybe(session.can_generate().then_some(Message::Generate))
                    .padding(10),
            ]
            .spacing(8),
        );
    }

    if session.is_generating() && session.results().is_empty() {
        content = content.push(text("Generating your headshot…").size(20));
    }

    let gallery = session
        .results()
        .iter()
        .fold(Row::new(), |gallery, image| {
            gallery.push(
                button(preview(previews.image(&image.id), RESULT_SIZE))
                    .on_press(Message::SelectImage(image.id.clone())),
            )
        })
        .spacing(16);
    content = content.push(gallery);

    if let Some(first) = session.results().first() {
        content = content.push(blueprint(first));
    }

    scrollable(content).height(Length::Fill).into()
}

/// The prompt that produced `image`, with a copy action
fn blueprint(image: &GeneratedImage) -> Element<'_, Message> {
    column![
        row![
            text("Generation blueprint").size(18),
            button("Copy Prompt").on_press(Message::CopyPrompt(image.prompt_used.clone())),
        ]
        .spacing(12)
        .align_y(Alignment::Center),
        text(&image.prompt_used).size(13),
        text(format!("Total tokens: ~{}", image.estimated_tokens())).size(12),
    ]
    .spacing(8)
    .into()
}

pub fn editor<'a>(session: &'a Session, previews: &Previews) -> Element<'a, Message> {
    let Some(image) = session.selected() else {
        return text("No image selected").into();
    };

    column![
        row![
            button("Back").on_press(Message::CloseEditor),
            button("Copy Prompt").on_press(Message::CopyPrompt(image.prompt_used.clone())),
            button("Export").on_press(Message::ExportImage),
        ]
        .spacing(12),
        preview(previews.image(&image.id), RESULT_SIZE * 1.5),
        text(&image.prompt_used).size(13),
    ]
    .spacing(16)
    .into()
}

pub fn library<'a>(projects: &'a [SavedProject], previews: &Previews) -> Element<'a, Message> {
    let header = row![
        text("My Library").size(28),
        button("Close").on_press(Message::CloseLibrary),
    ]
    .spacing(16)
    .align_y(Alignment::Center);

    if projects.is_empty() {
        return column![header, text("No saved headshots yet.")].spacing(16).into();
    }

    let cards: Vec<Element<'_, Message>> = projects
        .iter()
        .map(|project| project_card(project, previews))
        .collect();

    column![header, scrollable(Wrap::with_elements(cards)).height(Length::Fill)]
        .spacing(16)
        .into()
}

fn project_card<'a>(project: &'a SavedProject, previews: &Previews) -> Element<'a, Message> {
    let cover = preview(previews.image(&cover_key(project)), THUMBNAIL_SIZE);

    container(
        column![
            cover,
            text(&project.name).size(14),
            text(format!("{} image(s)", project.generated_images.len())).size(12),
            row![
                button("Open").on_press(Message::LoadProject(project.id.clone())),
                button("Delete").on_press(Message::DeleteProject(project.id.clone())),
            ]
            .spacing(8),
        ]
        .spacing(6),
    )
    .padding(12)
    .into()
}
