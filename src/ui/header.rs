/// App header: navigation buttons and the step indicator
use iced::widget::{button, row, text, Row};
use iced::{Alignment, Color, Element};

use crate::state::session::{Step, StepStatus};
use crate::Message;

const ACTIVE: Color = Color { r: 0.15, g: 0.39, b: 0.92, a: 1.0 };
const COMPLETED: Color = Color { r: 0.55, g: 0.7, b: 0.98, a: 1.0 };
const PENDING: Color = Color { r: 0.58, g: 0.64, b: 0.72, a: 1.0 };

pub fn header<'a>(current: Step, project_count: usize) -> Element<'a, Message> {
    let nav = row![
        text("Headshot Studio").size(22),
        button("New Headshot").on_press(Message::NewProject),
        button(text(format!("My Library ({})", project_count))).on_press(Message::OpenLibrary),
        button("API Key").on_press(Message::EditCredential),
    ]
    .spacing(12)
    .align_y(Alignment::Center);

    row![nav, step_indicator(current)]
        .spacing(40)
        .align_y(Alignment::Center)
        .into()
}

fn step_indicator<'a>(current: Step) -> Row<'a, Message> {
    Step::PROGRESSION
        .into_iter()
        .fold(Row::new().spacing(16), |indicator, step| {
            let color = match current.status_of(step) {
                StepStatus::Active => ACTIVE,
                StepStatus::Completed => COMPLETED,
                StepStatus::Pending => PENDING,
            };
            let number = step.number().unwrap_or_default();

            indicator.push(text(format!("{} {}", number, step.label())).size(14).color(color))
        })
}
