/// User interface module
///
/// - `header.rs` - navigation and the step indicator
/// - `screens.rs` - one view per workflow step
/// - `previews.rs` - decoded image handles reused across redraws

pub mod header;
pub mod previews;
pub mod screens;
