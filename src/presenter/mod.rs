use tracing::{debug, info, warn};

use crate::capture::types::MarkResult;

/// Renders transient result banners. The capture loop shows one banner per
/// mark outcome and clears it when scanning resumes.
pub trait Presenter: Send + Sync {
    fn show_result(&self, result: &MarkResult);
    fn clear_result(&self);
}

/// Banner rendering for the terminal client, through the log layer.
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn show_result(&self, result: &MarkResult) {
        match result {
            MarkResult::Success {
                message,
                student_name,
                roll_number,
            } => {
                info!(student = %student_name, roll = %roll_number, "{message}");
            }
            MarkResult::Failure { reason } => warn!("{reason}"),
        }
    }

    fn clear_result(&self) {
        debug!("result banner cleared");
    }
}
