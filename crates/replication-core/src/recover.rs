//! Instance recovery message shapes.
//!
//! A peer that may have missed messages sends an `instance_recover_request`
//! carrying a `[date-min, date-max]` window. Once every recovery handler has
//! replayed its messages for the window, the receiving instance answers with
//! an `instance_recover_finished` correlated to the request.

use crate::{ReceiverMessage, ReplicationError, ReplicationResult, SenderMessage};
use chrono::{DateTime, Utc};

/// Type of a recovery request.
pub const TYPE_INSTANCE_RECOVER_REQUEST: &str = "instance_recover_request";

/// Type of a recovery completion notice.
pub const TYPE_INSTANCE_RECOVER_FINISHED: &str = "instance_recover_finished";

/// Lower bound of the replay window.
pub const METADATA_DATE_MIN: &str = "instance-recover-request.date-min";

/// Upper bound of the replay window.
pub const METADATA_DATE_MAX: &str = "instance-recover-request.date-max";

/// Id of the request a completion notice answers.
pub const METADATA_REQUEST_ID: &str = "instance-recover-finished.request-id";

/// Source instance of the request a completion notice answers.
pub const METADATA_REQUEST_SOURCE: &str = "instance-recover-finished.request-source";

/// A `[date_min, date_max]` replay window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverWindow {
    pub date_min: DateTime<Utc>,
    pub date_max: DateTime<Utc>,
}

impl RecoverWindow {
    pub fn new(date_min: DateTime<Utc>, date_max: DateTime<Utc>) -> Self {
        Self { date_min, date_max }
    }

    /// Reads the mandatory window metadata of a request or completion message.
    pub fn from_message(message: &ReceiverMessage) -> ReplicationResult<Self> {
        let date_min = message.metadata_date(METADATA_DATE_MIN, true)?;
        let date_max = message.metadata_date(METADATA_DATE_MAX, true)?;

        match (date_min, date_max) {
            (Some(date_min), Some(date_max)) => Ok(Self { date_min, date_max }),
            // mandatory lookups never yield None
            _ => Err(ReplicationError::InvalidMessage(format!(
                "Incomplete recovery window in message [{}]",
                message.id
            ))),
        }
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        date >= self.date_min && date <= self.date_max
    }
}

/// Builds a recovery request for the given window.
///
/// `receivers` limits which instances should replay; empty asks everyone.
pub fn recover_request<I, S>(window: RecoverWindow, receivers: I) -> SenderMessage
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    SenderMessage::new(TYPE_INSTANCE_RECOVER_REQUEST)
        .with_receivers(receivers)
        .with_metadata_date(METADATA_DATE_MIN, window.date_min)
        .with_metadata_date(METADATA_DATE_MAX, window.date_max)
}

/// Builds the completion notice answering `request`.
///
/// The notice echoes the window, references the request id and source, and
/// is addressed to the requesting instance.
pub fn recover_finished(window: RecoverWindow, request: &ReceiverMessage) -> SenderMessage {
    let requester = request
        .source
        .clone()
        .unwrap_or_else(|| request.sender.clone());

    SenderMessage::new(TYPE_INSTANCE_RECOVER_FINISHED)
        .with_receivers([requester.clone()])
        .with_metadata_date(METADATA_DATE_MIN, window.date_min)
        .with_metadata_date(METADATA_DATE_MAX, window.date_max)
        .with_metadata(METADATA_REQUEST_ID, request.id.as_str())
        .with_metadata(METADATA_REQUEST_SOURCE, requester)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> RecoverWindow {
        RecoverWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_request_carries_window() {
        let request = recover_request(window(), ["http://a.local"]);
        assert_eq!(request.message_type, TYPE_INSTANCE_RECOVER_REQUEST);
        assert!(request.receivers.contains("http://a.local"));

        let received = ReceiverMessage::from_sender(&request, "http://requester.local");
        assert_eq!(RecoverWindow::from_message(&received).unwrap(), window());
    }

    #[test]
    fn test_window_missing_metadata_is_invalid() {
        let received = ReceiverMessage::from_sender(
            &SenderMessage::new(TYPE_INSTANCE_RECOVER_REQUEST)
                .with_metadata_date(METADATA_DATE_MIN, window().date_min),
            "s",
        );
        assert!(RecoverWindow::from_message(&received).is_err());
    }

    #[test]
    fn test_finished_correlates_request() {
        let request = recover_request(window(), Vec::<String>::new());
        let received = ReceiverMessage::from_sender(&request, "http://requester.local");

        let finished = recover_finished(window(), &received);
        assert_eq!(finished.message_type, TYPE_INSTANCE_RECOVER_FINISHED);
        assert_eq!(
            finished.custom_metadata[METADATA_REQUEST_ID],
            vec![request.id.to_string()]
        );
        assert_eq!(
            finished.custom_metadata[METADATA_REQUEST_SOURCE],
            vec!["http://requester.local".to_string()]
        );
        assert!(finished.receivers.contains("http://requester.local"));
        assert_ne!(finished.id, request.id);

        let echoed = ReceiverMessage::from_sender(&finished, "http://peer.local");
        assert_eq!(RecoverWindow::from_message(&echoed).unwrap(), window());
    }

    #[test]
    fn test_window_contains() {
        let w = window();
        assert!(w.contains(w.date_min));
        assert!(w.contains(w.date_max));
        assert!(!w.contains(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()));
    }
}
