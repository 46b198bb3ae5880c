use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Edit event envelope exchanged between collaborators on a document.
///
/// The `data` payload is opaque to the relay (typically serialized page
/// content) and is forwarded untouched. Envelopes with an unrecognized
/// `type` deserialize into `Unknown` and are dropped by the relay.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum EditEvent {
    /// Content of an existing page changed.
    #[serde(rename = "update")]
    Update {
        data: Value,
        #[serde(rename = "pageIndex")]
        page_index: u32,
    },
    /// A new page was appended to the document.
    #[serde(rename = "add-page")]
    AddPage { data: Value },
    /// A page was removed from the document.
    #[serde(rename = "delete-page")]
    DeletePage {
        #[serde(rename = "pageIndex")]
        page_index: u32,
    },
    #[serde(other)]
    Unknown,
}

impl EditEvent {
    /// Short name of the event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            EditEvent::Update { .. } => "update",
            EditEvent::AddPage { .. } => "add-page",
            EditEvent::DeletePage { .. } => "delete-page",
            EditEvent::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_update_event() {
        let event: EditEvent =
            serde_json::from_str(r#"{"type":"update","data":"<p>hi</p>","pageIndex":0}"#).unwrap();
        assert_eq!(
            event,
            EditEvent::Update {
                data: json!("<p>hi</p>"),
                page_index: 0
            }
        );
    }

    #[test]
    fn parses_add_page_event() {
        let event: EditEvent =
            serde_json::from_str(r#"{"type":"add-page","data":{"content":"<p>New Page</p>"}}"#)
                .unwrap();
        assert_eq!(
            event,
            EditEvent::AddPage {
                data: json!({"content": "<p>New Page</p>"})
            }
        );
    }

    #[test]
    fn parses_delete_page_event() {
        let event: EditEvent =
            serde_json::from_str(r#"{"type":"delete-page","pageIndex":2}"#).unwrap();
        assert_eq!(event, EditEvent::DeletePage { page_index: 2 });
    }

    #[test]
    fn unrecognized_kind_falls_back_to_unknown() {
        let event: EditEvent =
            serde_json::from_str(r#"{"type":"cursor-move","data":{"x":1}}"#).unwrap();
        assert_eq!(event, EditEvent::Unknown);
    }

    #[test]
    fn missing_type_is_an_error() {
        assert!(serde_json::from_str::<EditEvent>(r#"{"data":"<p>hi</p>"}"#).is_err());
    }

    #[test]
    fn update_round_trips_verbatim() {
        let raw = r#"{"type":"update","data":"<p>hi</p>","pageIndex":0}"#;
        let event: EditEvent = serde_json::from_str(raw).unwrap();
        let reserialized = serde_json::to_string(&event).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&reserialized).unwrap(),
            serde_json::from_str::<Value>(raw).unwrap()
        );
    }
}
