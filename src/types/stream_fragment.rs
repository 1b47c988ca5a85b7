use serde::{Deserialize, Serialize};

/// The JSON payload of one `data: ` frame: a fragment of assistant text to
/// append to the in-progress reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamFragment {
    /// The text fragment.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_round_trips() {
        let fragment: StreamFragment = serde_json::from_str(r#"{"content":"Hi"}"#).unwrap();
        assert_eq!(fragment.content, "Hi");
    }

    #[test]
    fn missing_content_is_an_error() {
        assert!(serde_json::from_str::<StreamFragment>(r#"{"token":"Hi"}"#).is_err());
    }
}
