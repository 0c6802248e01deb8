//! User-facing messages for data operations.
//!
//! Every template carries a numeric code, an `OK`/`KO` status and a
//! description with `%NAME%` placeholders (`%ITEM%`, `%OPERATION%`,
//! `%REASON%`, `%REQUEST%`). Placeholders left unresolved stay verbatim.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::Result;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"%([A-Z_]+)%").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    Ok,
    Ko,
}

/// Message templates used by the data-access layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageGeneral {
    DataOperationOk,
    DataOperationError,
    DataOperationErrorWithRequest,
    DataOperationErrorDuplicate,
    DataOperationErrorItem,
}

impl MessageGeneral {
    pub fn code(self) -> u16 {
        match self {
            MessageGeneral::DataOperationOk => 0,
            MessageGeneral::DataOperationError => 500,
            MessageGeneral::DataOperationErrorWithRequest => 500,
            MessageGeneral::DataOperationErrorDuplicate => 409,
            MessageGeneral::DataOperationErrorItem => 500,
        }
    }

    pub fn status(self) -> MessageStatus {
        match self {
            MessageGeneral::DataOperationOk => MessageStatus::Ok,
            _ => MessageStatus::Ko,
        }
    }

    pub fn template(self) -> &'static str {
        match self {
            MessageGeneral::DataOperationOk => "%ITEM% - %OPERATION% completed successfully.",
            MessageGeneral::DataOperationError => {
                "An unexpected error occurred while executing the data operation."
            }
            MessageGeneral::DataOperationErrorWithRequest => {
                "An unexpected error occurred while executing the request : %REQUEST%"
            }
            MessageGeneral::DataOperationErrorDuplicate => {
                "%ITEM% - %OPERATION% failed : an entry with the same key already exists."
            }
            MessageGeneral::DataOperationErrorItem => {
                "%ITEM% - %OPERATION% failed to complete. %REASON%"
            }
        }
    }

    /// Fresh, unresolved message for this template.
    pub fn message(self) -> Message {
        Message {
            code: self.code(),
            status: self.status(),
            description: self.template().to_string(),
        }
    }
}

/// A message instance, possibly with some placeholders resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub code: u16,
    pub status: MessageStatus,
    pub description: String,
}

impl Message {
    /// Replaces every occurrence of `%NAME%` with `value`.
    pub fn resolve(self, name: &str, value: &str) -> Self {
        self.resolve_with(|found| (found == name).then(|| value.to_string()))
    }

    /// Replaces each placeholder for which `lookup` returns a value.
    pub fn resolve_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.description = PLACEHOLDER
            .replace_all(&self.description, |caps: &Captures| {
                lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        self
    }

    /// Names of the placeholders still present in the description.
    pub fn unresolved(&self) -> Vec<&str> {
        PLACEHOLDER
            .captures_iter(&self.description)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    pub fn is_ok(&self) -> bool {
        self.status == MessageStatus::Ok
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_single_placeholder() {
        let message = MessageGeneral::DataOperationErrorWithRequest
            .message()
            .resolve("REQUEST", "SELECT * FROM robot");
        assert_eq!(
            message.description,
            "An unexpected error occurred while executing the request : SELECT * FROM robot"
        );
        assert!(message.unresolved().is_empty());
    }

    #[test]
    fn test_unknown_placeholders_stay_verbatim() {
        let message = MessageGeneral::DataOperationErrorItem
            .message()
            .resolve("ITEM", "robot");
        assert_eq!(message.unresolved(), vec!["OPERATION", "REASON"]);
        assert!(message.description.starts_with("robot - %OPERATION%"));
    }

    #[test]
    fn test_value_containing_placeholder_is_not_expanded() {
        let message = MessageGeneral::DataOperationErrorItem
            .message()
            .resolve_with(|name| match name {
                "ITEM" => Some("%REASON%".to_string()),
                "OPERATION" => Some("INSERT".to_string()),
                _ => None,
            });
        assert_eq!(
            message.description,
            "%REASON% - INSERT failed to complete. %REASON%"
        );
    }

    #[test]
    fn test_status_and_codes() {
        assert!(MessageGeneral::DataOperationOk.message().is_ok());
        assert!(!MessageGeneral::DataOperationErrorDuplicate.message().is_ok());
        assert_eq!(MessageGeneral::DataOperationErrorDuplicate.code(), 409);
    }

    #[test]
    fn test_json_rendering() {
        let json = MessageGeneral::DataOperationError.message().to_json().unwrap();
        insta::assert_snapshot!(json, @r###"{"code":500,"status":"KO","description":"An unexpected error occurred while executing the data operation."}"###);
    }
}
