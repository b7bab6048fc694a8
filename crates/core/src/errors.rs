use thiserror::Error;

use crate::search::SearchError;

/// Turn-scoped failures. Both are recoverable: the engine reports them to the
/// user and the conversation continues.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("product `{product_name}` was not found in the catalog")]
    ProductNotFound { product_name: String },
    #[error("catalog search unavailable: {0}")]
    SearchUnavailable(String),
}

impl DialogError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProductNotFound { .. } => "product_not_found",
            Self::SearchUnavailable(_) => "search_unavailable",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ProductNotFound { .. } => {
                "Sorry, I couldn't find that item. Please pick one from the list."
            }
            Self::SearchUnavailable(_) => {
                "The watch catalog is temporarily unavailable. Please try again in a moment."
            }
        }
    }
}

impl From<SearchError> for DialogError {
    fn from(value: SearchError) -> Self {
        Self::SearchUnavailable(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Dialog(#[from] DialogError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Dialog(DialogError::ProductNotFound { product_name }) => {
                Self::BadRequest {
                    message: format!("unknown product `{product_name}`"),
                    correlation_id: "unassigned".to_owned(),
                }
            }
            ApplicationError::Dialog(DialogError::SearchUnavailable(message))
            | ApplicationError::Persistence(message)
            | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DialogError, InterfaceError};
    use crate::search::SearchError;

    #[test]
    fn search_errors_become_search_unavailable() {
        let error = DialogError::from(SearchError::Timeout(10));

        assert_eq!(error.kind(), "search_unavailable");
        assert!(matches!(error, DialogError::SearchUnavailable(ref message) if message.contains("10s")));
    }

    #[test]
    fn product_not_found_has_recoverable_message() {
        let error = DialogError::ProductNotFound { product_name: "Ghost Watch".to_owned() };

        assert_eq!(
            error.user_message(),
            "Sorry, I couldn't find that item. Please pick one from the list."
        );
    }

    #[test]
    fn product_not_found_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DialogError::ProductNotFound {
            product_name: "Ghost Watch".to_owned(),
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("missing search key".to_owned()).into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
