use std::error::Error;
use recap::core::models::ConversationId;
use recap::core::registry::RegistryError;
use recap::errors::BotError;

#[test]
fn test_bot_error_implements_error_trait() {
    fn assert_error<T: Error + Send + Sync + 'static>(_: &T) {}

    let error = BotError::ApiError("test error".to_string());
    assert_error(&error);
}

#[test]
fn test_bot_error_display() {
    let error = BotError::ApiError("API failed".to_string());
    assert_eq!(format!("{error}"), "Failed to access chat platform API: API failed");

    let error = BotError::OpenAIError("Model unavailable".to_string());
    assert_eq!(
        format!("{error}"),
        "Failed to access OpenAI API: Model unavailable"
    );

    let error = BotError::HttpError("Connection error".to_string());
    assert_eq!(
        format!("{error}"),
        "Failed to send HTTP request: Connection error"
    );
}

#[test]
fn test_registry_error_converts_transparently() {
    let err: BotError = RegistryError::NotFound(ConversationId::from("C1")).into();

    assert!(matches!(err, BotError::Registry(RegistryError::NotFound(_))));
    assert_eq!(format!("{err}"), "No collection state for conversation C1");
}

#[test]
fn test_reqwest_conversion_exists() {
    #[allow(unused)]
    fn _check_reqwest_conversion(err: reqwest::Error) -> BotError {
        BotError::from(err)
    }
}
