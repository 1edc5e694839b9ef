//! Localized user-facing text
//!
//! Every string a user can see goes through [`Locale::render`]. Log lines
//! stay in English.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ru,
}

/// A user-visible message before localization
#[derive(Debug, Clone, PartialEq)]
pub enum Message<'a> {
    Validation(&'a ValidationError),
    /// Verification failed without any error text of its own
    VerificationFailed,
    NodeNotExportable,
    /// The host could not render a node
    RenderFailed,
    StorageUnavailable,
    Internal,
    TokenSaved,
    TokenCleared,
    TokenValid { login: &'a str },
    ArchiveCreated,
    ErrorNotice { message: &'a str },
}

impl Locale {
    pub fn render(&self, message: &Message<'_>) -> String {
        match self {
            Locale::En => render_en(message),
            Locale::Ru => render_ru(message),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }
}

fn render_en(message: &Message<'_>) -> String {
    match message {
        Message::Validation(error) => match error {
            ValidationError::EmptySelection => "No elements are selected".to_string(),
            ValidationError::MissingDensities => "No densities selected".to_string(),
            ValidationError::InvalidTokenFormat => {
                "Expected a GitHub PAT (ghp_… or github_pat_…)".to_string()
            }
            ValidationError::MissingCredential { .. } => "Token is not set".to_string(),
            ValidationError::QualityOutOfRange { quality } => {
                format!("JPEG quality must be between 0 and 1 (got {})", quality)
            }
            ValidationError::MalformedRequest { .. } => "The request could not be read".to_string(),
        },
        Message::VerificationFailed => "Verification failed".to_string(),
        Message::NodeNotExportable => "This node does not support export".to_string(),
        Message::RenderFailed => "Could not render the selected element".to_string(),
        Message::StorageUnavailable => "Storage is unavailable".to_string(),
        Message::Internal => "Something went wrong".to_string(),
        Message::TokenSaved => "Token saved for the selected repository".to_string(),
        Message::TokenCleared => "Token removed for the selected repository".to_string(),
        Message::TokenValid { login } => format!("Token is valid ({})", login),
        Message::ArchiveCreated => "Zip archive created".to_string(),
        Message::ErrorNotice { message } => format!("Error: {}", message),
    }
}

fn render_ru(message: &Message<'_>) -> String {
    match message {
        Message::Validation(error) => match error {
            ValidationError::EmptySelection => "Ни один элемент не выделен".to_string(),
            ValidationError::MissingDensities => "Не выбраны плотности".to_string(),
            ValidationError::InvalidTokenFormat => {
                "Ожидается GitHub PAT (ghp_… или github_pat_…)".to_string()
            }
            ValidationError::MissingCredential { .. } => "Токен не задан".to_string(),
            ValidationError::QualityOutOfRange { quality } => {
                format!("Качество JPEG должно быть от 0 до 1 (получено {})", quality)
            }
            ValidationError::MalformedRequest { .. } => "Не удалось прочитать запрос".to_string(),
        },
        Message::VerificationFailed => "Проверка не пройдена".to_string(),
        Message::NodeNotExportable => "Этот узел не поддерживает экспорт".to_string(),
        Message::RenderFailed => "Не удалось отрисовать выбранный элемент".to_string(),
        Message::StorageUnavailable => "Хранилище недоступно".to_string(),
        Message::Internal => "Что-то пошло не так".to_string(),
        Message::TokenSaved => "Токен сохранён для выбранного репозитория".to_string(),
        Message::TokenCleared => "Токен удалён для выбранного репозитория".to_string(),
        Message::TokenValid { login } => format!("Токен валиден ({})", login),
        Message::ArchiveCreated => "Zip-архив успешно создан".to_string(),
        Message::ErrorNotice { message } => format!("Ошибка: {}", message),
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ru" => Ok(Locale::Ru),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_text_per_locale() {
        let error = ValidationError::EmptySelection;
        assert_eq!(
            Locale::Ru.render(&Message::Validation(&error)),
            "Ни один элемент не выделен"
        );
        assert_eq!(
            Locale::En.render(&Message::Validation(&error)),
            "No elements are selected"
        );
    }

    #[test]
    fn test_notifications() {
        assert_eq!(
            Locale::Ru.render(&Message::TokenValid { login: "octocat" }),
            "Токен валиден (octocat)"
        );
        assert_eq!(
            Locale::En.render(&Message::ErrorNotice { message: "boom" }),
            "Error: boom"
        );
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("RU".parse::<Locale>(), Ok(Locale::Ru));
        assert!("de".parse::<Locale>().is_err());
    }
}
