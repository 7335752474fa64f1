use axum::{extract::State, response::Redirect, Form};
use serde::Deserialize;
use service_core::error::AppError;

use crate::i18n::Language;
use crate::AppState;

#[derive(Deserialize)]
pub struct LanguageForm {
    pub language: String,
    #[serde(default)]
    pub return_to: Option<String>,
}

/// Local paths only, never another origin. Browsers read `/\host` as
/// `//host`, so backslashes are refused outright.
fn safe_return_path(return_to: Option<&str>) -> &str {
    match return_to {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => "/",
    }
}

pub async fn set_language(
    State(state): State<AppState>,
    Form(form): Form<LanguageForm>,
) -> Result<Redirect, AppError> {
    let language = Language::parse(&form.language).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Unsupported language: {}", form.language))
    })?;

    if let Err(e) = state.language.set_language(language).await {
        tracing::warn!(error = %e, "Language switched but could not be persisted");
    }

    Ok(Redirect::to(safe_return_path(form.return_to.as_deref())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_path_stays_local() {
        assert_eq!(safe_return_path(Some("/visits")), "/visits");
        assert_eq!(safe_return_path(Some("//evil.example")), "/");
        assert_eq!(safe_return_path(Some("https://evil.example")), "/");
        assert_eq!(safe_return_path(Some("/\\evil.example")), "/");
        assert_eq!(safe_return_path(Some("/visits\\..\\x")), "/");
        assert_eq!(safe_return_path(Some("/\t/evil.example")), "/");
        assert_eq!(safe_return_path(None), "/");
    }
}
