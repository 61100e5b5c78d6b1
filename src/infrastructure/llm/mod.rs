mod factory;
mod openai;
mod watsonx;

pub use factory::HostedLlmFactory;
pub use openai::OpenAiLlm;
pub use watsonx::WatsonxLlm;

use rig::completion::{CompletionError, PromptError};
use rig::http_client;

use crate::domain::DomainError;

const MAX_ERROR_BODY: usize = 500;

fn transport_error(provider: &str, err: reqwest::Error) -> DomainError {
    if err.is_timeout() {
        DomainError::timeout(format!("{provider} request timed out"))
    } else {
        DomainError::external(format!("{provider} request failed: {err}"))
    }
}

fn status_error(provider: &str, status: u16, body: &str) -> DomainError {
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();

    match status {
        401 | 403 => DomainError::authentication(format!(
            "{provider} rejected the credentials ({status}): {body}"
        )),
        408 | 504 => DomainError::timeout(format!("{provider} timed out ({status})")),
        _ => DomainError::external(format!("{provider} returned {status}: {body}")),
    }
}

/// Passes successful responses through and maps the rest to domain errors.
async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, DomainError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(provider, status.as_u16(), &body))
}

/// Maps a failed rig prompt with the same rules as `check_status`.
fn prompt_error(provider: &str, err: PromptError) -> DomainError {
    match err {
        PromptError::CompletionError(CompletionError::HttpError(err)) => match err {
            http_client::Error::InvalidStatusCodeWithMessage(status, body) => {
                status_error(provider, status.as_u16(), &body)
            }
            http_client::Error::InvalidStatusCode(status) => {
                status_error(provider, status.as_u16(), "")
            }
            http_client::Error::Instance(source) => match source.downcast::<reqwest::Error>() {
                Ok(err) => transport_error(provider, *err),
                Err(source) => DomainError::external(format!("{provider} request failed: {source}")),
            },
            other => DomainError::external(format!("{provider} request failed: {other}")),
        },
        other => DomainError::external(format!("{provider} request failed: {other}")),
    }
}
