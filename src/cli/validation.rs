use reqwest::Url;

use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.api_url.as_deref() {
        validate_api_url(raw)?;
    }
    if args.page_size == Some(0) {
        return Err("invalid page-size, expected positive integer".to_string());
    }
    if args.pages == Some(0) {
        return Err("invalid pages, expected positive integer".to_string());
    }
    if args.timeout == Some(0) {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    if let Some(query) = args.query.as_deref() {
        if query.trim().is_empty() {
            return Err("invalid query, expected non-empty text".to_string());
        }
    }
    if let Some(doc_id) = args.detail.as_deref() {
        if doc_id.trim().is_empty() {
            return Err("invalid detail, expected a document id".to_string());
        }
    }
    Ok(())
}

pub fn validate_api_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("invalid --api-url '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "invalid --api-url '{raw}': unsupported scheme '{other}'"
        )),
    }
}
