use url::Url;

const INVALID_SCHEME: &str = "endpoint URL scheme must be https:// or http://";

pub fn check_scheme(endpoint_url: &str) -> Result<String, String> {
    let parsed = Url::parse(endpoint_url).map_err(|e| e.to_string())?;

    match parsed.scheme() {
        "https" | "http" => Ok(endpoint_url.to_string()),
        _ => Err(INVALID_SCHEME.to_string()),
    }
}
