/// Complete a bare URL: add a scheme and, for a single word, a `www.` host
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();

    const SCHEMES: [&str; 7] = [
        "http://",
        "https://",
        "file://",
        "data:",
        "about:",
        "chrome://",
        "chrome-extension://",
    ];
    if SCHEMES.iter().any(|scheme| trimmed.starts_with(scheme)) {
        return trimmed.to_string();
    }

    if trimmed.starts_with('/') || trimmed.starts_with("./") || trimmed.starts_with("../") {
        return trimmed.to_string();
    }

    if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
        return format!("http://{}", trimmed);
    }

    if trimmed.contains('.') {
        return format!("https://{}", trimmed);
    }

    // "wikipedia" -> "https://www.wikipedia.com"
    format!("https://www.{}.com", trimmed)
}
