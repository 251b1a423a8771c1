use std::net::IpAddr;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    #[error("Localhost not allowed")]
    Localhost,
}

/// Check an article link before handing it to the system browser.
///
/// Links arrive from third-party publishers via the API, so anything other
/// than a public http(s) address is refused: `file://`, `javascript:`,
/// localhost and private ranges all fail.
pub fn validate_article_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if host.eq_ignore_ascii_case("localhost") {
        return Err(UrlValidationError::Localhost);
    }

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(UrlValidationError::Localhost);
        }
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_article_urls_accepted() {
        let url = validate_article_url("https://www.bbc.co.uk/news/world-123").unwrap();
        assert_eq!(url.host_str(), Some("www.bbc.co.uk"));
        assert!(validate_article_url("http://example.com:8080/a?b=c").is_ok());
        assert!(validate_article_url("  https://example.com/padded  ").is_ok());
    }

    #[test]
    fn test_non_web_schemes_rejected() {
        for bad in ["file:///etc/passwd", "javascript:alert(1)", "ftp://example.com/x"] {
            assert!(
                matches!(
                    validate_article_url(bad),
                    Err(UrlValidationError::UnsupportedScheme(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_article_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
        assert!(validate_article_url("").is_err());
    }

    #[test]
    fn test_local_hosts_rejected() {
        assert!(matches!(
            validate_article_url("http://localhost/admin"),
            Err(UrlValidationError::Localhost)
        ));
        assert!(matches!(
            validate_article_url("http://127.0.0.1:3000"),
            Err(UrlValidationError::Localhost)
        ));
        assert!(matches!(
            validate_article_url("http://[::1]/"),
            Err(UrlValidationError::Localhost)
        ));
    }

    #[test]
    fn test_private_ranges_rejected() {
        for bad in [
            "http://10.0.0.1/",
            "http://192.168.1.20/router",
            "http://169.254.169.254/latest/meta-data",
            "http://0.0.0.0/",
            "http://[fd00::1]/",
            "http://[fe80::1]/",
        ] {
            assert!(
                matches!(
                    validate_article_url(bad),
                    Err(UrlValidationError::PrivateIp(_))
                ),
                "{bad} should be rejected"
            );
        }
    }
}
