//! Maps the WebSocket upgrade request path onto a channel.

use tokio_tungstenite::tungstenite::http::Uri;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/ws[?cwd=<dir>]`: interactive terminal.
    Terminal { cwd: Option<String> },
    /// `/control`: JSON project-runner channel.
    Control,
}

impl Route {
    pub fn from_uri(uri: &Uri) -> Option<Self> {
        Self::from_parts(uri.path(), uri.query())
    }

    pub fn from_parts(path: &str, query: Option<&str>) -> Option<Self> {
        match path {
            "/ws" | "/ws/" => Some(Route::Terminal {
                cwd: query.and_then(|q| query_param(q, "cwd")),
            }),
            "/control" | "/control/" => Some(Route::Control),
            _ => None,
        }
    }
}

/// First non-empty value of `key`, percent-decoded.
fn query_param(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_without_cwd() {
        assert_eq!(
            Route::from_parts("/ws", None),
            Some(Route::Terminal { cwd: None })
        );
        assert_eq!(
            Route::from_parts("/ws", Some("cwd=")),
            Some(Route::Terminal { cwd: None })
        );
    }

    #[test]
    fn terminal_cwd_is_decoded() {
        assert_eq!(
            Route::from_parts("/ws", Some("x=1&cwd=%2Ftmp%2Fmy%20dir")),
            Some(Route::Terminal {
                cwd: Some("/tmp/my dir".into())
            })
        );
        assert_eq!(
            Route::from_parts("/ws/", Some("cwd=~/src+app")),
            Some(Route::Terminal {
                cwd: Some("~/src app".into())
            })
        );
    }

    #[test]
    fn control_and_unknown() {
        assert_eq!(Route::from_parts("/control", None), Some(Route::Control));
        assert_eq!(Route::from_parts("/", None), None);
        assert_eq!(Route::from_parts("/wss", None), None);
    }

    #[test]
    fn from_uri() {
        let uri: Uri = "/ws?cwd=/srv".parse().unwrap();
        assert_eq!(
            Route::from_uri(&uri),
            Some(Route::Terminal {
                cwd: Some("/srv".into())
            })
        );
    }
}
