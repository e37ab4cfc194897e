use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Session claims --

/// Claims carried by the session cookie. Issued at login/registration and
/// decoded on every request by the session middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Query strings --

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Only same-site absolute paths are honoured; anything else falls back to `/`.
/// Control characters are refused since the value ends up in a `Location` header.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_accepts_local_paths_only() {
        assert_eq!(safe_next(Some("/profile/")), "/profile/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example/")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn next_rejects_control_characters() {
        assert_eq!(safe_next(Some("/\r\nX")), "/");
        assert_eq!(safe_next(Some("/profile/\n")), "/");
        assert_eq!(safe_next(Some("/a\tb")), "/");
        assert_eq!(safe_next(Some("/perfil/joão/")), "/perfil/joão/");
    }
}
