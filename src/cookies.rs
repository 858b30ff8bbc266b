use std::fs;
use std::path::PathBuf;

/// Supplies the anti-forgery token attached to every mutating request.
///
/// Implementations must read the token fresh on every call: the server can
/// rotate it between requests, so a cached value would eventually go stale.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> String;
}

/// Cookie-jar backed token source.
///
/// The jar file uses the Netscape format written by curl and browser
/// exporters. A missing file or absent cookie yields an empty token; the
/// request is still sent and the server's rejection is surfaced like any
/// other server error.
pub struct CookieJar {
    path: PathBuf,
    cookie_name: String,
}

impl CookieJar {
    pub fn new(path: PathBuf, cookie_name: impl Into<String>) -> Self {
        Self {
            path,
            cookie_name: cookie_name.into(),
        }
    }
}

impl TokenProvider for CookieJar {
    fn token(&self) -> String {
        let Ok(data) = fs::read_to_string(&self.path) else {
            return String::new();
        };
        value_from_jar(&data, &self.cookie_name).unwrap_or_default()
    }
}

/// Fixed token, for tests and for environments that pass the value directly.
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> String {
        self.0.clone()
    }
}

fn value_from_jar(data: &str, name: &str) -> Option<String> {
    for line in data.lines() {
        // #HttpOnly_ lines are real cookies; everything else starting with
        // '#' is a comment.
        let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }
        if fields[5] == name {
            return Some(fields[6].trim().to_string());
        }
    }
    None
}

/// Extracts a cookie value from a `Cookie:`-header style string
/// (`name=value; name=value`).
pub fn value_from_header(header: &str, name: &str) -> Option<String> {
    header.split("; ").find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim() == name {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const JAR: &str = "# Netscape HTTP Cookie File\n\
127.0.0.1\tFALSE\t/\tFALSE\t0\tsessionid\tabc123\n\
#HttpOnly_127.0.0.1\tFALSE\t/\tFALSE\t0\tcsrftoken\ttok-456\n";

    #[test]
    fn reads_named_cookie_from_jar() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(JAR.as_bytes()).unwrap();
        let jar = CookieJar::new(file.path().to_path_buf(), "csrftoken");
        assert_eq!(jar.token(), "tok-456");
    }

    #[test]
    fn missing_cookie_yields_empty_token() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(JAR.as_bytes()).unwrap();
        let jar = CookieJar::new(file.path().to_path_buf(), "othertoken");
        assert_eq!(jar.token(), "");
    }

    #[test]
    fn missing_file_yields_empty_token() {
        let jar = CookieJar::new(PathBuf::from("/nonexistent/cookies.txt"), "csrftoken");
        assert_eq!(jar.token(), "");
    }

    #[test]
    fn rereads_jar_on_every_call() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(JAR.as_bytes()).unwrap();
        let jar = CookieJar::new(file.path().to_path_buf(), "csrftoken");
        assert_eq!(jar.token(), "tok-456");

        let rotated = JAR.replace("tok-456", "tok-789");
        fs::write(file.path(), rotated).unwrap();
        assert_eq!(jar.token(), "tok-789");
    }

    #[test]
    fn header_style_lookup() {
        let header = "sessionid=abc123; csrftoken=tok-456";
        assert_eq!(
            value_from_header(header, "csrftoken").as_deref(),
            Some("tok-456")
        );
        assert_eq!(value_from_header(header, "missing"), None);
    }
}
