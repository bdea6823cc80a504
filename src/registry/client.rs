//! Blocking HTTP client for the registry API (ureq, no async runtime).
//!
//! Every request except search carries the session cookie. Non-2xx replies
//! become `HttpStatus` errors; transport failures become `Network` errors.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::core::config::RegistryConfig;
use crate::core::errors::{Result, RrpError};
use crate::registry::RegistryStore;
use crate::registry::models::{RepoTop, SearchResponse, Statistics, TagInfo};
use crate::registry::session::SessionCookie;

/// Registry client bound to one base URL and session.
pub struct HttpRegistry {
    base_url: String,
    cookie: String,
    agent: ureq::Agent,
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

impl HttpRegistry {
    /// Client for `config.url` authenticated with `session`.
    pub fn new(config: &RegistryConfig, session: &SessionCookie) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            cookie: session.header_value(),
            agent: make_agent(Duration::from_secs(config.timeout_secs)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: Option<(&str, &str)>) -> Result<T> {
        let mut request = self.agent.get(url);
        if let Some((key, value)) = query {
            request = request.query(key, value);
        } else {
            request = request.header("Cookie", &self.cookie);
        }

        let response = request.call().map_err(|e| RrpError::Network {
            method: "GET",
            url: url.to_string(),
            details: e.to_string(),
        })?;
        check_status("GET", url, response.status().as_u16())?;

        response
            .into_body()
            .read_json::<T>()
            .map_err(|e| RrpError::Decode {
                url: url.to_string(),
                details: e.to_string(),
            })
    }

    fn delete(&self, url: &str) -> Result<()> {
        let response = self
            .agent
            .delete(url)
            .header("Cookie", &self.cookie)
            .call()
            .map_err(|e| RrpError::Network {
                method: "DELETE",
                url: url.to_string(),
                details: e.to_string(),
            })?;
        check_status("DELETE", url, response.status().as_u16())
    }
}

impl RegistryStore for HttpRegistry {
    fn statistics(&self) -> Result<Statistics> {
        self.get_json(&self.url("/api/statistics"), None)
    }

    fn top_repositories(&self, count: u64) -> Result<Vec<RepoTop>> {
        let url = self.url(&format!("/api/repositories/top?count={count}"));
        self.get_json(&url, None)
    }

    fn search(&self, query: &str) -> Result<SearchResponse> {
        self.get_json(&self.url("/api/search"), Some(("q", query)))
    }

    fn list_tags(&self, repository: &str) -> Result<Vec<TagInfo>> {
        self.get_json(&self.url(&tags_path(repository)), None)
    }

    fn delete_repository(&self, repository: &str) -> Result<()> {
        self.delete(&self.url(&repository_path(repository)))
    }

    fn delete_tag(&self, repository: &str, tag: &str) -> Result<()> {
        let path = format!("{}/{tag}", tags_path(repository));
        self.delete(&self.url(&path))
    }
}

fn repository_path(repository: &str) -> String {
    format!("/api/repositories/{repository}")
}

fn tags_path(repository: &str) -> String {
    format!("{}/tags", repository_path(repository))
}

/// Map a response status onto the error taxonomy.
fn check_status(method: &'static str, url: &str, status: u16) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(RrpError::HttpStatus {
            method,
            url: url.to_string(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    fn client(url: &str) -> HttpRegistry {
        let config = RegistryConfig {
            url: url.to_string(),
            timeout_secs: 1,
        };
        HttpRegistry::new(&config, &SessionCookie::new("sid"))
    }

    #[test]
    fn paths_keep_project_prefix() {
        assert_eq!(
            repository_path("library/nginx"),
            "/api/repositories/library/nginx"
        );
        assert_eq!(
            tags_path("library/nginx"),
            "/api/repositories/library/nginx/tags"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let registry = client("https://harbor.example.com/");
        assert_eq!(
            registry.url("/api/statistics"),
            "https://harbor.example.com/api/statistics"
        );
        assert_eq!(registry.cookie, "beegosessionID=sid");
    }

    /// Answer `requests` connections with `200` and an empty JSON body that
    /// fits the path, returning each request head as received.
    fn serve(requests: usize) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut heads = Vec::new();
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut head = String::new();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                    head.push_str(&line);
                }
                let body = if head.starts_with("GET /api/search") {
                    r#"{"repository":[],"project":[]}"#
                } else if head.starts_with("GET") {
                    "[]"
                } else {
                    ""
                };
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                )
                .unwrap();
                heads.push(head);
            }
            heads
        });
        (url, handle)
    }

    fn has_cookie(head: &str) -> bool {
        head.to_ascii_lowercase()
            .lines()
            .any(|line| line.starts_with("cookie:"))
    }

    #[test]
    fn session_cookie_sent_on_every_request_but_search() {
        let (url, server) = serve(5);
        let registry = client(&url);

        registry.search("").unwrap();
        registry.top_repositories(3).unwrap();
        registry.list_tags("library/app").unwrap();
        registry.delete_tag("library/app", "v1").unwrap();
        registry.delete_repository("library/app").unwrap();

        let heads = server.join().unwrap();
        assert_eq!(heads.len(), 5);
        assert!(heads[0].starts_with("GET /api/search?q="));
        assert!(!has_cookie(&heads[0]), "search carried a cookie: {}", heads[0]);
        assert!(heads[1].starts_with("GET /api/repositories/top?count=3"));
        assert!(heads[2].starts_with("GET /api/repositories/library/app/tags"));
        assert!(heads[3].starts_with("DELETE /api/repositories/library/app/tags/v1"));
        assert!(heads[4].starts_with("DELETE /api/repositories/library/app "));
        for head in &heads[1..] {
            assert!(
                head.to_ascii_lowercase().contains("cookie: beegosessionid=sid"),
                "missing session cookie: {head}"
            );
        }
    }

    #[test]
    fn only_2xx_statuses_pass() {
        assert!(check_status("GET", "u", 200).is_ok());
        assert!(check_status("DELETE", "u", 204).is_ok());
        let err = check_status("DELETE", "u", 404).unwrap_err();
        assert_eq!(err.code(), "RRP-2002");
        assert!(check_status("GET", "u", 301).is_err());
    }

    #[test]
    fn unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let registry = client("http://127.0.0.1:9");
        let err = registry.statistics().unwrap_err();
        assert_eq!(err.kind(), crate::core::errors::ErrorKind::Network);
    }
}
