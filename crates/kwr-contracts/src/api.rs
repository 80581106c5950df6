/// API Contract Constants
///
/// Shared constants between the CLI and the service to prevent endpoint
/// mismatches.

/// Default configuration values.
pub mod defaults {
    /// Default port for `kwr-service`.
    pub const SERVER_PORT: u16 = 8088;

    /// Default server host.
    pub const SERVER_HOST: &str = "localhost";

    /// Default per-request timeout in milliseconds.
    pub const REQUEST_TIMEOUT_MS: u64 = 30000;

    /// API URL prefix.
    pub const API_PREFIX: &str = "/api";
}

/// API endpoint paths.
pub mod endpoints {
    pub const HEALTHZ: &str = "/healthz";
    pub const METRICS: &str = "/metrics";

    pub const RUNS: &str = "/api/runs";
    pub const RUN_BY_ID: &str = "/api/runs/:id";
    pub const RUN_ROADMAP: &str = "/api/runs/:id/roadmap";
    pub const RUN_PROGRESS: &str = "/api/runs/:id/progress";
    pub const RUN_CANCEL: &str = "/api/runs/:id/cancel";
    pub const RUN_RESUME: &str = "/api/runs/:id/resume";

    pub fn run_by_id(id: &str) -> String {
        RUN_BY_ID.replace(":id", id)
    }

    pub fn run_roadmap(id: &str) -> String {
        RUN_ROADMAP.replace(":id", id)
    }

    pub fn run_progress(id: &str) -> String {
        RUN_PROGRESS.replace(":id", id)
    }

    pub fn run_cancel(id: &str) -> String {
        RUN_CANCEL.replace(":id", id)
    }

    pub fn run_resume(id: &str) -> String {
        RUN_RESUME.replace(":id", id)
    }
}

/// URL generation utilities.
pub mod urls {
    use super::defaults::{SERVER_HOST, SERVER_PORT};

    pub fn default_server_url() -> String {
        format!("http://{}:{}", SERVER_HOST, SERVER_PORT)
    }

    pub fn server_url(host: &str, port: u16) -> String {
        format!("http://{}:{}", host, port)
    }

    pub fn endpoint_url(base_url: &str, endpoint: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), endpoint)
    }

    pub fn run_by_id(base_url: &str, id: &str) -> String {
        endpoint_url(base_url, &super::endpoints::run_by_id(id))
    }

    pub fn run_roadmap(base_url: &str, id: &str) -> String {
        endpoint_url(base_url, &super::endpoints::run_roadmap(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_constants_match_expected_paths() {
        assert_eq!(endpoints::RUNS, "/api/runs");
        assert_eq!(endpoints::HEALTHZ, "/healthz");
    }

    #[test]
    fn dynamic_endpoints_substitute_id() {
        assert_eq!(endpoints::run_by_id("abc"), "/api/runs/abc");
        assert_eq!(endpoints::run_roadmap("abc"), "/api/runs/abc/roadmap");
        assert_eq!(endpoints::run_cancel("abc"), "/api/runs/abc/cancel");
    }

    #[test]
    fn url_generation_composes_host_port_and_path() {
        assert_eq!(urls::default_server_url(), "http://localhost:8088");
        assert_eq!(
            urls::endpoint_url("http://localhost:8088", "/healthz"),
            "http://localhost:8088/healthz"
        );
    }
}
