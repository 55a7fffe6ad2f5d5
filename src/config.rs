use anyhow::Result;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "claude-sonnet";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub session_path: PathBuf,
    pub model: String,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = data_dir();
        Ok(Self {
            db_path: env_path("CAMPUS_DB_PATH").unwrap_or_else(|| data_dir.join("campus.db")),
            upload_dir: env_path("CAMPUS_UPLOAD_DIR").unwrap_or_else(|| data_dir.join("uploads")),
            session_path: env_path("CAMPUS_SESSION_PATH")
                .unwrap_or_else(|| data_dir.join("session.json")),
            model: env::var("CAMPUS_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            log_json: env_bool("CAMPUS_LOG_JSON", false),
        })
    }
}

fn data_dir() -> PathBuf {
    // XDG data directory, or the working directory when none is available
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "campus") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_paths() {
        unsafe {
            env::set_var("CAMPUS_DB_PATH", "/tmp/campus-test.db");
            env::set_var("CAMPUS_MODEL", "gpt-4o");
        }
        let config = Config::from_env().unwrap();
        unsafe {
            env::remove_var("CAMPUS_DB_PATH");
            env::remove_var("CAMPUS_MODEL");
        }
        assert_eq!(config.db_path, PathBuf::from("/tmp/campus-test.db"));
        assert_eq!(config.model, "gpt-4o");
        assert!(config.upload_dir.ends_with("uploads"));
    }

    #[test]
    fn test_env_bool_parsing() {
        unsafe { env::set_var("CAMPUS_TEST_FLAG", "Yes"); }
        assert!(env_bool("CAMPUS_TEST_FLAG", false));
        unsafe { env::set_var("CAMPUS_TEST_FLAG", "0"); }
        assert!(!env_bool("CAMPUS_TEST_FLAG", true));
        unsafe { env::remove_var("CAMPUS_TEST_FLAG"); }
        assert!(env_bool("CAMPUS_TEST_FLAG", true));
    }
}
