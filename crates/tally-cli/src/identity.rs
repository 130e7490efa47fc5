//! Which catalog user a command acts as.
//!
//! Resolution chain: `--user` flag > `TALLY_USER` env > `user` in the
//! per-user config file > `USER` env (TTY only).

use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    pub message: String,
    pub code: &'static str,
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdentityError {}

trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_user_with(
    cli_flag: Option<&str>,
    configured: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(name) = cli_flag.map(str::trim).filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }
    if let Some(name) = env.get("TALLY_USER") {
        return Some(name);
    }
    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }
    if env.is_tty() {
        return env.get("USER");
    }
    None
}

/// Resolve the acting user name, or explain how to set one.
pub fn require_user(
    cli_flag: Option<&str>,
    configured: Option<&str>,
) -> Result<String, IdentityError> {
    resolve_user_with(cli_flag, configured, &RealEnv).ok_or_else(|| IdentityError {
        message: "a user identity is required. Set --user or TALLY_USER.".to_string(),
        code: "missing_user",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockEnv {
        vars: HashMap<String, String>,
        tty: bool,
    }

    impl MockEnv {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
                tty: false,
            }
        }

        fn var(mut self, key: &str, val: &str) -> Self {
            self.vars.insert(key.to_string(), val.to_string());
            self
        }

        const fn tty(mut self) -> Self {
            self.tty = true;
            self
        }
    }

    impl EnvReader for MockEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).filter(|v| !v.is_empty()).cloned()
        }

        fn is_tty(&self) -> bool {
            self.tty
        }
    }

    #[test]
    fn flag_wins() {
        let env = MockEnv::new().var("TALLY_USER", "env-user");
        assert_eq!(
            resolve_user_with(Some("alice"), Some("cfg"), &env),
            Some("alice".into())
        );
    }

    #[test]
    fn blank_flag_is_ignored() {
        let env = MockEnv::new().var("TALLY_USER", "env-user");
        assert_eq!(
            resolve_user_with(Some("  "), None, &env),
            Some("env-user".into())
        );
    }

    #[test]
    fn env_beats_config() {
        let env = MockEnv::new().var("TALLY_USER", "env-user");
        assert_eq!(
            resolve_user_with(None, Some("cfg"), &env),
            Some("env-user".into())
        );
    }

    #[test]
    fn config_beats_login_name() {
        let env = MockEnv::new().var("USER", "login").tty();
        assert_eq!(resolve_user_with(None, Some("cfg"), &env), Some("cfg".into()));
    }

    #[test]
    fn login_name_only_on_a_tty() {
        let piped = MockEnv::new().var("USER", "login");
        assert_eq!(resolve_user_with(None, None, &piped), None);

        let tty = MockEnv::new().var("USER", "login").tty();
        assert_eq!(resolve_user_with(None, None, &tty), Some("login".into()));
    }
}
