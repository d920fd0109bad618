//! # Connection Profiles
//!
//! Console connection settings are kept in an INI file, one section per
//! profile:
//!
//! ```ini
//! [default]
//! server = https://localhost:9002
//! webroot = /hac
//! user = admin
//! password = nimda
//! insecure = true
//!
//! [staging]
//! server = https://backoffice.staging.example.com
//! user = deployer
//! password = secret
//! timeout = 120
//! replica = api-7d9f8-abcde
//! ```

use ini::Ini;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Cookie used by the load balancer to pin a session to one node
pub const DEFAULT_REPLICA_COOKIE: &str = "ROUTE";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to load profile file '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: ini::Error,
    },
    #[error("Invalid value '{value}' for '{key}' in profile '{profile}'")]
    InvalidValue {
        profile: String,
        key: String,
        value: String,
    },
}

/// A single cluster node that requests should be routed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    pub id: String,
    pub cookie_name: String,
}

/// Connection settings for one console
pub trait ConnectionProfile {
    /// Base URL, e.g. `https://localhost:9002`
    fn server(&self) -> &str;
    /// Path prefix the console is mounted under, e.g. `/hac`
    fn webroot(&self) -> &str;
    fn username(&self) -> &str;
    fn password(&self) -> &str;
    /// Accept invalid TLS certificates
    fn insecure(&self) -> bool;
    fn timeout(&self) -> Option<Duration>;
    fn replica(&self) -> Option<&Replica>;

    /// Console root URL that command paths are appended to
    fn generated_url(&self) -> String {
        let server = self.server().trim_end_matches('/');
        let webroot = self.webroot().trim_matches('/');
        if webroot.is_empty() {
            server.to_string()
        } else {
            format!("{server}/{webroot}")
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniProfile {
    server: String,
    webroot: String,
    user: String,
    password: String,
    insecure: bool,
    timeout: Option<Duration>,
    replica: Option<Replica>,
}

impl IniProfile {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    pub fn with_webroot(mut self, webroot: impl Into<String>) -> Self {
        self.webroot = webroot.into();
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_replica(mut self, replica: Replica) -> Self {
        self.replica = Some(replica);
        self
    }

    fn from_section(name: &str, section: &ini::Properties) -> Result<Self, ProfileError> {
        let get = |key: &str| section.get(key).unwrap_or_default().trim().to_string();
        let invalid = |key: &str, value: &str| ProfileError::InvalidValue {
            profile: name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };

        let insecure = match get("insecure").to_lowercase().as_str() {
            "" | "false" | "no" | "0" => false,
            "true" | "yes" | "1" => true,
            other => return Err(invalid("insecure", other)),
        };

        let timeout = match get("timeout").as_str() {
            "" => None,
            secs => Some(Duration::from_secs(
                secs.parse::<u64>().map_err(|_| invalid("timeout", secs))?,
            )),
        };

        let replica = match get("replica").as_str() {
            "" => None,
            id => {
                let cookie_name = match get("replica_cookie").as_str() {
                    "" => DEFAULT_REPLICA_COOKIE.to_string(),
                    cookie => cookie.to_string(),
                };
                Some(Replica {
                    id: id.to_string(),
                    cookie_name,
                })
            }
        };

        Ok(Self {
            server: get("server"),
            webroot: get("webroot"),
            user: get("user"),
            password: get("password"),
            insecure,
            timeout,
            replica,
        })
    }
}

impl ConnectionProfile for IniProfile {
    fn server(&self) -> &str {
        &self.server
    }

    fn webroot(&self) -> &str {
        &self.webroot
    }

    fn username(&self) -> &str {
        &self.user
    }

    fn password(&self) -> &str {
        &self.password
    }

    fn insecure(&self) -> bool {
        self.insecure
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn replica(&self) -> Option<&Replica> {
        self.replica.as_ref()
    }
}

/// Profile with no server and no credentials
pub fn get_blank_profile() -> IniProfile {
    IniProfile::default()
}

/// Reads profiles from an INI file
pub struct IniProfileStore {
    path: String,
}

impl IniProfileStore {
    /// `path` may start with `~`
    pub fn new(path: &str) -> Self {
        Self {
            path: shellexpand::tilde(path).into_owned(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn load(&self) -> Result<Option<Ini>, ProfileError> {
        if !Path::new(&self.path).exists() {
            tracing::debug!("Profile file '{}' does not exist", self.path);
            return Ok(None);
        }
        Ini::load_from_file(&self.path)
            .map(Some)
            .map_err(|source| ProfileError::Load {
                path: self.path.clone(),
                source,
            })
    }

    /// Look up a profile by section name. A missing file yields `Ok(None)`.
    pub fn get_profile(&self, name: &str) -> Result<Option<IniProfile>, ProfileError> {
        let Some(ini) = self.load()? else {
            return Ok(None);
        };
        ini.section(Some(name))
            .map(|section| IniProfile::from_section(name, section))
            .transpose()
    }

    pub fn profile_names(&self) -> Result<Vec<String>, ProfileError> {
        Ok(self
            .load()?
            .map(|ini| ini.sections().flatten().map(str::to_string).collect())
            .unwrap_or_default())
    }
}
