use std::{
    env,
    path::{Path, PathBuf},
};

use crate::error::{Result, ServerErr};

/// The identity announced to the manager when none is configured.
pub const DEFAULT_IDENTITY: &str = "model";

const IDENTITY_VAR: &str = "MODEL_SERVER_IDENTITY";
const IPC_SCHEME: &str = "ipc://";

/// Where to connect and how to introduce ourselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    endpoint: PathBuf,
    identity: String,
}

impl ServerConfig {
    /// Creates a new server configuration.
    ///
    /// # Args
    /// * `endpoint` - The socket path, optionally prefixed by `ipc://`.
    /// * `identity` - The transport identity.
    pub fn new(endpoint: &str, identity: impl Into<String>) -> Self {
        let endpoint = endpoint.strip_prefix(IPC_SCHEME).unwrap_or(endpoint);
        Self {
            endpoint: PathBuf::from(endpoint),
            identity: identity.into(),
        }
    }

    /// Builds the configuration from the process arguments and environment.
    ///
    /// # Args
    /// * `args` - The arguments after the program name, exactly one endpoint is expected.
    ///
    /// # Errors
    /// Returns `ServerErr::Usage` on any other amount of arguments.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        let [endpoint] = args.as_slice() else {
            return Err(ServerErr::Usage(format!(
                "expected exactly one endpoint argument, got {}",
                args.len()
            )));
        };

        let identity = env::var(IDENTITY_VAR).unwrap_or_else(|_| DEFAULT_IDENTITY.to_string());
        Ok(Self::new(endpoint, identity))
    }

    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}
