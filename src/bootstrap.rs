//! Windows remote-management bootstrap script.
//!
//! The script body comes from a template owned by the host tool. The engine
//! only supplies the parameters and embeds whatever text comes back as a
//! user-data part.

/// Filename of the injected user-data part.
pub const BOOTSTRAP_FILENAME: &str = "setup_winrm.ps1";

/// MIME subtype of the injected user-data part.
pub const BOOTSTRAP_CONTENT_TYPE: &str = "x-shellscript";

/// Values available to the bootstrap template.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootstrapParams {
    /// User the script creates or configures.
    pub username: String,
    /// Password assigned to [`Self::username`].
    pub password: String,
    /// Hostname given to the instance.
    pub hostname: Option<String>,
}

/// Renders the bootstrap script.
pub trait BootstrapRenderer: Send + Sync {
    /// Returns the script text for `params`.
    fn render(&self, params: &BootstrapParams) -> String;
}

impl<F> BootstrapRenderer for F
where
    F: Fn(&BootstrapParams) -> String + Send + Sync,
{
    fn render(&self, params: &BootstrapParams) -> String {
        self(params)
    }
}
