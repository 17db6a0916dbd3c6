//! Server command-line parameters.

use std::path::Path;

use crate::config::FixtureConfig;

/// Certificate chain file name inside the certificate folder.
pub const PUBLIC_CERT: &str = "public.cert";
/// Private key file name inside the certificate folder.
pub const PRIVATE_CERT: &str = "private.cert";

/// Flag carrying the TLS chain and key paths.
pub const TLS_FLAG: &str = "-Z -o";
pub const MEMORY_FLAG: &str = "-m";
pub const OPTION_FLAG: &str = "-o";
/// Enables `stats sizes` reporting.
pub const TRACK_SIZES: &str = "track_sizes";

/// Ordered flag → value pairs handed to the server binary.
///
/// Insertion order is kept so the rendered command line is deterministic.
/// Inserting a flag that is already present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerParameters {
    entries: Vec<(String, String)>,
}

impl ServerParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, flag: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let flag = flag.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(f, _)| *f == flag) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((flag, value)),
        }
        self
    }

    pub fn get(&self, flag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == flag)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.get(flag).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders `" <flag> <value>"` for every pair, in order.
    pub fn to_flag_string(&self) -> String {
        self.iter().fold(String::new(), |mut out, (flag, value)| {
            out.push(' ');
            out.push_str(flag);
            out.push(' ');
            out.push_str(value);
            out
        })
    }
}

impl<F, V> FromIterator<(F, V)> for ServerParameters
where
    F: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (F, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (flag, value) in iter {
            params.insert(flag, value);
        }
        params
    }
}

/// Builds the default server flags for `config`.
///
/// Always sets the memory limit and size tracking. With a certificate folder
/// configured, TLS is switched on first, pointing at the chain and key files
/// inside that folder.
pub fn build_parameters(config: &FixtureConfig) -> ServerParameters {
    let mut params = ServerParameters::new();

    if let Some(folder) = config.cert_folder.as_deref() {
        params.insert(TLS_FLAG, tls_value(folder));
    }
    params
        .insert(MEMORY_FLAG, config.memory_limit.to_string())
        .insert(OPTION_FLAG, TRACK_SIZES);

    params
}

fn tls_value(folder: &Path) -> String {
    format!(
        "{},{}",
        folder.join(PUBLIC_CERT).display(),
        folder.join(PRIVATE_CERT).display()
    )
}
