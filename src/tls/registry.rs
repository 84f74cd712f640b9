//! Configuration registry
//!
//! Holds the currently bound [`TlsSettings`] for each endpoint role. A bound
//! value is shared as an `Arc` and never mutated; binding again swaps in a
//! new value. [`ConfigRegistry::set_options`] runs the option pipeline
//! outside the lock and publishes only on success, so readers never observe
//! a partially applied configuration.

use super::options::{apply, TlsOption, TlsSettings};
use super::Result;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

static GLOBAL: Lazy<ConfigRegistry> = Lazy::new(ConfigRegistry::new);

/// Endpoint role a configuration is bound for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Slots {
    client: Arc<TlsSettings>,
    server: Arc<TlsSettings>,
}

impl Slots {
    fn get(&self, role: Role) -> &Arc<TlsSettings> {
        match role {
            Role::Client => &self.client,
            Role::Server => &self.server,
        }
    }

    fn get_mut(&mut self, role: Role) -> &mut Arc<TlsSettings> {
        match role {
            Role::Client => &mut self.client,
            Role::Server => &mut self.server,
        }
    }
}

/// Store of bound TLS settings, one per role
///
/// Clones share the same slots. Both roles start bound to empty settings.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    slots: Arc<RwLock<Slots>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        ConfigRegistry {
            slots: Arc::new(RwLock::new(Slots {
                client: Arc::new(TlsSettings::default()),
                server: Arc::new(TlsSettings::default()),
            })),
        }
    }

    /// Process-wide registry
    pub fn global() -> &'static ConfigRegistry {
        &GLOBAL
    }

    /// Bind `settings` for `role`, replacing the previous binding
    pub fn bind(&self, role: Role, settings: TlsSettings) -> Arc<TlsSettings> {
        let settings = Arc::new(settings);
        *self.slots.write().get_mut(role) = Arc::clone(&settings);
        log::info!(
            "bound {} TLS settings ({} certificates)",
            role,
            settings.certificates().len()
        );
        settings
    }

    /// Currently bound settings for `role`
    pub fn lookup(&self, role: Role) -> Arc<TlsSettings> {
        Arc::clone(self.slots.read().get(role))
    }

    /// Build fresh settings from `options` and bind them for `role`
    ///
    /// On error nothing is bound and the previous settings stay in effect.
    pub fn set_options<I>(&self, role: Role, options: I) -> Result<Arc<TlsSettings>>
    where
        I: IntoIterator<Item = TlsOption>,
    {
        let settings = apply(TlsSettings::default(), options)?;
        Ok(self.bind(role, settings))
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        ConfigRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::algorithm::KeyAlgorithm;
    use crate::tls::error::TlsError;
    use crate::tls::options::{
        append_bound_server_certificates, enable_insecure_skip_verify, ignore_system_certs,
        use_ephemeral_certificate,
    };
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_default_bindings() {
        let registry = ConfigRegistry::new();
        for role in [Role::Client, Role::Server] {
            let settings = registry.lookup(role);
            assert!(settings.certificates().is_empty());
            assert!(settings.roots().is_none());
            assert!(!settings.insecure_skip_verify());
        }
    }

    #[test]
    fn test_set_options_replaces_binding() {
        let registry = ConfigRegistry::new();
        registry
            .set_options(Role::Client, vec![enable_insecure_skip_verify()])
            .unwrap();
        assert!(registry.lookup(Role::Client).insecure_skip_verify());

        registry
            .set_options(Role::Client, vec![ignore_system_certs()])
            .unwrap();
        let settings = registry.lookup(Role::Client);
        assert!(!settings.insecure_skip_verify());
        assert!(settings.roots().is_some());
    }

    #[test]
    fn test_failed_run_keeps_previous_binding() {
        let registry = ConfigRegistry::new();
        let previous = registry
            .set_options(
                Role::Server,
                vec![use_ephemeral_certificate("localhost", KeyAlgorithm::Default, Duration::from_secs(60))],
            )
            .unwrap();

        let result = registry.set_options(
            Role::Server,
            vec![
                use_ephemeral_certificate("other.test", KeyAlgorithm::Default, Duration::from_secs(60)),
                enable_insecure_skip_verify(),
                TlsOption::new(|_| Err(TlsError::InvalidConfig("rejected".to_string()))),
            ],
        );
        assert!(result.is_err());

        let current = registry.lookup(Role::Server);
        assert!(Arc::ptr_eq(&previous, &current));
        assert!(!current.insecure_skip_verify());
        assert_eq!(current.certificates().len(), 1);
    }

    #[test]
    fn test_roles_are_independent() {
        let registry = ConfigRegistry::new();
        registry
            .set_options(Role::Server, vec![enable_insecure_skip_verify()])
            .unwrap();
        assert!(!registry.lookup(Role::Client).insecure_skip_verify());
    }

    #[test]
    fn test_clones_share_slots() {
        let registry = ConfigRegistry::new();
        let clone = registry.clone();
        clone
            .set_options(Role::Client, vec![enable_insecure_skip_verify()])
            .unwrap();
        assert!(registry.lookup(Role::Client).insecure_skip_verify());
    }

    #[test]
    fn test_bound_server_certificates() {
        let registry = ConfigRegistry::new();
        let server = registry
            .set_options(
                Role::Server,
                vec![use_ephemeral_certificate("localhost", KeyAlgorithm::Default, Duration::from_secs(60))],
            )
            .unwrap();

        let client = registry
            .set_options(
                Role::Client,
                vec![ignore_system_certs(), append_bound_server_certificates(&registry)],
            )
            .unwrap();

        let roots = client.roots().unwrap();
        assert_eq!(roots.certificates().len(), 1);
        assert!(roots.verify(server.certificates()[0].certificate()).unwrap());
    }

    #[test]
    fn test_concurrent_set_options() {
        let registry = ConfigRegistry::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let options = if i % 2 == 0 {
                        vec![enable_insecure_skip_verify()]
                    } else {
                        vec![ignore_system_certs()]
                    };
                    registry.set_options(Role::Client, options).unwrap();
                    let seen = registry.lookup(Role::Client);
                    // Every visible binding is one complete pipeline result.
                    assert!(seen.insecure_skip_verify() != seen.roots().is_some());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_global_registry() {
        let settings = ConfigRegistry::global().lookup(Role::Server);
        assert!(settings.roots().is_none());
    }
}
