//! Listener configuration and callback URL construction.
//!
//! [`ListenerConfig`] is what callers fill in; every field is optional or has
//! a default. [`ListenerConfig::resolve`] turns it into [`ListenerSettings`],
//! the concrete values the listener runs with, discovering the local address
//! and a free port where none were given.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use callback_server::{detect_local_ip, find_available_port, ServerConfig, DEFAULT_MAX_BODY_BYTES};
use url::Url;

use crate::error::{ListenerError, ListenerResult};

pub use callback_server::TlsConfig as SslConfig;

/// Ports scanned for a free listener port when none is configured
pub const DEFAULT_PORT_RANGE: (u16, u16) = (8000, 8999);

/// Lease requested from the hub (a little over 27 hours)
pub const DEFAULT_LEASE_SECONDS: u32 = 100_000;

/// Upper bound on a single unsubscribe call
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Public-facing address overrides for a listener behind a reverse proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseProxyConfig {
    /// Public port; defaults to the listener port
    pub port: Option<u16>,
    /// Whether the public URL uses https; defaults to whether TLS is configured
    pub ssl: Option<bool>,
    /// Path prefix the proxy routes to this listener
    pub path_prefix: Option<String>,
}

impl ReverseProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = Some(ssl);
        self
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }
}

/// Configuration for a [`Listener`](crate::Listener).
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Public host name or IP; defaults to the detected local address
    pub host_name: Option<String>,
    /// Port to bind; defaults to the first free port in `port_range`
    pub port: Option<u16>,
    /// Terminate TLS in-process with this certificate material
    pub ssl: Option<SslConfig>,
    /// Public-facing address overrides
    pub reverse_proxy: ReverseProxyConfig,
    /// Inclusive range scanned when `port` is not set
    pub port_range: (u16, u16),
    /// Lease requested for every subscription
    pub lease_seconds: u32,
    /// Upper bound on a single unsubscribe call
    pub stop_timeout: Duration,
    /// Upper bound on notification body size
    pub max_body_bytes: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host_name: None,
            port: None,
            ssl: None,
            reverse_proxy: ReverseProxyConfig::default(),
            port_range: DEFAULT_PORT_RANGE,
            lease_seconds: DEFAULT_LEASE_SECONDS,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ListenerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the public host name
    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    /// Set the port to bind
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Serve over TLS with the given PEM material
    pub fn with_ssl(mut self, ssl: SslConfig) -> Self {
        self.ssl = Some(ssl);
        self
    }

    /// Set reverse proxy overrides
    pub fn with_reverse_proxy(mut self, reverse_proxy: ReverseProxyConfig) -> Self {
        self.reverse_proxy = reverse_proxy;
        self
    }

    /// Set the range scanned for a free port
    pub fn with_port_range(mut self, start: u16, end: u16) -> Self {
        self.port_range = (start, end);
        self
    }

    /// Set the requested lease duration
    pub fn with_lease_seconds(mut self, lease_seconds: u32) -> Self {
        self.lease_seconds = lease_seconds;
        self
    }

    /// Set the unsubscribe timeout
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the notification body size limit
    pub fn with_max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ListenerResult<()> {
        let (start, end) = self.port_range;
        if start > end {
            return Err(ListenerError::Configuration(format!(
                "port_range start ({start}) must not exceed end ({end})"
            )));
        }

        if self.lease_seconds == 0 {
            return Err(ListenerError::Configuration(
                "lease_seconds must be greater than 0".to_string(),
            ));
        }

        if self.stop_timeout.is_zero() {
            return Err(ListenerError::Configuration(
                "stop_timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(ListenerError::Configuration(
                "max_body_bytes must be greater than 0".to_string(),
            ));
        }

        if self.reverse_proxy.port == Some(0) {
            return Err(ListenerError::Configuration(
                "reverse_proxy.port must be greater than 0".to_string(),
            ));
        }

        // The callback URL carries the configured port, not the bound one
        if self.port == Some(0) && self.reverse_proxy.port.is_none() {
            return Err(ListenerError::Configuration(
                "port 0 needs an explicit reverse_proxy.port for the callback URL".to_string(),
            ));
        }

        if start == 0 {
            return Err(ListenerError::Configuration(
                "port_range must not include port 0".to_string(),
            ));
        }

        if let Some(host) = &self.host_name {
            normalize_host(host)?;
        }

        Ok(())
    }

    /// Validate and fill in discovered defaults.
    ///
    /// With both `host_name` and `port` set, no discovery takes place.
    pub fn resolve(self) -> ListenerResult<ListenerSettings> {
        self.validate()?;

        let host_name = match &self.host_name {
            Some(host) => normalize_host(host)?,
            None => {
                let ip = detect_local_ip().ok_or_else(|| {
                    ListenerError::Configuration(
                        "host_name not set and no local address could be detected".to_string(),
                    )
                })?;
                format_ip(ip)
            }
        };

        let port = match self.port {
            Some(port) => port,
            None => {
                let (start, end) = self.port_range;
                find_available_port(start, end).ok_or_else(|| {
                    ListenerError::Configuration(format!("no free port in range {start}-{end}"))
                })?
            }
        };

        let public = PublicAddress {
            port: self.reverse_proxy.port.unwrap_or(port),
            ssl: self.reverse_proxy.ssl.unwrap_or(self.ssl.is_some()),
            path_prefix: self
                .reverse_proxy
                .path_prefix
                .as_deref()
                .unwrap_or_default()
                .trim_matches('/')
                .to_string(),
        };

        Ok(ListenerSettings {
            host_name,
            port,
            ssl: self.ssl,
            public,
            lease_seconds: self.lease_seconds,
            stop_timeout: self.stop_timeout,
            max_body_bytes: self.max_body_bytes,
        })
    }
}

/// The address the hub is told to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicAddress {
    pub port: u16,
    pub ssl: bool,
    /// Prefix with leading and trailing slashes removed
    pub path_prefix: String,
}

impl PublicAddress {
    fn scheme(&self) -> &'static str {
        if self.ssl {
            "https"
        } else {
            "http"
        }
    }

    fn is_default_port(&self) -> bool {
        (self.ssl && self.port == 443) || (!self.ssl && self.port == 80)
    }
}

/// Resolved listener settings.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    /// Host name as it appears in callback URLs (IPv6 bracketed)
    pub host_name: String,
    /// Port the callback server binds
    pub port: u16,
    pub ssl: Option<SslConfig>,
    pub public: PublicAddress,
    pub lease_seconds: u32,
    pub stop_timeout: Duration,
    pub max_body_bytes: u64,
}

impl ListenerSettings {
    /// Build the public callback URL for a subscription identifier.
    ///
    /// ```
    /// use helix_webhooks::{ListenerConfig, ReverseProxyConfig};
    ///
    /// let settings = ListenerConfig::new()
    ///     .with_host_name("hooks.example.com")
    ///     .with_port(8080)
    ///     .with_reverse_proxy(
    ///         ReverseProxyConfig::new()
    ///             .with_port(443)
    ///             .with_ssl(true)
    ///             .with_path_prefix("/twitch/"),
    ///     )
    ///     .resolve()
    ///     .unwrap();
    ///
    /// assert_eq!(
    ///     settings.build_hook_url("abc123"),
    ///     "https://hooks.example.com/twitch/abc123"
    /// );
    /// ```
    pub fn build_hook_url(&self, id: &str) -> String {
        let mut url = format!("{}://{}", self.public.scheme(), self.host_name);
        if !self.public.is_default_port() {
            url.push_str(&format!(":{}", self.public.port));
        }
        if !self.public.path_prefix.is_empty() {
            url.push('/');
            url.push_str(&self.public.path_prefix);
        }
        url.push('/');
        url.push_str(id);
        url
    }

    /// Address the callback server binds: all interfaces on the configured port
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port)
    }

    pub(crate) fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.bind_addr())
            .with_tls(self.ssl.clone())
            .with_max_body_bytes(self.max_body_bytes)
    }
}

fn format_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{v6}]"),
    }
}

/// Bracket IPv6 literals and check the result is a usable URL host.
fn normalize_host(host: &str) -> ListenerResult<String> {
    let host = host.trim();
    let candidate = match host.parse::<Ipv6Addr>() {
        Ok(v6) => format!("[{v6}]"),
        Err(_) => host.to_string(),
    };

    let parsed = Url::parse(&format!("http://{candidate}/"))
        .map_err(|e| ListenerError::Configuration(format!("invalid host_name {host:?}: {e}")))?;

    // Reject anything that smuggles a port, credentials or a path into the host
    if parsed.port().is_some() || !parsed.username().is_empty() || parsed.path() != "/" {
        return Err(ListenerError::Configuration(format!(
            "invalid host_name {host:?}: expected a bare host"
        )));
    }

    Ok(candidate)
}
