// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// LAN advertisement of the web front-end via mDNS / DNS-SD.
//
// Failure to advertise never stops the server; clients can still use the
// address printed at startup.

use tracing::{info, warn};

/// DNS-SD service type for plain HTTP.
pub const HTTP_SERVICE_TYPE: &str = "_http._tcp.local.";

/// Instance name shown in service browsers.
pub const SERVICE_NAME: &str = "Printdrop";

/// A live mDNS registration.
pub struct MdnsAdvertiser {
    daemon: mdns_sd::ServiceDaemon,
    fullname: Option<String>,
}

impl MdnsAdvertiser {
    /// Register `SERVICE_NAME` on `port`.  Returns `None` if the daemon
    /// could not be created.
    pub fn register(port: u16) -> Option<Self> {
        let daemon = match mdns_sd::ServiceDaemon::new() {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "failed to create mDNS daemon for advertisement");
                return None;
            }
        };

        let properties = [("path", "/"), ("txtvers", "1")];
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "printdrop".into());

        let mut fullname = None;
        match mdns_sd::ServiceInfo::new(
            HTTP_SERVICE_TYPE,
            SERVICE_NAME,
            &format!("{hostname}.local."),
            "",
            port,
            &properties[..],
        ) {
            Ok(service_info) => {
                let service_info = service_info.enable_addr_auto();
                let name = service_info.get_fullname().to_owned();
                match daemon.register(service_info) {
                    Ok(()) => {
                        info!(service_type = HTTP_SERVICE_TYPE, name = SERVICE_NAME, port, "mDNS service registered");
                        fullname = Some(name);
                    }
                    Err(e) => warn!(error = %e, "failed to register mDNS service"),
                }
            }
            Err(e) => warn!(error = %e, "failed to create mDNS ServiceInfo"),
        }

        Some(Self { daemon, fullname })
    }

    /// Withdraw the advertisement and stop the daemon.
    pub fn unregister(mut self) {
        if let Some(fullname) = self.fullname.take() {
            match self.daemon.unregister(&fullname) {
                Ok(_) => info!(name = %fullname, "mDNS service unregistered"),
                Err(e) => warn!(error = %e, "failed to unregister mDNS service"),
            }
        }
        if let Err(e) = self.daemon.shutdown() {
            warn!(error = %e, "failed to shut down mDNS daemon");
        }
    }
}
