//! ESP-IDF station-mode radio link.

use super::{JoinError, LinkStatus, RadioLink};
use crate::config::NetworkConfig;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::ipv4::{
    ClientConfiguration as Ipv4ClientConfiguration, ClientSettings, Configuration as Ipv4Configuration,
    Mask, Subnet,
};
use esp_idf_svc::netif::{EspNetif, NetifConfiguration};
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};
use std::time::Duration;

/// [`RadioLink`] over the ESP-IDF WiFi driver in station mode.
///
/// A static-IP override from [`NetworkConfig`] is applied when the netif is
/// created, so a configuration change saved through the portal takes
/// effect on the next boot.
pub struct EspRadioLink<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
}

impl<'a> EspRadioLink<'a> {
    /// Wrap the modem peripheral in a blocking station-mode driver.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        network: &NetworkConfig,
    ) -> Result<Self, JoinError> {
        let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), None)
            .map_err(|e| JoinError::Fault(format!("wifi driver init: {:?}", e)))?;

        if network.is_configured() {
            let netif = EspNetif::new_with_conf(&static_ip_conf(network))
                .map_err(|e| JoinError::Fault(format!("static netif init: {:?}", e)))?;
            esp_wifi
                .swap_netif_sta(netif)
                .map_err(|e| JoinError::Fault(format!("static netif swap: {:?}", e)))?;
            info!("Static IP configuration applied");
        }

        let wifi = BlockingWifi::wrap(esp_wifi, sysloop)
            .map_err(|e| JoinError::Fault(format!("wifi wrapper init: {:?}", e)))?;
        Ok(Self { wifi })
    }
}

fn static_ip_conf(network: &NetworkConfig) -> NetifConfiguration {
    let mut conf = NetifConfiguration::wifi_default_client();
    if let (Some(ip), Some(gateway)) = (network.static_ip_addr(), network.gateway_addr()) {
        let mask = network
            .subnet_addr()
            .and_then(|m| Mask::try_from(m).ok())
            .unwrap_or(Mask(24));
        conf.ip_configuration = Some(Ipv4Configuration::Client(Ipv4ClientConfiguration::Fixed(
            ClientSettings {
                ip,
                subnet: Subnet { gateway, mask },
                dns: network.primary_dns_addr(),
                secondary_dns: network.secondary_dns_addr(),
            },
        )));
    }
    conf
}

impl RadioLink for EspRadioLink<'_> {
    fn join(&mut self, ssid: &str, password: &str, timeout: Duration) -> Result<(), JoinError> {
        info!("Joining network: {}", ssid);

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| JoinError::Failed("ssid does not fit driver limits".to_string()))?,
            password: password
                .try_into()
                .map_err(|_| JoinError::Failed("password does not fit driver limits".to_string()))?,
            auth_method,
            ..Default::default()
        });

        self.wifi
            .set_configuration(&config)
            .map_err(|e| JoinError::Fault(format!("set configuration: {:?}", e)))?;
        self.wifi
            .start()
            .map_err(|e| JoinError::Fault(format!("driver start: {:?}", e)))?;

        // ESP-IDF signals association/DHCP through the event loop; the
        // blocking wrapper enforces its own internal timeouts, which are
        // below the agent's configured ceiling.
        let _ = timeout;
        self.wifi
            .connect()
            .map_err(|e| JoinError::Failed(format!("association: {:?}", e)))?;
        self.wifi
            .wait_netif_up()
            .map_err(|e| JoinError::Failed(format!("DHCP: {:?}", e)))?;

        if let Ok(ip_info) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("Joined {}, IP: {}", ssid, ip_info.ip);
        }
        Ok(())
    }

    fn link_status(&mut self) -> LinkStatus {
        LinkStatus {
            joined: self.wifi.is_connected().unwrap_or(false),
            signal_dbm: None,
        }
    }

    fn leave(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("Disconnect failed: {:?}", e);
        }
        if let Err(e) = self.wifi.stop() {
            warn!("Driver stop failed: {:?}", e);
        }
    }
}
