//! # USB Bulk Transport
//!
//! Streams print data to the first OUT endpoint a device declares. The
//! endpoint is resolved from a [`DeviceLayout`], a plain copy of the
//! configuration → interface → alternate setting → endpoint tree, so the
//! selection rule does not depend on having hardware attached.

use std::time::Duration;

use log::{debug, info, warn};
use rusb::{ConfigDescriptor, Context, Device, DeviceHandle, Direction, TransferType, UsbContext};

use super::{Transport, TransportKind};
use crate::error::{Error, TransportError};

/// Device selection by vendor id, and optionally product id and serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbFilter {
    pub vendor_id: u16,
    pub product_id: Option<u16>,
    pub serial: Option<String>,
}

impl UsbFilter {
    pub fn new(vendor_id: u16) -> Self {
        UsbFilter {
            vendor_id,
            product_id: None,
            serial: None,
        }
    }

    pub fn product_id(self, product_id: u16) -> Self {
        UsbFilter {
            product_id: Some(product_id),
            ..self
        }
    }

    pub fn serial(self, serial: String) -> Self {
        UsbFilter {
            serial: Some(serial),
            ..self
        }
    }

    fn matches_ids(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id.map_or(true, |pid| pid == product_id)
    }
}

/// Location of an endpoint in the descriptor tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub config: u8,
    pub iface: u8,
    pub setting: u8,
    pub address: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    pub address: u8,
    pub direction: Direction,
    pub transfer_type: TransferType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltSetting {
    pub setting: u8,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceLayout {
    pub number: u8,
    pub alternates: Vec<AltSetting>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayout {
    pub number: u8,
    pub interfaces: Vec<InterfaceLayout>,
}

/// Endpoint tree of a device, in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceLayout {
    pub configs: Vec<ConfigLayout>,
}

impl DeviceLayout {
    /// Read every configuration descriptor of `device`.
    pub fn read<T: UsbContext>(device: &Device<T>) -> Result<Self, Error> {
        let device_desc = device.device_descriptor()?;
        let mut configs = Vec::new();
        for n in 0..device_desc.num_configurations() {
            match device.config_descriptor(n) {
                Ok(config_desc) => configs.push(ConfigLayout::from_descriptor(&config_desc)),
                Err(err) => debug!("skipping configuration {}: {:?}", n, err),
            }
        }
        Ok(DeviceLayout { configs })
    }

    /// First endpoint with direction OUT, scanning interfaces, then their
    /// alternate settings, then endpoints.
    ///
    /// Fails with [`Error::DeviceUnsupported`] if the device has none.
    pub fn find_out_endpoint(&self) -> Result<Endpoint, Error> {
        for config in &self.configs {
            for interface in &config.interfaces {
                for alt in &interface.alternates {
                    if let Some(ep) = alt.endpoints.iter().find(|ep| ep.direction == Direction::Out) {
                        return Ok(Endpoint {
                            config: config.number,
                            iface: interface.number,
                            setting: alt.setting,
                            address: ep.address,
                        });
                    }
                }
            }
        }
        Err(Error::DeviceUnsupported(
            "device has no OUT endpoint".into(),
        ))
    }
}

impl ConfigLayout {
    fn from_descriptor(config_desc: &ConfigDescriptor) -> Self {
        let interfaces = config_desc
            .interfaces()
            .map(|interface| InterfaceLayout {
                number: interface.number(),
                alternates: interface
                    .descriptors()
                    .map(|interface_desc| AltSetting {
                        setting: interface_desc.setting_number(),
                        endpoints: interface_desc
                            .endpoint_descriptors()
                            .map(|endpoint_desc| EndpointInfo {
                                address: endpoint_desc.address(),
                                direction: endpoint_desc.direction(),
                                transfer_type: endpoint_desc.transfer_type(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();
        ConfigLayout {
            number: config_desc.number(),
            interfaces,
        }
    }
}

/// USB printer reached through a bulk OUT endpoint.
pub struct UsbPrinter<T: UsbContext = Context> {
    device: Device<T>,
    handle: Option<DeviceHandle<T>>,
    endpoint: Option<Endpoint>,
    claimed: bool,
    timeout: Duration,
}

impl<T: UsbContext> UsbPrinter<T> {
    /// Wrap a device; the endpoint is discovered on connect.
    pub fn new(device: Device<T>) -> Self {
        UsbPrinter {
            device,
            handle: None,
            endpoint: None,
            claimed: false,
            timeout: Duration::from_secs(10),
        }
    }

    /// Use an endpoint the caller already discovered.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Bulk write timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        self.endpoint
    }

    fn claim(&mut self, endpoint: Endpoint) -> Result<(), Error> {
        if self.handle.is_none() {
            self.handle = Some(self.device.open()?);
        }
        let handle = self.handle.as_mut().ok_or(TransportError::NotConnected)?;

        // Printers bound to usblp need the kernel driver detached first
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(err) => return Err(err.into()),
        }

        if handle.active_configuration()? != endpoint.config {
            handle.set_active_configuration(endpoint.config)?;
        }
        handle.claim_interface(endpoint.iface)?;
        self.claimed = true;
        if endpoint.setting != 0 {
            handle.set_alternate_setting(endpoint.iface, endpoint.setting)?;
        }
        info!(
            "claimed interface {} (setting {}), OUT endpoint {:#04x}",
            endpoint.iface, endpoint.setting, endpoint.address
        );
        Ok(())
    }
}

impl UsbPrinter<Context> {
    /// Find the first attached device matching `filter`.
    pub fn open(filter: &UsbFilter) -> Result<Self, Error> {
        let context = Context::new().map_err(|err| {
            Error::DeviceUnavailable(format!("USB is not available: {}", err))
        })?;
        let devices = context.devices()?;

        if devices.is_empty() {
            debug!("Failed to read device list");
            return Err(Error::DeviceUnavailable(
                "can't read USB device list, permission issue?".into(),
            ));
        }
        for device in devices.iter() {
            let device_desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(err) => {
                    debug!("{:?}", err);
                    continue;
                }
            };
            if !filter.matches_ids(device_desc.vendor_id(), device_desc.product_id()) {
                continue;
            }
            let Some(wanted) = filter.serial.as_deref() else {
                return Ok(Self::new(device));
            };
            match read_serial_number(&device) {
                Ok(serial) if serial == wanted => return Ok(Self::new(device)),
                Ok(_) => continue,
                Err(err) => {
                    debug!("Failed to read serial number string: {:?}", err);
                    continue;
                }
            }
        }
        debug!("No device matches {:?}", filter);
        Err(Error::DeviceUnavailable(format!(
            "no USB device matches {:04x}:{}",
            filter.vendor_id,
            filter
                .product_id
                .map_or_else(|| "*".to_string(), |pid| format!("{:04x}", pid))
        )))
    }
}

fn read_serial_number<T: UsbContext>(device: &Device<T>) -> Result<String, rusb::Error> {
    let timeout = Duration::from_secs(1);
    let device_desc = device.device_descriptor()?;
    let handle = device.open()?;
    let language = handle
        .read_languages(timeout)?
        .into_iter()
        .next()
        .ok_or(rusb::Error::NotFound)?;
    handle.read_serial_number_string(language, &device_desc, timeout)
}

impl<T: UsbContext> Transport for UsbPrinter<T> {
    fn kind(&self) -> TransportKind {
        TransportKind::Usb
    }

    fn is_ready(&self) -> bool {
        self.handle.is_some() && self.claimed && self.endpoint.is_some()
    }

    fn connect(&mut self) -> Result<(), Error> {
        let endpoint = match self.endpoint {
            Some(endpoint) => endpoint,
            None => {
                let endpoint = DeviceLayout::read(&self.device)?.find_out_endpoint()?;
                debug!("selected endpoint {:?}", endpoint);
                self.endpoint = Some(endpoint);
                endpoint
            }
        };
        self.claim(endpoint)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let (handle, endpoint) = match (self.handle.as_ref(), self.endpoint) {
            (Some(handle), Some(endpoint)) if self.claimed => (handle, endpoint),
            _ => return Err(TransportError::NotConnected.into()),
        };
        let n = handle.write_bulk(endpoint.address, data, self.timeout)?;
        if n != data.len() {
            debug!(
                "write error: bytes wrote {} != bytes supplied {}, possibly timeout ?",
                n,
                data.len()
            );
            return Err(TransportError::ShortWrite {
                written: n,
                expected: data.len(),
            }
            .into());
        }
        Ok(())
    }
}

impl<T: UsbContext> Drop for UsbPrinter<T> {
    fn drop(&mut self) {
        if let (Some(handle), Some(endpoint), true) =
            (self.handle.as_mut(), self.endpoint, self.claimed)
        {
            if let Err(err) = handle.release_interface(endpoint.iface) {
                warn!("failed to release interface {}: {}", endpoint.iface, err);
            }
        }
    }
}

pub(crate) fn is_supported() -> bool {
    Context::new().is_ok()
}

/// Attached devices with their ids and first OUT endpoint, for inspection.
pub fn list_devices() -> Result<Vec<(u16, u16, Result<Endpoint, Error>)>, Error> {
    let context = Context::new()
        .map_err(|err| Error::DeviceUnavailable(format!("USB is not available: {}", err)))?;
    let mut found = Vec::new();
    for device in context.devices()?.iter() {
        let device_desc = match device.device_descriptor() {
            Ok(d) => d,
            Err(_) => continue,
        };
        let endpoint = DeviceLayout::read(&device).and_then(|layout| layout.find_out_endpoint());
        found.push((device_desc.vendor_id(), device_desc.product_id(), endpoint));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(address: u8, direction: Direction) -> EndpointInfo {
        EndpointInfo {
            address,
            direction,
            transfer_type: TransferType::Bulk,
        }
    }

    fn layout(interfaces: Vec<InterfaceLayout>) -> DeviceLayout {
        DeviceLayout {
            configs: vec![ConfigLayout {
                number: 1,
                interfaces,
            }],
        }
    }

    #[test]
    fn picks_first_out_endpoint_in_declared_order() {
        let device = layout(vec![
            InterfaceLayout {
                number: 0,
                alternates: vec![AltSetting {
                    setting: 0,
                    endpoints: vec![ep(0x81, Direction::In)],
                }],
            },
            InterfaceLayout {
                number: 1,
                alternates: vec![
                    AltSetting {
                        setting: 0,
                        endpoints: vec![ep(0x82, Direction::In)],
                    },
                    AltSetting {
                        setting: 1,
                        endpoints: vec![ep(0x83, Direction::In), ep(0x02, Direction::Out), ep(0x03, Direction::Out)],
                    },
                ],
            },
            InterfaceLayout {
                number: 2,
                alternates: vec![AltSetting {
                    setting: 0,
                    endpoints: vec![ep(0x04, Direction::Out)],
                }],
            },
        ]);

        assert_eq!(
            device.find_out_endpoint().unwrap(),
            Endpoint {
                config: 1,
                iface: 1,
                setting: 1,
                address: 0x02
            }
        );
    }

    #[test]
    fn direction_decides_not_transfer_type() {
        let device = layout(vec![InterfaceLayout {
            number: 0,
            alternates: vec![AltSetting {
                setting: 0,
                endpoints: vec![EndpointInfo {
                    address: 0x01,
                    direction: Direction::Out,
                    transfer_type: TransferType::Interrupt,
                }],
            }],
        }]);
        assert_eq!(device.find_out_endpoint().unwrap().address, 0x01);
    }

    #[test]
    fn no_out_endpoint_is_unsupported() {
        let device = layout(vec![InterfaceLayout {
            number: 0,
            alternates: vec![AltSetting {
                setting: 0,
                endpoints: vec![ep(0x81, Direction::In)],
            }],
        }]);
        assert!(matches!(
            device.find_out_endpoint(),
            Err(Error::DeviceUnsupported(_))
        ));
        assert!(matches!(
            DeviceLayout::default().find_out_endpoint(),
            Err(Error::DeviceUnsupported(_))
        ));
    }

    #[test]
    fn filter_matches_optional_product() {
        let any = UsbFilter::new(0x0416);
        assert!(any.matches_ids(0x0416, 0x5011));
        assert!(!any.matches_ids(0x04b8, 0x5011));

        let exact = UsbFilter::new(0x0416).product_id(0x5011);
        assert!(exact.matches_ids(0x0416, 0x5011));
        assert!(!exact.matches_ids(0x0416, 0x5012));
    }
}
