//! hidapi backed transport and device discovery.

use std::ffi::CString;

use hidapi::{HidApi, HidDevice};

use crate::drivers::steam_controller::{ProductId, VID};

use super::{ConnectionInfo, Transport, TransportError, FEATURE_REPORT_SIZE};

// A zero timeout makes input reads poll instead of block.
const INPUT_TIMEOUT_MS: i32 = 0;

/// Enumerate candidate controller endpoints, wireless dongles first.
pub fn enumerate() -> Result<Vec<ConnectionInfo>, TransportError> {
    let api = HidApi::new()?;
    let mut found = Vec::new();
    for wireless in [true, false] {
        let pid = if wireless {
            ProductId::WirelessDongle
        } else {
            ProductId::Wired
        }
        .to_u16();
        for device_info in api.device_list() {
            if device_info.vendor_id() == VID && device_info.product_id() == pid {
                found.push(ConnectionInfo {
                    path: device_info.path().to_string_lossy().into_owned(),
                    wireless,
                });
            }
        }
    }
    Ok(found)
}

/// Classify a (vendor, product) pair; `Some(wireless)` for devices this
/// library can drive.
pub(crate) fn identify(vendor_id: u16, product_id: u16) -> Option<bool> {
    if vendor_id != VID {
        return None;
    }
    if product_id == ProductId::Wired.to_u16() {
        Some(false)
    } else if product_id == ProductId::WirelessDongle.to_u16() {
        Some(true)
    } else {
        None
    }
}

/// Transport over a hidraw device opened through hidapi.
pub struct HidTransport {
    device: HidDevice,
}

impl HidTransport {
    /// Open the device behind `info` and verify it really is a Steam
    /// Controller before handing it to the protocol engine.
    pub fn open(info: &ConnectionInfo) -> Result<Self, TransportError> {
        let path = CString::new(info.path.clone())
            .map_err(|_| TransportError::InvalidPath(info.path.clone()))?;
        let api = HidApi::new()?;
        let device = api.open_path(&path)?;

        let device_info = device.get_device_info()?;
        if identify(device_info.vendor_id(), device_info.product_id()).is_none() {
            return Err(TransportError::NotSteamController(info.path.clone()));
        }

        Ok(Self { device })
    }
}

impl Transport for HidTransport {
    fn send_feature(&mut self, report: &[u8; FEATURE_REPORT_SIZE]) -> Result<(), TransportError> {
        self.device.send_feature_report(report)?;
        Ok(())
    }

    fn recv_feature(
        &mut self,
        report: &mut [u8; FEATURE_REPORT_SIZE],
    ) -> Result<(), TransportError> {
        // Byte 0 selects the report id to fetch; the controller only
        // uses report page 0.
        report[0] = 0;
        self.device.get_feature_report(report)?;
        Ok(())
    }

    fn read_input(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self.device.read_timeout(buf, INPUT_TIMEOUT_MS)?)
    }
}
