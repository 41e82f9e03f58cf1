//! PCI ID database (`pci.ids` format) lookups.
//!
//! The text format nests by leading tabs:
//!
//! ```text
//! 10de  NVIDIA Corporation
//! 	1c82  GP107 [GeForce GTX 1050 Ti]
//! 		1043 8613  PH-GTX1050TI-4G
//! C 03  Display controller
//! 	00  VGA compatible controller
//! 		00  VGA controller
//! ```
//!
//! Both hierarchies are turned into trees once at load time. Each lookup walks a single parent's
//! children, so a device is only ever matched inside its own vendor's block. The database is
//! known to be incomplete for obsolete and vendor-private IDs; misses resolve to [`UNKNOWN`] (or
//! `None` for the optional programming-interface and subsystem levels) instead of failing.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::DatabaseError;
use crate::header::PciHeader;

/// Name reported for vendor, device, class and subclass IDs missing from the database.
pub const UNKNOWN: &str = "unknown";

/// Board-level (subsystem vendor, subsystem device) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubsystemId {
    pub vendor_id: u16,
    pub device_id: u16,
}

/// Names resolved for one image. Individual fields fall back to [`UNKNOWN`] independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsystemIdentity {
    pub vendor_name: String,
    pub device_name: String,
    pub class_name: String,
    pub subclass_name: String,
    /// `None` when the subclass has no matching programming-interface entry.
    pub prog_interface_name: Option<String>,
    /// `None` when the image carries no subsystem ID or the database has no entry for it.
    pub subsystem_name: Option<String>,
    pub subsystem_vendor_name: Option<String>,
}

#[derive(Debug, Clone)]
struct Vendor {
    id: u16,
    name: String,
    devices: Vec<Device>,
}

#[derive(Debug, Clone)]
struct Device {
    id: u16,
    name: String,
    subsystems: Vec<Subsystem>,
}

#[derive(Debug, Clone)]
struct Subsystem {
    id: SubsystemId,
    name: String,
}

#[derive(Debug, Clone)]
struct Class {
    id: u8,
    name: String,
    subclasses: Vec<Subclass>,
}

#[derive(Debug, Clone)]
struct Subclass {
    id: u8,
    name: String,
    prog_interfaces: Vec<(u8, String)>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Vendor,
    Class,
}

#[derive(Debug, Clone, Default)]
pub struct IdentifierDatabase {
    vendors: Vec<Vendor>,
    classes: Vec<Class>,
}

impl IdentifierDatabase {
    /// An empty database; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse database text. Vendor and class sections may appear in the same text, as they do in
    /// the upstream `pci.ids`.
    pub fn parse(text: &str) -> Self {
        let mut db = Self::new();
        db.extend_from_str(text);
        db
    }

    /// Load the vendor/device database and the class database from two files.
    pub fn load(vendor_path: &Path, class_path: &Path) -> Result<Self, DatabaseError> {
        let mut db = Self::new();
        db.load_file(vendor_path)?;
        db.load_file(class_path)?;
        Ok(db)
    }

    /// Merge the entries of one database file into this database.
    pub fn load_file(&mut self, path: &Path) -> Result<(), DatabaseError> {
        let bytes = fs::read(path).map_err(|source| DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // The upstream files are UTF-8, but older copies carry stray Latin-1 bytes.
        self.extend_from_str(&String::from_utf8_lossy(&bytes));
        tracing::debug!(
            "loaded {}: {} vendors, {} classes",
            path.display(),
            self.vendors.len(),
            self.classes.len()
        );
        Ok(())
    }

    pub fn extend_from_str(&mut self, text: &str) {
        let mut block = Block::None;

        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.starts_with('#') {
                continue;
            }
            if line.trim().is_empty() {
                block = Block::None;
                continue;
            }

            let depth = line.bytes().take_while(|&b| b == b'\t').count();
            let body = &line[depth..];

            match (depth, block) {
                (0, _) => block = self.push_top_level(body),
                (1, Block::Vendor) => {
                    let device = split_hex(body, 4).and_then(|(id, name)| {
                        Some(Device {
                            id: u16::from_str_radix(id, 16).ok()?,
                            name: name.to_string(),
                            subsystems: Vec::new(),
                        })
                    });
                    if let (Some(device), Some(vendor)) = (device, self.vendors.last_mut()) {
                        vendor.devices.push(device);
                    }
                }
                (1, Block::Class) => {
                    let subclass = split_hex(body, 2).and_then(|(id, name)| {
                        Some(Subclass {
                            id: u8::from_str_radix(id, 16).ok()?,
                            name: name.to_string(),
                            prog_interfaces: Vec::new(),
                        })
                    });
                    if let (Some(subclass), Some(class)) = (subclass, self.classes.last_mut()) {
                        class.subclasses.push(subclass);
                    }
                }
                (2, Block::Vendor) => {
                    let device = self
                        .vendors
                        .last_mut()
                        .and_then(|vendor| vendor.devices.last_mut());
                    if let (Some(subsystem), Some(device)) = (parse_subsystem(body), device) {
                        device.subsystems.push(subsystem);
                    }
                }
                (2, Block::Class) => {
                    let subclass = self
                        .classes
                        .last_mut()
                        .and_then(|class| class.subclasses.last_mut());
                    let prog_if = split_hex(body, 2).and_then(|(id, name)| {
                        Some((u8::from_str_radix(id, 16).ok()?, name.to_string()))
                    });
                    if let (Some(prog_if), Some(subclass)) = (prog_if, subclass) {
                        subclass.prog_interfaces.push(prog_if);
                    }
                }
                _ => {}
            }
        }
    }

    fn push_top_level(&mut self, body: &str) -> Block {
        if let Some(rest) = body.strip_prefix("C ") {
            let Some((id, name)) = split_hex(rest, 2) else {
                return Block::None;
            };
            let Ok(id) = u8::from_str_radix(id, 16) else {
                return Block::None;
            };
            self.classes.push(Class {
                id,
                name: name.to_string(),
                subclasses: Vec::new(),
            });
            return Block::Class;
        }

        let Some((id, name)) = split_hex(body, 4) else {
            // Unrecognized top-level lines end the current block.
            return Block::None;
        };
        let Ok(id) = u16::from_str_radix(id, 16) else {
            return Block::None;
        };
        self.vendors.push(Vendor {
            id,
            name: name.to_string(),
            devices: Vec::new(),
        });
        Block::Vendor
    }

    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty() && self.classes.is_empty()
    }

    fn vendor(&self, vendor_id: u16) -> Option<&Vendor> {
        self.vendors.iter().find(|v| v.id == vendor_id)
    }

    fn device(&self, vendor_id: u16, device_id: u16) -> Option<&Device> {
        self.vendor(vendor_id)?
            .devices
            .iter()
            .find(|d| d.id == device_id)
    }

    fn class(&self, class_code: u8) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == class_code)
    }

    fn subclass(&self, class_code: u8, subclass_code: u8) -> Option<&Subclass> {
        self.class(class_code)?
            .subclasses
            .iter()
            .find(|s| s.id == subclass_code)
    }

    pub fn vendor_name(&self, vendor_id: u16) -> &str {
        self.vendor(vendor_id).map_or(UNKNOWN, |v| v.name.as_str())
    }

    pub fn device_name(&self, vendor_id: u16, device_id: u16) -> &str {
        self.device(vendor_id, device_id).map_or(UNKNOWN, |d| d.name.as_str())
    }

    /// Board name for `subsystem` fitted with the chip `vendor_id:device_id`.
    pub fn subsystem_name(
        &self,
        vendor_id: u16,
        device_id: u16,
        subsystem: SubsystemId,
    ) -> Option<&str> {
        self.device(vendor_id, device_id)?
            .subsystems
            .iter()
            .find(|s| s.id == subsystem)
            .map(|s| s.name.as_str())
    }

    pub fn class_name(&self, class_code: u8) -> &str {
        self.class(class_code).map_or(UNKNOWN, |c| c.name.as_str())
    }

    pub fn subclass_name(&self, class_code: u8, subclass_code: u8) -> &str {
        self.subclass(class_code, subclass_code)
            .map_or(UNKNOWN, |s| s.name.as_str())
    }

    pub fn prog_interface_name(
        &self,
        class_code: u8,
        subclass_code: u8,
        prog_interface: u8,
    ) -> Option<&str> {
        self.subclass(class_code, subclass_code)?
            .prog_interfaces
            .iter()
            .find(|(id, _)| *id == prog_interface)
            .map(|(_, name)| name.as_str())
    }

    /// Resolve every name for an image header and optional board subsystem.
    pub fn identify(
        &self,
        header: &PciHeader,
        subsystem: Option<SubsystemId>,
    ) -> SubsystemIdentity {
        let (vendor, device) = (header.vendor_id, header.device_id);
        let (class, subclass) = (header.class_code, header.subclass_code);

        SubsystemIdentity {
            vendor_name: self.vendor_name(vendor).to_string(),
            device_name: self.device_name(vendor, device).to_string(),
            class_name: self.class_name(class).to_string(),
            subclass_name: self.subclass_name(class, subclass).to_string(),
            prog_interface_name: self
                .prog_interface_name(class, subclass, header.prog_interface)
                .map(str::to_string),
            subsystem_name: subsystem
                .and_then(|id| self.subsystem_name(vendor, device, id))
                .map(str::to_string),
            subsystem_vendor_name: subsystem
                .and_then(|id| self.vendor(id.vendor_id))
                .map(|v| v.name.clone()),
        }
    }
}

/// Split `"<digits hex chars><whitespace><name>"`.
fn split_hex(body: &str, digits: usize) -> Option<(&str, &str)> {
    let id = body.get(..digits)?;
    if !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let rest = &body[digits..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some((id, rest.trim()))
}

fn parse_subsystem(body: &str) -> Option<Subsystem> {
    let (vendor, rest) = split_hex(body, 4)?;
    let (device, name) = split_hex(rest, 4)?;
    Some(Subsystem {
        id: SubsystemId {
            vendor_id: u16::from_str_radix(vendor, 16).ok()?,
            device_id: u16::from_str_radix(device, 16).ok()?,
        },
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: &str = "\
# List of PCI ID's
#
1002  Advanced Micro Devices, Inc. [AMD/ATI]
\t6798  Tahiti XT [Radeon HD 7970/8970 OEM / R9 280X]
\t\t1002 3000  Tahiti XT2 [Radeon HD 7970 GHz Edition]
\t\t1043 041c  HD 7970 DirectCU II
# a comment inside the block does not end it
\t67df  Ellesmere [Radeon RX 470/480/570/570X/580/580X/590]
10de  NVIDIA Corporation
\t1c82  GP107 [GeForce GTX 1050 Ti]
\t\t1043 8613  PH-GTX1050TI-4G

8086  Intel Corporation
\t10d3  82574L Gigabit Network Connection
";

    const CLASSES: &str = "\
C 02  Network controller
\t00  Ethernet controller
C 03  Display controller
\t00  VGA compatible controller
\t\t00  VGA controller
\t\t01  8514 controller
\t02  3D controller
C 0c  Serial bus controller
\t03  USB controller
\t\t30  XHCI
";

    fn db() -> IdentifierDatabase {
        let mut db = IdentifierDatabase::parse(IDS);
        db.extend_from_str(CLASSES);
        db
    }

    #[test]
    fn vendor_and_device_lookup() {
        let db = db();
        assert_eq!(db.vendor_count(), 3);
        assert_eq!(db.vendor_name(0x1002), "Advanced Micro Devices, Inc. [AMD/ATI]");
        assert_eq!(
            db.device_name(0x1002, 0x67df),
            "Ellesmere [Radeon RX 470/480/570/570X/580/580X/590]"
        );
        assert_eq!(db.device_name(0x10de, 0x1c82), "GP107 [GeForce GTX 1050 Ti]");
        assert_eq!(db.device_name(0x8086, 0x10d3), "82574L Gigabit Network Connection");
    }

    #[test]
    fn device_lookup_is_scoped_to_its_vendor() {
        let db = db();
        // 1c82 exists, but only under 10de.
        assert_eq!(db.device_name(0x1002, 0x1c82), UNKNOWN);
        assert_eq!(db.device_name(0xabcd, 0x1c82), UNKNOWN);
        assert_eq!(db.vendor_name(0xabcd), UNKNOWN);
    }

    #[test]
    fn subsystem_lookup_is_scoped_to_its_device() {
        let db = db();
        let board = SubsystemId {
            vendor_id: 0x1043,
            device_id: 0x041c,
        };
        assert_eq!(
            db.subsystem_name(0x1002, 0x6798, board),
            Some("HD 7970 DirectCU II")
        );
        assert_eq!(db.subsystem_name(0x1002, 0x67df, board), None);
        assert_eq!(
            db.subsystem_name(
                0x1002,
                0x6798,
                SubsystemId {
                    vendor_id: 0x1043,
                    device_id: 0x8613
                }
            ),
            None
        );
    }

    #[test]
    fn class_hierarchy_lookup() {
        let db = db();
        assert_eq!(db.class_count(), 3);
        assert_eq!(db.class_name(0x03), "Display controller");
        assert_eq!(db.subclass_name(0x03, 0x00), "VGA compatible controller");
        assert_eq!(db.subclass_name(0x03, 0x02), "3D controller");
        assert_eq!(db.prog_interface_name(0x03, 0x00, 0x01), Some("8514 controller"));
        assert_eq!(db.prog_interface_name(0x0c, 0x03, 0x30), Some("XHCI"));
        // 3D controller has no programming interfaces listed.
        assert_eq!(db.prog_interface_name(0x03, 0x02, 0x00), None);
        assert_eq!(db.subclass_name(0x02, 0x80), UNKNOWN);
        assert_eq!(db.class_name(0xff), UNKNOWN);
        assert_eq!(db.subclass_name(0xff, 0x00), UNKNOWN);
    }

    #[test]
    fn blank_line_ends_a_block() {
        let db = IdentifierDatabase::parse("1234  Vendor\n\n\t5678  Orphan\n");
        assert_eq!(db.vendor_name(0x1234), "Vendor");
        assert_eq!(db.device_name(0x1234, 0x5678), UNKNOWN);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let db = IdentifierDatabase::parse(
            "zzzz  Bad vendor\n\tabcd  Orphan device\n1234 Vendor\r\n\tqq  junk\n\t0001  One\n",
        );
        assert_eq!(db.vendor_count(), 1);
        assert_eq!(db.vendor_name(0x1234), "Vendor");
        assert_eq!(db.device_name(0x1234, 0x0001), "One");
    }

    #[test]
    fn empty_database_is_total() {
        let db = IdentifierDatabase::new();
        assert!(db.is_empty());
        assert_eq!(db.vendor_name(0x10de), UNKNOWN);
        assert_eq!(db.device_name(0x10de, 0x1c82), UNKNOWN);
        assert_eq!(db.class_name(0x03), UNKNOWN);
        assert_eq!(db.prog_interface_name(0x03, 0x00, 0x00), None);
    }
}
