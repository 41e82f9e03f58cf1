//! PCI Data Structure ("PCIR") parsing.

use serde::Serialize;

use crate::view::ByteView;

pub const PCIR_SIGNATURE: [u8; 4] = *b"PCIR";

/// Bytes covered by a PCI 3.0 data structure.
pub const PCIR_LEN: usize = 0x18;

/// Image lengths are expressed in 512-byte blocks.
pub const IMAGE_BLOCK_SIZE: usize = 512;

/// Bit 7 of the indicator byte marks the last image in the ROM.
pub const LAST_IMAGE_BIT: u8 = 0x80;

const VENDOR_ID: usize = 0x04;
const DEVICE_ID: usize = 0x06;
const DEVICE_LIST_POINTER: usize = 0x08;
const STRUCTURE_LENGTH: usize = 0x0A;
const STRUCTURE_REVISION: usize = 0x0C;
const PROG_INTERFACE: usize = 0x0D;
const SUBCLASS_CODE: usize = 0x0E;
const CLASS_CODE: usize = 0x0F;
const IMAGE_LENGTH: usize = 0x10;
const REVISION_LEVEL: usize = 0x12;
const CODE_TYPE: usize = 0x14;
const INDICATOR: usize = 0x15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CodeType {
    /// Intel x86, PC-AT compatible (legacy BIOS).
    PcAt,
    OpenFirmware,
    PaRisc,
    Efi,
    Unknown(u8),
}

impl CodeType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => CodeType::PcAt,
            0x01 => CodeType::OpenFirmware,
            0x02 => CodeType::PaRisc,
            0x03 => CodeType::Efi,
            other => CodeType::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            CodeType::PcAt => 0x00,
            CodeType::OpenFirmware => 0x01,
            CodeType::PaRisc => 0x02,
            CodeType::Efi => 0x03,
            CodeType::Unknown(raw) => raw,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CodeType::PcAt => "BIOS",
            CodeType::OpenFirmware => "Open Firmware",
            CodeType::PaRisc => "PA-RISC",
            CodeType::Efi => "UEFI",
            CodeType::Unknown(_) => "unknown",
        }
    }
}

/// Decoded PCI Data Structure of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PciHeader {
    pub signature: [u8; 4],
    pub vendor_id: u16,
    pub device_id: u16,
    pub device_list_pointer: u16,
    pub structure_length: u16,
    pub structure_revision: u8,
    pub prog_interface: u8,
    pub subclass_code: u8,
    pub class_code: u8,
    pub image_length_blocks: u16,
    pub revision_level: u16,
    pub code_type: CodeType,
    pub indicator: u8,
    pub last_image: bool,
    /// The structure ran past the end of the buffer; missing bytes were read as zero.
    pub truncated: bool,
}

impl PciHeader {
    /// Parse the data structure at `offset`.
    ///
    /// Never fails: callers only get here once the "PCIR" tag has been verified, and a structure
    /// cut short by the end of the buffer is reported through [`PciHeader::truncated`] with a
    /// zero image length, which ends the image chain.
    pub fn parse(view: &ByteView<'_>, offset: usize) -> Self {
        let (raw, truncated) = view.array_padded::<PCIR_LEN>(offset);
        let u16_at = |off: usize| u16::from_le_bytes([raw[off], raw[off + 1]]);
        let indicator = raw[INDICATOR];

        PciHeader {
            signature: [raw[0], raw[1], raw[2], raw[3]],
            vendor_id: u16_at(VENDOR_ID),
            device_id: u16_at(DEVICE_ID),
            device_list_pointer: u16_at(DEVICE_LIST_POINTER),
            structure_length: u16_at(STRUCTURE_LENGTH),
            structure_revision: raw[STRUCTURE_REVISION],
            prog_interface: raw[PROG_INTERFACE],
            subclass_code: raw[SUBCLASS_CODE],
            class_code: raw[CLASS_CODE],
            image_length_blocks: if truncated { 0 } else { u16_at(IMAGE_LENGTH) },
            revision_level: u16_at(REVISION_LEVEL),
            code_type: CodeType::from_raw(raw[CODE_TYPE]),
            indicator,
            last_image: indicator & LAST_IMAGE_BIT != 0,
            truncated,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.signature == PCIR_SIGNATURE
    }

    /// Image size in bytes as declared by the header.
    pub fn image_len(&self) -> usize {
        usize::from(self.image_length_blocks) * IMAGE_BLOCK_SIZE
    }

    /// Whether the chain ends after this image.
    ///
    /// Some dumps clear the last-image bit but declare a zero-length image; both conditions end
    /// the chain independently.
    pub fn ends_chain(&self) -> bool {
        self.last_image || self.image_length_blocks == 0
    }
}
