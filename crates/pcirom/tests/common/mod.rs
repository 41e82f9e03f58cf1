#![allow(dead_code)]

//! Synthetic option ROM images for integration tests.

pub const PCI_IDS: &str = "\
# Trimmed pci.ids
1002  Advanced Micro Devices, Inc. [AMD/ATI]
\t6798  Tahiti XT [Radeon HD 7970/8970 OEM / R9 280X]
\t\t1043 041c  HD 7970 DirectCU II
10de  NVIDIA Corporation
\t1c82  GP107 [GeForce GTX 1050 Ti]
\t\t1043 8613  PH-GTX1050TI-4G
1043  ASUSTeK Computer Inc.
8086  Intel Corporation
\t10d3  82574L Gigabit Network Connection
";

pub const PCI_CLASSES: &str = "\
C 02  Network controller
\t00  Ethernet controller
C 03  Display controller
\t00  VGA compatible controller
\t\t00  VGA controller
\t\t01  8514 controller
";

/// Builder for one image: 0x55AA header, PCIR pointer, PCIR structure, plus arbitrary patches.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    len: usize,
    anchor: bool,
    pointer: Option<u16>,
    pcir_at: usize,
    vendor: u16,
    device: u16,
    class: u8,
    subclass: u8,
    prog_if: u8,
    blocks: u16,
    indicator: u8,
    code_type: u8,
    patches: Vec<(usize, Vec<u8>)>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self {
            len: 512,
            anchor: true,
            pointer: None,
            pcir_at: 0x1C,
            vendor: 0x8086,
            device: 0x10D3,
            class: 0x02,
            subclass: 0x00,
            prog_if: 0x00,
            blocks: 1,
            indicator: 0x80,
            code_type: 0x00,
            patches: Vec::new(),
        }
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    pub fn ids(mut self, vendor: u16, device: u16) -> Self {
        self.vendor = vendor;
        self.device = device;
        self
    }

    pub fn class(mut self, class: u8, subclass: u8, prog_if: u8) -> Self {
        self.class = class;
        self.subclass = subclass;
        self.prog_if = prog_if;
        self
    }

    pub fn blocks(mut self, blocks: u16) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn last(mut self, last: bool) -> Self {
        self.indicator = if last { 0x80 } else { 0x00 };
        self
    }

    pub fn code_type(mut self, code_type: u8) -> Self {
        self.code_type = code_type;
        self
    }

    /// Place the PCIR structure at `offset`; the declared pointer follows unless overridden.
    pub fn pcir_at(mut self, offset: usize) -> Self {
        self.pcir_at = offset;
        self
    }

    /// Declare a PCIR pointer that differs from where the structure actually is.
    pub fn pointer(mut self, pointer: u16) -> Self {
        self.pointer = Some(pointer);
        self
    }

    pub fn without_anchor(mut self) -> Self {
        self.anchor = false;
        self
    }

    pub fn patch(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.patches.push((offset, bytes.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut rom = vec![0u8; self.len];
        if self.anchor {
            rom[..2].copy_from_slice(&[0x55, 0xAA]);
            rom[2] = u8::try_from(self.len / 512).unwrap_or(0xFF);
            let pointer = self.pointer.unwrap_or(self.pcir_at as u16);
            rom[0x18..0x1A].copy_from_slice(&pointer.to_le_bytes());
        }

        let p = self.pcir_at;
        rom[p..p + 4].copy_from_slice(b"PCIR");
        rom[p + 0x04..p + 0x06].copy_from_slice(&self.vendor.to_le_bytes());
        rom[p + 0x06..p + 0x08].copy_from_slice(&self.device.to_le_bytes());
        rom[p + 0x0A..p + 0x0C].copy_from_slice(&0x18u16.to_le_bytes());
        rom[p + 0x0D] = self.prog_if;
        rom[p + 0x0E] = self.subclass;
        rom[p + 0x0F] = self.class;
        rom[p + 0x10..p + 0x12].copy_from_slice(&self.blocks.to_le_bytes());
        rom[p + 0x14] = self.code_type;
        rom[p + 0x15] = self.indicator;

        for (offset, bytes) in &self.patches {
            rom[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }
        rom
    }
}

pub fn concat(images: &[Vec<u8>]) -> Vec<u8> {
    images.concat()
}
