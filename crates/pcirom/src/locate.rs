//! Resolution of the PCI data structure offset for one image.
//!
//! The declared pointer in the PnP expansion header is trusted first and then verified. Dumps in
//! the wild regularly carry a wrong pointer, a vendor wrapper in front of the 0x55AA anchor, or no
//! anchor at all, so verification failures fall back to forward scans bounded by the buffer.

use serde::Serialize;

use crate::error::LocateError;
use crate::header::PCIR_SIGNATURE;
use crate::view::ByteView;

/// Expansion ROM header signature, 0x55 0xAA in storage order.
pub const PNP_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Offset of the 16-bit PCIR pointer within the expansion ROM header.
pub const PCIR_POINTER_OFFSET: usize = 0x18;

/// A 0x55AA expansion ROM header and the PCIR pointer it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PnpAnchor {
    pub offset: usize,
    /// `None` when the header is cut off before the pointer field.
    pub header_pointer: Option<u16>,
}

impl PnpAnchor {
    fn read(view: &ByteView<'_>, offset: usize) -> Self {
        Self {
            offset,
            header_pointer: view.u16_le(offset + PCIR_POINTER_OFFSET).ok(),
        }
    }

    /// Absolute offset of the PCIR structure as declared by this header.
    pub fn declared_header_offset(&self) -> Option<usize> {
        self.header_pointer.map(|ptr| self.offset + usize::from(ptr))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocatedHeader {
    pub anchor: Option<PnpAnchor>,
    pub header_offset: usize,
    /// Declared offset that failed verification, when the header had to be found by scanning.
    pub corrected_from: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderLocator<'a> {
    view: ByteView<'a>,
    fallback_scan: bool,
}

impl<'a> HeaderLocator<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self {
            view,
            fallback_scan: true,
        }
    }

    /// Enable or disable the brute-force anchor and signature scans.
    ///
    /// With scanning disabled a missing anchor or a bad declared pointer is an error.
    pub fn with_fallback_scan(mut self, enabled: bool) -> Self {
        self.fallback_scan = enabled;
        self
    }

    /// Resolve the PCIR offset for the image starting at `base`.
    pub fn locate(&self, base: usize) -> Result<LocatedHeader, LocateError> {
        let anchor = self.find_anchor(base)?;
        let declared = anchor.and_then(|a| a.declared_header_offset());

        if let Some(offset) = declared {
            if self.view.matches(offset, &PCIR_SIGNATURE) {
                return Ok(LocatedHeader {
                    anchor,
                    header_offset: offset,
                    corrected_from: None,
                });
            }
        }

        if !self.fallback_scan {
            return Err(match declared {
                Some(offset) => LocateError::SignatureMismatch { offset },
                None => LocateError::NoHeader { base },
            });
        }

        let Some(found) = self.view.find(base, &PCIR_SIGNATURE) else {
            return Err(LocateError::NoHeader { base });
        };

        if let Some(declared) = declared {
            tracing::warn!(
                "PCIR pointer {declared:#x} is corrupt; using header found at {found:#x}"
            );
        }

        Ok(LocatedHeader {
            anchor,
            header_offset: found,
            corrected_from: declared,
        })
    }

    /// The anchor at `base`, or the first one found by scanning.
    ///
    /// A scanned anchor is only accepted ahead of the first "PCIR" at or after `base`; one past
    /// it heads a later image, and the header in between belongs to an anchorless image.
    fn find_anchor(&self, base: usize) -> Result<Option<PnpAnchor>, LocateError> {
        if self.view.matches(base, &PNP_SIGNATURE) {
            return Ok(Some(PnpAnchor::read(&self.view, base)));
        }
        if !self.fallback_scan {
            return Ok(None);
        }

        let first_header = self
            .view
            .find(base, &PCIR_SIGNATURE)
            .ok_or(LocateError::NoHeader { base })?;
        tracing::warn!("no 0x55AA signature at {base:#x}; scanning for one");
        Ok(self
            .view
            .find(base, &PNP_SIGNATURE)
            .filter(|&offset| offset < first_header)
            .map(|offset| PnpAnchor::read(&self.view, offset)))
    }
}
