//! Walking the chain of images concatenated in one ROM file.

use serde::Serialize;

use crate::error::{DecodeError, LocateError};
use crate::header::{PciHeader, PCIR_LEN};
use crate::ids::{IdentifierDatabase, SubsystemIdentity};
use crate::locate::{HeaderLocator, LocatedHeader};
use crate::vendor::{decode_extension, ExtensionContext, VendorExtension};
use crate::view::ByteView;

/// Knobs for a decode pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fall back to brute-force scans when the 0x55AA header is missing or its PCIR pointer is
    /// wrong. Disabling this turns both conditions into a failed image.
    pub fallback_scan: bool,

    /// Look for ATI/AMD, NVIDIA and EFI structures.
    pub vendor_extensions: bool,

    /// Stop after this many images.
    pub max_images: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            fallback_scan: true,
            vendor_extensions: true,
            max_images: None,
        }
    }
}

/// One image of a ROM file.
///
/// Holds only copied data, so it outlives the buffer it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedImage {
    pub start_address: usize,
    /// Offset of the 0x55AA header, if one was found.
    pub pnp_offset: Option<usize>,
    pub header_offset: usize,
    /// Declared PCIR offset that turned out not to hold a header. `Some` marks a corrupt image
    /// decoded from a scan-found header.
    pub corrected_from: Option<usize>,
    pub header: PciHeader,
    pub vendor_extension: VendorExtension,
    pub identity: SubsystemIdentity,
}

impl DecodedImage {
    pub fn is_corrupt(&self) -> bool {
        self.corrected_from.is_some()
    }

    /// Base address of the following image, or `None` if this one ends the chain.
    ///
    /// The image length counts from the 0x55AA header, which a scan may have found past
    /// `start_address`.
    pub fn next_image(&self) -> Option<usize> {
        if self.header.ends_chain() {
            return None;
        }
        self.pnp_offset
            .unwrap_or(self.start_address)
            .checked_add(self.header.image_len())
    }
}

/// Why the image chain stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// The last decoded image had its last-image bit set.
    LastImage,
    /// The last decoded image declared a zero length.
    ZeroLength,
    /// [`DecodeOptions::max_images`] was reached.
    ImageLimit,
    /// No header could be located for the image at `base`.
    Failed { base: usize, error: LocateError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedRom {
    pub images: Vec<DecodedImage>,
    pub termination: Termination,
}

impl DecodedRom {
    pub fn is_corrupt(&self) -> bool {
        self.images.iter().any(DecodedImage::is_corrupt)
    }
}

enum WalkState {
    Scanning(usize),
    HeaderValid { base: usize, located: LocatedHeader },
    Decoded(Box<DecodedImage>),
    Done(Termination),
}

/// Decodes every image of one ROM buffer.
pub struct ImageChainWalker<'a> {
    view: ByteView<'a>,
    ids: &'a IdentifierDatabase,
    options: DecodeOptions,
}

impl<'a> ImageChainWalker<'a> {
    pub fn new(rom: &'a [u8], ids: &'a IdentifierDatabase, options: DecodeOptions) -> Self {
        Self {
            view: ByteView::new(rom),
            ids,
            options,
        }
    }

    /// Walk the chain from offset 0.
    ///
    /// Images decoded before a mid-chain failure are kept; the failure is reported through
    /// [`DecodedRom::termination`].
    pub fn walk(&self) -> DecodedRom {
        let locator = HeaderLocator::new(self.view).with_fallback_scan(self.options.fallback_scan);
        let mut images: Vec<DecodedImage> = Vec::new();
        let mut state = WalkState::Scanning(0);

        let termination = loop {
            state = match state {
                WalkState::Scanning(base) => {
                    if self.options.max_images.is_some_and(|max| images.len() >= max) {
                        WalkState::Done(Termination::ImageLimit)
                    } else {
                        let previous = images.last().map(|image| image.header_offset);
                        match locator.locate(base) {
                            // A scan from inside an image that was itself found by scanning
                            // reaches the same header again.
                            Ok(located)
                                if previous.is_some_and(|prev| located.header_offset <= prev) =>
                            {
                                let resume = previous.map_or(base, |prev| prev + PCIR_LEN);
                                tracing::debug!(
                                    "header at {:#x} already decoded; rescanning from {resume:#x}",
                                    located.header_offset
                                );
                                WalkState::Scanning(resume)
                            }
                            Ok(located) => WalkState::HeaderValid { base, located },
                            Err(error) => WalkState::Done(Termination::Failed { base, error }),
                        }
                    }
                }
                WalkState::HeaderValid { base, located } => {
                    WalkState::Decoded(Box::new(self.decode_image(base, located)))
                }
                WalkState::Decoded(image) => {
                    let next = match image.next_image() {
                        Some(next) => WalkState::Scanning(next),
                        None if image.header.last_image => WalkState::Done(Termination::LastImage),
                        None => WalkState::Done(Termination::ZeroLength),
                    };
                    images.push(*image);
                    next
                }
                WalkState::Done(termination) => break termination,
            };
        };

        tracing::debug!(
            "ROM chain ended after {} image(s): {termination:?}",
            images.len()
        );
        DecodedRom {
            images,
            termination,
        }
    }

    fn decode_image(&self, base: usize, located: LocatedHeader) -> DecodedImage {
        let _span = tracing::debug_span!("rom_image", base).entered();

        let header = PciHeader::parse(&self.view, located.header_offset);
        let anchor = located.anchor.map(|a| a.offset);
        let vendor_extension = if self.options.vendor_extensions {
            decode_extension(&ExtensionContext {
                view: self.view,
                anchor: anchor.unwrap_or(base),
                header_offset: located.header_offset,
            })
        } else {
            VendorExtension::None
        };
        let identity = self.ids.identify(&header, vendor_extension.subsystem());

        tracing::debug!(
            "{:04x}:{:04x} class {:02x}{:02x}{:02x} at {:#x}, {} blocks",
            header.vendor_id,
            header.device_id,
            header.class_code,
            header.subclass_code,
            header.prog_interface,
            located.header_offset,
            header.image_length_blocks
        );

        DecodedImage {
            start_address: base,
            pnp_offset: anchor,
            header_offset: located.header_offset,
            corrected_from: located.corrected_from,
            header,
            vendor_extension,
            identity,
        }
    }
}

/// Decode every image in `rom`.
///
/// Fails only when not even the first image's PCI data structure can be found.
pub fn decode_rom(
    rom: &[u8],
    ids: &IdentifierDatabase,
    options: &DecodeOptions,
) -> Result<DecodedRom, DecodeError> {
    let decoded = ImageChainWalker::new(rom, ids, options.clone()).walk();
    if decoded.images.is_empty() {
        if let Termination::Failed { error, .. } = decoded.termination {
            return Err(DecodeError::NoPciHeader {
                len: rom.len(),
                source: error,
            });
        }
    }
    Ok(decoded)
}
