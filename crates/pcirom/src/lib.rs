#![forbid(unsafe_code)]

//! Decoder for PCI expansion ("option") ROM images.
//!
//! Given the raw bytes of a firmware dump (video BIOS, NIC boot ROM, UEFI driver ROM, ...) this
//! crate locates each image's PCI data structure, extracts its header fields, recognizes
//! ATI/AMD, NVIDIA and EFI vendor structures, names the IDs through a `pci.ids` database and
//! follows the chain of images concatenated in the file.
//!
//! Decoding is best effort: truncated or vendor-mangled layouts yield as much as could be
//! extracted, and only a ROM with no PCI data structure at all is an error.
//!
//! ```no_run
//! use pcirom::{decode_rom, DecodeOptions, IdentifierDatabase};
//!
//! let rom = std::fs::read("vbios.rom").unwrap();
//! let ids = IdentifierDatabase::parse(&std::fs::read_to_string("pci.ids").unwrap());
//! for image in decode_rom(&rom, &ids, &DecodeOptions::default()).unwrap().images {
//!     println!("{} {}", image.identity.vendor_name, image.identity.device_name);
//! }
//! ```

mod chain;
mod error;
mod header;
mod ids;
mod locate;
mod strings;
pub mod vendor;
mod view;

pub use chain::{
    decode_rom, DecodeOptions, DecodedImage, DecodedRom, ImageChainWalker, Termination,
};
pub use error::{DatabaseError, DecodeError, LocateError, RomError};
pub use header::{CodeType, PciHeader, IMAGE_BLOCK_SIZE, LAST_IMAGE_BIT, PCIR_LEN, PCIR_SIGNATURE};
pub use ids::{IdentifierDatabase, SubsystemId, SubsystemIdentity, UNKNOWN};
pub use locate::{HeaderLocator, LocatedHeader, PnpAnchor, PCIR_POINTER_OFFSET, PNP_SIGNATURE};
pub use strings::{sane_strings, MIN_RUN_LEN};
pub use vendor::VendorExtension;
pub use view::{ByteView, Direction};
