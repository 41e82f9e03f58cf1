//! Text and JSON rendering of one decoded file.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use pcirom::vendor::{AtiExtension, EfiExtension, NvidiaExtension, SubsystemLayout};
use pcirom::{DecodedImage, DecodedRom, SubsystemId, SubsystemIdentity, Termination, VendorExtension};

#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub path: &'a Path,
    pub size: usize,
    pub result: Result<DecodedRom, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strings: Option<Vec<String>>,
}

impl FileReport<'_> {
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{} ({} bytes)", self.path.display(), self.size)?;

        match &self.result {
            Ok(rom) => {
                for (index, image) in rom.images.iter().enumerate() {
                    render_image(out, index, image)?;
                }
                writeln!(out, "  chain: {}", termination(&rom.termination))?;
            }
            Err(err) => writeln!(out, "  error: {err}")?,
        }

        if let Some(strings) = &self.strings {
            writeln!(out, "  strings:")?;
            for s in strings {
                writeln!(out, "    {s}")?;
            }
        }
        writeln!(out)
    }
}

fn render_image(out: &mut impl Write, index: usize, image: &DecodedImage) -> io::Result<()> {
    let header = &image.header;
    let names = &image.identity;

    write!(out, "  image {index} at {:#x}", image.start_address)?;
    if let Some(anchor) = image.pnp_offset {
        write!(out, ", 0x55AA at {anchor:#x}")?;
    }
    writeln!(out, ", PCIR at {:#x}", image.header_offset)?;

    if let Some(declared) = image.corrected_from {
        writeln!(
            out,
            "    corrupt: PCIR pointer {declared:#x} is wrong, header found by scanning"
        )?;
    }
    if header.truncated {
        writeln!(out, "    truncated: PCIR structure runs past the end of the file")?;
    }

    writeln!(out, "    vendor:    [{:04x}] {}", header.vendor_id, names.vendor_name)?;
    writeln!(out, "    device:    [{:04x}] {}", header.device_id, names.device_name)?;
    writeln!(out, "    class:     [{:02x}] {}", header.class_code, names.class_name)?;
    writeln!(out, "    subclass:  [{:02x}] {}", header.subclass_code, names.subclass_name)?;
    if let Some(prog_if) = &names.prog_interface_name {
        writeln!(out, "    prog-if:   [{:02x}] {prog_if}", header.prog_interface)?;
    }
    writeln!(
        out,
        "    code type: [{:02x}] {}",
        header.code_type.raw(),
        header.code_type.name()
    )?;
    writeln!(
        out,
        "    size:      {} bytes ({} blocks){}",
        header.image_len(),
        header.image_length_blocks,
        if header.last_image { ", last image" } else { "" }
    )?;

    match &image.vendor_extension {
        VendorExtension::None => Ok(()),
        VendorExtension::Ati(ati) => render_ati(out, ati, names),
        VendorExtension::Nvidia(nv) => render_nvidia(out, nv, names),
        VendorExtension::Efi(efi) => render_efi(out, efi),
    }
}

fn render_subsystem(
    out: &mut impl Write,
    subsystem: Option<SubsystemId>,
    names: &SubsystemIdentity,
) -> io::Result<()> {
    let Some(id) = subsystem else {
        return Ok(());
    };
    writeln!(
        out,
        "    subsystem: [{:04x}:{:04x}] {} {}",
        id.vendor_id,
        id.device_id,
        names.subsystem_vendor_name.as_deref().unwrap_or(pcirom::UNKNOWN),
        names.subsystem_name.as_deref().unwrap_or(pcirom::UNKNOWN)
    )
}

fn render_ati(
    out: &mut impl Write,
    ati: &AtiExtension,
    names: &SubsystemIdentity,
) -> io::Result<()> {
    writeln!(out, "    ATI/AMD:   built {}", ati.build_date)?;
    if let Some(table) = &ati.table_name {
        writeln!(out, "    ATOMBIOS:  {table}")?;
    }
    render_subsystem(out, ati.subsystem, names)
}

fn render_nvidia(
    out: &mut impl Write,
    nv: &NvidiaExtension,
    names: &SubsystemIdentity,
) -> io::Result<()> {
    let layout = match nv.layout {
        SubsystemLayout::Legacy => "legacy header",
        SubsystemLayout::Npde => "NPDE",
        SubsystemLayout::KeplerMaxwell => "Kepler/Maxwell",
    };
    writeln!(
        out,
        "    NVIDIA:    built {} ({layout} layout)",
        nv.build_date.as_deref().unwrap_or(pcirom::UNKNOWN)
    )?;
    render_subsystem(out, nv.subsystem, names)
}

fn render_efi(out: &mut impl Write, efi: &EfiExtension) -> io::Result<()> {
    writeln!(
        out,
        "    EFI:       {} driver, {:?}",
        efi.machine_type.name(),
        efi.subsystem
    )?;
    if let Some(compression) = efi.compression {
        writeln!(out, "    EFI image: {compression:?}")?;
    }
    Ok(())
}

fn termination(termination: &Termination) -> String {
    match termination {
        Termination::LastImage => "ended at last image".to_string(),
        Termination::ZeroLength => "ended at zero-length image".to_string(),
        Termination::ImageLimit => "image limit reached".to_string(),
        Termination::Failed { base, error } => format!("stopped at {base:#x}: {error}"),
    }
}
