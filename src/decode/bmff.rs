//! Minimal ISO-BMFF walk for HEIF-family containers.
//!
//! Two jobs, no more:
//! - `major_brand`: read the `ftyp` brand so codec mismatches can be
//!   reported precisely.
//! - `extract_exif`: locate the `Exif` item via `meta` → `iinf`/`iloc`
//!   and return its payload with the TIFF-offset prefix resolved.
//!
//! Item payloads live at absolute file offsets (`iloc` construction
//! method 0), which is how every camera writer stores EXIF in practice.
//! Items packed into `idat` are rejected as malformed-for-our-purposes.

use super::decoder::DecodeError;

pub(crate) type FourCc = [u8; 4];

/// Leading identifier of an EXIF APP1 payload, preceding the TIFF header.
const EXIF_ID: &[u8] = b"Exif\0\0";

fn malformed(what: &str) -> DecodeError {
    DecodeError::Metadata(what.to_string())
}

fn be16(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes(data.get(at..at + 2)?.try_into().ok()?))
}

fn be32(data: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(data.get(at..at + 4)?.try_into().ok()?))
}

fn be64(data: &[u8], at: usize) -> Option<u64> {
    Some(u64::from_be_bytes(data.get(at..at + 8)?.try_into().ok()?))
}

/// Read a big-endian unsigned integer of `size` bytes (0, 2, 4, or 8 in
/// practice; size 0 reads as 0 per the iloc field rules).
fn be_uint(data: &[u8], at: usize, size: usize) -> Option<u64> {
    if size > 8 {
        return None;
    }
    let bytes = data.get(at..at + size)?;
    Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Iterate the boxes laid end-to-end in `data`, yielding `(type, payload)`.
/// Stops at the first structurally impossible size.
fn boxes(data: &[u8]) -> impl Iterator<Item = (FourCc, &[u8])> {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        let size32 = be32(data, pos)? as usize;
        let kind: FourCc = data.get(pos + 4..pos + 8)?.try_into().ok()?;

        let (header, size) = match size32 {
            0 => (8, data.len() - pos), // box extends to end of file
            1 => (16, usize::try_from(be64(data, pos + 8)?).ok()?),
            n => (8, n),
        };
        let end = pos.checked_add(size)?;
        if size < header || end > data.len() {
            return None;
        }

        let payload = &data[pos + header..end];
        pos = end;
        Some((kind, payload))
    })
}

fn find_box<'a>(container: &'a [u8], kind: &FourCc) -> Option<&'a [u8]> {
    boxes(container).find(|(k, _)| k == kind).map(|(_, p)| p)
}

/// Major brand from the `ftyp` box, if the data is a plausible BMFF file.
pub(crate) fn major_brand(data: &[u8]) -> Option<FourCc> {
    find_box(data, b"ftyp")?.get(..4)?.try_into().ok()
}

/// Extract the EXIF block from a HEIF-family container.
///
/// `Ok(None)` when the container simply carries no `Exif` item. Errors
/// indicate a meta box that claims an item but cannot deliver it.
pub(crate) fn extract_exif(data: &[u8]) -> Result<Option<Vec<u8>>, DecodeError> {
    // meta is a FullBox: 4 bytes of version/flags before the child boxes
    let Some(meta) = find_box(data, b"meta") else {
        return Ok(None);
    };
    let children = meta.get(4..).ok_or_else(|| malformed("truncated meta box"))?;

    let Some(iinf) = find_box(children, b"iinf") else {
        return Ok(None);
    };
    let Some(exif_id) = exif_item_id(iinf)? else {
        return Ok(None);
    };

    let iloc = find_box(children, b"iloc")
        .ok_or_else(|| malformed("Exif item declared but no iloc box"))?;
    let Some(extents) = item_extents(iloc, exif_id)? else {
        return Err(malformed("Exif item missing from iloc"));
    };

    let mut item = Vec::new();
    for (offset, length) in extents {
        let start = usize::try_from(offset).map_err(|_| malformed("extent offset overflow"))?;
        let end = start
            .checked_add(usize::try_from(length).map_err(|_| malformed("extent length overflow"))?)
            .ok_or_else(|| malformed("extent range overflow"))?;
        let slice = data
            .get(start..end)
            .ok_or_else(|| malformed("extent outside file"))?;
        item.extend_from_slice(slice);
    }

    exif_payload(&item).map(Some)
}

/// Find the item ID carrying `Exif` in an `iinf` payload.
fn exif_item_id(iinf: &[u8]) -> Result<Option<u32>, DecodeError> {
    let version = *iinf.first().ok_or_else(|| malformed("empty iinf box"))?;
    let entries_at = if version == 0 { 6 } else { 8 };
    let entries = iinf
        .get(entries_at..)
        .ok_or_else(|| malformed("truncated iinf box"))?;

    for (kind, infe) in boxes(entries) {
        if &kind != b"infe" {
            continue;
        }
        let v = *infe.first().ok_or_else(|| malformed("empty infe box"))?;
        // item_type only exists from infe version 2 on
        if v < 2 {
            continue;
        }
        let (item_id, type_at) = if v == 2 {
            (
                be16(infe, 4).ok_or_else(|| malformed("truncated infe box"))? as u32,
                8,
            )
        } else {
            (
                be32(infe, 4).ok_or_else(|| malformed("truncated infe box"))?,
                10,
            )
        };
        let item_type = infe
            .get(type_at..type_at + 4)
            .ok_or_else(|| malformed("truncated infe box"))?;
        if item_type == b"Exif" {
            return Ok(Some(item_id));
        }
    }
    Ok(None)
}

/// Absolute `(offset, length)` extents for `wanted` from an `iloc` payload.
fn item_extents(iloc: &[u8], wanted: u32) -> Result<Option<Vec<(u64, u64)>>, DecodeError> {
    let err = || malformed("truncated iloc box");

    let version = *iloc.first().ok_or_else(err)?;
    if version > 2 {
        return Err(malformed("unknown iloc version"));
    }

    let sizes = *iloc.get(4).ok_or_else(err)?;
    let offset_size = (sizes >> 4) as usize;
    let length_size = (sizes & 0xF) as usize;
    let sizes = *iloc.get(5).ok_or_else(err)?;
    let base_offset_size = (sizes >> 4) as usize;
    let index_size = if version >= 1 { (sizes & 0xF) as usize } else { 0 };

    let mut pos = 6;
    let item_count = if version < 2 {
        let n = be16(iloc, pos).ok_or_else(err)?;
        pos += 2;
        u32::from(n)
    } else {
        let n = be32(iloc, pos).ok_or_else(err)?;
        pos += 4;
        n
    };

    for _ in 0..item_count {
        let item_id = if version < 2 {
            let id = be16(iloc, pos).ok_or_else(err)?;
            pos += 2;
            u32::from(id)
        } else {
            let id = be32(iloc, pos).ok_or_else(err)?;
            pos += 4;
            id
        };

        let construction = if version >= 1 {
            let word = be16(iloc, pos).ok_or_else(err)?;
            pos += 2;
            word & 0xF
        } else {
            0
        };

        pos += 2; // data_reference_index
        let base = be_uint(iloc, pos, base_offset_size).ok_or_else(err)?;
        pos += base_offset_size;

        let extent_count = be16(iloc, pos).ok_or_else(err)? as usize;
        pos += 2;

        if item_id != wanted {
            pos += extent_count * (index_size + offset_size + length_size);
            continue;
        }
        if construction != 0 {
            return Err(malformed("Exif item not stored at a file offset"));
        }

        let mut extents = Vec::with_capacity(extent_count);
        for _ in 0..extent_count {
            pos += index_size;
            let offset = be_uint(iloc, pos, offset_size).ok_or_else(err)?;
            pos += offset_size;
            let length = be_uint(iloc, pos, length_size).ok_or_else(err)?;
            pos += length_size;
            extents.push((base + offset, length));
        }
        return Ok(Some(extents));
    }

    Ok(None)
}

/// Resolve a HEIF ExifDataBlock into an APP1-ready payload.
///
/// The item starts with a u32 offset to the TIFF header, counted from just
/// past the u32. The bytes in between normally end with `Exif\0\0`, which
/// APP1 needs in front of the TIFF data; when a writer omitted it, it is
/// supplied here.
fn exif_payload(item: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if item.len() < 4 {
        return Err(malformed("Exif item shorter than its offset field"));
    }
    let tiff_at = u32::from_be_bytes([item[0], item[1], item[2], item[3]]) as usize;
    let body = &item[4..];
    if tiff_at > body.len() {
        return Err(malformed("Exif TIFF offset outside item"));
    }

    if tiff_at >= EXIF_ID.len() && &body[tiff_at - EXIF_ID.len()..tiff_at] == EXIF_ID {
        return Ok(body[tiff_at - EXIF_ID.len()..].to_vec());
    }
    let mut out = Vec::with_capacity(EXIF_ID.len() + body.len() - tiff_at);
    out.extend_from_slice(EXIF_ID);
    out.extend_from_slice(&body[tiff_at..]);
    Ok(out)
}
