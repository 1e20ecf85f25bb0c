use crate::error::{Error, Result};

fn take<'a>(data: &'a [u8], pos: &mut usize, len: usize, what: &str) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| Error::ParseError(format!("Unexpected end of data while reading {}", what)))?;
    let bytes = &data[*pos..end];
    *pos = end;
    Ok(bytes)
}

pub fn read_u8(data: &[u8], pos: &mut usize) -> Result<u8> {
    Ok(take(data, pos, 1, "u8")?[0])
}

pub fn read_u16(data: &[u8], pos: &mut usize) -> Result<u16> {
    let b = take(data, pos, 2, "u16")?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

pub fn read_u24(data: &[u8], pos: &mut usize) -> Result<u32> {
    let b = take(data, pos, 3, "u24")?;
    Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
}

pub fn read_bytes<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    take(data, pos, len, &format!("{} bytes", len))
}

pub fn read_vector_u8<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let len = read_u8(data, pos)? as usize;
    read_bytes(data, pos, len)
}

pub fn read_vector_u16<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let len = read_u16(data, pos)? as usize;
    read_bytes(data, pos, len)
}

pub fn read_vector_u24<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let len = read_u24(data, pos)? as usize;
    read_bytes(data, pos, len)
}

/// Fails if anything is left after a message body was fully parsed.
pub fn expect_end(data: &[u8], pos: usize, what: &str) -> Result<()> {
    if pos != data.len() {
        return Err(Error::ParseError(format!(
            "{} has {} trailing bytes",
            what,
            data.len().saturating_sub(pos)
        )));
    }
    Ok(())
}

pub fn write_u8(vec: &mut Vec<u8>, value: u8) {
    vec.push(value);
}

pub fn write_u16(vec: &mut Vec<u8>, value: u16) {
    vec.extend_from_slice(&value.to_be_bytes());
}

pub fn write_u24(vec: &mut Vec<u8>, value: usize) -> Result<()> {
    if value > 0xFF_FFFF {
        return Err(Error::ParseError(format!("{} does not fit in u24", value)));
    }
    vec.extend_from_slice(&(value as u32).to_be_bytes()[1..]);
    Ok(())
}

pub fn write_vector_u8(vec: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = u8::try_from(data.len())
        .map_err(|_| Error::ParseError("Data too large for u8 length prefix".to_string()))?;
    write_u8(vec, len);
    vec.extend_from_slice(data);
    Ok(())
}

pub fn write_vector_u16(vec: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = u16::try_from(data.len())
        .map_err(|_| Error::ParseError("Data too large for u16 length prefix".to_string()))?;
    write_u16(vec, len);
    vec.extend_from_slice(data);
    Ok(())
}

pub fn write_vector_u24(vec: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    write_u24(vec, data.len())?;
    vec.extend_from_slice(data);
    Ok(())
}

/// Short hex fingerprint for trace logging. Never log full secrets.
pub fn fingerprint(data: &[u8]) -> String {
    data.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}
