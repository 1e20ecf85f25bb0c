use crate::error::{Error, Result};
use crate::handshake::extensions::{Extension, ExtensionType};
use crate::utils;

/// ClientHello form: u8 length-prefixed list of versions.
pub fn client_extension(versions: &[u16]) -> Result<Extension> {
    let mut list = Vec::with_capacity(versions.len() * 2);
    for version in versions {
        utils::write_u16(&mut list, *version);
    }
    let mut data = Vec::with_capacity(1 + list.len());
    utils::write_vector_u8(&mut data, &list)?;
    Ok(Extension::new(ExtensionType::SupportedVersions, data))
}

/// ServerHello form: the single selected version.
pub fn parse_server(extension: &Extension) -> Result<u16> {
    if extension.data.len() != 2 {
        return Err(Error::ParseError(format!(
            "ServerHello supported_versions has length {}",
            extension.data.len()
        )));
    }
    utils::read_u16(&extension.data, &mut 0)
}
