use crate::error::Result;

pub mod x509;

pub use x509::CertificateSummary;

/// A certificate received from the server, kept as DER together with the
/// fields extracted from it.
#[derive(Debug, Clone)]
pub struct ServerCertificate {
    pub der_data: Vec<u8>,
    pub summary: CertificateSummary,
}

impl ServerCertificate {
    /// Fails with a bad_certificate condition when the DER does not parse.
    pub fn from_der(der_data: Vec<u8>) -> Result<Self> {
        let summary = x509::parse_certificate(&der_data)?;
        Ok(Self { der_data, summary })
    }
}
