use crate::error::{Error, Result};
use x509_parser::prelude::*;

/// Fields of a server certificate worth showing to a user. No chain or
/// signature validation happens here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub not_before: i64,
    pub not_after: i64,
    pub dns_names: Vec<String>,
}

fn parse_dns_names(cert: &X509Certificate) -> Vec<String> {
    match cert.subject_alternative_name() {
        Ok(Some(san)) => san
            .value
            .general_names
            .iter()
            .filter_map(|gn| match gn {
                GeneralName::DNSName(name) => Some(name.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn parse_certificate(cert_der: &[u8]) -> Result<CertificateSummary> {
    let (rest, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| Error::CertificateError(format!("Failed to parse X.509 certificate: {}", e)))?;
    if !rest.is_empty() {
        return Err(Error::CertificateError(format!(
            "{} bytes after the certificate DER",
            rest.len()
        )));
    }

    Ok(CertificateSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        serial_number: cert.raw_serial_as_string(),
        not_before: cert.validity().not_before.timestamp(),
        not_after: cert.validity().not_after.timestamp(),
        dns_names: parse_dns_names(&cert),
    })
}
