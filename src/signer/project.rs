//! Validation of a CSR against the CA policy and projection onto a request.
//!
//! Each field is handled by its own step; the first failing step aborts the
//! projection. A field reaches the request only when the policy allows it.

use crate::ca::policy::{KeyFormat, ListPolicy, Presence, ValidationPolicy};
use crate::ca::request::{CertificateRequest, San, SignatureRequest, SubjectDn, Validity};
use crate::cert::csr::ParsedCsr;
use crate::config::ExpiryPolicy;
use crate::error::{IssuerError, Result};
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// Build the outbound request for `csr` under `policy`.
///
/// `now` becomes the requested not-before.
pub fn build_request(
    csr: &ParsedCsr,
    policy: &ValidationPolicy,
    expiry: ExpiryPolicy,
    now: DateTime<Utc>,
) -> Result<CertificateRequest> {
    let subject_dn = project_subject(csr, policy)?;
    let san = project_san(csr, policy, subject_dn.common_name.as_deref());
    check_san_minimums(&san, policy)?;
    check_public_key(csr, policy)?;
    let signature = select_hash_algorithm(policy)?;
    let validity = build_validity(policy, expiry, now)?;

    Ok(CertificateRequest {
        validity,
        subject_dn,
        san,
        signature,
        csr: csr.to_pem(),
    })
}

fn project_subject(csr: &ParsedCsr, policy: &ValidationPolicy) -> Result<SubjectDn> {
    Ok(SubjectDn {
        common_name: project_field(
            "common name",
            policy.subject_dn.common_name.presence,
            &csr.common_name,
        )?,
        serial_number: project_field(
            "serial number",
            policy.subject_dn.serial_number.presence,
            &csr.serial_number,
        )?,
    })
}

fn project_field(name: &str, presence: Presence, value: &str) -> Result<Option<String>> {
    match presence {
        Presence::Required if value.is_empty() => Err(IssuerError::PolicyError(format!(
            "CA validation policy requires subject {}, but the CSR does not contain one",
            name
        ))),
        Presence::Required | Presence::Optional => Ok(Some(value.to_string())),
        Presence::Forbidden | Presence::Static => Ok(None),
    }
}

fn project_san(csr: &ParsedCsr, policy: &ValidationPolicy, common_name: Option<&str>) -> San {
    San {
        dns_names: project_dns_names(&csr.dns_names, &policy.san.dns_names, common_name),
        ip_addresses: project_ip_addresses(&csr.ip_addresses, &policy.san.ip_addresses),
    }
}

/// CSR DNS names are copied only when their count is below the maximum. A
/// non-empty common name is added when one more entry still fits.
fn project_dns_names(
    requested: &[String],
    rule: &ListPolicy,
    common_name: Option<&str>,
) -> Vec<String> {
    if !rule.accepts_client_values() {
        return Vec::new();
    }

    let mut names = Vec::new();
    if requested.len() < rule.max_count {
        names.extend(requested.iter().cloned());
    }

    if let Some(cn) = common_name.filter(|cn| !cn.is_empty()) {
        if requested.len() < rule.max_count && !names.iter().any(|name| name == cn) {
            names.push(cn.to_string());
        }
    }

    names
}

fn project_ip_addresses(requested: &[IpAddr], rule: &ListPolicy) -> Vec<IpAddr> {
    if rule.accepts_client_values() && requested.len() < rule.max_count {
        requested.to_vec()
    } else {
        Vec::new()
    }
}

fn check_san_minimums(san: &San, policy: &ValidationPolicy) -> Result<()> {
    let dns_min = policy.san.dns_names.min_count;
    let ip_min = policy.san.ip_addresses.min_count;

    if san.dns_names.len() < dns_min || san.ip_addresses.len() < ip_min {
        return Err(IssuerError::PolicyError(format!(
            "CA validation policy requires SANs that are missing from the CSR: \
             DNS names {} of {}, IP addresses {} of {}",
            san.dns_names.len(),
            dns_min,
            san.ip_addresses.len(),
            ip_min
        )));
    }
    Ok(())
}

fn check_public_key(csr: &ParsedCsr, policy: &ValidationPolicy) -> Result<()> {
    let csr_type = csr.public_key_algorithm.as_str();
    let ca_type = policy.public_key.key_type.as_str();
    if csr_type != ca_type {
        return Err(IssuerError::PolicyError(format!(
            "CSR public key type does not match the CA account public key type: CSR - {}, CA - {}",
            csr_type, ca_type
        )));
    }

    if policy.public_key.key_format != KeyFormat::Pkcs10 {
        return Err(IssuerError::UnsupportedError(format!(
            "CA account requires the {} key format; only PKCS10 is supported, update the CA account",
            policy.public_key.key_format
        )));
    }
    Ok(())
}

fn select_hash_algorithm(policy: &ValidationPolicy) -> Result<Option<SignatureRequest>> {
    let rule = &policy.signature.hash_algorithm;
    if rule.presence != Presence::Required {
        return Ok(None);
    }

    let hash_algorithm = rule.list.first().ok_or_else(|| {
        IssuerError::PolicyError(
            "CA validation policy requires a signature hash algorithm but lists none".to_string(),
        )
    })?;

    Ok(Some(SignatureRequest {
        hash_algorithm: hash_algorithm.clone(),
    }))
}

fn build_validity(
    policy: &ValidationPolicy,
    expiry: ExpiryPolicy,
    now: DateTime<Utc>,
) -> Result<Validity> {
    let not_before = now.timestamp();
    let not_after = match expiry {
        ExpiryPolicy::CaAssigned => 0,
        ExpiryPolicy::Explicit { seconds } => {
            if let Some(validity) = &policy.validity {
                if !validity.permits(seconds) {
                    return Err(IssuerError::PolicyError(format!(
                        "requested validity of {}s is outside the CA range {}s..{}s",
                        seconds, validity.secondsmin, validity.secondsmax
                    )));
                }
            }
            let seconds = i64::try_from(seconds).map_err(|_| {
                IssuerError::PolicyError(format!("requested validity of {}s is too large", seconds))
            })?;
            not_before.checked_add(seconds).ok_or_else(|| {
                IssuerError::PolicyError(format!(
                    "requested validity of {}s overflows the not-after time",
                    seconds
                ))
            })?
        }
    };

    Ok(Validity {
        not_before,
        not_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ca::policy::{
        AlgorithmPolicy, FieldPolicy, PublicKeyPolicy, SanPolicy, SignaturePolicy,
        SubjectDnPolicy, ValidityPolicy,
    };
    use crate::crypto::KeyAlgorithm;
    use crate::error::ErrorKind;
    use chrono::TimeZone;

    const CSR_CN: &str = include_str!("../../tests/fixtures/csr-rsa-cn.pem");

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn csr(common_name: &str, dns_names: &[&str]) -> ParsedCsr {
        ParsedCsr {
            common_name: common_name.to_string(),
            serial_number: String::new(),
            dns_names: dns_names.iter().map(|n| n.to_string()).collect(),
            ip_addresses: Vec::new(),
            public_key_algorithm: KeyAlgorithm::Rsa,
            der: Vec::new(),
        }
    }

    fn field(presence: Presence) -> FieldPolicy {
        FieldPolicy {
            presence,
            format: None,
        }
    }

    fn list(min_count: usize, max_count: usize) -> ListPolicy {
        ListPolicy {
            is_static: false,
            list: Vec::new(),
            min_count,
            max_count,
        }
    }

    fn policy() -> ValidationPolicy {
        ValidationPolicy {
            validity: None,
            subject_dn: SubjectDnPolicy {
                common_name: field(Presence::Required),
                serial_number: field(Presence::Forbidden),
            },
            san: SanPolicy::default(),
            public_key: PublicKeyPolicy {
                key_type: "RSA".to_string(),
                allowed_lengths: vec![2048],
                key_format: KeyFormat::Pkcs10,
            },
            signature: SignaturePolicy {
                algorithm: AlgorithmPolicy::default(),
                hash_algorithm: AlgorithmPolicy {
                    presence: Presence::Required,
                    list: vec!["SHA256".to_string(), "SHA384".to_string()],
                },
            },
        }
    }

    #[test]
    fn test_required_common_name_copied() {
        let request = build_request(&csr("example.com", &[]), &policy(), ExpiryPolicy::CaAssigned, now())
            .unwrap();
        assert_eq!(request.subject_dn.common_name.as_deref(), Some("example.com"));
        assert_eq!(request.subject_dn.serial_number, None);
        assert!(request.san.is_empty());
        assert_eq!(request.signature.unwrap().hash_algorithm, "SHA256");
    }

    #[test]
    fn test_required_common_name_missing() {
        let err = build_request(&csr("", &[]), &policy(), ExpiryPolicy::CaAssigned, now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyValidation);
        assert!(err.to_string().contains("common name"));
    }

    #[test]
    fn test_required_serial_number_missing() {
        let mut policy = policy();
        policy.subject_dn.serial_number = field(Presence::Required);
        let err = build_request(&csr("example.com", &[]), &policy, ExpiryPolicy::CaAssigned, now())
            .unwrap_err();
        assert!(err.to_string().contains("serial number"));
    }

    #[test]
    fn test_optional_fields_copied_even_when_empty() {
        let mut policy = policy();
        policy.subject_dn.common_name = field(Presence::Optional);
        policy.subject_dn.serial_number = field(Presence::Optional);
        let request =
            build_request(&csr("", &[]), &policy, ExpiryPolicy::CaAssigned, now()).unwrap();
        assert_eq!(request.subject_dn.common_name.as_deref(), Some(""));
        assert_eq!(request.subject_dn.serial_number.as_deref(), Some(""));
    }

    #[test]
    fn test_forbidden_and_static_fields_dropped() {
        let mut policy = policy();
        policy.subject_dn.common_name = field(Presence::Static);
        let mut parsed = csr("example.com", &[]);
        parsed.serial_number = "SN-1".to_string();
        let request = build_request(&parsed, &policy, ExpiryPolicy::CaAssigned, now()).unwrap();
        assert_eq!(request.subject_dn, SubjectDn::default());
    }

    #[test]
    fn test_dns_backfill_with_room() {
        let names = project_dns_names(
            &["a.example.com".to_string()],
            &list(0, 2),
            Some("example.com"),
        );
        assert_eq!(names, vec!["a.example.com", "example.com"]);
    }

    #[test]
    fn test_dns_backfill_without_room() {
        let requested = vec!["a.example.com".to_string(), "b.example.com".to_string()];
        let names = project_dns_names(&requested, &list(0, 3), Some("example.com"));
        assert_eq!(names, vec!["a.example.com", "b.example.com", "example.com"]);

        let requested = vec![
            "a.example.com".to_string(),
            "b.example.com".to_string(),
            "c.example.com".to_string(),
        ];
        let names = project_dns_names(&requested, &list(0, 4), Some("example.com"));
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_dns_at_maximum_not_copied() {
        let requested = vec!["a.example.com".to_string(), "b.example.com".to_string()];
        let names = project_dns_names(&requested, &list(0, 2), Some("example.com"));
        assert!(names.is_empty());
    }

    #[test]
    fn test_dns_at_maximum_fails_minimum() {
        let mut policy = policy();
        policy.san.dns_names = list(1, 2);
        let err = build_request(
            &csr("example.com", &["a.example.com", "b.example.com"]),
            &policy,
            ExpiryPolicy::CaAssigned,
            now(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyValidation);
    }

    #[test]
    fn test_dns_backfill_is_a_union() {
        let requested = vec!["example.com".to_string()];
        let names = project_dns_names(&requested, &list(0, 5), Some("example.com"));
        assert_eq!(names, requested);
    }

    #[test]
    fn test_dns_over_maximum_not_copied() {
        let requested = vec![
            "a.example.com".to_string(),
            "b.example.com".to_string(),
            "c.example.com".to_string(),
        ];
        let names = project_dns_names(&requested, &list(0, 2), Some("example.com"));
        assert!(names.is_empty());
    }

    #[test]
    fn test_dns_static_or_zero_max() {
        let mut rule = list(0, 5);
        rule.is_static = true;
        let requested = vec!["a.example.com".to_string()];
        assert!(project_dns_names(&requested, &rule, Some("example.com")).is_empty());
        assert!(project_dns_names(&requested, &list(0, 0), Some("example.com")).is_empty());
    }

    #[test]
    fn test_dns_no_backfill_for_empty_common_name() {
        let names = project_dns_names(&[], &list(0, 2), Some(""));
        assert!(names.is_empty());
        let names = project_dns_names(&[], &list(0, 2), None);
        assert!(names.is_empty());
    }

    #[test]
    fn test_minimum_checked_after_backfill() {
        let mut policy = policy();
        policy.san.dns_names = list(1, 3);
        let request = build_request(&csr("example.com", &[]), &policy, ExpiryPolicy::CaAssigned, now())
            .unwrap();
        assert_eq!(request.san.dns_names, vec!["example.com"]);
    }

    #[test]
    fn test_minimum_not_met() {
        let mut policy = policy();
        policy.san.ip_addresses = list(1, 3);
        let err = build_request(&csr("example.com", &[]), &policy, ExpiryPolicy::CaAssigned, now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyValidation);
        assert!(err.to_string().contains("SANs"));
    }

    #[test]
    fn test_ip_addresses_copied_without_backfill() {
        let rule = list(0, 2);
        let requested: Vec<IpAddr> = vec!["10.0.0.1".parse().unwrap()];
        assert_eq!(project_ip_addresses(&requested, &rule), requested);

        let at_maximum: Vec<IpAddr> = vec!["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()];
        assert!(project_ip_addresses(&at_maximum, &rule).is_empty());
        assert!(project_ip_addresses(&requested, &list(0, 1)).is_empty());

        let too_many: Vec<IpAddr> = vec![
            "10.0.0.1".parse().unwrap(),
            "10.0.0.2".parse().unwrap(),
            "10.0.0.3".parse().unwrap(),
        ];
        assert!(project_ip_addresses(&too_many, &rule).is_empty());
    }

    #[test]
    fn test_key_type_mismatch_names_both() {
        let mut parsed = csr("example.com", &[]);
        parsed.public_key_algorithm = KeyAlgorithm::Ecdsa;
        let err = build_request(&parsed, &policy(), ExpiryPolicy::CaAssigned, now()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("CSR - ECDSA"));
        assert!(message.contains("CA - RSA"));
    }

    #[test]
    fn test_key_format_must_be_pkcs10() {
        let mut policy = policy();
        policy.public_key.key_format = KeyFormat::Pkcs8;
        let err = build_request(&csr("example.com", &[]), &policy, ExpiryPolicy::CaAssigned, now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(err.to_string().contains("PKCS8"));
    }

    #[test]
    fn test_hash_not_required() {
        let mut policy = policy();
        policy.signature.hash_algorithm.presence = Presence::Optional;
        let request = build_request(&csr("example.com", &[]), &policy, ExpiryPolicy::CaAssigned, now())
            .unwrap();
        assert!(request.signature.is_none());
    }

    #[test]
    fn test_hash_required_with_empty_list() {
        let mut policy = policy();
        policy.signature.hash_algorithm.list.clear();
        let err = build_request(&csr("example.com", &[]), &policy, ExpiryPolicy::CaAssigned, now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyValidation);
    }

    #[test]
    fn test_ca_assigned_validity() {
        let request = build_request(&csr("example.com", &[]), &policy(), ExpiryPolicy::CaAssigned, now())
            .unwrap();
        assert_eq!(request.validity.not_before, now().timestamp());
        assert_eq!(request.validity.not_after, 0);
    }

    #[test]
    fn test_explicit_validity() {
        let mut policy = policy();
        policy.validity = Some(ValidityPolicy {
            secondsmin: 3600,
            secondsmax: 86400,
            ..ValidityPolicy::default()
        });

        let request = build_request(
            &csr("example.com", &[]),
            &policy,
            ExpiryPolicy::Explicit { seconds: 7200 },
            now(),
        )
        .unwrap();
        assert_eq!(request.validity.not_after, now().timestamp() + 7200);

        let err = build_request(
            &csr("example.com", &[]),
            &policy,
            ExpiryPolicy::Explicit { seconds: 90000 },
            now(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyValidation);
    }

    #[test]
    fn test_request_carries_csr_pem() {
        let parsed = ParsedCsr::from_bytes(CSR_CN.as_bytes()).unwrap();
        let request = build_request(&parsed, &policy(), ExpiryPolicy::CaAssigned, now()).unwrap();
        let reparsed = ParsedCsr::from_bytes(request.csr.as_bytes()).unwrap();
        assert_eq!(reparsed.der(), parsed.der());
    }
}
