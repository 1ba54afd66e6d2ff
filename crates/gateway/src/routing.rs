// Tenant resolution from the request hostname
//
// The compute ID is the single label directly under the routing domain:
// `{compute_id}.{routing_domain}`. Hosts outside the routing domain, bare
// routing-domain hosts, and nested labels all resolve to None - the caller
// answers 400.

/// Extract the compute ID from a Host header value.
///
/// The port suffix is ignored; matching is on the DNS name only.
pub fn compute_id_from_host(host: &str, routing_domain: &str) -> Option<String> {
    let host = host.split(':').next().unwrap_or(host);
    let suffix = format!(".{routing_domain}");
    let label = host.strip_suffix(suffix.as_str())?;
    if label.is_empty() || label.contains('.') {
        return None;
    }
    Some(label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "preview.computesdk.com";

    #[test]
    fn extracts_the_leftmost_label() {
        assert_eq!(
            compute_id_from_host("test-compute-id.preview.computesdk.com", DOMAIN),
            Some("test-compute-id".to_string())
        );
    }

    #[test]
    fn ignores_the_port() {
        assert_eq!(
            compute_id_from_host("abc.preview.computesdk.com:8080", DOMAIN),
            Some("abc".to_string())
        );
    }

    #[test]
    fn bare_apex_has_no_compute_id() {
        assert_eq!(compute_id_from_host("computesdk.com", DOMAIN), None);
        assert_eq!(compute_id_from_host("preview.computesdk.com", DOMAIN), None);
    }

    #[test]
    fn foreign_domains_have_no_compute_id() {
        assert_eq!(compute_id_from_host("example.com", DOMAIN), None);
        assert_eq!(
            compute_id_from_host("abc.preview.computesdk.com.evil.com", DOMAIN),
            None
        );
    }

    #[test]
    fn nested_labels_are_rejected() {
        assert_eq!(
            compute_id_from_host("a.b.preview.computesdk.com", DOMAIN),
            None
        );
    }
}
